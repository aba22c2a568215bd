use chrono::{DateTime, Utc};
use hubuum_authz::{NamespaceId, NamespaceName};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct Namespace {
    #[schema(value_type = i64)]
    pub id: NamespaceId,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a namespace insert.
#[derive(Debug, Clone)]
pub struct NewNamespace {
    pub name: NamespaceName,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct NamespacePatch {
    pub name: Option<NamespaceName>,
    pub description: Option<String>,
}

impl NamespacePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}
