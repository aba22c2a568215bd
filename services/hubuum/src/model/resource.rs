//! Namespaced inventory objects.
//!
//! Every kind shares one row shape. `name` carries the kind's human key (a
//! host name, a room id, a purchase order number) and everything kind
//! specific lives in `attributes`, which the service stores but does not
//! interpret. The one exception is a host's `fqdn`, which is a lookup key.
use chrono::{DateTime, Utc};
use hubuum_authz::{NamespaceId, ResourceKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct Resource {
    pub id: i64,
    #[schema(value_type = String)]
    pub kind: ResourceKind,
    #[schema(value_type = i64)]
    pub namespace: NamespaceId,
    pub name: String,
    #[schema(value_type = Object)]
    pub attributes: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    pub fn fqdn(&self) -> Option<&str> {
        self.attributes.get("fqdn").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct NewResource {
    pub kind: ResourceKind,
    pub namespace: NamespaceId,
    pub name: String,
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct ResourcePatch {
    pub namespace: Option<NamespaceId>,
    pub name: Option<String>,
    pub attributes: Option<Map<String, Value>>,
    /// Replace the stored attributes instead of merging into them.
    pub replace_attributes: bool,
}
