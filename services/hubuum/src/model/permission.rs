use chrono::{DateTime, Utc};
use hubuum_authz::{CapabilitySet, Grant, GroupId, NamespaceId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A grant row: one group's capabilities on one namespace.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct Permission {
    pub id: i64,
    #[schema(value_type = i64)]
    pub namespace: NamespaceId,
    #[schema(value_type = i64)]
    pub group: GroupId,
    pub has_create: bool,
    pub has_read: bool,
    pub has_update: bool,
    pub has_delete: bool,
    pub has_namespace: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    pub fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::from_flags(
            self.has_create,
            self.has_read,
            self.has_update,
            self.has_delete,
            self.has_namespace,
        )
    }

    pub fn set_capabilities(&mut self, capabilities: CapabilitySet) {
        use hubuum_authz::Capability;
        self.has_create = capabilities.contains(Capability::Create);
        self.has_read = capabilities.contains(Capability::Read);
        self.has_update = capabilities.contains(Capability::Update);
        self.has_delete = capabilities.contains(Capability::Delete);
        self.has_namespace = capabilities.contains(Capability::Namespace);
    }

    pub fn to_grant(&self) -> Grant {
        Grant::new(self.namespace, self.group, self.capabilities())
    }
}
