//! Resource kinds known to the inventory and their per-kind configuration.
//!
//! # Purpose
//! Enumerates every kind of entity the API serves and attaches a static
//! [`KindDescriptor`] to each one: its model name (used in permission codes),
//! its URL segment, whether it is namespaced, whether it is open (exempt from
//! namespace scoped visibility), and its ordered lookup fields.
//!
//! # Key invariants
//! - Exactly the namespaced kinds carry a namespace id on every row.
//! - Open kinds are listed in full for any authenticated principal.
use crate::LookupField;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Host,
    HostType,
    Room,
    Jack,
    Person,
    Vendor,
    PurchaseOrder,
    PurchaseDocuments,
    Namespace,
    Permission,
    User,
    Group,
}

/// Static configuration for one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindDescriptor {
    pub model: &'static str,
    pub path: &'static str,
    pub namespaced: bool,
    pub open: bool,
    pub lookup_fields: &'static [LookupField],
}

const ID_NAME: &[LookupField] = &[LookupField::Id, LookupField::Name];

impl ResourceKind {
    pub const ALL: [ResourceKind; 12] = [
        ResourceKind::Host,
        ResourceKind::HostType,
        ResourceKind::Room,
        ResourceKind::Jack,
        ResourceKind::Person,
        ResourceKind::Vendor,
        ResourceKind::PurchaseOrder,
        ResourceKind::PurchaseDocuments,
        ResourceKind::Namespace,
        ResourceKind::Permission,
        ResourceKind::User,
        ResourceKind::Group,
    ];

    /// Kinds stored in the generic resource table and served under `/{kind}`.
    pub const INVENTORY: [ResourceKind; 8] = [
        ResourceKind::Host,
        ResourceKind::HostType,
        ResourceKind::Room,
        ResourceKind::Jack,
        ResourceKind::Person,
        ResourceKind::Vendor,
        ResourceKind::PurchaseOrder,
        ResourceKind::PurchaseDocuments,
    ];

    pub fn descriptor(self) -> KindDescriptor {
        let (model, path) = match self {
            ResourceKind::Host => ("host", "hosts"),
            ResourceKind::HostType => ("hosttype", "hosttypes"),
            ResourceKind::Room => ("room", "rooms"),
            ResourceKind::Jack => ("jack", "jacks"),
            ResourceKind::Person => ("person", "persons"),
            ResourceKind::Vendor => ("vendor", "vendors"),
            ResourceKind::PurchaseOrder => ("purchaseorder", "purchaseorders"),
            ResourceKind::PurchaseDocuments => ("purchasedocuments", "purchasedocuments"),
            ResourceKind::Namespace => ("namespace", "namespaces"),
            ResourceKind::Permission => ("permission", "permissions"),
            ResourceKind::User => ("user", "users"),
            ResourceKind::Group => ("group", "groups"),
        };
        let lookup_fields: &'static [LookupField] = match self {
            ResourceKind::Host => &[LookupField::Id, LookupField::Name, LookupField::Fqdn],
            ResourceKind::User => &[LookupField::Id, LookupField::Username, LookupField::Email],
            ResourceKind::Permission => &[LookupField::Id],
            _ => ID_NAME,
        };
        KindDescriptor {
            model,
            path,
            namespaced: !matches!(self, ResourceKind::User | ResourceKind::Group),
            open: matches!(self, ResourceKind::User | ResourceKind::Group),
            lookup_fields,
        }
    }

    pub fn model(self) -> &'static str {
        self.descriptor().model
    }

    pub fn path(self) -> &'static str {
        self.descriptor().path
    }

    pub fn is_open(self) -> bool {
        self.descriptor().open
    }

    pub fn lookup_fields(self) -> &'static [LookupField] {
        self.descriptor().lookup_fields
    }

    pub fn from_model(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.model() == value)
    }

    pub fn from_path(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.path() == value)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.model())
    }
}
