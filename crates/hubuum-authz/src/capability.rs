//! Capability flags carried by a namespace grant.
//!
//! # Purpose
//! Names the five independent operations a group may be granted on a
//! namespace and provides a compact set type for them.
//!
//! # Key invariants
//! - Flags are independent. Holding `update` says nothing about `read`.
//! - `Namespace` means "may create child namespaces below this one, or modify
//!   this namespace's own identity".
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Create,
    Read,
    Update,
    Delete,
    Namespace,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::Create,
        Capability::Read,
        Capability::Update,
        Capability::Delete,
        Capability::Namespace,
    ];

    /// Bare operation name, as used in permission codes (`read`).
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Create => "create",
            Capability::Read => "read",
            Capability::Update => "update",
            Capability::Delete => "delete",
            Capability::Namespace => "namespace",
        }
    }

    /// Grant column name for this capability (`has_read`).
    pub fn field_name(self) -> &'static str {
        match self {
            Capability::Create => "has_create",
            Capability::Read => "has_read",
            Capability::Update => "has_update",
            Capability::Delete => "has_delete",
            Capability::Namespace => "has_namespace",
        }
    }

    /// Resolve a grant column name back into a capability.
    pub fn from_field_name(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|capability| capability.field_name() == value)
    }

    fn bit(self) -> u8 {
        match self {
            Capability::Create => 1,
            Capability::Read => 1 << 1,
            Capability::Update => 1 << 2,
            Capability::Delete => 1 << 3,
            Capability::Namespace => 1 << 4,
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Capability {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create" => Ok(Capability::Create),
            "read" => Ok(Capability::Read),
            "update" => Ok(Capability::Update),
            "delete" => Ok(Capability::Delete),
            "namespace" => Ok(Capability::Namespace),
            _ => Err(()),
        }
    }
}

/// Set of capabilities held by one grant.
///
/// Serializes as the list of held operation names, e.g. `["read", "update"]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<Capability>", from = "Vec<Capability>")]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Capability::ALL.into_iter().collect()
    }

    pub fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn insert(&mut self, capability: Capability) {
        self.0 |= capability.bit();
    }

    pub fn remove(&mut self, capability: Capability) {
        self.0 &= !capability.bit();
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.insert(capability);
        self
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL
            .into_iter()
            .filter(move |capability| self.contains(*capability))
    }

    /// Build a set from the five grant columns, in column order.
    pub fn from_flags(
        create: bool,
        read: bool,
        update: bool,
        delete: bool,
        namespace: bool,
    ) -> Self {
        let mut set = Self::empty();
        for (flag, capability) in [create, read, update, delete, namespace]
            .into_iter()
            .zip(Capability::ALL)
        {
            if flag {
                set.insert(capability);
            }
        }
        set
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = Self::empty();
        for capability in iter {
            set.insert(capability);
        }
        set
    }
}

impl From<CapabilitySet> for Vec<Capability> {
    fn from(set: CapabilitySet) -> Self {
        set.iter().collect()
    }
}

impl From<Vec<Capability>> for CapabilitySet {
    fn from(capabilities: Vec<Capability>) -> Self {
        capabilities.into_iter().collect()
    }
}
