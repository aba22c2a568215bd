//! List visibility.
//!
//! Admins and open kinds see everything. Everyone else sees rows whose
//! namespace some of their groups can read. Having no read grant at all yields
//! an empty list, never an error.
use crate::{Capability, GrantLookup, NamespaceId, Principal, ResourceKind};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    All,
    Namespaces(HashSet<NamespaceId>),
}

impl Visibility {
    pub fn allows(&self, namespace: NamespaceId) -> bool {
        match self {
            Visibility::All => true,
            Visibility::Namespaces(set) => set.contains(&namespace),
        }
    }

    /// Keep the items whose namespace is visible.
    pub fn filter<T, F>(&self, items: Vec<T>, namespace_of: F) -> Vec<T>
    where
        F: Fn(&T) -> NamespaceId,
    {
        match self {
            Visibility::All => items,
            Visibility::Namespaces(_) => items
                .into_iter()
                .filter(|item| self.allows(namespace_of(item)))
                .collect(),
        }
    }
}

pub fn visibility_for<G: GrantLookup + ?Sized>(
    principal: &Principal,
    kind: ResourceKind,
    grants: &G,
) -> Visibility {
    if principal.is_admin() || kind.is_open() {
        return Visibility::All;
    }
    let readable = principal
        .groups
        .iter()
        .flat_map(|group| grants.namespaces_with(*group, Capability::Read))
        .collect();
    Visibility::Namespaces(readable)
}
