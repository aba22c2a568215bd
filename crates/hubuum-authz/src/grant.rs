//! Namespace grants and read access to them.
//!
//! # Purpose
//! A [`Grant`] binds one group to one namespace with a capability set.
//! [`GrantLookup`] is the seam the decision procedure reads grants through,
//! so callers can hand it a slice loaded from any store.
//!
//! # Key invariants
//! - At most one grant exists per (namespace, group). Enforcing that is the
//!   store's job; lookups here tolerate duplicates by taking the union.
use crate::{Capability, CapabilitySet, GroupId, NamespaceId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub namespace: NamespaceId,
    pub group: GroupId,
    pub capabilities: CapabilitySet,
}

impl Grant {
    pub fn new(namespace: NamespaceId, group: GroupId, capabilities: CapabilitySet) -> Self {
        Self {
            namespace,
            group,
            capabilities,
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }
}

/// Read-only view over a set of grants.
pub trait GrantLookup {
    /// Capabilities `group` holds on `namespace`; empty when there is no grant.
    fn capabilities(&self, namespace: NamespaceId, group: GroupId) -> CapabilitySet;

    /// Every namespace on which `group` holds `capability`.
    fn namespaces_with(&self, group: GroupId, capability: Capability) -> HashSet<NamespaceId>;

    /// Every group holding `capability` on `namespace`.
    fn groups_with_capability(
        &self,
        namespace: NamespaceId,
        capability: Capability,
    ) -> BTreeSet<GroupId>;

    /// True when any of `groups` holds `capability` on `namespace`.
    fn any_group_has(
        &self,
        groups: &[GroupId],
        namespace: NamespaceId,
        capability: Capability,
    ) -> bool {
        groups
            .iter()
            .any(|group| self.capabilities(namespace, *group).contains(capability))
    }
}

impl GrantLookup for [Grant] {
    fn capabilities(&self, namespace: NamespaceId, group: GroupId) -> CapabilitySet {
        self.iter()
            .filter(|grant| grant.namespace == namespace && grant.group == group)
            .flat_map(|grant| grant.capabilities.iter())
            .collect()
    }

    fn namespaces_with(&self, group: GroupId, capability: Capability) -> HashSet<NamespaceId> {
        self.iter()
            .filter(|grant| grant.group == group && grant.allows(capability))
            .map(|grant| grant.namespace)
            .collect()
    }

    fn groups_with_capability(
        &self,
        namespace: NamespaceId,
        capability: Capability,
    ) -> BTreeSet<GroupId> {
        self.iter()
            .filter(|grant| grant.namespace == namespace && grant.allows(capability))
            .map(|grant| grant.group)
            .collect()
    }
}

impl GrantLookup for Vec<Grant> {
    fn capabilities(&self, namespace: NamespaceId, group: GroupId) -> CapabilitySet {
        self.as_slice().capabilities(namespace, group)
    }

    fn namespaces_with(&self, group: GroupId, capability: Capability) -> HashSet<NamespaceId> {
        self.as_slice().namespaces_with(group, capability)
    }

    fn groups_with_capability(
        &self,
        namespace: NamespaceId,
        capability: Capability,
    ) -> BTreeSet<GroupId> {
        self.as_slice().groups_with_capability(namespace, capability)
    }
}
