//! Namespace permission model shared by the hubuum service and its tests.
//!
//! # Purpose
//! Centralizes the dotted namespace hierarchy, the five-flag capability model,
//! typed permission codes, the per-request authorization decision, list
//! visibility filtering and ordered multi-field lookup.
//!
//! # How it fits
//! The crate is storage agnostic. The HTTP service resolves principals,
//! namespaces and grants from its store, then asks this crate for a decision.
//! Nothing in here performs I/O.
//!
//! # Key invariants
//! - Staff and superusers bypass every grant check.
//! - Capability flags are independent; `update` never implies `read`.
//! - Root namespaces (no dot) can only be created by admins.
//!
//! # Examples
//! ```rust
//! use hubuum_authz::{
//!     AccessPolicy, Capability, CapabilitySet, Decision, Grant, GroupId, Method, NamespaceId,
//!     Principal, Target, UserId, decide,
//! };
//!
//! let infra = NamespaceId::new(1);
//! let netops = GroupId::new(7);
//! let grants = vec![Grant::new(infra, netops, CapabilitySet::from_iter([Capability::Read]))];
//! let user = Principal::new(UserId::new(3), "alice").with_groups([netops]);
//!
//! let decision = decide(
//!     Some(&user),
//!     Method::Get,
//!     AccessPolicy::NamespaceScoped,
//!     &Target::Object(infra),
//!     grants.as_slice(),
//! );
//! assert_eq!(decision, Decision::Allow);
//! ```

mod capability;
mod decision;
mod errors;
mod grant;
mod lookup;
mod permission;
mod principal;
mod resource;
mod types;
mod visibility;

pub use capability::{Capability, CapabilitySet};
pub use decision::{
    AccessPolicy, Decision, DenyReason, Method, Target, authorize_capability, decide,
    resolve_owner_group,
};
pub use errors::{AuthzError, AuthzResult};
pub use grant::{Grant, GrantLookup};
pub use lookup::{LookupField, lookup_by_fields};
pub use permission::{PermissionCode, has_perm};
pub use principal::Principal;
pub use resource::{KindDescriptor, ResourceKind};
pub use types::{GroupId, NamespaceId, NamespaceName, UserId, is_root, parent_of};
pub use visibility::{Visibility, visibility_for};
