//! Typed permission codes of the form `hubuum.<op>_<kind>`.
//!
//! # Purpose
//! Parses permission strings once at the boundary into a [`PermissionCode`]
//! so the rest of the system works with an operation and a resource kind
//! instead of free-form text.
//!
//! # Examples
//! ```rust
//! use hubuum_authz::{Capability, PermissionCode, ResourceKind};
//!
//! let code: PermissionCode = "hubuum.namespace_namespace".parse().unwrap();
//! assert_eq!(code.capability, Capability::Namespace);
//! assert_eq!(code.kind, ResourceKind::Namespace);
//! assert_eq!(code.to_string(), "hubuum.namespace_namespace");
//! ```
use crate::{AuthzError, AuthzResult, Capability, GrantLookup, NamespaceId, Principal, ResourceKind};

const APP_LABEL: &str = "hubuum";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PermissionCode {
    pub capability: Capability,
    pub kind: ResourceKind,
}

impl PermissionCode {
    pub fn new(capability: Capability, kind: ResourceKind) -> Self {
        Self { capability, kind }
    }
}

impl std::fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{APP_LABEL}.{}_{}", self.capability, self.kind.model())
    }
}

impl std::str::FromStr for PermissionCode {
    type Err = AuthzError;

    fn from_str(value: &str) -> AuthzResult<Self> {
        let invalid = || AuthzError::MissingParameter(format!("invalid permission code {value:?}"));
        let rest = value
            .strip_prefix(APP_LABEL)
            .and_then(|rest| rest.strip_prefix('.'))
            .ok_or_else(invalid)?;
        let (operation, model) = rest.split_once('_').ok_or_else(invalid)?;
        let capability = operation.parse::<Capability>().map_err(|_| invalid())?;
        let kind = ResourceKind::from_model(model).ok_or_else(invalid)?;
        Ok(Self { capability, kind })
    }
}

/// Does some group of `principal` hold the code's operation on `namespace`?
///
/// Admins always pass. The resource kind in the code is informational; grants
/// are per namespace, not per kind.
pub fn has_perm<G: GrantLookup + ?Sized>(
    principal: &Principal,
    code: PermissionCode,
    namespace: NamespaceId,
    grants: &G,
) -> bool {
    if principal.is_admin() {
        return true;
    }
    grants.any_group_has(&principal.groups, namespace, code.capability)
}
