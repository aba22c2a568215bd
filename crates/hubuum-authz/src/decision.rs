//! Per-request authorization decision.
//!
//! # Purpose
//! Reconciles the HTTP method, the access policy of the endpoint, the target
//! of the request and the principal's group grants into a single
//! [`Decision`].
//!
//! # How it fits
//! Handlers authenticate, resolve their target (looking up the namespace an
//! object lives in, or the parent of a namespace being created), and only then
//! call [`decide`]. The decision has no side effects. The one state change
//! tied to authorization, granting the owner group full rights on a freshly
//! created namespace, is picked by [`resolve_owner_group`] and committed by the
//! store together with the namespace row.
//!
//! # Key invariants
//! - Admin bypass is checked first, before anything else.
//! - Anonymous principals are denied with [`DenyReason::Unauthenticated`].
//! - Writes to a namespace's own identity need `namespace`, not `update`.
//! - Root namespaces can only be created by admins.
//! - A multi-group principal must always name the owner group explicitly.
//!
//! # Common pitfalls
//! - Treating `update` as implying `read`. A group holding only `update` can
//!   modify objects it cannot see.
use crate::{
    AuthzError, AuthzResult, Capability, GrantLookup, GroupId, NamespaceId, NamespaceName,
    PermissionCode, Principal, ResourceKind, has_perm,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Options,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    pub fn is_safe(self) -> bool {
        matches!(self, Method::Get | Method::Head | Method::Options)
    }

    /// Capability a method needs on an existing target.
    ///
    /// `target_is_namespace` switches writes and deletes to the `namespace`
    /// capability, since they change the namespace itself.
    pub fn required_capability(self, target_is_namespace: bool) -> Capability {
        match self {
            Method::Get | Method::Head | Method::Options => Capability::Read,
            Method::Post => Capability::Create,
            Method::Put | Method::Patch if target_is_namespace => Capability::Namespace,
            Method::Put | Method::Patch => Capability::Update,
            Method::Delete if target_is_namespace => Capability::Namespace,
            Method::Delete => Capability::Delete,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = AuthzError;

    fn from_str(value: &str) -> AuthzResult<Self> {
        match value.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(AuthzError::MethodNotAllowed(value.to_string())),
        }
    }
}

/// How an endpoint composes authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessPolicy {
    /// Grant based checks against the namespace the target lives in.
    NamespaceScoped,
    /// Admins may do anything, everyone else authenticated may only read.
    AdminOrReadOnly,
}

impl AccessPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessPolicy::NamespaceScoped => "namespace_scoped",
            AccessPolicy::AdminOrReadOnly => "admin_or_read_only",
        }
    }
}

/// What a request acts on, already resolved against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The collection itself (list).
    Collection,
    /// An existing namespace, acted on as an object.
    Namespace(NamespaceId),
    /// An existing object living in the given namespace.
    Object(NamespaceId),
    /// A namespace about to be created. `parent` is the id of the literal
    /// parent namespace, or `None` when it does not exist.
    NewNamespace {
        name: NamespaceName,
        parent: Option<NamespaceId>,
    },
    /// An object about to be created in `namespace`, or `None` when the named
    /// namespace does not exist.
    NewObject { namespace: Option<NamespaceId> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    MissingCapability(Capability),
    RootNamespaceRequiresAdmin,
    AdminRequired,
    UnsafeCollectionMethod(Method),
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenyReason::Unauthenticated => f.write_str("authentication required"),
            DenyReason::MissingCapability(capability) => {
                write!(f, "no group grants {capability} on the namespace")
            }
            DenyReason::RootNamespaceRequiresAdmin => {
                f.write_str("only admins may create root namespaces")
            }
            DenyReason::AdminRequired => f.write_str("admin privileges required"),
            DenyReason::UnsafeCollectionMethod(method) => {
                write!(f, "{method} requires a resolved target")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
    NotFound(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Metric label for the outcome.
    pub fn outcome(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Deny(DenyReason::Unauthenticated) => "unauthenticated",
            Decision::Deny(_) => "deny",
            Decision::NotFound(_) => "not_found",
        }
    }

    pub fn into_result(self) -> AuthzResult<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(DenyReason::Unauthenticated) => Err(AuthzError::Unauthenticated),
            Decision::Deny(reason) => Err(AuthzError::Forbidden(reason.to_string())),
            Decision::NotFound(what) => Err(AuthzError::NotFound(what)),
        }
    }
}

/// Decide whether `principal` may perform `method` on `target`.
pub fn decide<G: GrantLookup + ?Sized>(
    principal: Option<&Principal>,
    method: Method,
    policy: AccessPolicy,
    target: &Target,
    grants: &G,
) -> Decision {
    let decision = evaluate(principal, method, policy, target, grants);
    tracing::debug!(
        user = principal.map(|p| p.username.as_str()).unwrap_or("<anonymous>"),
        method = method.as_str(),
        policy = policy.as_str(),
        ?target,
        outcome = decision.outcome(),
        "authorization decision"
    );
    decision
}

fn evaluate<G: GrantLookup + ?Sized>(
    principal: Option<&Principal>,
    method: Method,
    policy: AccessPolicy,
    target: &Target,
    grants: &G,
) -> Decision {
    let Some(principal) = principal else {
        return Decision::Deny(DenyReason::Unauthenticated);
    };
    if principal.is_admin() {
        return Decision::Allow;
    }

    if policy == AccessPolicy::AdminOrReadOnly {
        return if method.is_safe() {
            Decision::Allow
        } else {
            Decision::Deny(DenyReason::AdminRequired)
        };
    }

    let require = |namespace: NamespaceId, capability: Capability| {
        if grants.any_group_has(&principal.groups, namespace, capability) {
            Decision::Allow
        } else {
            Decision::Deny(DenyReason::MissingCapability(capability))
        }
    };

    match target {
        Target::Collection if method.is_safe() => Decision::Allow,
        Target::Collection => Decision::Deny(DenyReason::UnsafeCollectionMethod(method)),
        Target::Namespace(namespace) => require(*namespace, method.required_capability(true)),
        Target::Object(namespace) => require(*namespace, method.required_capability(false)),
        Target::NewNamespace { name, .. } if name.is_root() => {
            Decision::Deny(DenyReason::RootNamespaceRequiresAdmin)
        }
        Target::NewNamespace { name, parent: None } => Decision::NotFound(format!(
            "parent namespace {} does not exist",
            name.parent().map(|p| p.to_string()).unwrap_or_default()
        )),
        Target::NewNamespace {
            parent: Some(parent),
            ..
        } => require(*parent, Capability::Namespace),
        Target::NewObject { namespace: None } => {
            Decision::NotFound("namespace does not exist".to_string())
        }
        Target::NewObject {
            namespace: Some(namespace),
        } => require(*namespace, Capability::Create),
    }
}

/// Require `capability` on `namespace` regardless of the HTTP method.
///
/// Used by endpoints whose required capability is fixed, such as managing the
/// grants of a namespace.
pub fn authorize_capability<G: GrantLookup + ?Sized>(
    principal: &Principal,
    capability: Capability,
    namespace: NamespaceId,
    grants: &G,
) -> AuthzResult<()> {
    let code = PermissionCode::new(capability, ResourceKind::Namespace);
    if has_perm(principal, code, namespace, grants) {
        return Ok(());
    }
    Err(AuthzError::Forbidden(
        DenyReason::MissingCapability(capability).to_string(),
    ))
}

/// Pick the group that will own a namespace created by `principal`.
///
/// Admins may name any group, or none. Everyone else must name a group they
/// belong to, or belong to exactly one group and name nothing.
///
/// # Errors
/// - [`AuthzError::MissingParameter`] when the requested group is not one of
///   the principal's groups, or when no group was requested and the principal
///   does not have exactly one.
pub fn resolve_owner_group(
    principal: &Principal,
    requested: Option<GroupId>,
) -> AuthzResult<Option<GroupId>> {
    match requested {
        Some(group) if principal.is_admin() || principal.is_member_of(group) => Ok(Some(group)),
        Some(group) => Err(AuthzError::MissingParameter(format!(
            "user {} is not a member of group {group}",
            principal.username
        ))),
        None if principal.is_admin() => Ok(None),
        None if principal.has_only_one_group() => Ok(principal.groups.first().copied()),
        None => Err(AuthzError::MissingParameter(
            "no group parameter provided, and no singular default available".to_string(),
        )),
    }
}
