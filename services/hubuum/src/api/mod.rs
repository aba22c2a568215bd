//! Hubuum HTTP API module.
//!
//! # Purpose
//! Exposes the route handler modules and the pieces they share: the
//! per-request [`Caller`] (principal plus its grants, loaded once) and the
//! multi-field lookups for every entity with alternate human keys.
//!
//! # Request flow
//! Every handler runs the same sequence: authenticate, look up the target,
//! authorize against it, then act.
pub mod error;
pub mod grants;
pub mod groups;
pub mod namespaces;
pub mod openapi;
pub mod permissions;
pub mod resources;
pub mod system;
pub mod types;
pub mod users;

use crate::api::error::{ApiError, api_internal, api_method_not_allowed, api_not_found};
use crate::app::AppState;
use crate::auth::session::principal_from_headers;
use crate::model::{Group, Namespace, Resource, User};
use crate::observability;
use axum::http::{HeaderMap, Method as HttpMethod};
use hubuum_authz::{
    AccessPolicy, AuthzError, Capability, Decision, DenyReason, Grant, Method, NamespaceId,
    Principal, ResourceKind, Target, Visibility, authorize_capability, decide, lookup_by_fields,
    visibility_for,
};

/// An authenticated principal and the grants of its groups.
pub(crate) struct Caller {
    pub principal: Principal,
    pub grants: Vec<Grant>,
    method: Method,
    policy: AccessPolicy,
}

impl Caller {
    /// Authenticate the request and load the caller's grants.
    ///
    /// Anonymous requests go through the decision procedure so the denial is
    /// counted like any other.
    pub async fn load(
        state: &AppState,
        headers: &HeaderMap,
        method: Method,
        policy: AccessPolicy,
    ) -> Result<Self, ApiError> {
        let Some(principal) = principal_from_headers(state, headers).await? else {
            let decision = decide(None, method, policy, &Target::Collection, &Vec::<Grant>::new());
            observability::record_decision(policy, &decision);
            return Err(decision
                .into_result()
                .err()
                .unwrap_or(AuthzError::Unauthenticated)
                .into());
        };
        let grants = if principal.is_admin() || principal.groups.is_empty() {
            Vec::new()
        } else {
            state
                .store
                .grants_for_groups(&principal.groups)
                .await
                .map_err(|err| api_internal("failed to load grants", &err))?
        };
        Ok(Self {
            principal,
            grants,
            method,
            policy,
        })
    }

    /// Run the decision procedure for this request's method against `target`.
    pub fn authorize(&self, target: &Target) -> Result<(), ApiError> {
        let decision = decide(
            Some(&self.principal),
            self.method,
            self.policy,
            target,
            &self.grants,
        );
        observability::record_decision(self.policy, &decision);
        decision.into_result().map_err(ApiError::from)
    }

    /// Require a fixed capability on `namespace`, whatever the method.
    pub fn require(&self, capability: Capability, namespace: NamespaceId) -> Result<(), ApiError> {
        let result =
            authorize_capability(&self.principal, capability, namespace, &self.grants);
        let decision = match &result {
            Ok(()) => Decision::Allow,
            Err(_) => Decision::Deny(DenyReason::MissingCapability(capability)),
        };
        observability::record_decision(self.policy, &decision);
        result.map_err(ApiError::from)
    }

    pub fn visibility(&self, kind: ResourceKind) -> Visibility {
        visibility_for(&self.principal, kind, &self.grants)
    }
}

fn lookup_error(kind: ResourceKind, err: AuthzError) -> ApiError {
    match err {
        AuthzError::NotFound(_) => api_not_found(&format!("{kind} not found")),
        other => other.into(),
    }
}

pub(crate) async fn lookup_namespace(state: &AppState, value: &str) -> Result<Namespace, ApiError> {
    let store = state.store.as_ref();
    let kind = ResourceKind::Namespace;
    lookup_by_fields(kind.lookup_fields(), value, move |field, value| {
        store.find_namespaces(field, value)
    })
    .await
    .map_err(|err| lookup_error(kind, err))
}

pub(crate) async fn lookup_group(state: &AppState, value: &str) -> Result<Group, ApiError> {
    let store = state.store.as_ref();
    let kind = ResourceKind::Group;
    lookup_by_fields(kind.lookup_fields(), value, move |field, value| {
        store.find_groups(field, value)
    })
    .await
    .map_err(|err| lookup_error(kind, err))
}

pub(crate) async fn lookup_user(state: &AppState, value: &str) -> Result<User, ApiError> {
    let store = state.store.as_ref();
    let kind = ResourceKind::User;
    lookup_by_fields(kind.lookup_fields(), value, move |field, value| {
        store.find_users(field, value)
    })
    .await
    .map_err(|err| lookup_error(kind, err))
}

pub(crate) async fn lookup_resource(
    state: &AppState,
    kind: ResourceKind,
    value: &str,
) -> Result<Resource, ApiError> {
    let store = state.store.as_ref();
    lookup_by_fields(kind.lookup_fields(), value, move |field, value| {
        store.find_resources(kind, field, value)
    })
    .await
    .map_err(|err| lookup_error(kind, err))
}

/// Handler for methods a route deliberately refuses.
pub(crate) async fn method_not_allowed(method: HttpMethod) -> ApiError {
    api_method_not_allowed(method.as_str())
}
