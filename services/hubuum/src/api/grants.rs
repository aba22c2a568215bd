//! Grant sub-resource of a namespace: `/namespaces/{val}/groups[/{group}]`.
//!
//! Reading grants needs `read` on the namespace. Creating and revoking them
//! needs `namespace`, the same capability that guards the namespace's own
//! identity. Admins bypass both. The holder listing takes `?capability=` to
//! narrow it to groups holding one capability.
use crate::api::error::{
    ApiError, api_conflict, api_not_found, api_store_error, api_validation_error,
};
use crate::api::types::{GrantFlags, GroupListResponse};
use crate::api::{Caller, lookup_group, lookup_namespace};
use crate::app::AppState;
use crate::model::Permission;
use crate::store::StoreError;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use hubuum_authz::{AccessPolicy, Capability, Method};
use serde::Deserialize;
use std::collections::BTreeMap;

const POLICY: AccessPolicy = AccessPolicy::NamespaceScoped;

/// Query string of the grant-holder listing.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct HolderQuery {
    /// Only list groups holding this capability.
    pub capability: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/namespaces/{val}/groups",
    tag = "grants",
    params(
        ("val" = String, Path, description = "Namespace id or name"),
        ("capability" = Option<String>, Query, description = "Only groups holding this capability")
    ),
    responses(
        (status = 200, description = "Groups holding a grant on the namespace", body = GroupListResponse),
        (status = 400, description = "Unknown capability", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Namespace not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_namespace_groups(
    Path(val): Path<String>,
    Query(query): Query<HolderQuery>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<GroupListResponse>, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Get, POLICY).await?;
    let namespace = lookup_namespace(&state, &val).await?;
    caller.require(Capability::Read, namespace.id)?;

    let capabilities = match query.capability.as_deref() {
        Some(text) => match text.parse::<Capability>() {
            Ok(capability) => vec![capability],
            Err(()) => {
                return Err(api_validation_error(&format!("unknown capability {text:?}")));
            }
        },
        None => Capability::ALL.to_vec(),
    };
    // A group holding several capabilities shows up once.
    let mut holders = BTreeMap::new();
    for capability in capabilities {
        let groups = state
            .store
            .groups_with_capability(namespace.id, capability)
            .await
            .map_err(|err| api_store_error("failed to list grant holders", err))?;
        holders.extend(groups.into_iter().map(|group| (group.id, group)));
    }
    Ok(Json(GroupListResponse {
        items: holders.into_values().collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/namespaces/{val}/groups/{group}",
    tag = "grants",
    params(
        ("val" = String, Path, description = "Namespace id or name"),
        ("group" = String, Path, description = "Group id or name")
    ),
    responses(
        (status = 200, description = "The group's grant", body = Permission),
        (status = 404, description = "Namespace, group or grant not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_grant(
    Path((val, group)): Path<(String, String)>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Permission>, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Get, POLICY).await?;
    let namespace = lookup_namespace(&state, &val).await?;
    let group = lookup_group(&state, &group).await?;
    caller.require(Capability::Read, namespace.id)?;
    state
        .store
        .find_permission(namespace.id, group.id)
        .await
        .map_err(|err| api_store_error("failed to load grant", err))?
        .map(Json)
        .ok_or_else(|| api_not_found("grant not found"))
}

#[utoipa::path(
    post,
    path = "/api/v1/namespaces/{val}/groups/{group}",
    tag = "grants",
    params(
        ("val" = String, Path, description = "Namespace id or name"),
        ("group" = String, Path, description = "Group id or name")
    ),
    request_body = GrantFlags,
    responses(
        (status = 204, description = "Grant created"),
        (status = 400, description = "No capability flag set", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Namespace or group not found", body = crate::api::types::ErrorResponse),
        (status = 409, description = "The group already has a grant", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_grant(
    Path((val, group)): Path<(String, String)>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(flags): Json<GrantFlags>,
) -> Result<StatusCode, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Post, POLICY).await?;
    let namespace = lookup_namespace(&state, &val).await?;
    let group = lookup_group(&state, &group).await?;
    caller.require(Capability::Namespace, namespace.id)?;

    let capabilities = flags.capabilities();
    if capabilities.is_empty() {
        return Err(api_validation_error("at least one capability flag must be set"));
    }
    match state.store.grant(namespace.id, group.id, capabilities).await {
        Ok(_) => {
            tracing::info!(namespace = %namespace.name, group = %group.name, "grant created");
            Ok(StatusCode::NO_CONTENT)
        }
        Err(StoreError::Conflict(_)) => Err(api_conflict(
            "already_exists",
            &format!("group {} already has a grant on {}", group.name, namespace.name),
        )),
        Err(err) => Err(api_store_error("failed to create grant", err)),
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/namespaces/{val}/groups/{group}",
    tag = "grants",
    params(
        ("val" = String, Path, description = "Namespace id or name"),
        ("group" = String, Path, description = "Group id or name")
    ),
    responses(
        (status = 204, description = "Grant revoked"),
        (status = 404, description = "Namespace, group or grant not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_grant(
    Path((val, group)): Path<(String, String)>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Delete, POLICY).await?;
    let namespace = lookup_namespace(&state, &val).await?;
    let group = lookup_group(&state, &group).await?;
    caller.require(Capability::Namespace, namespace.id)?;

    let removed = state
        .store
        .revoke(namespace.id, group.id)
        .await
        .map_err(|err| api_store_error("failed to revoke grant", err))?;
    if !removed {
        return Err(api_not_found("grant not found"));
    }
    tracing::info!(namespace = %namespace.name, group = %group.name, "grant revoked");
    Ok(StatusCode::NO_CONTENT)
}
