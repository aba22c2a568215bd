//! Permission rows as a top-level collection.
//!
//! Everyone authenticated may read the rows of namespaces they can read;
//! only admins write here. Non-admins manage grants through the namespace
//! grant sub-resource instead.
use crate::api::error::{ApiError, api_not_found, api_store_error, api_validation_error};
use crate::api::types::{PermissionCreateRequest, PermissionListResponse};
use crate::api::{Caller, lookup_group, lookup_namespace};
use crate::app::AppState;
use crate::model::Permission;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use hubuum_authz::{AccessPolicy, LookupField, Method, ResourceKind, Target};

const POLICY: AccessPolicy = AccessPolicy::AdminOrReadOnly;

fn permission_id(value: &str) -> Result<i64, ApiError> {
    LookupField::parse_id(value).map_err(|_| api_not_found("permission not found"))
}

#[utoipa::path(
    get,
    path = "/api/v1/permissions",
    tag = "permissions",
    responses(
        (status = 200, description = "Permission rows on readable namespaces", body = PermissionListResponse)
    )
)]
pub(crate) async fn list_permissions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PermissionListResponse>, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Get, POLICY).await?;
    caller.authorize(&Target::Collection)?;
    let items = state
        .store
        .list_permissions()
        .await
        .map_err(|err| api_store_error("failed to list permissions", err))?;
    let items = caller
        .visibility(ResourceKind::Permission)
        .filter(items, |permission| permission.namespace);
    Ok(Json(PermissionListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/api/v1/permissions",
    tag = "permissions",
    request_body = PermissionCreateRequest,
    responses(
        (status = 201, description = "Permission created", body = Permission),
        (status = 400, description = "No capability flag set", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Admins only", body = crate::api::types::ErrorResponse),
        (status = 409, description = "The group already has a grant", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_permission(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<PermissionCreateRequest>,
) -> Result<(StatusCode, Json<Permission>), ApiError> {
    let caller = Caller::load(&state, &headers, Method::Post, POLICY).await?;
    caller.authorize(&Target::Collection)?;
    let namespace = lookup_namespace(&state, &body.namespace).await?;
    let group = lookup_group(&state, &body.group).await?;
    let capabilities = body.flags.capabilities();
    if capabilities.is_empty() {
        return Err(api_validation_error("at least one capability flag must be set"));
    }
    let permission = state
        .store
        .grant(namespace.id, group.id, capabilities)
        .await
        .map_err(|err| api_store_error("failed to create permission", err))?;
    Ok((StatusCode::CREATED, Json(permission)))
}

#[utoipa::path(
    get,
    path = "/api/v1/permissions/{id}",
    tag = "permissions",
    params(("id" = i64, Path, description = "Permission id")),
    responses(
        (status = 200, description = "Permission", body = Permission),
        (status = 404, description = "Permission not found or not visible", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_permission(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Permission>, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Get, POLICY).await?;
    let permission = state
        .store
        .get_permission(permission_id(&id)?)
        .await
        .map_err(|err| api_store_error("failed to load permission", err))?;
    caller.authorize(&Target::Object(permission.namespace))?;
    if !caller
        .visibility(ResourceKind::Permission)
        .allows(permission.namespace)
    {
        return Err(api_not_found("permission not found"));
    }
    Ok(Json(permission))
}

#[utoipa::path(
    delete,
    path = "/api/v1/permissions/{id}",
    tag = "permissions",
    params(("id" = i64, Path, description = "Permission id")),
    responses(
        (status = 204, description = "Permission deleted"),
        (status = 403, description = "Admins only", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Permission not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_permission(
    Path(id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Delete, POLICY).await?;
    let permission = state
        .store
        .get_permission(permission_id(&id)?)
        .await
        .map_err(|err| api_store_error("failed to load permission", err))?;
    caller.authorize(&Target::Object(permission.namespace))?;
    state
        .store
        .delete_permission(permission.id)
        .await
        .map_err(|err| api_store_error("failed to delete permission", err))?;
    Ok(StatusCode::NO_CONTENT)
}
