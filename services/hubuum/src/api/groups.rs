//! Group and group membership API handlers.
//!
//! Groups are an open kind. Any authenticated caller may list groups and test
//! membership; only admins create, rename or delete groups and change who is
//! in them. Deleting a group drops its grants and memberships but leaves the
//! namespaces and resources those grants pointed to.
use crate::api::error::{ApiError, api_not_found, api_store_error, api_validation_error};
use crate::api::types::{GroupListResponse, GroupRequest, Membership};
use crate::api::{Caller, lookup_group, lookup_user};
use crate::app::AppState;
use crate::model::Group;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use hubuum_authz::{AccessPolicy, Method, Target};

const POLICY: AccessPolicy = AccessPolicy::AdminOrReadOnly;

fn group_name(name: &str) -> Result<&str, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(api_validation_error("group name must not be empty"));
    }
    Ok(name)
}

#[utoipa::path(
    get,
    path = "/api/v1/groups",
    tag = "groups",
    responses((status = 200, description = "All groups", body = GroupListResponse))
)]
pub(crate) async fn list_groups(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<GroupListResponse>, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Get, POLICY).await?;
    caller.authorize(&Target::Collection)?;
    let items = state
        .store
        .list_groups()
        .await
        .map_err(|err| api_store_error("failed to list groups", err))?;
    Ok(Json(GroupListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/api/v1/groups",
    tag = "groups",
    request_body = GroupRequest,
    responses(
        (status = 201, description = "Group created", body = Group),
        (status = 403, description = "Admins only", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Group name taken", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<GroupRequest>,
) -> Result<(StatusCode, Json<Group>), ApiError> {
    let caller = Caller::load(&state, &headers, Method::Post, POLICY).await?;
    caller.authorize(&Target::Collection)?;
    let group = state
        .store
        .create_group(group_name(&body.name)?)
        .await
        .map_err(|err| api_store_error("failed to create group", err))?;
    tracing::info!(group = %group.name, "group created");
    Ok((StatusCode::CREATED, Json(group)))
}

#[utoipa::path(
    get,
    path = "/api/v1/groups/{val}",
    tag = "groups",
    params(("val" = String, Path, description = "Group id or name")),
    responses(
        (status = 200, description = "Group", body = Group),
        (status = 404, description = "Group not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_group(
    Path(val): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Group>, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Get, POLICY).await?;
    caller.authorize(&Target::Collection)?;
    Ok(Json(lookup_group(&state, &val).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/groups/{val}",
    tag = "groups",
    params(("val" = String, Path, description = "Group id or name")),
    request_body = GroupRequest,
    responses(
        (status = 200, description = "Group renamed", body = Group),
        (status = 403, description = "Admins only", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Group name taken", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn patch_group(
    Path(val): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<GroupRequest>,
) -> Result<Json<Group>, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Patch, POLICY).await?;
    let group = lookup_group(&state, &val).await?;
    caller.authorize(&Target::Collection)?;
    let renamed = state
        .store
        .rename_group(group.id, group_name(&body.name)?)
        .await
        .map_err(|err| api_store_error("failed to rename group", err))?;
    Ok(Json(renamed))
}

#[utoipa::path(
    delete,
    path = "/api/v1/groups/{val}",
    tag = "groups",
    params(("val" = String, Path, description = "Group id or name")),
    responses(
        (status = 204, description = "Group, its grants and memberships deleted"),
        (status = 403, description = "Admins only", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Group not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_group(
    Path(val): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Delete, POLICY).await?;
    let group = lookup_group(&state, &val).await?;
    caller.authorize(&Target::Collection)?;
    state
        .store
        .delete_group(group.id)
        .await
        .map_err(|err| api_store_error("failed to delete group", err))?;
    tracing::info!(group = %group.name, "group deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/groups/{group}/members/{user}",
    tag = "groups",
    params(
        ("group" = String, Path, description = "Group id or name"),
        ("user" = String, Path, description = "User id, username or email")
    ),
    responses(
        (status = 204, description = "The user is a member"),
        (status = 404, description = "Not a member, or unknown group or user", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_member(
    Path((group, user)): Path<(String, String)>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Get, POLICY).await?;
    let group = lookup_group(&state, &group).await?;
    let user = lookup_user(&state, &user).await?;
    caller.authorize(&Target::Collection)?;
    let member = state
        .store
        .is_member(group.id, user.id)
        .await
        .map_err(|err| api_store_error("failed to check membership", err))?;
    if !member {
        return Err(api_not_found("user is not a member of the group"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/groups/{group}/members/{user}",
    tag = "groups",
    params(
        ("group" = String, Path, description = "Group id or name"),
        ("user" = String, Path, description = "User id, username or email")
    ),
    responses(
        (status = 201, description = "Membership created", body = Membership),
        (status = 200, description = "Already a member", body = Membership),
        (status = 403, description = "Admins only", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn add_member(
    Path((group, user)): Path<(String, String)>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Membership>), ApiError> {
    let caller = Caller::load(&state, &headers, Method::Post, POLICY).await?;
    let group = lookup_group(&state, &group).await?;
    let user = lookup_user(&state, &user).await?;
    caller.authorize(&Target::Collection)?;
    let created = state
        .store
        .add_member(group.id, user.id)
        .await
        .map_err(|err| api_store_error("failed to add member", err))?;
    let user = state
        .store
        .get_user(user.id)
        .await
        .map_err(|err| api_store_error("failed to reload user", err))?;
    let status = if created {
        tracing::info!(group = %group.name, user = %user.username, "member added");
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(Membership { group, user })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/groups/{group}/members/{user}",
    tag = "groups",
    params(
        ("group" = String, Path, description = "Group id or name"),
        ("user" = String, Path, description = "User id, username or email")
    ),
    responses(
        (status = 204, description = "The user is no longer a member"),
        (status = 403, description = "Admins only", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn remove_member(
    Path((group, user)): Path<(String, String)>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Delete, POLICY).await?;
    let group = lookup_group(&state, &group).await?;
    let user = lookup_user(&state, &user).await?;
    caller.authorize(&Target::Collection)?;
    state
        .store
        .remove_member(group.id, user.id)
        .await
        .map_err(|err| api_store_error("failed to remove member", err))?;
    Ok(StatusCode::NO_CONTENT)
}
