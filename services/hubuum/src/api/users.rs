//! User API handlers.
//!
//! Users are an open kind: any authenticated caller may list and read them.
//! Only admins create, modify or delete users.
use crate::api::error::{ApiError, api_internal_message, api_store_error, api_validation_error};
use crate::api::types::{UserCreateRequest, UserListResponse, UserPatchRequest};
use crate::api::{Caller, lookup_user};
use crate::app::AppState;
use crate::auth::password;
use crate::model::{NewUser, User, UserPatch};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use hubuum_authz::{AccessPolicy, Method, Target};

const POLICY: AccessPolicy = AccessPolicy::AdminOrReadOnly;

async fn hash(password: Option<String>) -> Result<Option<String>, ApiError> {
    match password {
        Some(password) if password.is_empty() => {
            Err(api_validation_error("password must not be empty"))
        }
        Some(password) => password::hash_password(password)
            .await
            .map(Some)
            .map_err(|err| {
                tracing::error!(error = ?err, "failed to hash password");
                api_internal_message("failed to hash password")
            }),
        None => Ok(None),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    responses((status = 200, description = "All users", body = UserListResponse))
)]
pub(crate) async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserListResponse>, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Get, POLICY).await?;
    caller.authorize(&Target::Collection)?;
    let items = state
        .store
        .list_users()
        .await
        .map_err(|err| api_store_error("failed to list users", err))?;
    Ok(Json(UserListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = UserCreateRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 403, description = "Admins only", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Username taken", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<UserCreateRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let caller = Caller::load(&state, &headers, Method::Post, POLICY).await?;
    caller.authorize(&Target::Collection)?;
    if body.username.trim().is_empty() {
        return Err(api_validation_error("username must not be empty"));
    }
    let user = state
        .store
        .create_user(NewUser {
            username: body.username,
            email: body.email,
            is_staff: body.is_staff,
            is_superuser: body.is_superuser,
            password_hash: hash(body.password).await?,
        })
        .await
        .map_err(|err| api_store_error("failed to create user", err))?;
    tracing::info!(username = %user.username, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{val}",
    tag = "users",
    params(("val" = String, Path, description = "User id, username or email")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_user(
    Path(val): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<User>, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Get, POLICY).await?;
    caller.authorize(&Target::Collection)?;
    Ok(Json(lookup_user(&state, &val).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/{val}",
    tag = "users",
    params(("val" = String, Path, description = "User id, username or email")),
    request_body = UserPatchRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 403, description = "Admins only", body = crate::api::types::ErrorResponse),
        (status = 404, description = "User not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn patch_user(
    Path(val): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<UserPatchRequest>,
) -> Result<Json<User>, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Patch, POLICY).await?;
    let user = lookup_user(&state, &val).await?;
    caller.authorize(&Target::Collection)?;
    let patch = UserPatch {
        username: body.username,
        email: body.email,
        is_staff: body.is_staff,
        is_superuser: body.is_superuser,
        password_hash: hash(body.password).await?,
    };
    let updated = state
        .store
        .update_user(user.id, patch)
        .await
        .map_err(|err| api_store_error("failed to update user", err))?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{val}",
    tag = "users",
    params(("val" = String, Path, description = "User id, username or email")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Admins only", body = crate::api::types::ErrorResponse),
        (status = 404, description = "User not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_user(
    Path(val): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Delete, POLICY).await?;
    let user = lookup_user(&state, &val).await?;
    caller.authorize(&Target::Collection)?;
    state
        .store
        .delete_user(user.id)
        .await
        .map_err(|err| api_store_error("failed to delete user", err))?;
    tracing::info!(username = %user.username, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
