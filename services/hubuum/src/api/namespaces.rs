//! Namespace API handlers.
//!
//! # Purpose
//! Lists, creates, renames and deletes namespaces. Creating a child needs the
//! `namespace` capability on the literal parent, and the owner group picked
//! for the new namespace receives every capability on it in the same write.
//!
//! # Key invariants
//! - Root namespaces are created by admins only.
//! - Renaming and deleting a namespace need `namespace` on it, not `update`.
//! - A rename that changes the parent is also checked as a creation under the
//!   new parent, so only admins can turn a child into a root.
//! - Deleting a namespace removes its grants and resources.
use crate::api::error::{ApiError, api_store_error};
use crate::api::types::{
    NamespaceCreateRequest, NamespaceListResponse, NamespacePatchRequest, NamespaceUpdateRequest,
};
use crate::api::{Caller, lookup_group, lookup_namespace};
use crate::app::AppState;
use crate::model::{Namespace, NamespacePatch, NewNamespace};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use hubuum_authz::{
    AccessPolicy, Method, NamespaceName, ResourceKind, Target, parent_of, resolve_owner_group,
};

const POLICY: AccessPolicy = AccessPolicy::NamespaceScoped;

#[utoipa::path(
    get,
    path = "/api/v1/namespaces",
    tag = "namespaces",
    responses(
        (status = 200, description = "Namespaces the caller can read", body = NamespaceListResponse),
        (status = 401, description = "Not authenticated", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_namespaces(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<NamespaceListResponse>, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Get, POLICY).await?;
    caller.authorize(&Target::Collection)?;
    let items = state
        .store
        .list_namespaces()
        .await
        .map_err(|err| api_store_error("failed to list namespaces", err))?;
    let items = caller
        .visibility(ResourceKind::Namespace)
        .filter(items, |namespace| namespace.id);
    Ok(Json(NamespaceListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/api/v1/namespaces",
    tag = "namespaces",
    request_body = NamespaceCreateRequest,
    responses(
        (status = 201, description = "Namespace created", body = Namespace),
        (status = 400, description = "Invalid name or no owner group", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Not allowed to create here", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Parent namespace does not exist", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Namespace already exists", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_namespace(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NamespaceCreateRequest>,
) -> Result<(StatusCode, Json<Namespace>), ApiError> {
    let caller = Caller::load(&state, &headers, Method::Post, POLICY).await?;
    let name = NamespaceName::parse(body.name)?;

    let parent = match name.parent() {
        Some(parent) => state
            .store
            .namespace_by_name(parent.as_str())
            .await
            .map_err(|err| api_store_error("failed to load parent namespace", err))?
            .map(|namespace| namespace.id),
        None => None,
    };
    caller.authorize(&Target::NewNamespace {
        name: name.clone(),
        parent,
    })?;

    let requested = match body.group.as_deref() {
        Some(group) => Some(lookup_group(&state, group).await?.id),
        None => None,
    };
    let owner = resolve_owner_group(&caller.principal, requested)?;

    let namespace = state
        .store
        .create_namespace(
            NewNamespace {
                name,
                description: body.description,
            },
            owner,
        )
        .await
        .map_err(|err| api_store_error("failed to create namespace", err))?;
    tracing::info!(
        namespace = %namespace.name,
        owner = ?owner,
        user = %caller.principal.username,
        "namespace created"
    );
    Ok((StatusCode::CREATED, Json(namespace)))
}

#[utoipa::path(
    get,
    path = "/api/v1/namespaces/{val}",
    tag = "namespaces",
    params(("val" = String, Path, description = "Namespace id or name")),
    responses(
        (status = 200, description = "Namespace", body = Namespace),
        (status = 403, description = "No read grant", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Namespace not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_namespace(
    Path(val): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Namespace>, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Get, POLICY).await?;
    let namespace = lookup_namespace(&state, &val).await?;
    caller.authorize(&Target::Namespace(namespace.id))?;
    Ok(Json(namespace))
}

#[utoipa::path(
    patch,
    path = "/api/v1/namespaces/{val}",
    tag = "namespaces",
    params(("val" = String, Path, description = "Namespace id or name")),
    request_body = NamespacePatchRequest,
    responses(
        (status = 200, description = "Namespace updated", body = Namespace),
        (status = 403, description = "No namespace grant", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Namespace not found", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Name already taken", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn patch_namespace(
    Path(val): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NamespacePatchRequest>,
) -> Result<Json<Namespace>, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Patch, POLICY).await?;
    update_namespace(&state, &caller, &val, body).await
}

#[utoipa::path(
    put,
    path = "/api/v1/namespaces/{val}",
    tag = "namespaces",
    params(("val" = String, Path, description = "Namespace id or name")),
    request_body = NamespaceUpdateRequest,
    responses(
        (status = 200, description = "Namespace replaced", body = Namespace),
        (status = 403, description = "No namespace grant", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Namespace not found", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Name already taken", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn put_namespace(
    Path(val): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<NamespaceUpdateRequest>,
) -> Result<Json<Namespace>, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Put, POLICY).await?;
    let body = NamespacePatchRequest {
        name: Some(body.name),
        description: Some(body.description),
    };
    update_namespace(&state, &caller, &val, body).await
}

async fn update_namespace(
    state: &AppState,
    caller: &Caller,
    val: &str,
    body: NamespacePatchRequest,
) -> Result<Json<Namespace>, ApiError> {
    let namespace = lookup_namespace(state, val).await?;
    caller.authorize(&Target::Namespace(namespace.id))?;

    let name = body.name.map(NamespaceName::parse).transpose()?;
    if let Some(name) = &name {
        authorize_move(state, caller, &namespace, name).await?;
    }
    let patch = NamespacePatch {
        name,
        description: body.description,
    };
    let updated = state
        .store
        .update_namespace(namespace.id, patch)
        .await
        .map_err(|err| api_store_error("failed to update namespace", err))?;
    if updated.name != namespace.name {
        tracing::info!(from = %namespace.name, to = %updated.name, "namespace renamed");
    }
    Ok(Json(updated))
}

/// A rename that changes the parent places the namespace somewhere new, so it
/// is checked like creating `name` there.
async fn authorize_move(
    state: &AppState,
    caller: &Caller,
    current: &Namespace,
    name: &NamespaceName,
) -> Result<(), ApiError> {
    let parent = name.parent();
    if parent.as_ref().map(NamespaceName::as_str) == parent_of(&current.name).as_deref() {
        return Ok(());
    }
    let parent = match parent {
        Some(parent) => state
            .store
            .namespace_by_name(parent.as_str())
            .await
            .map_err(|err| api_store_error("failed to load parent namespace", err))?
            .map(|namespace| namespace.id),
        None => None,
    };
    caller.authorize(&Target::NewNamespace {
        name: name.clone(),
        parent,
    })
}

#[utoipa::path(
    delete,
    path = "/api/v1/namespaces/{val}",
    tag = "namespaces",
    params(("val" = String, Path, description = "Namespace id or name")),
    responses(
        (status = 204, description = "Namespace, its grants and its resources deleted"),
        (status = 403, description = "No namespace grant", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Namespace not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_namespace(
    Path(val): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Delete, POLICY).await?;
    let namespace = lookup_namespace(&state, &val).await?;
    caller.authorize(&Target::Namespace(namespace.id))?;
    state
        .store
        .delete_namespace(namespace.id)
        .await
        .map_err(|err| api_store_error("failed to delete namespace", err))?;
    tracing::info!(namespace = %namespace.name, "namespace deleted");
    Ok(StatusCode::NO_CONTENT)
}
