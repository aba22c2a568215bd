//! Generic handlers for namespaced inventory kinds.
//!
//! One set of handlers serves every kind in [`ResourceKind::INVENTORY`]. The
//! kind is attached to each sub-router as an extension, and with it come the
//! kind's URL segment and ordered lookup fields. Authorization is always
//! against the namespace the object lives in:
//! - list: filtered to namespaces the caller can read
//! - create: `create` on the namespace named in the payload
//! - read, update, delete: the matching capability on the object's namespace
//!
//! PUT replaces the stored attributes; PATCH merges into them.
//!
//! Moving an object to another namespace also needs `create` on the
//! destination.
use crate::api::error::{ApiError, api_not_found, api_store_error, api_validation_error};
use crate::api::types::{ResourceCreateRequest, ResourceListResponse, ResourcePatchRequest};
use crate::api::{Caller, lookup_namespace, lookup_resource};
use crate::app::AppState;
use crate::model::{NewResource, Resource, ResourcePatch};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json, Router};
use hubuum_authz::{AccessPolicy, Capability, Method, NamespaceId, ResourceKind, Target};

const POLICY: AccessPolicy = AccessPolicy::NamespaceScoped;

/// Routes for one inventory kind, mounted under `/api/v1/{path}`.
pub fn routes(kind: ResourceKind) -> Router<AppState> {
    let collection = format!("/api/v1/{}", kind.path());
    let detail = format!("{collection}/:val");
    Router::new()
        .route(
            &collection,
            axum::routing::get(list_resources).post(create_resource),
        )
        .route(
            &detail,
            axum::routing::get(get_resource)
                .put(put_resource)
                .patch(patch_resource)
                .delete(delete_resource),
        )
        .layer(Extension(kind))
}

/// Resolve the namespace named in a payload, or `None` if it does not exist.
async fn target_namespace(state: &AppState, value: &str) -> Result<Option<NamespaceId>, ApiError> {
    match lookup_namespace(state, value).await {
        Ok(namespace) => Ok(Some(namespace.id)),
        Err(err) if err.status == StatusCode::NOT_FOUND => Ok(None),
        Err(err) => Err(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/{kind}",
    tag = "resources",
    params(("kind" = String, Path, description = "Inventory kind, e.g. hosts or rooms")),
    responses(
        (status = 200, description = "Objects in namespaces the caller can read", body = ResourceListResponse)
    )
)]
pub(crate) async fn list_resources(
    Extension(kind): Extension<ResourceKind>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ResourceListResponse>, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Get, POLICY).await?;
    caller.authorize(&Target::Collection)?;
    let items = state
        .store
        .list_resources(kind)
        .await
        .map_err(|err| api_store_error("failed to list objects", err))?;
    let items = caller
        .visibility(kind)
        .filter(items, |resource| resource.namespace);
    Ok(Json(ResourceListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/api/v1/{kind}",
    tag = "resources",
    params(("kind" = String, Path, description = "Inventory kind, e.g. hosts or rooms")),
    request_body = ResourceCreateRequest,
    responses(
        (status = 201, description = "Object created", body = Resource),
        (status = 403, description = "No create grant on the namespace", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Namespace not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_resource(
    Extension(kind): Extension<ResourceKind>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ResourceCreateRequest>,
) -> Result<(StatusCode, Json<Resource>), ApiError> {
    let caller = Caller::load(&state, &headers, Method::Post, POLICY).await?;
    let namespace = target_namespace(&state, &body.namespace).await?;
    caller.authorize(&Target::NewObject { namespace })?;
    let Some(namespace) = namespace else {
        return Err(api_not_found("namespace not found"));
    };
    if body.name.trim().is_empty() {
        return Err(api_validation_error("name must not be empty"));
    }
    let resource = state
        .store
        .create_resource(NewResource {
            kind,
            namespace,
            name: body.name,
            attributes: body.attributes,
        })
        .await
        .map_err(|err| api_store_error("failed to create object", err))?;
    tracing::debug!(kind = %kind, name = %resource.name, "object created");
    Ok((StatusCode::CREATED, Json(resource)))
}

#[utoipa::path(
    get,
    path = "/api/v1/{kind}/{val}",
    tag = "resources",
    params(
        ("kind" = String, Path, description = "Inventory kind, e.g. hosts or rooms"),
        ("val" = String, Path, description = "Object id, name, or for hosts the fqdn")
    ),
    responses(
        (status = 200, description = "Object", body = Resource),
        (status = 403, description = "No read grant", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Object not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_resource(
    Extension(kind): Extension<ResourceKind>,
    Path(val): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Resource>, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Get, POLICY).await?;
    let resource = lookup_resource(&state, kind, &val).await?;
    caller.authorize(&Target::Object(resource.namespace))?;
    Ok(Json(resource))
}

#[utoipa::path(
    patch,
    path = "/api/v1/{kind}/{val}",
    tag = "resources",
    params(
        ("kind" = String, Path, description = "Inventory kind, e.g. hosts or rooms"),
        ("val" = String, Path, description = "Object id, name, or for hosts the fqdn")
    ),
    request_body = ResourcePatchRequest,
    responses(
        (status = 200, description = "Object updated", body = Resource),
        (status = 403, description = "No update grant", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Object not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn patch_resource(
    Extension(kind): Extension<ResourceKind>,
    Path(val): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ResourcePatchRequest>,
) -> Result<Json<Resource>, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Patch, POLICY).await?;
    update_resource(&state, &caller, kind, &val, body, false).await
}

#[utoipa::path(
    put,
    path = "/api/v1/{kind}/{val}",
    tag = "resources",
    params(
        ("kind" = String, Path, description = "Inventory kind, e.g. hosts or rooms"),
        ("val" = String, Path, description = "Object id, name, or for hosts the fqdn")
    ),
    request_body = ResourceCreateRequest,
    responses(
        (status = 200, description = "Object replaced", body = Resource),
        (status = 403, description = "No update grant", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Object not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn put_resource(
    Extension(kind): Extension<ResourceKind>,
    Path(val): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ResourceCreateRequest>,
) -> Result<Json<Resource>, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Put, POLICY).await?;
    let body = ResourcePatchRequest {
        namespace: Some(body.namespace),
        name: Some(body.name),
        attributes: Some(body.attributes),
    };
    update_resource(&state, &caller, kind, &val, body, true).await
}

async fn update_resource(
    state: &AppState,
    caller: &Caller,
    kind: ResourceKind,
    val: &str,
    body: ResourcePatchRequest,
    replace_attributes: bool,
) -> Result<Json<Resource>, ApiError> {
    let resource = lookup_resource(state, kind, val).await?;
    caller.authorize(&Target::Object(resource.namespace))?;

    let destination = match body.namespace.as_deref() {
        Some(value) => {
            let namespace = lookup_namespace(state, value).await?;
            if namespace.id != resource.namespace {
                caller.require(Capability::Create, namespace.id)?;
            }
            Some(namespace.id)
        }
        None => None,
    };
    if body.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(api_validation_error("name must not be empty"));
    }
    let updated = state
        .store
        .update_resource(
            resource.id,
            ResourcePatch {
                namespace: destination,
                name: body.name,
                attributes: body.attributes,
                replace_attributes,
            },
        )
        .await
        .map_err(|err| api_store_error("failed to update object", err))?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/{kind}/{val}",
    tag = "resources",
    params(
        ("kind" = String, Path, description = "Inventory kind, e.g. hosts or rooms"),
        ("val" = String, Path, description = "Object id, name, or for hosts the fqdn")
    ),
    responses(
        (status = 204, description = "Object deleted"),
        (status = 403, description = "No delete grant", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Object not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_resource(
    Extension(kind): Extension<ResourceKind>,
    Path(val): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let caller = Caller::load(&state, &headers, Method::Delete, POLICY).await?;
    let resource = lookup_resource(&state, kind, &val).await?;
    caller.authorize(&Target::Object(resource.namespace))?;
    state
        .store
        .delete_resource(resource.id)
        .await
        .map_err(|err| api_store_error("failed to delete object", err))?;
    Ok(StatusCode::NO_CONTENT)
}
