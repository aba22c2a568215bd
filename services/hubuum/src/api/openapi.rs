//! OpenAPI schema aggregation for the hubuum API.
//!
//! # Purpose
//! Collects all routes and schema types into a single OpenAPI document,
//! served as JSON at `/api/openapi.json`.
use crate::api::{
    grants, groups, namespaces, permissions, resources, system,
    types::{
        ErrorResponse, GrantFlags, GroupListResponse, GroupRequest, HealthStatus, LoginResponse,
        Membership, NamespaceCreateRequest, NamespaceListResponse, NamespacePatchRequest,
        NamespaceUpdateRequest, PermissionCreateRequest, PermissionListResponse,
        ResourceCreateRequest, ResourceListResponse, ResourcePatchRequest, SystemInfo,
        UserCreateRequest, UserListResponse, UserPatchRequest,
    },
    users,
};
use crate::auth::session;
use crate::model::{Group, Namespace, Permission, Resource, User};
use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "hubuum",
        version = "v1",
        description = "Namespace scoped asset inventory API"
    ),
    paths(
        system::system_info,
        system::system_health,
        session::login,
        session::logout,
        session::logout_all,
        namespaces::list_namespaces,
        namespaces::create_namespace,
        namespaces::get_namespace,
        namespaces::put_namespace,
        namespaces::patch_namespace,
        namespaces::delete_namespace,
        grants::list_namespace_groups,
        grants::get_grant,
        grants::create_grant,
        grants::delete_grant,
        permissions::list_permissions,
        permissions::create_permission,
        permissions::get_permission,
        permissions::delete_permission,
        users::list_users,
        users::create_user,
        users::get_user,
        users::patch_user,
        users::delete_user,
        groups::list_groups,
        groups::create_group,
        groups::get_group,
        groups::patch_group,
        groups::delete_group,
        groups::get_member,
        groups::add_member,
        groups::remove_member,
        resources::list_resources,
        resources::create_resource,
        resources::get_resource,
        resources::put_resource,
        resources::patch_resource,
        resources::delete_resource
    ),
    components(schemas(
        SystemInfo,
        HealthStatus,
        ErrorResponse,
        LoginResponse,
        Namespace,
        NamespaceCreateRequest,
        NamespacePatchRequest,
        NamespaceUpdateRequest,
        NamespaceListResponse,
        GrantFlags,
        Permission,
        PermissionCreateRequest,
        PermissionListResponse,
        User,
        UserCreateRequest,
        UserPatchRequest,
        UserListResponse,
        Group,
        GroupRequest,
        GroupListResponse,
        Membership,
        Resource,
        ResourceCreateRequest,
        ResourcePatchRequest,
        ResourceListResponse
    )),
    tags(
        (name = "system", description = "System and discovery endpoints"),
        (name = "auth", description = "Login and token management"),
        (name = "namespaces", description = "Namespace lifecycle"),
        (name = "grants", description = "Group grants on a namespace"),
        (name = "permissions", description = "Permission rows"),
        (name = "users", description = "User management"),
        (name = "groups", description = "Groups and memberships"),
        (name = "resources", description = "Namespaced inventory objects")
    )
)]
pub struct ApiDoc;

pub(crate) async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_core_paths() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        for path in [
            "/api/v1/namespaces",
            "/api/v1/namespaces/{val}/groups/{group}",
            "/api/v1/permissions/{id}",
            "/api/v1/groups/{group}/members/{user}",
            "/api/v1/{kind}/{val}",
            "/api/auth/login",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
    }
}
