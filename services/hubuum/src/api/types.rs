//! HTTP API request/response types.
//!
//! # Purpose
//! Defines the payload shapes of the hubuum REST API and their OpenAPI
//! schemas. Stored rows (namespaces, users, resources) are returned as the
//! model types directly.
use crate::model::{Group, Namespace, Permission, Resource, User};
use chrono::{DateTime, Utc};
use hubuum_authz::CapabilitySet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SystemInfo {
    pub service: String,
    pub api_version: String,
    pub storage_backend: String,
    pub durable_storage: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct NamespaceCreateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Owner group, by id or name. Required for principals with zero or
    /// several groups.
    #[serde(default)]
    pub group: Option<String>,
}

/// Full replacement body for `PUT /namespaces/{val}`.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct NamespaceUpdateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct NamespacePatchRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// The five grant flags. Missing flags default to false.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, Default)]
pub struct GrantFlags {
    #[serde(default)]
    pub has_create: bool,
    #[serde(default)]
    pub has_read: bool,
    #[serde(default)]
    pub has_update: bool,
    #[serde(default)]
    pub has_delete: bool,
    #[serde(default)]
    pub has_namespace: bool,
}

impl GrantFlags {
    pub fn capabilities(self) -> CapabilitySet {
        CapabilitySet::from_flags(
            self.has_create,
            self.has_read,
            self.has_update,
            self.has_delete,
            self.has_namespace,
        )
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PermissionCreateRequest {
    /// Namespace id or name.
    pub namespace: String,
    /// Group id or name.
    pub group: String,
    #[serde(flatten)]
    pub flags: GrantFlags,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct UserCreateRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct UserPatchRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub is_staff: Option<bool>,
    #[serde(default)]
    pub is_superuser: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct GroupRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct Membership {
    pub group: Group,
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ResourceCreateRequest {
    /// Namespace id or name.
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct ResourcePatchRequest {
    /// Move the object to another namespace, by id or name.
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Merged into the stored attributes.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub attributes: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NamespaceListResponse {
    pub items: Vec<Namespace>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GroupListResponse {
    pub items: Vec<Group>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub items: Vec<User>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PermissionListResponse {
    pub items: Vec<Permission>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResourceListResponse {
    pub items: Vec<Resource>,
}
