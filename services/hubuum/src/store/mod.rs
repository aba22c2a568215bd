//! Storage traits and backends.
//!
//! # Purpose
//! Describes the persistence contract the API relies on and provides an
//! in-memory and a Postgres implementation of it.
//!
//! # Key invariants
//! - Namespace names, group names, usernames and `(namespace, group)` grant
//!   pairs are unique. A duplicate insert is [`StoreError::Conflict`].
//! - Deleting a namespace removes its grants and resources. Deleting a group
//!   removes its grants and memberships, never namespaces or resources.
//! - A namespace and its initial owner grant are written as one unit.
use crate::model::{
    AuthToken, Group, Namespace, NamespacePatch, NewNamespace, NewResource, NewUser, Permission,
    Resource, ResourcePatch, User, UserPatch,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hubuum_authz::{
    Capability, CapabilitySet, Grant, GroupId, LookupField, NamespaceId, ResourceKind, UserId,
};
use thiserror::Error;

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            other => StoreError::Unexpected(other.into()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Unexpected(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Namespaces, grants and namespaced resources.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn list_namespaces(&self) -> StoreResult<Vec<Namespace>>;
    async fn find_namespaces(&self, field: LookupField, value: &str)
    -> StoreResult<Vec<Namespace>>;
    async fn namespace_by_name(&self, name: &str) -> StoreResult<Option<Namespace>>;
    /// Insert a namespace and, when `owner` is set, give that group every
    /// capability on it. Both writes commit together or not at all.
    async fn create_namespace(
        &self,
        namespace: NewNamespace,
        owner: Option<GroupId>,
    ) -> StoreResult<Namespace>;
    async fn update_namespace(
        &self,
        id: NamespaceId,
        patch: NamespacePatch,
    ) -> StoreResult<Namespace>;
    async fn delete_namespace(&self, id: NamespaceId) -> StoreResult<()>;

    async fn list_permissions(&self) -> StoreResult<Vec<Permission>>;
    async fn namespace_permissions(&self, namespace: NamespaceId) -> StoreResult<Vec<Permission>>;
    async fn get_permission(&self, id: i64) -> StoreResult<Permission>;
    async fn find_permission(
        &self,
        namespace: NamespaceId,
        group: GroupId,
    ) -> StoreResult<Option<Permission>>;
    /// Every grant held by any of `groups`.
    async fn grants_for_groups(&self, groups: &[GroupId]) -> StoreResult<Vec<Grant>>;
    /// Create a grant; [`StoreError::Conflict`] when the pair already has one.
    async fn grant(
        &self,
        namespace: NamespaceId,
        group: GroupId,
        capabilities: CapabilitySet,
    ) -> StoreResult<Permission>;
    /// Create or overwrite the pair's grant with every capability set.
    async fn grant_all(&self, namespace: NamespaceId, group: GroupId) -> StoreResult<Permission>;
    /// Remove the pair's grant. Returns whether a row was removed.
    async fn revoke(&self, namespace: NamespaceId, group: GroupId) -> StoreResult<bool>;
    async fn delete_permission(&self, id: i64) -> StoreResult<()>;
    async fn groups_with_capability(
        &self,
        namespace: NamespaceId,
        capability: Capability,
    ) -> StoreResult<Vec<Group>>;

    async fn list_resources(&self, kind: ResourceKind) -> StoreResult<Vec<Resource>>;
    async fn find_resources(
        &self,
        kind: ResourceKind,
        field: LookupField,
        value: &str,
    ) -> StoreResult<Vec<Resource>>;
    async fn create_resource(&self, resource: NewResource) -> StoreResult<Resource>;
    async fn update_resource(&self, id: i64, patch: ResourcePatch) -> StoreResult<Resource>;
    async fn delete_resource(&self, id: i64) -> StoreResult<()>;
}

/// Users, groups, memberships and login tokens.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn find_users(&self, field: LookupField, value: &str) -> StoreResult<Vec<User>>;
    async fn get_user(&self, id: UserId) -> StoreResult<User>;
    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn update_user(&self, id: UserId, patch: UserPatch) -> StoreResult<User>;
    async fn delete_user(&self, id: UserId) -> StoreResult<()>;

    async fn list_groups(&self) -> StoreResult<Vec<Group>>;
    async fn find_groups(&self, field: LookupField, value: &str) -> StoreResult<Vec<Group>>;
    async fn get_group(&self, id: GroupId) -> StoreResult<Group>;
    async fn create_group(&self, name: &str) -> StoreResult<Group>;
    async fn rename_group(&self, id: GroupId, name: &str) -> StoreResult<Group>;
    async fn delete_group(&self, id: GroupId) -> StoreResult<()>;

    /// Returns true when the membership was created, false when it existed.
    async fn add_member(&self, group: GroupId, user: UserId) -> StoreResult<bool>;
    async fn is_member(&self, group: GroupId, user: UserId) -> StoreResult<bool>;
    async fn remove_member(&self, group: GroupId, user: UserId) -> StoreResult<()>;

    async fn insert_token(&self, token: AuthToken) -> StoreResult<()>;
    /// Resolve a live token. Expired tokens are removed and reported as absent.
    async fn token(&self, digest: &str, now: DateTime<Utc>) -> StoreResult<Option<AuthToken>>;
    async fn extend_token(&self, digest: &str, expires_at: DateTime<Utc>) -> StoreResult<()>;
    async fn delete_token(&self, digest: &str) -> StoreResult<bool>;
    async fn delete_user_tokens(&self, user: UserId) -> StoreResult<u64>;
}

#[async_trait]
pub trait HubuumStore: InventoryStore + IdentityStore {
    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}

/// Parse a lookup value tried against the `id` field.
pub(crate) fn parse_lookup_id(value: &str) -> StoreResult<i64> {
    LookupField::parse_id(value).map_err(|err| StoreError::NotFound(err.to_string()))
}

pub(crate) fn record_counts(namespaces: usize, grants: usize) {
    metrics::gauge!("hubuum_namespaces_total").set(namespaces as f64);
    metrics::gauge!("hubuum_grants_total").set(grants as f64);
}
