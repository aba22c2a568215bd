//! Postgres-backed implementation of the hubuum store.
//!
//! # Key invariants
//! - Referential integrity is enforced by the schema: grants, resources and
//!   tokens reference their owners with `ON DELETE CASCADE`.
//! - Uniqueness (namespace names, group names, usernames, one grant per
//!   `(namespace, group)`, one resource name per kind) is enforced by unique
//!   constraints. A violation surfaces as [`StoreError::Conflict`], which is
//!   how concurrent duplicate inserts are resolved.
//! - A namespace and its owner grant are inserted in one transaction.
//!
//! # Operational notes
//! - Migrations run at startup via `sqlx::migrate!("./migrations")`.
//! - Database URLs may contain credentials; never log them.
use super::{
    HubuumStore, IdentityStore, InventoryStore, StoreError, StoreResult, parse_lookup_id,
    record_counts,
};
use crate::config::PostgresConfig;
use crate::model::{
    AuthToken, Group, Namespace, NamespacePatch, NewNamespace, NewResource, NewUser, Permission,
    Resource, ResourcePatch, User, UserPatch,
};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hubuum_authz::{
    Capability, CapabilitySet, Grant, GroupId, LookupField, NamespaceId, ResourceKind, UserId,
};
use serde_json::{Map, Value};
use sqlx::postgres::{PgConnectOptions, PgExecutor, PgPoolOptions};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use std::time::Duration;

/// Durable hubuum store backed by Postgres.
///
/// # Example
/// ```rust,no_run
/// use hubuum::config::PostgresConfig;
/// use hubuum::store::postgres::PostgresStore;
///
/// async fn open(pg: PostgresConfig) {
///     let _ = PostgresStore::connect(&pg).await;
/// }
/// ```
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

#[derive(Debug, Clone, FromRow)]
struct DbNamespace {
    id: i64,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbGroup {
    id: i64,
    name: String,
}

#[derive(Debug, Clone, FromRow)]
struct DbUser {
    id: i64,
    username: String,
    email: String,
    is_staff: bool,
    is_superuser: bool,
    password_hash: Option<String>,
    groups: Vec<i64>,
}

#[derive(Debug, Clone, FromRow)]
struct DbPermission {
    id: i64,
    namespace_id: i64,
    group_id: i64,
    has_create: bool,
    has_read: bool,
    has_update: bool,
    has_delete: bool,
    has_namespace: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbResource {
    id: i64,
    kind: String,
    namespace_id: i64,
    name: String,
    attributes: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbToken {
    digest: String,
    user_id: i64,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

const NAMESPACE_COLUMNS: &str = "id, name, description, created_at, updated_at";
const PERMISSION_COLUMNS: &str = "id, namespace_id, group_id, has_create, has_read, has_update, \
     has_delete, has_namespace, created_at, updated_at";
const RESOURCE_COLUMNS: &str = "id, kind, namespace_id, name, attributes, created_at, updated_at";
const USER_SELECT: &str = "SELECT u.id, u.username, u.email, u.is_staff, u.is_superuser, \
     u.password_hash, \
     COALESCE(array_agg(m.group_id ORDER BY m.group_id) FILTER (WHERE m.group_id IS NOT NULL), \
     '{}') AS groups \
     FROM users u LEFT JOIN group_members m ON m.user_id = u.id";

impl PostgresStore {
    /// Connect to Postgres and apply the embedded migrations.
    ///
    /// # Errors
    /// - Connection, pool setup or migration failures.
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, true).await
    }

    /// Connect without running migrations, for tests that manage the schema.
    #[cfg(any(test, feature = "pg-tests"))]
    pub async fn connect_without_migrations(pg: &PostgresConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, false).await
    }

    async fn connect_internal(pg: &PostgresConfig, run_migrations: bool) -> StoreResult<Self> {
        // Fail fast on an unreachable database instead of hanging requests.
        let connect_options = PgConnectOptions::from_str(&pg.url)?;
        let pool = PgPoolOptions::new()
            .max_connections(pg.max_connections)
            .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
            .connect_with(connect_options)
            .await?;

        if run_migrations {
            sqlx::migrate!("./migrations").run(&pool).await?;
        }

        let store = Self { pool };
        store.publish_counts().await;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn publish_counts(&self) {
        let counts: Result<(i64, i64), sqlx::Error> = sqlx::query_as(
            "SELECT (SELECT count(*) FROM namespaces), (SELECT count(*) FROM permissions)",
        )
        .fetch_one(&self.pool)
        .await;
        match counts {
            Ok((namespaces, grants)) => record_counts(namespaces as usize, grants as usize),
            Err(err) => tracing::warn!(error = %err, "failed to refresh inventory gauges"),
        }
    }

    async fn namespaces_where(
        &self,
        clause: &str,
        value: QueryValue<'_>,
    ) -> StoreResult<Vec<Namespace>> {
        let sql = format!("SELECT {NAMESPACE_COLUMNS} FROM namespaces WHERE {clause} ORDER BY id");
        let rows = value
            .bind_as(sqlx::query_as::<_, DbNamespace>(&sql))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(namespace_from_db).collect())
    }

    async fn groups_where(&self, clause: &str, value: QueryValue<'_>) -> StoreResult<Vec<Group>> {
        let sql = format!("SELECT id, name FROM groups WHERE {clause} ORDER BY id");
        let rows = value
            .bind_as(sqlx::query_as::<_, DbGroup>(&sql))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(group_from_db).collect())
    }

    async fn users_where(&self, clause: &str, value: QueryValue<'_>) -> StoreResult<Vec<User>> {
        let sql = format!("{USER_SELECT} WHERE {clause} GROUP BY u.id ORDER BY u.id");
        let rows = value
            .bind_as(sqlx::query_as::<_, DbUser>(&sql))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(user_from_db).collect())
    }
}

/// A single bind value for the `*_where` helpers. Clauses are fixed strings
/// chosen in code; only the value comes from the caller.
enum QueryValue<'a> {
    Id(i64),
    Text(&'a str),
}

impl<'a> QueryValue<'a> {
    fn bind_as<'q, O>(
        self,
        query: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
    ) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>
    where
        'a: 'q,
    {
        match self {
            QueryValue::Id(id) => query.bind(id),
            QueryValue::Text(text) => query.bind(text),
        }
    }
}

#[async_trait]
impl InventoryStore for PostgresStore {
    async fn list_namespaces(&self) -> StoreResult<Vec<Namespace>> {
        let sql = format!("SELECT {NAMESPACE_COLUMNS} FROM namespaces ORDER BY id");
        let rows = sqlx::query_as::<_, DbNamespace>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(namespace_from_db).collect())
    }

    async fn find_namespaces(
        &self,
        field: LookupField,
        value: &str,
    ) -> StoreResult<Vec<Namespace>> {
        match field {
            LookupField::Id => {
                self.namespaces_where("id = $1", QueryValue::Id(parse_lookup_id(value)?))
                    .await
            }
            LookupField::Name => self.namespaces_where("name = $1", QueryValue::Text(value)).await,
            _ => Ok(Vec::new()),
        }
    }

    async fn namespace_by_name(&self, name: &str) -> StoreResult<Option<Namespace>> {
        Ok(self
            .namespaces_where("name = $1", QueryValue::Text(name))
            .await?
            .into_iter()
            .next())
    }

    async fn create_namespace(
        &self,
        namespace: NewNamespace,
        owner: Option<GroupId>,
    ) -> StoreResult<Namespace> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "INSERT INTO namespaces (name, description) VALUES ($1, $2) \
             RETURNING {NAMESPACE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DbNamespace>(&sql)
            .bind(namespace.name.as_str())
            .bind(&namespace.description)
            .fetch_one(&mut *tx)
            .await
            .map_err(|err| constraint_error(err, "namespace exists", "namespace"))?;

        if let Some(group) = owner {
            upsert_grant_all(&mut *tx, row.id, group.get())
                .await
                .map_err(|err| constraint_error(err, "permission exists", "group not found"))?;
        }
        tx.commit().await?;
        self.publish_counts().await;
        Ok(namespace_from_db(row))
    }

    async fn update_namespace(
        &self,
        id: NamespaceId,
        patch: NamespacePatch,
    ) -> StoreResult<Namespace> {
        let sql = format!(
            "UPDATE namespaces SET name = COALESCE($2, name), \
             description = COALESCE($3, description), updated_at = now() \
             WHERE id = $1 RETURNING {NAMESPACE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DbNamespace>(&sql)
            .bind(id.get())
            .bind(patch.name.as_ref().map(|name| name.as_str()))
            .bind(patch.description.as_deref())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| constraint_error(err, "namespace exists", "namespace"))?
            .ok_or_else(|| StoreError::NotFound("namespace not found".into()))?;
        Ok(namespace_from_db(row))
    }

    async fn delete_namespace(&self, id: NamespaceId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM namespaces WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("namespace not found".into()));
        }
        self.publish_counts().await;
        Ok(())
    }

    async fn list_permissions(&self) -> StoreResult<Vec<Permission>> {
        let sql = format!("SELECT {PERMISSION_COLUMNS} FROM permissions ORDER BY id");
        let rows = sqlx::query_as::<_, DbPermission>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(permission_from_db).collect())
    }

    async fn namespace_permissions(&self, namespace: NamespaceId) -> StoreResult<Vec<Permission>> {
        let sql = format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE namespace_id = $1 ORDER BY id"
        );
        let rows = sqlx::query_as::<_, DbPermission>(&sql)
            .bind(namespace.get())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(permission_from_db).collect())
    }

    async fn get_permission(&self, id: i64) -> StoreResult<Permission> {
        let sql = format!("SELECT {PERMISSION_COLUMNS} FROM permissions WHERE id = $1");
        sqlx::query_as::<_, DbPermission>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(permission_from_db)
            .ok_or_else(|| StoreError::NotFound("permission not found".into()))
    }

    async fn find_permission(
        &self,
        namespace: NamespaceId,
        group: GroupId,
    ) -> StoreResult<Option<Permission>> {
        let sql = format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE namespace_id = $1 AND group_id = $2"
        );
        Ok(sqlx::query_as::<_, DbPermission>(&sql)
            .bind(namespace.get())
            .bind(group.get())
            .fetch_optional(&self.pool)
            .await?
            .map(permission_from_db))
    }

    async fn grants_for_groups(&self, groups: &[GroupId]) -> StoreResult<Vec<Grant>> {
        if groups.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = groups.iter().map(|group| group.get()).collect();
        let sql = format!("SELECT {PERMISSION_COLUMNS} FROM permissions WHERE group_id = ANY($1)");
        let rows = sqlx::query_as::<_, DbPermission>(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| permission_from_db(row).to_grant())
            .collect())
    }

    async fn grant(
        &self,
        namespace: NamespaceId,
        group: GroupId,
        capabilities: CapabilitySet,
    ) -> StoreResult<Permission> {
        let sql = format!(
            "INSERT INTO permissions (namespace_id, group_id, has_create, has_read, has_update, \
             has_delete, has_namespace) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {PERMISSION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DbPermission>(&sql)
            .bind(namespace.get())
            .bind(group.get())
            .bind(capabilities.contains(Capability::Create))
            .bind(capabilities.contains(Capability::Read))
            .bind(capabilities.contains(Capability::Update))
            .bind(capabilities.contains(Capability::Delete))
            .bind(capabilities.contains(Capability::Namespace))
            .fetch_one(&self.pool)
            .await
            .map_err(|err| constraint_error(err, "permission exists", "namespace or group"))?;
        self.publish_counts().await;
        Ok(permission_from_db(row))
    }

    async fn grant_all(&self, namespace: NamespaceId, group: GroupId) -> StoreResult<Permission> {
        let row = upsert_grant_all(&self.pool, namespace.get(), group.get())
            .await
            .map_err(|err| constraint_error(err, "permission exists", "namespace or group"))?;
        self.publish_counts().await;
        Ok(permission_from_db(row))
    }

    async fn revoke(&self, namespace: NamespaceId, group: GroupId) -> StoreResult<bool> {
        let result =
            sqlx::query("DELETE FROM permissions WHERE namespace_id = $1 AND group_id = $2")
                .bind(namespace.get())
                .bind(group.get())
                .execute(&self.pool)
                .await?;
        self.publish_counts().await;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_permission(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("permission not found".into()));
        }
        self.publish_counts().await;
        Ok(())
    }

    async fn groups_with_capability(
        &self,
        namespace: NamespaceId,
        capability: Capability,
    ) -> StoreResult<Vec<Group>> {
        // Column names come from the closed Capability enum.
        let sql = format!(
            "SELECT g.id, g.name FROM groups g JOIN permissions p ON p.group_id = g.id \
             WHERE p.namespace_id = $1 AND p.{} ORDER BY g.id",
            capability.field_name()
        );
        let rows = sqlx::query_as::<_, DbGroup>(&sql)
            .bind(namespace.get())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(group_from_db).collect())
    }

    async fn list_resources(&self, kind: ResourceKind) -> StoreResult<Vec<Resource>> {
        let sql = format!("SELECT {RESOURCE_COLUMNS} FROM resources WHERE kind = $1 ORDER BY id");
        let rows = sqlx::query_as::<_, DbResource>(&sql)
            .bind(kind.model())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(resource_from_db).collect()
    }

    async fn find_resources(
        &self,
        kind: ResourceKind,
        field: LookupField,
        value: &str,
    ) -> StoreResult<Vec<Resource>> {
        let clause = match field {
            LookupField::Id => "id = $2",
            LookupField::Name => "name = $2",
            LookupField::Fqdn => "attributes ->> 'fqdn' = $2",
            _ => return Ok(Vec::new()),
        };
        let sql = format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources WHERE kind = $1 AND {clause} ORDER BY id"
        );
        let query = sqlx::query_as::<_, DbResource>(&sql).bind(kind.model());
        let query = match field {
            LookupField::Id => query.bind(parse_lookup_id(value)?),
            _ => query.bind(value),
        };
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(resource_from_db).collect()
    }

    async fn create_resource(&self, resource: NewResource) -> StoreResult<Resource> {
        let sql = format!(
            "INSERT INTO resources (kind, namespace_id, name, attributes) VALUES ($1, $2, $3, $4) \
             RETURNING {RESOURCE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DbResource>(&sql)
            .bind(resource.kind.model())
            .bind(resource.namespace.get())
            .bind(&resource.name)
            .bind(Value::Object(resource.attributes))
            .fetch_one(&self.pool)
            .await
            .map_err(|err| constraint_error(err, "resource exists", "namespace not found"))?;
        resource_from_db(row)
    }

    async fn update_resource(&self, id: i64, patch: ResourcePatch) -> StoreResult<Resource> {
        let sql = format!(
            "UPDATE resources SET namespace_id = COALESCE($2, namespace_id), \
             name = COALESCE($3, name), \
             attributes = CASE WHEN $5 THEN COALESCE($4, attributes) \
             ELSE attributes || COALESCE($4, '{{}}'::jsonb) END, \
             updated_at = now() WHERE id = $1 RETURNING {RESOURCE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DbResource>(&sql)
            .bind(id)
            .bind(patch.namespace.map(NamespaceId::get))
            .bind(patch.name.as_deref())
            .bind(patch.attributes.map(Value::Object))
            .bind(patch.replace_attributes)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| constraint_error(err, "resource exists", "namespace not found"))?
            .ok_or_else(|| StoreError::NotFound("resource not found".into()))?;
        resource_from_db(row)
    }

    async fn delete_resource(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM resources WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("resource not found".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for PostgresStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let sql = format!("{USER_SELECT} GROUP BY u.id ORDER BY u.id");
        let rows = sqlx::query_as::<_, DbUser>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(user_from_db).collect())
    }

    async fn find_users(&self, field: LookupField, value: &str) -> StoreResult<Vec<User>> {
        match field {
            LookupField::Id => {
                self.users_where("u.id = $1", QueryValue::Id(parse_lookup_id(value)?))
                    .await
            }
            LookupField::Username => {
                self.users_where("u.username = $1", QueryValue::Text(value))
                    .await
            }
            LookupField::Email => {
                self.users_where("u.email <> '' AND u.email = $1", QueryValue::Text(value))
                    .await
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn get_user(&self, id: UserId) -> StoreResult<User> {
        self.users_where("u.id = $1", QueryValue::Id(id.get()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound("user not found".into()))
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users_where("u.username = $1", QueryValue::Text(username))
            .await?
            .into_iter()
            .next())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, email, is_staff, is_superuser, password_hash) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(user.password_hash.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| constraint_error(err, "user exists", "user"))?;
        self.get_user(UserId::new(id)).await
    }

    async fn update_user(&self, id: UserId, patch: UserPatch) -> StoreResult<User> {
        let result = sqlx::query(
            "UPDATE users SET username = COALESCE($2, username), email = COALESCE($3, email), \
             is_staff = COALESCE($4, is_staff), is_superuser = COALESCE($5, is_superuser), \
             password_hash = COALESCE($6, password_hash) WHERE id = $1",
        )
        .bind(id.get())
        .bind(patch.username.as_deref())
        .bind(patch.email.as_deref())
        .bind(patch.is_staff)
        .bind(patch.is_superuser)
        .bind(patch.password_hash.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|err| constraint_error(err, "user exists", "user"))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user not found".into()));
        }
        self.get_user(id).await
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user not found".into()));
        }
        Ok(())
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        let rows = sqlx::query_as::<_, DbGroup>("SELECT id, name FROM groups ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(group_from_db).collect())
    }

    async fn find_groups(&self, field: LookupField, value: &str) -> StoreResult<Vec<Group>> {
        match field {
            LookupField::Id => {
                let id = parse_lookup_id(value)?;
                self.groups_where("id = $1", QueryValue::Id(id)).await
            }
            LookupField::Name => self.groups_where("name = $1", QueryValue::Text(value)).await,
            _ => Ok(Vec::new()),
        }
    }

    async fn get_group(&self, id: GroupId) -> StoreResult<Group> {
        self.groups_where("id = $1", QueryValue::Id(id.get()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound("group not found".into()))
    }

    async fn create_group(&self, name: &str) -> StoreResult<Group> {
        let row = sqlx::query_as::<_, DbGroup>(
            "INSERT INTO groups (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| constraint_error(err, "group exists", "group"))?;
        Ok(group_from_db(row))
    }

    async fn rename_group(&self, id: GroupId, name: &str) -> StoreResult<Group> {
        let row = sqlx::query_as::<_, DbGroup>(
            "UPDATE groups SET name = $2 WHERE id = $1 RETURNING id, name",
        )
        .bind(id.get())
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| constraint_error(err, "group exists", "group"))?
        .ok_or_else(|| StoreError::NotFound("group not found".into()))?;
        Ok(group_from_db(row))
    }

    async fn delete_group(&self, id: GroupId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("group not found".into()));
        }
        self.publish_counts().await;
        Ok(())
    }

    async fn add_member(&self, group: GroupId, user: UserId) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO group_members (group_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(group.get())
        .bind(user.get())
        .execute(&self.pool)
        .await
        .map_err(|err| constraint_error(err, "member exists", "group or user not found"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_member(&self, group: GroupId, user: UserId) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM group_members WHERE group_id = $1 AND user_id = $2)",
        )
        .bind(group.get())
        .bind(user.get())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn remove_member(&self, group: GroupId, user: UserId) -> StoreResult<()> {
        sqlx::query("DELETE FROM group_members WHERE group_id = $1 AND user_id = $2")
            .bind(group.get())
            .bind(user.get())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_token(&self, token: AuthToken) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO auth_tokens (digest, user_id, created_at, expires_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&token.digest)
        .bind(token.user_id.get())
        .bind(token.created_at)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|err| constraint_error(err, "token exists", "user not found"))?;
        Ok(())
    }

    async fn token(&self, digest: &str, now: DateTime<Utc>) -> StoreResult<Option<AuthToken>> {
        let row = sqlx::query_as::<_, DbToken>(
            "SELECT digest, user_id, created_at, expires_at FROM auth_tokens WHERE digest = $1",
        )
        .bind(digest)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let token = AuthToken {
            digest: row.digest,
            user_id: UserId::new(row.user_id),
            created_at: row.created_at,
            expires_at: row.expires_at,
        };
        if token.is_expired(now) {
            self.delete_token(digest).await?;
            return Ok(None);
        }
        Ok(Some(token))
    }

    async fn extend_token(&self, digest: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        let result = sqlx::query("UPDATE auth_tokens SET expires_at = $2 WHERE digest = $1")
            .bind(digest)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("token not found".into()));
        }
        Ok(())
    }

    async fn delete_token(&self, digest: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE digest = $1")
            .bind(digest)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user_tokens(&self, user: UserId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE user_id = $1")
            .bind(user.get())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl HubuumStore for PostgresStore {
    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23503").unwrap_or(false);
    }
    false
}

/// Give `group` every capability on `namespace`, inserting or upgrading its row.
async fn upsert_grant_all<'e, E: PgExecutor<'e>>(
    executor: E,
    namespace: i64,
    group: i64,
) -> Result<DbPermission, sqlx::Error> {
    let sql = format!(
        "INSERT INTO permissions (namespace_id, group_id, has_create, has_read, has_update, \
         has_delete, has_namespace) VALUES ($1, $2, TRUE, TRUE, TRUE, TRUE, TRUE) \
         ON CONFLICT (namespace_id, group_id) DO UPDATE SET has_create = TRUE, \
         has_read = TRUE, has_update = TRUE, has_delete = TRUE, has_namespace = TRUE, \
         updated_at = now() RETURNING {PERMISSION_COLUMNS}"
    );
    sqlx::query_as::<_, DbPermission>(&sql)
        .bind(namespace)
        .bind(group)
        .fetch_one(executor)
        .await
}

/// Map constraint violations onto the store taxonomy.
fn constraint_error(err: sqlx::Error, conflict: &str, missing: &str) -> StoreError {
    if is_unique_violation(&err) {
        return StoreError::Conflict(conflict.to_string());
    }
    if is_foreign_key_violation(&err) {
        return StoreError::NotFound(missing.to_string());
    }
    StoreError::from(err)
}

fn namespace_from_db(row: DbNamespace) -> Namespace {
    Namespace {
        id: NamespaceId::new(row.id),
        name: row.name,
        description: row.description,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn group_from_db(row: DbGroup) -> Group {
    Group {
        id: GroupId::new(row.id),
        name: row.name,
    }
}

fn user_from_db(row: DbUser) -> User {
    User {
        id: UserId::new(row.id),
        username: row.username,
        email: row.email,
        is_staff: row.is_staff,
        is_superuser: row.is_superuser,
        groups: row.groups.into_iter().map(GroupId::new).collect(),
        password_hash: row.password_hash,
    }
}

fn permission_from_db(row: DbPermission) -> Permission {
    Permission {
        id: row.id,
        namespace: NamespaceId::new(row.namespace_id),
        group: GroupId::new(row.group_id),
        has_create: row.has_create,
        has_read: row.has_read,
        has_update: row.has_update,
        has_delete: row.has_delete,
        has_namespace: row.has_namespace,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn resource_from_db(row: DbResource) -> StoreResult<Resource> {
    let kind = ResourceKind::from_model(&row.kind)
        .ok_or_else(|| StoreError::Unexpected(anyhow!("unknown resource kind {}", row.kind)))?;
    let attributes = match row.attributes {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(StoreError::Unexpected(anyhow!(
                "resource attributes must be an object, got {other}"
            )));
        }
    };
    Ok(Resource {
        id: row.id,
        kind,
        namespace: NamespaceId::new(row.namespace_id),
        name: row.name,
        attributes,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
