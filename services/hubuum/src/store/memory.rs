//! In-memory implementation of the hubuum store.
//!
//! # Purpose
//! Keeps every table in process memory for local development, tests and
//! deployments that do not need durability.
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - All tables sit behind a single `tokio::sync::RwLock`, so every mutation
//!   (including a namespace insert together with its owner grant, or a delete
//!   together with its cascade) is applied atomically with respect to other
//!   requests.
//!
//! # Cascading deletes
//! Deleting a namespace, group or user scans the dependent tables and removes
//! matching rows under the same write lock, mirroring the `ON DELETE CASCADE`
//! foreign keys of the Postgres schema.
use super::{
    HubuumStore, IdentityStore, InventoryStore, StoreError, StoreResult, parse_lookup_id,
    record_counts,
};
use crate::model::{
    AuthToken, Group, Namespace, NamespacePatch, NewNamespace, NewResource, NewUser, Permission,
    Resource, ResourcePatch, User, UserPatch,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hubuum_authz::{
    Capability, CapabilitySet, Grant, GroupId, LookupField, NamespaceId, ResourceKind, UserId,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    namespaces: BTreeMap<NamespaceId, Namespace>,
    groups: BTreeMap<GroupId, Group>,
    users: BTreeMap<UserId, User>,
    members: BTreeSet<(GroupId, UserId)>,
    permissions: BTreeMap<i64, Permission>,
    resources: BTreeMap<i64, Resource>,
    tokens: HashMap<String, AuthToken>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn with_groups(&self, mut user: User) -> User {
        user.groups = self
            .members
            .iter()
            .filter(|(_, member)| *member == user.id)
            .map(|(group, _)| *group)
            .collect();
        user
    }

    fn permission_for(&self, namespace: NamespaceId, group: GroupId) -> Option<&Permission> {
        self.permissions
            .values()
            .find(|perm| perm.namespace == namespace && perm.group == group)
    }

    fn upsert_grant(
        &mut self,
        namespace: NamespaceId,
        group: GroupId,
        capabilities: CapabilitySet,
    ) -> Permission {
        let now = Utc::now();
        let id = match self.permission_for(namespace, group) {
            Some(perm) => perm.id,
            None => self.allocate_id(),
        };
        let permission = self.permissions.entry(id).or_insert_with(|| Permission {
            id,
            namespace,
            group,
            has_create: false,
            has_read: false,
            has_update: false,
            has_delete: false,
            has_namespace: false,
            created_at: now,
            updated_at: now,
        });
        permission.set_capabilities(capabilities);
        permission.updated_at = now;
        let permission = permission.clone();
        self.publish_counts();
        permission
    }

    /// Give `group` every capability on `namespace`, creating the row if needed.
    fn grant_all(&mut self, namespace: NamespaceId, group: GroupId) -> StoreResult<Permission> {
        if !self.namespaces.contains_key(&namespace) {
            return Err(StoreError::NotFound("namespace not found".into()));
        }
        if !self.groups.contains_key(&group) {
            return Err(StoreError::NotFound("group not found".into()));
        }
        Ok(self.upsert_grant(namespace, group, CapabilitySet::all()))
    }

    fn publish_counts(&self) {
        record_counts(self.namespaces.len(), self.permissions.len());
    }
}

/// In-memory hubuum store.
///
/// Cloning shares the underlying tables.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn list_namespaces(&self) -> StoreResult<Vec<Namespace>> {
        Ok(self.tables.read().await.namespaces.values().cloned().collect())
    }

    async fn find_namespaces(
        &self,
        field: LookupField,
        value: &str,
    ) -> StoreResult<Vec<Namespace>> {
        let tables = self.tables.read().await;
        Ok(match field {
            LookupField::Id => {
                let id = NamespaceId::new(parse_lookup_id(value)?);
                tables.namespaces.get(&id).cloned().into_iter().collect()
            }
            LookupField::Name => tables
                .namespaces
                .values()
                .filter(|ns| ns.name == value)
                .cloned()
                .collect(),
            _ => Vec::new(),
        })
    }

    async fn namespace_by_name(&self, name: &str) -> StoreResult<Option<Namespace>> {
        Ok(self
            .tables
            .read()
            .await
            .namespaces
            .values()
            .find(|ns| ns.name == name)
            .cloned())
    }

    async fn create_namespace(
        &self,
        namespace: NewNamespace,
        owner: Option<GroupId>,
    ) -> StoreResult<Namespace> {
        let mut tables = self.tables.write().await;
        if tables
            .namespaces
            .values()
            .any(|ns| ns.name == namespace.name.as_str())
        {
            return Err(StoreError::Conflict("namespace exists".into()));
        }
        if owner.is_some_and(|group| !tables.groups.contains_key(&group)) {
            return Err(StoreError::NotFound("group not found".into()));
        }
        let now = Utc::now();
        let created = Namespace {
            id: NamespaceId::new(tables.allocate_id()),
            name: namespace.name.to_string(),
            description: namespace.description,
            created_at: now,
            updated_at: now,
        };
        tables.namespaces.insert(created.id, created.clone());
        if let Some(group) = owner {
            tables.grant_all(created.id, group)?;
        }
        tables.publish_counts();
        Ok(created)
    }

    async fn update_namespace(
        &self,
        id: NamespaceId,
        patch: NamespacePatch,
    ) -> StoreResult<Namespace> {
        let mut tables = self.tables.write().await;
        if let Some(name) = &patch.name {
            if tables
                .namespaces
                .values()
                .any(|ns| ns.id != id && ns.name == name.as_str())
            {
                return Err(StoreError::Conflict("namespace exists".into()));
            }
        }
        let namespace = tables
            .namespaces
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("namespace not found".into()))?;
        if let Some(name) = patch.name {
            namespace.name = name.to_string();
        }
        if let Some(description) = patch.description {
            namespace.description = description;
        }
        namespace.updated_at = Utc::now();
        Ok(namespace.clone())
    }

    async fn delete_namespace(&self, id: NamespaceId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.namespaces.remove(&id).is_none() {
            return Err(StoreError::NotFound("namespace not found".into()));
        }
        tables.permissions.retain(|_, perm| perm.namespace != id);
        tables.resources.retain(|_, res| res.namespace != id);
        tables.publish_counts();
        Ok(())
    }

    async fn list_permissions(&self) -> StoreResult<Vec<Permission>> {
        Ok(self
            .tables
            .read()
            .await
            .permissions
            .values()
            .cloned()
            .collect())
    }

    async fn namespace_permissions(&self, namespace: NamespaceId) -> StoreResult<Vec<Permission>> {
        Ok(self
            .tables
            .read()
            .await
            .permissions
            .values()
            .filter(|perm| perm.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn get_permission(&self, id: i64) -> StoreResult<Permission> {
        self.tables
            .read()
            .await
            .permissions
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("permission not found".into()))
    }

    async fn find_permission(
        &self,
        namespace: NamespaceId,
        group: GroupId,
    ) -> StoreResult<Option<Permission>> {
        Ok(self
            .tables
            .read()
            .await
            .permission_for(namespace, group)
            .cloned())
    }

    async fn grants_for_groups(&self, groups: &[GroupId]) -> StoreResult<Vec<Grant>> {
        Ok(self
            .tables
            .read()
            .await
            .permissions
            .values()
            .filter(|perm| groups.contains(&perm.group))
            .map(Permission::to_grant)
            .collect())
    }

    async fn grant(
        &self,
        namespace: NamespaceId,
        group: GroupId,
        capabilities: CapabilitySet,
    ) -> StoreResult<Permission> {
        let mut tables = self.tables.write().await;
        if !tables.namespaces.contains_key(&namespace) {
            return Err(StoreError::NotFound("namespace not found".into()));
        }
        if !tables.groups.contains_key(&group) {
            return Err(StoreError::NotFound("group not found".into()));
        }
        if tables.permission_for(namespace, group).is_some() {
            return Err(StoreError::Conflict("permission exists".into()));
        }
        Ok(tables.upsert_grant(namespace, group, capabilities))
    }

    async fn grant_all(&self, namespace: NamespaceId, group: GroupId) -> StoreResult<Permission> {
        self.tables.write().await.grant_all(namespace, group)
    }

    async fn revoke(&self, namespace: NamespaceId, group: GroupId) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.permissions.len();
        tables
            .permissions
            .retain(|_, perm| !(perm.namespace == namespace && perm.group == group));
        let removed = tables.permissions.len() != before;
        tables.publish_counts();
        Ok(removed)
    }

    async fn delete_permission(&self, id: i64) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.permissions.remove(&id).is_none() {
            return Err(StoreError::NotFound("permission not found".into()));
        }
        tables.publish_counts();
        Ok(())
    }

    async fn groups_with_capability(
        &self,
        namespace: NamespaceId,
        capability: Capability,
    ) -> StoreResult<Vec<Group>> {
        let tables = self.tables.read().await;
        Ok(tables
            .permissions
            .values()
            .filter(|perm| perm.namespace == namespace && perm.capabilities().contains(capability))
            .filter_map(|perm| tables.groups.get(&perm.group).cloned())
            .collect())
    }

    async fn list_resources(&self, kind: ResourceKind) -> StoreResult<Vec<Resource>> {
        Ok(self
            .tables
            .read()
            .await
            .resources
            .values()
            .filter(|res| res.kind == kind)
            .cloned()
            .collect())
    }

    async fn find_resources(
        &self,
        kind: ResourceKind,
        field: LookupField,
        value: &str,
    ) -> StoreResult<Vec<Resource>> {
        let tables = self.tables.read().await;
        let of_kind = tables.resources.values().filter(|res| res.kind == kind);
        Ok(match field {
            LookupField::Id => {
                let id = parse_lookup_id(value)?;
                of_kind.filter(|res| res.id == id).cloned().collect()
            }
            LookupField::Name => of_kind.filter(|res| res.name == value).cloned().collect(),
            LookupField::Fqdn => of_kind
                .filter(|res| res.fqdn() == Some(value))
                .cloned()
                .collect(),
            _ => Vec::new(),
        })
    }

    async fn create_resource(&self, resource: NewResource) -> StoreResult<Resource> {
        let mut tables = self.tables.write().await;
        if !tables.namespaces.contains_key(&resource.namespace) {
            return Err(StoreError::NotFound("namespace not found".into()));
        }
        let now = Utc::now();
        let created = Resource {
            id: tables.allocate_id(),
            kind: resource.kind,
            namespace: resource.namespace,
            name: resource.name,
            attributes: resource.attributes,
            created_at: now,
            updated_at: now,
        };
        tables.resources.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_resource(&self, id: i64, patch: ResourcePatch) -> StoreResult<Resource> {
        let mut tables = self.tables.write().await;
        if let Some(namespace) = patch.namespace {
            if !tables.namespaces.contains_key(&namespace) {
                return Err(StoreError::NotFound("namespace not found".into()));
            }
        }
        let resource = tables
            .resources
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("resource not found".into()))?;
        if let Some(namespace) = patch.namespace {
            resource.namespace = namespace;
        }
        if let Some(name) = patch.name {
            resource.name = name;
        }
        match patch.attributes {
            Some(attributes) if patch.replace_attributes => resource.attributes = attributes,
            Some(attributes) => resource.attributes.extend(attributes),
            None => {}
        }
        resource.updated_at = Utc::now();
        Ok(resource.clone())
    }

    async fn delete_resource(&self, id: i64) -> StoreResult<()> {
        match self.tables.write().await.resources.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound("resource not found".into())),
        }
    }
}

#[async_trait]
impl IdentityStore for InMemoryStore {
    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .map(|user| tables.with_groups(user.clone()))
            .collect())
    }

    async fn find_users(&self, field: LookupField, value: &str) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        let matches: Vec<User> = match field {
            LookupField::Id => {
                let id = UserId::new(parse_lookup_id(value)?);
                tables.users.get(&id).cloned().into_iter().collect()
            }
            LookupField::Username => tables
                .users
                .values()
                .filter(|user| user.username == value)
                .cloned()
                .collect(),
            LookupField::Email => tables
                .users
                .values()
                .filter(|user| !user.email.is_empty() && user.email == value)
                .cloned()
                .collect(),
            _ => Vec::new(),
        };
        Ok(matches
            .into_iter()
            .map(|user| tables.with_groups(user))
            .collect())
    }

    async fn get_user(&self, id: UserId) -> StoreResult<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .get(&id)
            .cloned()
            .map(|user| tables.with_groups(user))
            .ok_or_else(|| StoreError::NotFound("user not found".into()))
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.username == username)
            .cloned()
            .map(|user| tables.with_groups(user)))
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|existing| existing.username == user.username)
        {
            return Err(StoreError::Conflict("user exists".into()));
        }
        let created = User {
            id: UserId::new(tables.allocate_id()),
            username: user.username,
            email: user.email,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            groups: Vec::new(),
            password_hash: user.password_hash,
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_user(&self, id: UserId, patch: UserPatch) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if let Some(username) = &patch.username {
            if tables
                .users
                .values()
                .any(|user| user.id != id && &user.username == username)
            {
                return Err(StoreError::Conflict("user exists".into()));
            }
        }
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("user not found".into()))?;
        if let Some(username) = patch.username {
            user.username = username;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(is_staff) = patch.is_staff {
            user.is_staff = is_staff;
        }
        if let Some(is_superuser) = patch.is_superuser {
            user.is_superuser = is_superuser;
        }
        if let Some(hash) = patch.password_hash {
            user.password_hash = Some(hash);
        }
        let updated = user.clone();
        Ok(tables.with_groups(updated))
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Err(StoreError::NotFound("user not found".into()));
        }
        tables.members.retain(|(_, user)| *user != id);
        tables.tokens.retain(|_, token| token.user_id != id);
        Ok(())
    }

    async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        Ok(self.tables.read().await.groups.values().cloned().collect())
    }

    async fn find_groups(&self, field: LookupField, value: &str) -> StoreResult<Vec<Group>> {
        let tables = self.tables.read().await;
        Ok(match field {
            LookupField::Id => {
                let id = GroupId::new(parse_lookup_id(value)?);
                tables.groups.get(&id).cloned().into_iter().collect()
            }
            LookupField::Name => tables
                .groups
                .values()
                .filter(|group| group.name == value)
                .cloned()
                .collect(),
            _ => Vec::new(),
        })
    }

    async fn get_group(&self, id: GroupId) -> StoreResult<Group> {
        self.tables
            .read()
            .await
            .groups
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("group not found".into()))
    }

    async fn create_group(&self, name: &str) -> StoreResult<Group> {
        let mut tables = self.tables.write().await;
        if tables.groups.values().any(|group| group.name == name) {
            return Err(StoreError::Conflict("group exists".into()));
        }
        let group = Group {
            id: GroupId::new(tables.allocate_id()),
            name: name.to_string(),
        };
        tables.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn rename_group(&self, id: GroupId, name: &str) -> StoreResult<Group> {
        let mut tables = self.tables.write().await;
        if tables
            .groups
            .values()
            .any(|group| group.id != id && group.name == name)
        {
            return Err(StoreError::Conflict("group exists".into()));
        }
        let group = tables
            .groups
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("group not found".into()))?;
        group.name = name.to_string();
        Ok(group.clone())
    }

    async fn delete_group(&self, id: GroupId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.groups.remove(&id).is_none() {
            return Err(StoreError::NotFound("group not found".into()));
        }
        tables.members.retain(|(group, _)| *group != id);
        tables.permissions.retain(|_, perm| perm.group != id);
        tables.publish_counts();
        Ok(())
    }

    async fn add_member(&self, group: GroupId, user: UserId) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.groups.contains_key(&group) {
            return Err(StoreError::NotFound("group not found".into()));
        }
        if !tables.users.contains_key(&user) {
            return Err(StoreError::NotFound("user not found".into()));
        }
        Ok(tables.members.insert((group, user)))
    }

    async fn is_member(&self, group: GroupId, user: UserId) -> StoreResult<bool> {
        Ok(self.tables.read().await.members.contains(&(group, user)))
    }

    async fn remove_member(&self, group: GroupId, user: UserId) -> StoreResult<()> {
        self.tables.write().await.members.remove(&(group, user));
        Ok(())
    }

    async fn insert_token(&self, token: AuthToken) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&token.user_id) {
            return Err(StoreError::NotFound("user not found".into()));
        }
        tables.tokens.insert(token.digest.clone(), token);
        Ok(())
    }

    async fn token(&self, digest: &str, now: DateTime<Utc>) -> StoreResult<Option<AuthToken>> {
        let mut tables = self.tables.write().await;
        match tables.tokens.get(digest) {
            Some(token) if token.is_expired(now) => {
                tables.tokens.remove(digest);
                Ok(None)
            }
            Some(token) => Ok(Some(token.clone())),
            None => Ok(None),
        }
    }

    async fn extend_token(&self, digest: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let token = tables
            .tokens
            .get_mut(digest)
            .ok_or_else(|| StoreError::NotFound("token not found".into()))?;
        token.expires_at = expires_at;
        Ok(())
    }

    async fn delete_token(&self, digest: &str) -> StoreResult<bool> {
        Ok(self.tables.write().await.tokens.remove(digest).is_some())
    }

    async fn delete_user_tokens(&self, user: UserId) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.tokens.len();
        tables.tokens.retain(|_, token| token.user_id != user);
        Ok((before - tables.tokens.len()) as u64)
    }
}

#[async_trait]
impl HubuumStore for InMemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
