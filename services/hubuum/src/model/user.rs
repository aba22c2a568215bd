use hubuum_authz::{GroupId, Principal, UserId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A stored user. The password hash never leaves the service.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct User {
    #[schema(value_type = i64)]
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    #[schema(value_type = Vec<i64>)]
    pub groups: Vec<GroupId>,
    #[serde(skip)]
    pub password_hash: Option<String>,
}

impl User {
    /// Authorization view of this user, carrying its group ids.
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            username: self.username.clone(),
            is_staff: self.is_staff,
            is_superuser: self.is_superuser,
            groups: self.groups.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
    pub password_hash: Option<String>,
}
