//! The authenticated caller as seen by authorization.
use crate::{GroupId, UserId};
use serde::{Deserialize, Serialize};

/// A user plus the ids of every group it belongs to.
///
/// The group list is loaded once when a request is authenticated and reused
/// for every decision made while serving that request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub username: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub groups: Vec<GroupId>,
}

impl Principal {
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            is_staff: false,
            is_superuser: false,
            groups: Vec::new(),
        }
    }

    pub fn with_groups(mut self, groups: impl IntoIterator<Item = GroupId>) -> Self {
        self.groups = groups.into_iter().collect();
        self
    }

    pub fn staff(mut self) -> Self {
        self.is_staff = true;
        self
    }

    pub fn superuser(mut self) -> Self {
        self.is_superuser = true;
        self
    }

    /// Staff and superusers skip every grant check.
    pub fn is_admin(&self) -> bool {
        self.is_staff || self.is_superuser
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn has_only_one_group(&self) -> bool {
        self.groups.len() == 1
    }

    pub fn is_member_of(&self, group: GroupId) -> bool {
        self.groups.contains(&group)
    }
}
