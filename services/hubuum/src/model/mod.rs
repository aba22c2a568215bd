//! Inventory data model.
//!
//! # Purpose
//! Row shapes shared by the stores and the HTTP API: namespaces, groups,
//! users, grants, namespaced resources and login tokens.
mod group;
mod namespace;
mod permission;
mod resource;
mod token;
mod user;

pub use group::Group;
pub use namespace::{Namespace, NamespacePatch, NewNamespace};
pub use permission::Permission;
pub use resource::{NewResource, Resource, ResourcePatch};
pub use token::AuthToken;
pub use user::{NewUser, User, UserPatch};
