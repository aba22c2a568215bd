//! Seeds the first superuser so a fresh deployment can log in.
use crate::auth::password;
use crate::config::BootstrapAdmin;
use crate::model::NewUser;
use crate::store::{HubuumStore, StoreError};
use anyhow::Context;

/// Create the configured admin unless a user with that name already exists.
///
/// An existing user is left untouched, including its password.
pub async fn ensure_bootstrap_admin(
    store: &dyn HubuumStore,
    admin: &BootstrapAdmin,
) -> anyhow::Result<()> {
    let existing = store
        .user_by_username(&admin.username)
        .await
        .context("look up bootstrap admin")?;
    if existing.is_some() {
        tracing::debug!(username = %admin.username, "bootstrap admin already present");
        return Ok(());
    }
    let hash = password::hash_password(admin.password.clone()).await?;
    let created = store
        .create_user(NewUser {
            username: admin.username.clone(),
            email: String::new(),
            is_staff: true,
            is_superuser: true,
            password_hash: Some(hash),
        })
        .await;
    match created {
        Ok(user) => {
            tracing::info!(username = %user.username, "created bootstrap admin");
            Ok(())
        }
        // Another replica created it first.
        Err(StoreError::Conflict(_)) => Ok(()),
        Err(err) => Err(err).context("create bootstrap admin"),
    }
}
