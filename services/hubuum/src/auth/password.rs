//! Password hashing for stored users.
//!
//! Hashes are PHC strings produced by Argon2id with a random salt. Hashing is
//! CPU bound, so the async helpers run it on the blocking pool.
use anyhow::{Context, anyhow};
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

pub fn hash_password_blocking(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("hash password: {err}"))?;
    Ok(hash.to_string())
}

/// Returns false for a wrong password and for a malformed stored hash.
pub fn verify_password_blocking(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!(error = %err, "stored password hash is malformed");
            return false;
        }
    };
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => true,
        Err(password_hash::Error::Password) => false,
        Err(err) => {
            tracing::warn!(error = %err, "password verification failed");
            false
        }
    }
}

pub async fn hash_password(password: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_password_blocking(&password))
        .await
        .context("join password hashing task")?
}

pub async fn verify_password(password: String, hash: String) -> bool {
    match tokio::task::spawn_blocking(move || verify_password_blocking(&password, &hash)).await {
        Ok(valid) => valid,
        Err(err) => {
            tracing::error!(error = %err, "password verification task failed");
            false
        }
    }
}
