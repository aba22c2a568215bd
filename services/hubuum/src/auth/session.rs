//! Login sessions and request authentication.
//!
//! # Purpose
//! Exchanges HTTP Basic credentials for an opaque token and resolves the
//! `Authorization: Token <secret>` (or `Bearer <secret>`) header of later
//! requests into a [`Principal`] with its group list loaded once.
//!
//! # Key invariants
//! - Only the digest of a token is stored.
//! - Every successful use pushes the expiry out by the configured TTL.
//! - Expired or revoked tokens are rejected with 401.
use crate::api::error::{ApiError, api_internal, api_internal_message, api_unauthorized};
use crate::api::types::LoginResponse;
use crate::app::AppState;
use crate::auth::{password, token};
use crate::model::{AuthToken, User};
use crate::store::StoreError;
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use hubuum_authz::Principal;

/// Extract the token secret from an `Authorization` header.
pub fn token_secret(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Token ")
        .or_else(|| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|secret| !secret.is_empty())
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Resolve a token secret to its digest and owning user, refreshing expiry.
async fn resolve_token(state: &AppState, secret: &str) -> Result<(String, User), ApiError> {
    let digest = token::digest(secret);
    let now = Utc::now();
    let stored = state
        .store
        .token(&digest, now)
        .await
        .map_err(|err| api_internal("failed to load token", &err))?
        .ok_or_else(|| api_unauthorized("invalid or expired token"))?;
    let user = match state.store.get_user(stored.user_id).await {
        Ok(user) => user,
        Err(StoreError::NotFound(_)) => return Err(api_unauthorized("invalid or expired token")),
        Err(err) => return Err(api_internal("failed to load user", &err)),
    };
    match state.store.extend_token(&digest, now + state.token_ttl).await {
        Ok(()) | Err(StoreError::NotFound(_)) => {}
        Err(err) => return Err(api_internal("failed to refresh token", &err)),
    }
    Ok((digest, user))
}

/// Authenticate the request if it carries credentials.
///
/// Returns `Ok(None)` for a request without an `Authorization` header so the
/// decision procedure can deny it as anonymous. A header that is present but
/// unusable is rejected here.
pub async fn principal_from_headers(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<Principal>, ApiError> {
    if !headers.contains_key(AUTHORIZATION) {
        return Ok(None);
    }
    let secret =
        token_secret(headers).ok_or_else(|| api_unauthorized("unsupported authorization scheme"))?;
    let (_, user) = resolve_token(state, secret).await?;
    Ok(Some(user.principal()))
}

/// Authenticate the request, rejecting anonymous callers.
pub async fn require_principal(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Principal, ApiError> {
    principal_from_headers(state, headers)
        .await?
        .ok_or_else(|| api_unauthorized("authentication required"))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LoginResponse>, ApiError> {
    let (username, supplied) =
        basic_credentials(&headers).ok_or_else(|| api_unauthorized("basic credentials required"))?;
    let user = state
        .store
        .user_by_username(&username)
        .await
        .map_err(|err| api_internal("failed to load user", &err))?;
    let Some(user) = user else {
        tracing::info!(username = %username, "login for unknown user");
        return Err(api_unauthorized("invalid credentials"));
    };
    let Some(hash) = user.password_hash.clone() else {
        return Err(api_unauthorized("invalid credentials"));
    };
    if !password::verify_password(supplied, hash).await {
        tracing::info!(username = %username, "login with wrong password");
        return Err(api_unauthorized("invalid credentials"));
    }

    let secret = token::generate_secret();
    let now = Utc::now();
    let issued = AuthToken {
        digest: token::digest(&secret),
        user_id: user.id,
        created_at: now,
        expires_at: now + state.token_ttl,
    };
    let expires_at = issued.expires_at;
    state.store.insert_token(issued).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to store token");
        api_internal_message("failed to issue token")
    })?;
    tracing::info!(user = %user.username, "login succeeded");
    Ok(Json(LoginResponse {
        token: secret,
        expires_at,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Missing or invalid token", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let secret = token_secret(&headers).ok_or_else(|| api_unauthorized("token required"))?;
    let (digest, _) = resolve_token(&state, secret).await?;
    state
        .store
        .delete_token(&digest)
        .await
        .map_err(|err| api_internal("failed to revoke token", &err))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/auth/logoutall",
    tag = "auth",
    responses(
        (status = 204, description = "Every token of the user revoked"),
        (status = 401, description = "Missing or invalid token", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn logout_all(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let secret = token_secret(&headers).ok_or_else(|| api_unauthorized("token required"))?;
    let (_, user) = resolve_token(&state, secret).await?;
    let removed = state
        .store
        .delete_user_tokens(user.id)
        .await
        .map_err(|err| api_internal("failed to revoke tokens", &err))?;
    tracing::info!(user = %user.username, removed, "revoked all tokens");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).expect("header"));
        headers
    }

    #[test]
    fn token_secret_accepts_token_and_bearer() {
        assert_eq!(token_secret(&headers("Token abc")), Some("abc"));
        assert_eq!(token_secret(&headers("Bearer abc")), Some("abc"));
        assert_eq!(token_secret(&headers("Basic abc")), None);
        assert_eq!(token_secret(&headers("Token ")), None);
        assert_eq!(token_secret(&HeaderMap::new()), None);
    }

    #[test]
    fn basic_credentials_decode() {
        let encoded = STANDARD.encode("alice:s3cret:with-colon");
        let creds = basic_credentials(&headers(&format!("Basic {encoded}")));
        assert_eq!(
            creds,
            Some(("alice".to_string(), "s3cret:with-colon".to_string()))
        );
        assert_eq!(basic_credentials(&headers("Basic !!!")), None);
        assert_eq!(basic_credentials(&headers("Token abc")), None);
    }
}
