//! API error types and helpers.
//!
//! # Purpose and responsibility
//! Centralizes HTTP error response construction so every hubuum endpoint
//! returns the same `{code, message, request_id}` body.
//!
//! # Key invariants and assumptions
//! - Each [`AuthzError`] variant maps to exactly one status code.
//! - Store conflicts and misses map onto 409 and 404; anything else is a 500.
//!
//! # Security considerations
//! - Internal errors log details server-side but return generic messages.
use crate::api::types::ErrorResponse;
use crate::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use hubuum_authz::AuthzError;

/// Structured API error returned by handlers.
///
/// # Invariants
/// - `status` must match the semantics of `body.code`.
///
/// # Example
/// ```rust
/// use axum::http::StatusCode;
/// use hubuum::api::error::ApiError;
/// use hubuum::api::types::ErrorResponse;
///
/// let err = ApiError {
///     status: StatusCode::NOT_FOUND,
///     body: ErrorResponse {
///         code: "not_found".to_string(),
///         message: "missing".to_string(),
///         request_id: None,
///     },
/// };
/// ```
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn api_error(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            request_id: None,
        },
    }
}

/// Build a 404 Not Found error.
pub fn api_not_found(message: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, "not_found", message)
}

/// Build a 409 Conflict error with a caller-provided code.
pub fn api_conflict(code: &str, message: &str) -> ApiError {
    api_error(StatusCode::CONFLICT, code, message)
}

/// Build a 500 Internal Server Error from a store error.
///
/// # What it does
/// Logs the store error and returns a generic internal error response.
pub fn api_internal(message: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = ?err, "hubuum storage error");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Build a 500 Internal Server Error without a store error.
pub fn api_internal_message(message: &str) -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

/// Build a 401 Unauthorized error.
pub fn api_unauthorized(message: &str) -> ApiError {
    api_error(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

/// Build a 403 Forbidden error.
pub fn api_forbidden(message: &str) -> ApiError {
    api_error(StatusCode::FORBIDDEN, "forbidden", message)
}

/// Build a 400 Bad Request validation error.
pub fn api_validation_error(message: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

/// Build a 405 Method Not Allowed error.
pub fn api_method_not_allowed(method: &str) -> ApiError {
    api_error(
        StatusCode::METHOD_NOT_ALLOWED,
        "method_not_allowed",
        &format!("method {method} not allowed"),
    )
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::MissingParameter(message) => api_validation_error(&message),
            AuthzError::Conflict(message) => api_conflict("already_exists", &message),
            AuthzError::NotFound(message) => api_not_found(&message),
            AuthzError::Forbidden(message) => api_forbidden(&message),
            AuthzError::Unauthenticated => api_unauthorized("authentication required"),
            AuthzError::MethodNotAllowed(method) => api_method_not_allowed(&method),
        }
    }
}

/// Map a store failure, using `context` as the message for internal errors.
pub fn api_store_error(context: &str, err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound(message) => api_not_found(&message),
        StoreError::Conflict(message) => api_conflict("already_exists", &message),
        err => api_internal(context, &err),
    }
}
