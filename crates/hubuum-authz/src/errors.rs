use thiserror::Error;

/// Failure taxonomy shared by the decision procedure, the lifecycle rules and
/// the HTTP layer.
///
/// Each variant maps to exactly one HTTP status at the transport boundary:
/// `MissingParameter` 400, `Unauthenticated` 401, `Forbidden` 403,
/// `NotFound` 404, `MethodNotAllowed` 405, `Conflict` 409.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    #[error("missing or invalid parameter: {0}")]
    MissingParameter(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("authentication required")]
    Unauthenticated,
    #[error("method {0} not allowed")]
    MethodNotAllowed(String),
}

pub type AuthzResult<T> = Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_variants() {
        let errors = vec![
            AuthzError::MissingParameter("group".to_string()),
            AuthzError::Conflict("grant exists".to_string()),
            AuthzError::NotFound("namespace".to_string()),
            AuthzError::Forbidden("missing read".to_string()),
            AuthzError::Unauthenticated,
            AuthzError::MethodNotAllowed("PATCH".to_string()),
        ];

        for error in errors {
            let rendered = error.to_string();
            assert!(!rendered.is_empty());
        }
    }
}
