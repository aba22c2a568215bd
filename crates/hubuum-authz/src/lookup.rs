//! Ordered multi-field lookup.
//!
//! # Purpose
//! Resolves a single path value (`"42"`, `"alice"`, `"alice@example.org"`)
//! against an ordered list of fields. The first field that yields exactly one
//! row wins.
//!
//! # Key invariants
//! - A failing field query (a non-numeric value against `id`, a store error) counts
//!   as "no match on this field" and the search moves on.
//! - Only after every field is exhausted does the lookup fail, with
//!   [`AuthzError::NotFound`].
//!
//! # Examples
//! ```rust
//! use hubuum_authz::{LookupField, lookup_by_fields};
//!
//! # tokio_test_block(async {
//! let users = vec![(1_i64, "alice", "alice@x.org")];
//! let found = lookup_by_fields(
//!     &[LookupField::Id, LookupField::Username, LookupField::Email],
//!     "alice@x.org",
//!     |field, value| {
//!         let users = users.clone();
//!         async move {
//!             let hits: Vec<_> = match field {
//!                 LookupField::Id => {
//!                     let id = LookupField::parse_id(value)?;
//!                     users.into_iter().filter(|u| u.0 == id).collect()
//!                 }
//!                 LookupField::Username => users.into_iter().filter(|u| u.1 == value).collect(),
//!                 LookupField::Email => users.into_iter().filter(|u| u.2 == value).collect(),
//!                 _ => Vec::new(),
//!             };
//!             Ok::<_, hubuum_authz::AuthzError>(hits)
//!         }
//!     },
//! )
//! .await
//! .unwrap();
//! assert_eq!(found.0, 1);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```
use crate::{AuthzError, AuthzResult};
use serde::{Deserialize, Serialize};
use std::future::Future;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupField {
    Id,
    Name,
    Username,
    Email,
    Fqdn,
}

impl LookupField {
    pub fn as_str(self) -> &'static str {
        match self {
            LookupField::Id => "id",
            LookupField::Name => "name",
            LookupField::Username => "username",
            LookupField::Email => "email",
            LookupField::Fqdn => "fqdn",
        }
    }

    /// Parse a value tried against the `id` field.
    pub fn parse_id(value: &str) -> AuthzResult<i64> {
        value
            .trim()
            .parse::<i64>()
            .map_err(|_| AuthzError::MissingParameter(format!("{value:?} is not a numeric id")))
    }
}

impl std::fmt::Display for LookupField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Try `fields` in order, returning the first unique match.
pub async fn lookup_by_fields<'a, T, E, F, Fut>(
    fields: &[LookupField],
    value: &'a str,
    mut query: F,
) -> AuthzResult<T>
where
    F: FnMut(LookupField, &'a str) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
    E: std::fmt::Display,
{
    if value.trim().is_empty() {
        return Err(AuthzError::MissingParameter(
            "lookup value must not be empty".to_string(),
        ));
    }
    for field in fields {
        match query(*field, value).await {
            Ok(mut hits) if hits.len() == 1 => {
                if let Some(hit) = hits.pop() {
                    return Ok(hit);
                }
            }
            Ok(hits) => {
                tracing::debug!(
                    field = field.as_str(),
                    value,
                    matches = hits.len(),
                    "no unique match"
                );
            }
            Err(err) => {
                tracing::debug!(field = field.as_str(), value, error = %err, "lookup query failed");
            }
        }
    }
    Err(AuthzError::NotFound(format!("no object matches {value:?}")))
}
