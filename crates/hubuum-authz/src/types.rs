//! Identifiers and the dotted namespace hierarchy.
//!
//! # Purpose
//! Wraps numeric row identifiers so namespace, group and user ids cannot be
//! mixed up, and models namespace names as dot-delimited paths.
//!
//! # How it fits
//! The hierarchy is never stored. A namespace's parent is derived from its
//! name on demand, so every helper here is a pure function over the string.
//!
//! # Key invariants
//! - The parent of `a.b.c` is `a.b`; a name without a dot is a root.
//! - A child's existence never implies its parent exists. Only namespace
//!   creation checks for the parent.
//!
//! # Examples
//! ```rust
//! use hubuum_authz::{NamespaceName, is_root, parent_of};
//!
//! assert_eq!(parent_of("infra.net.core").as_deref(), Some("infra.net"));
//! assert!(is_root("infra"));
//!
//! let name = NamespaceName::parse("infra.net").unwrap();
//! assert_eq!(name.leaf(), "net");
//! assert_eq!(name.depth(), 2);
//! ```
//!
//! # Common pitfalls
//! - Comparing names by prefix. `infra2` is not a child of `infra`.
use crate::{AuthzError, AuthzResult};
use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(
    /// Primary key of a namespace row.
    NamespaceId
);
numeric_id!(
    /// Primary key of a group row.
    GroupId
);
numeric_id!(
    /// Primary key of a user row.
    UserId
);

/// Return the parent name of a dotted namespace name, or `None` for a root.
pub fn parent_of(name: &str) -> Option<String> {
    name.rsplit_once('.').map(|(parent, _)| parent.to_string())
}

/// True when `name` has no dot.
pub fn is_root(name: &str) -> bool {
    !name.contains('.')
}

/// Validated dotted namespace name.
///
/// # Invariants
/// - Non-empty, and no component between dots is empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NamespaceName(String);

impl NamespaceName {
    /// Parse and validate a namespace name.
    ///
    /// # Errors
    /// - [`AuthzError::MissingParameter`] for an empty name or an empty
    ///   component (`a..b`, `.a`, `a.`).
    pub fn parse(value: impl Into<String>) -> AuthzResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AuthzError::MissingParameter(
                "namespace name must not be empty".to_string(),
            ));
        }
        if trimmed.split('.').any(|part| part.trim().is_empty()) {
            return Err(AuthzError::MissingParameter(format!(
                "namespace name {trimmed:?} has an empty component"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        is_root(&self.0)
    }

    /// Parent name, validated by construction.
    pub fn parent(&self) -> Option<NamespaceName> {
        parent_of(&self.0).map(NamespaceName)
    }

    /// Number of dot-separated components.
    pub fn depth(&self) -> usize {
        self.0.split('.').count()
    }

    /// Last component of the name.
    pub fn leaf(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Join a child suffix onto this name.
    pub fn child(&self, suffix: &str) -> AuthzResult<NamespaceName> {
        NamespaceName::parse(format!("{}.{}", self.0, suffix))
    }
}

impl std::fmt::Display for NamespaceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for NamespaceName {
    type Error = AuthzError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<NamespaceName> for String {
    fn from(value: NamespaceName) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_and_root_helpers() {
        assert_eq!(parent_of("infra"), None);
        assert_eq!(parent_of("infra.net").as_deref(), Some("infra"));
        assert_eq!(parent_of("a.b.c").as_deref(), Some("a.b"));
        assert!(is_root("infra"));
        assert!(!is_root("infra.net"));
    }

    #[test]
    fn parse_rejects_empty_components() {
        for bad in ["", "   ", "a..b", ".a", "a.", "."] {
            let err = NamespaceName::parse(bad).expect_err(bad);
            assert!(matches!(err, AuthzError::MissingParameter(_)), "{bad}");
        }
    }

    #[test]
    fn parse_trims_and_exposes_structure() {
        let name = NamespaceName::parse("  infra.net.core ").expect("parse");
        assert_eq!(name.as_str(), "infra.net.core");
        assert_eq!(name.depth(), 3);
        assert_eq!(name.leaf(), "core");
        assert!(!name.is_root());
        assert_eq!(
            name.parent().map(|p| p.to_string()).as_deref(),
            Some("infra.net")
        );

        let root = NamespaceName::parse("infra").expect("parse");
        assert!(root.is_root());
        assert!(root.parent().is_none());
        assert_eq!(root.child("dc1").expect("child").as_str(), "infra.dc1");
        assert!(root.child("").is_err());
    }

    #[test]
    fn prefix_is_not_parenthood() {
        assert_eq!(parent_of("infra2.x").as_deref(), Some("infra2"));
        assert_ne!(parent_of("infra2").as_deref(), Some("infra"));
    }

    #[test]
    fn serde_roundtrip_validates() {
        let parsed: Result<NamespaceName, _> = serde_json::from_str("\"a..b\"");
        assert!(parsed.is_err());
        let id: NamespaceId = serde_json::from_str("42").expect("id");
        assert_eq!(id.get(), 42);
    }
}
