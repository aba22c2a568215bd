use chrono::{DateTime, Utc};
use hubuum_authz::UserId;

/// A login token. Only the sha256 digest of the secret is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub digest: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
