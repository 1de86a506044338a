use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::AuthError;

/// A single-use, time-boxed password reset token.
///
/// Only the SHA-256 hash of the token is stored; the plaintext leaves the
/// library exactly once, at creation.
#[derive(Debug, Clone)]
pub struct PasswordResetToken {
    pub user_id: i64,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at > now
    }
}

#[async_trait]
pub trait PasswordResetRepository: Send + Sync {
    async fn create(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetToken, AuthError>;

    async fn find_by_hash(&self, token_hash: &str)
        -> Result<Option<PasswordResetToken>, AuthError>;

    /// Marks the token used; it can never verify again.
    async fn consume(&self, token_hash: &str) -> Result<(), AuthError>;

    /// Removes tokens past expiry. Returns the number removed.
    async fn sweep_expired(&self) -> Result<u64, AuthError>;
}
