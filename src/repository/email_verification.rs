use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::AuthError;

/// A single-use email verification token. Stored hashed, like reset tokens.
#[derive(Debug, Clone)]
pub struct EmailVerificationToken {
    pub user_id: i64,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl EmailVerificationToken {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at > now
    }
}

#[async_trait]
pub trait EmailVerificationRepository: Send + Sync {
    async fn create(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<EmailVerificationToken, AuthError>;

    async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<EmailVerificationToken>, AuthError>;

    async fn consume(&self, token_hash: &str) -> Result<(), AuthError>;

    async fn sweep_expired(&self) -> Result<u64, AuthError>;
}
