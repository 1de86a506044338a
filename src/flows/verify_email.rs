use std::sync::Arc;

use chrono::Utc;

use super::retry::with_retry;
use crate::config::AuthConfig;
use crate::crypto::hash_token;
use crate::repository::{EmailVerificationRepository, UserRepository};
use crate::AuthError;

/// Consumes an email verification token and activates the account.
#[derive(Clone)]
pub struct VerifyEmailFlow {
    users: Arc<dyn UserRepository>,
    verifications: Arc<dyn EmailVerificationRepository>,
    config: AuthConfig,
}

impl VerifyEmailFlow {
    pub fn new(
        users: Arc<dyn UserRepository>,
        verifications: Arc<dyn EmailVerificationRepository>,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            verifications,
            config,
        }
    }

    /// Unknown, expired, and already-used tokens fail identically.
    pub async fn execute(&self, token: &str) -> Result<(), AuthError> {
        let token_hash = hash_token(token);
        let record = self
            .verifications
            .find_by_hash(&token_hash)
            .await?
            .ok_or(AuthError::TokenInvalid)?;
        if !record.is_usable(Utc::now()) {
            return Err(AuthError::TokenInvalid);
        }
        self.verifications.consume(&token_hash).await?;

        with_retry(self.config.store_timeout, self.config.retry_backoff, || {
            self.users.mark_email_verified(record.user_id)
        })
        .await?;

        log::info!(
            target: "palisade_flows",
            "msg=\"email_verified\" user_id={}",
            record.user_id
        );
        Ok(())
    }
}
