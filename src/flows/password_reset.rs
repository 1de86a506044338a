use std::sync::Arc;

use chrono::Utc;

use super::retry::with_retry;
use crate::config::AuthConfig;
use crate::crypto::{generate_token, hash_token, PasswordHasher, DEFAULT_TOKEN_LENGTH};
use crate::rate_limit::{ClientIdentity, RateLimitDecision, RateLimiter};
use crate::repository::{PasswordResetRepository, UserRepository};
use crate::session::SessionManager;
use crate::validators::validate_password;
use crate::AuthError;

/// Result of a reset request.
///
/// `Accepted` comes back whether or not the account exists, so the
/// response cannot be used to enumerate emails. The token is only
/// populated for real accounts; the caller delivers it and sends the
/// same generic reply either way.
#[derive(Debug, Clone)]
pub enum ForgotPasswordOutcome {
    Accepted {
        /// Plaintext reset token to deliver, absent for unknown emails.
        reset_token: Option<String>,
    },
    RateLimited {
        retry_after: i64,
    },
}

/// Issues single-use, time-boxed password reset tokens.
#[derive(Clone)]
pub struct ForgotPasswordFlow {
    users: Arc<dyn UserRepository>,
    resets: Arc<dyn PasswordResetRepository>,
    limiter: RateLimiter,
    config: AuthConfig,
}

impl ForgotPasswordFlow {
    pub fn new(
        users: Arc<dyn UserRepository>,
        resets: Arc<dyn PasswordResetRepository>,
        limiter: RateLimiter,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            resets,
            limiter,
            config,
        }
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub async fn execute(
        &self,
        email: &str,
        client: &ClientIdentity,
    ) -> Result<ForgotPasswordOutcome, AuthError> {
        if let RateLimitDecision::Blocked { retry_after } =
            self.limiter.check("password_reset", client).await?
        {
            return Ok(ForgotPasswordOutcome::RateLimited { retry_after });
        }

        let email = email.to_lowercase();
        let user = with_retry(self.config.store_timeout, self.config.retry_backoff, || {
            self.users.find_by_email(&email)
        })
        .await?;

        let Some(user) = user else {
            log::info!(
                target: "palisade_flows",
                "msg=\"reset_requested_for_unknown_email\""
            );
            return Ok(ForgotPasswordOutcome::Accepted { reset_token: None });
        };

        let token = generate_token(DEFAULT_TOKEN_LENGTH);
        let expires_at = Utc::now() + self.config.registration.password_reset_expiry;
        self.resets
            .create(user.id, &hash_token(&token), expires_at)
            .await?;

        log::info!(
            target: "palisade_flows",
            "msg=\"reset_token_issued\" user_id={}",
            user.id
        );
        Ok(ForgotPasswordOutcome::Accepted {
            reset_token: Some(token),
        })
    }
}

/// Consumes a reset token and installs a new password.
#[derive(Clone)]
pub struct ResetPasswordFlow {
    users: Arc<dyn UserRepository>,
    resets: Arc<dyn PasswordResetRepository>,
    hasher: Arc<dyn PasswordHasher>,
    sessions: SessionManager,
    config: AuthConfig,
}

impl ResetPasswordFlow {
    pub fn new(
        users: Arc<dyn UserRepository>,
        resets: Arc<dyn PasswordResetRepository>,
        hasher: Arc<dyn PasswordHasher>,
        sessions: SessionManager,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            resets,
            hasher,
            sessions,
            config,
        }
    }

    /// Expired, already-used, and unknown tokens all fail identically.
    /// Every session of the user is ended; the new password must be used
    /// to log in again.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub async fn execute(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        validate_password(new_password)?;

        let token_hash = hash_token(token);
        let record = self
            .resets
            .find_by_hash(&token_hash)
            .await?
            .ok_or(AuthError::TokenInvalid)?;
        if !record.is_usable(Utc::now()) {
            return Err(AuthError::TokenInvalid);
        }
        self.resets.consume(&token_hash).await?;

        let hashed_password = self.hasher.hash(new_password)?;
        with_retry(self.config.store_timeout, self.config.retry_backoff, || {
            self.users.update_password(record.user_id, &hashed_password)
        })
        .await?;

        self.sessions
            .invalidate_all_user_sessions(record.user_id, None)
            .await?;

        log::info!(
            target: "palisade_flows",
            "msg=\"password_reset\" user_id={}",
            record.user_id
        );
        Ok(())
    }
}
