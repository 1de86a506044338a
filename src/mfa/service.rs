use std::sync::Arc;

use chrono::Utc;

use super::challenge::{ChallengeStore, MfaChallenge, MfaMethod};
use super::dispatch::ChallengeDispatcher;
use super::state::{MfaStateStore, PendingEnrollment};
use super::totp;
use crate::config::MfaConfig;
use crate::crypto::{generate_numeric_code, generate_token, hash_token};
use crate::repository::{UserAccount, UserRepository};
use crate::AuthError;

/// Length of a backup code in characters.
const BACKUP_CODE_LENGTH: usize = 10;

/// Length of a challenge id.
const CHALLENGE_ID_LENGTH: usize = 32;

/// Digits in a dispatched SMS/email code.
const DISPATCH_CODE_DIGITS: u32 = 6;

/// Where a user sits in the MFA lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MfaState {
    Unconfigured,
    /// Secret staged, awaiting the first valid code.
    Provisioned,
    Enabled,
}

/// Returned once at setup; the secret and plaintext backup codes are
/// never retrievable again.
#[derive(Debug, Clone)]
pub struct MfaEnrollment {
    pub secret: String,
    pub provisioning_uri: String,
    pub backup_codes: Vec<String>,
}

/// Drives the MFA lifecycle and challenge verification.
#[derive(Clone)]
pub struct MfaService {
    users: Arc<dyn UserRepository>,
    state: Arc<dyn MfaStateStore>,
    challenges: Arc<dyn ChallengeStore>,
    dispatcher: Arc<dyn ChallengeDispatcher>,
    config: MfaConfig,
}

impl MfaService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        state: Arc<dyn MfaStateStore>,
        challenges: Arc<dyn ChallengeStore>,
        dispatcher: Arc<dyn ChallengeDispatcher>,
        config: MfaConfig,
    ) -> Self {
        Self {
            users,
            state,
            challenges,
            dispatcher,
            config,
        }
    }

    pub async fn status(&self, user_id: i64) -> Result<MfaState, AuthError> {
        let user = self.require_user(user_id).await?;
        if user.mfa_enabled {
            return Ok(MfaState::Enabled);
        }
        if self.state.staged(user_id).await?.is_some() {
            return Ok(MfaState::Provisioned);
        }
        Ok(MfaState::Unconfigured)
    }

    /// Stages a new secret and backup codes for the user.
    ///
    /// Nothing touches the credential record yet; the transition to
    /// enabled happens in `confirm_setup`. Calling again replaces any
    /// unconfirmed staging.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub async fn setup(&self, user_id: i64) -> Result<MfaEnrollment, AuthError> {
        let user = self.require_user(user_id).await?;
        if user.mfa_enabled {
            return Err(AuthError::ValidationError(
                "two-factor authentication is already enabled".to_owned(),
            ));
        }

        let secret = totp::generate_secret();
        let backup_codes: Vec<String> = (0..self.config.backup_code_count)
            .map(|_| generate_token(BACKUP_CODE_LENGTH))
            .collect();
        let backup_code_hashes = backup_codes.iter().map(|c| hash_token(c)).collect();

        let provisioning_uri =
            totp::provisioning_uri(&secret, &self.config.issuer, &user.email)?;

        self.state
            .stage(PendingEnrollment {
                user_id,
                secret: secret.clone(),
                backup_code_hashes,
                created_at: Utc::now(),
            })
            .await?;

        log::info!(
            target: "palisade_mfa",
            "msg=\"mfa_provisioned\" user_id={user_id}"
        );

        Ok(MfaEnrollment {
            secret,
            provisioning_uri,
            backup_codes,
        })
    }

    /// Verifies the first code against the staged secret; on success the
    /// secret and backup-code hashes move to the credential record and
    /// MFA is enabled. A wrong code leaves the staging in place for
    /// retry.
    pub async fn confirm_setup(&self, user_id: i64, code: &str) -> Result<bool, AuthError> {
        let Some(staged) = self.state.staged(user_id).await? else {
            return Err(AuthError::MfaNotConfigured);
        };

        let Some(step) = totp::verify_at(&staged.secret, code, unix_now())? else {
            return Ok(false);
        };
        if !self.state.consume_step(user_id, step).await? {
            return Ok(false);
        }

        self.users
            .set_mfa(
                user_id,
                Some(staged.secret),
                staged.backup_code_hashes,
                true,
            )
            .await?;
        self.state.take_staged(user_id).await?;

        log::info!(target: "palisade_mfa", "msg=\"mfa_enabled\" user_id={user_id}");
        Ok(true)
    }

    /// Disables MFA after re-proof with a current code.
    ///
    /// The password-based re-proof path verifies elsewhere and then calls
    /// [`MfaService::clear`].
    pub async fn disable(&self, user_id: i64, code: &str) -> Result<(), AuthError> {
        let user = self.require_user(user_id).await?;
        let secret = user.mfa_secret.as_deref().ok_or(AuthError::MfaNotConfigured)?;

        let step = totp::verify_at(secret, code, unix_now())?
            .ok_or(AuthError::InvalidTwoFactor)?;
        if !self.state.consume_step(user_id, step).await? {
            return Err(AuthError::InvalidTwoFactor);
        }

        self.clear(user_id).await
    }

    /// Removes the secret and backup codes unconditionally.
    ///
    /// The caller must already have re-proved the user's identity (e.g.
    /// a password check).
    pub async fn clear(&self, user_id: i64) -> Result<(), AuthError> {
        self.users.set_mfa(user_id, None, Vec::new(), false).await?;
        self.state.clear(user_id).await?;
        log::info!(target: "palisade_mfa", "msg=\"mfa_disabled\" user_id={user_id}");
        Ok(())
    }

    /// Opens a challenge for the user.
    ///
    /// TOTP challenges carry no server code. SMS and email challenges
    /// generate one, store its hash, and dispatch the plaintext out of
    /// band under a timeout; a slow or failing dispatcher surfaces as
    /// `UpstreamUnavailable`.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub async fn issue_challenge(
        &self,
        user_id: i64,
        method: MfaMethod,
    ) -> Result<MfaChallenge, AuthError> {
        let user = self.require_user(user_id).await?;
        if method == MfaMethod::Totp && !user.mfa_enabled {
            return Err(AuthError::MfaNotConfigured);
        }

        let code = match method {
            MfaMethod::Totp => None,
            MfaMethod::Sms | MfaMethod::Email => {
                Some(generate_numeric_code(DISPATCH_CODE_DIGITS))
            }
        };

        let now = Utc::now();
        let challenge = MfaChallenge {
            id: generate_token(CHALLENGE_ID_LENGTH),
            user_id,
            method,
            code_hash: code.as_deref().map(hash_token),
            attempts: 0,
            max_attempts: self.config.max_challenge_attempts,
            used: false,
            created_at: now,
            expires_at: now + method.challenge_ttl(&self.config),
        };
        self.challenges.insert(challenge.clone()).await?;

        if let Some(ref code) = code {
            self.dispatch_code(&user, method, code).await?;
        }

        Ok(challenge)
    }

    /// Verifies a code against a challenge.
    ///
    /// Expired and used challenges fail; exhausted attempts surface as
    /// `TooManyAttempts`; every other path counts as an attempt whether
    /// the code matches or not.
    pub async fn verify_challenge(
        &self,
        challenge_id: &str,
        code: &str,
    ) -> Result<bool, AuthError> {
        let Some(challenge) = self.challenges.find(challenge_id).await? else {
            return Ok(false);
        };

        if challenge.used || challenge.is_expired(Utc::now()) {
            return Ok(false);
        }
        if challenge.attempts_exhausted() {
            return Err(AuthError::TooManyAttempts);
        }
        self.challenges.record_attempt(challenge_id).await?;

        let matched = match challenge.method {
            MfaMethod::Totp => self.verify_totp(challenge.user_id, code).await?,
            MfaMethod::Sms | MfaMethod::Email => challenge
                .code_hash
                .as_deref()
                .is_some_and(|hash| hash == hash_token(code)),
        };

        if matched {
            self.challenges.mark_used(challenge_id).await?;
        } else {
            log::warn!(
                target: "palisade_mfa",
                "msg=\"challenge_code_rejected\" user_id={} method={}",
                challenge.user_id,
                challenge.method
            );
        }
        Ok(matched)
    }

    /// Checks a backup code and burns it on match.
    ///
    /// Independent of the challenge lifecycle; a backup code works even
    /// with no open challenge.
    pub async fn verify_backup_code(
        &self,
        user_id: i64,
        code: &str,
    ) -> Result<bool, AuthError> {
        let user = self.require_user(user_id).await?;
        if !user.mfa_enabled {
            return Err(AuthError::MfaNotConfigured);
        }

        let hash = hash_token(code);
        let Some(position) = user.backup_codes.iter().position(|h| *h == hash) else {
            return Ok(false);
        };

        let mut remaining = user.backup_codes;
        remaining.remove(position);
        let left = remaining.len();
        self.users
            .set_mfa(user_id, user.mfa_secret, remaining, true)
            .await?;

        log::warn!(
            target: "palisade_mfa",
            "msg=\"backup_code_used\" user_id={user_id} remaining={left}"
        );
        Ok(true)
    }

    /// Verifies a login-time second factor: a current TOTP code first,
    /// falling back to a backup code (which is burned on match).
    pub async fn verify_code(&self, user_id: i64, code: &str) -> Result<bool, AuthError> {
        if self.verify_totp(user_id, code).await? {
            return Ok(true);
        }
        self.verify_backup_code(user_id, code).await
    }

    /// Removes expired challenges. Enabled secrets are untouched; they
    /// live in the credential record.
    pub async fn sweep_expired_challenges(&self) -> Result<u64, AuthError> {
        self.challenges.sweep_expired(Utc::now()).await
    }

    async fn verify_totp(&self, user_id: i64, code: &str) -> Result<bool, AuthError> {
        let user = self.require_user(user_id).await?;
        let secret = user.mfa_secret.as_deref().ok_or(AuthError::MfaNotConfigured)?;

        match totp::verify_at(secret, code, unix_now())? {
            Some(step) => self.state.consume_step(user_id, step).await,
            None => Ok(false),
        }
    }

    async fn dispatch_code(
        &self,
        user: &UserAccount,
        method: MfaMethod,
        code: &str,
    ) -> Result<(), AuthError> {
        let timeout = self
            .config
            .dispatch_timeout
            .to_std()
            .map_err(|_| AuthError::ConfigurationError("negative dispatch timeout".to_owned()))?;

        match tokio::time::timeout(timeout, self.dispatcher.dispatch(user, method, code)).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!(
                    target: "palisade_mfa",
                    "msg=\"challenge_dispatch_timeout\" user_id={} method={method}",
                    user.id
                );
                Err(AuthError::UpstreamUnavailable)
            }
        }
    }

    async fn require_user(&self, user_id: i64) -> Result<UserAccount, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::ValidationError("unknown user".to_owned()))
    }
}

impl std::fmt::Debug for MfaService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MfaService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}
