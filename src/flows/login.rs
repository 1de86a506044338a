use std::sync::Arc;

use chrono::Utc;

use super::retry::with_retry;
use super::AuthenticatedSession;
use crate::config::AuthConfig;
use crate::crypto::PasswordHasher;
use crate::mfa::MfaService;
use crate::rate_limit::{ClientIdentity, RateLimitDecision, RateLimiter};
use crate::repository::{AccountStatus, UserAccount, UserRepository};
use crate::session::{DeviceInfo, Location, SessionManager, SessionMetadata};
use crate::token::TokenSubject;
use crate::AuthError;

/// Verified against when the email is unknown, so the response time does
/// not reveal whether the account exists.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$AAAAAAAAAAAAAAAAAAAAAA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// One login attempt.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub two_factor_code: Option<String>,
    pub remember_me: bool,
    pub device: DeviceInfo,
    pub location: Location,
    pub client: ClientIdentity,
}

/// Typed result of a login attempt.
///
/// Deliberately coarse: `InvalidCredentials` covers both unknown email
/// and wrong password.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Success(AuthenticatedSession),
    InvalidCredentials,
    Suspended,
    Inactive,
    EmailVerificationRequired,
    /// The account has MFA enabled; retry with a code.
    TwoFactorRequired,
    InvalidTwoFactor,
    RateLimited {
        retry_after: i64,
    },
}

/// Drives a login attempt from credential check through MFA to token
/// issuance.
#[derive(Clone)]
pub struct LoginFlow {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    sessions: SessionManager,
    mfa: MfaService,
    limiter: RateLimiter,
    config: AuthConfig,
}

impl LoginFlow {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        sessions: SessionManager,
        mfa: MfaService,
        limiter: RateLimiter,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            hasher,
            sessions,
            mfa,
            limiter,
            config,
        }
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(email = %request.email))
    )]
    pub async fn execute(&self, request: LoginRequest) -> Result<LoginOutcome, AuthError> {
        if let RateLimitDecision::Blocked { retry_after } =
            self.limiter.check("login", &request.client).await?
        {
            return Ok(LoginOutcome::RateLimited { retry_after });
        }

        let email = request.email.to_lowercase();
        let user = with_retry(self.config.store_timeout, self.config.retry_backoff, || {
            self.users.find_by_email(&email)
        })
        .await?;

        let Some(user) = user else {
            // Burn comparable work for unknown emails.
            let _ = self.hasher.verify(&request.password, DUMMY_HASH);
            log::info!(target: "palisade_flows", "msg=\"login_failed\" reason=unknown_email");
            return Ok(LoginOutcome::InvalidCredentials);
        };

        if !self.hasher.verify(&request.password, &user.hashed_password)? {
            log::info!(
                target: "palisade_flows",
                "msg=\"login_failed\" reason=bad_password user_id={}",
                user.id
            );
            return Ok(LoginOutcome::InvalidCredentials);
        }

        if let Some(outcome) = self.check_account_gate(&user) {
            return Ok(outcome);
        }

        let mfa_verified = if user.mfa_enabled {
            let Some(code) = request.two_factor_code.as_deref() else {
                return Ok(LoginOutcome::TwoFactorRequired);
            };
            if !self.mfa.verify_code(user.id, code).await? {
                log::warn!(
                    target: "palisade_flows",
                    "msg=\"login_failed\" reason=bad_two_factor user_id={}",
                    user.id
                );
                return Ok(LoginOutcome::InvalidTwoFactor);
            }
            true
        } else {
            false
        };

        let subject = TokenSubject {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            organization_id: user.organization_id,
        };
        let metadata = SessionMetadata::password_login(mfa_verified, request.remember_me);
        let established = self
            .sessions
            .create_session(&subject, request.device, request.location, metadata)
            .await?;

        with_retry(self.config.store_timeout, self.config.retry_backoff, || {
            self.users.record_login(user.id, Utc::now())
        })
        .await?;
        self.limiter.clear("login", &request.client).await?;

        log::info!(
            target: "palisade_flows",
            "msg=\"login_succeeded\" user_id={} session_id={}",
            user.id,
            established.session.id
        );

        Ok(LoginOutcome::Success(AuthenticatedSession {
            user: user.profile(),
            tokens: established.tokens,
            session_id: established.session.id,
            session_token: established.session_token,
        }))
    }

    fn check_account_gate(&self, user: &UserAccount) -> Option<LoginOutcome> {
        match user.status {
            AccountStatus::Suspended => Some(LoginOutcome::Suspended),
            AccountStatus::Inactive => Some(LoginOutcome::Inactive),
            AccountStatus::PendingVerification => Some(LoginOutcome::EmailVerificationRequired),
            AccountStatus::Active => {
                if self.config.registration.require_email_verification
                    && !user.is_email_verified()
                {
                    Some(LoginOutcome::EmailVerificationRequired)
                } else {
                    None
                }
            }
        }
    }
}
