use std::sync::Arc;

use chrono::Utc;

use super::retry::with_retry;
use super::AuthenticatedSession;
use crate::config::AuthConfig;
use crate::crypto::{generate_token, hash_token, PasswordHasher, DEFAULT_TOKEN_LENGTH};
use crate::rate_limit::{ClientIdentity, RateLimitDecision, RateLimiter};
use crate::repository::{
    AccountStatus, EmailVerificationRepository, NewUser, Organization, OrganizationRepository,
    UserRepository,
};
use crate::session::{DeviceInfo, Location, SessionManager, SessionMetadata};
use crate::token::TokenSubject;
use crate::validators::{validate_email, validate_name, validate_password};
use crate::AuthError;

/// A self-serve registration.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    /// Join an existing organization by slug; `None` creates a personal
    /// one.
    pub organization_slug: Option<String>,
    pub device: DeviceInfo,
    pub location: Location,
    pub client: ClientIdentity,
}

/// Typed result of a registration.
#[derive(Debug, Clone)]
pub enum RegisterOutcome {
    Registered {
        user: crate::repository::PublicProfile,
        /// Plaintext email-verification token for the caller to deliver;
        /// only its hash is stored.
        verification_token: String,
        /// Withheld (`None`) while email verification gates token
        /// issuance.
        session: Option<AuthenticatedSession>,
    },
    RateLimited {
        retry_after: i64,
    },
}

/// Creates accounts: validation, organization resolution, password
/// hashing, and (configuration permitting) immediate token issuance.
#[derive(Clone)]
pub struct RegisterFlow {
    users: Arc<dyn UserRepository>,
    organizations: Arc<dyn OrganizationRepository>,
    verifications: Arc<dyn EmailVerificationRepository>,
    hasher: Arc<dyn PasswordHasher>,
    sessions: SessionManager,
    limiter: RateLimiter,
    config: AuthConfig,
}

impl RegisterFlow {
    pub fn new(
        users: Arc<dyn UserRepository>,
        organizations: Arc<dyn OrganizationRepository>,
        verifications: Arc<dyn EmailVerificationRepository>,
        hasher: Arc<dyn PasswordHasher>,
        sessions: SessionManager,
        limiter: RateLimiter,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            organizations,
            verifications,
            hasher,
            sessions,
            limiter,
            config,
        }
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(email = %request.email))
    )]
    pub async fn execute(&self, request: RegisterRequest) -> Result<RegisterOutcome, AuthError> {
        if let RateLimitDecision::Blocked { retry_after } =
            self.limiter.check("registration", &request.client).await?
        {
            return Ok(RegisterOutcome::RateLimited { retry_after });
        }

        validate_email(&request.email)?;
        validate_password(&request.password)?;
        validate_name(&request.first_name)?;
        validate_name(&request.last_name)?;

        let organization = self.resolve_organization(&request).await?;
        let hashed_password = self.hasher.hash(&request.password)?;

        let status = if self.config.registration.require_email_verification {
            AccountStatus::PendingVerification
        } else {
            AccountStatus::Active
        };
        let new_user = NewUser {
            email: request.email.to_lowercase(),
            hashed_password,
            first_name: request.first_name.trim().to_owned(),
            last_name: request.last_name.trim().to_owned(),
            role: self.config.registration.default_role,
            status,
            organization_id: Some(organization.id),
        };
        let user = with_retry(self.config.store_timeout, self.config.retry_backoff, || {
            self.users.create(new_user.clone())
        })
        .await?;

        let verification_token = self.issue_verification_token(user.id).await?;

        let session = if status == AccountStatus::Active {
            let subject = TokenSubject {
                user_id: user.id,
                email: user.email.clone(),
                role: user.role,
                organization_id: user.organization_id,
            };
            let established = self
                .sessions
                .create_session(
                    &subject,
                    request.device,
                    request.location,
                    SessionMetadata::password_login(false, false),
                )
                .await?;
            Some(AuthenticatedSession {
                user: user.profile(),
                tokens: established.tokens,
                session_id: established.session.id,
                session_token: established.session_token,
            })
        } else {
            None
        };

        log::info!(
            target: "palisade_flows",
            "msg=\"user_registered\" user_id={} org_id={} pending_verification={}",
            user.id,
            organization.id,
            session.is_none()
        );

        Ok(RegisterOutcome::Registered {
            user: user.profile(),
            verification_token,
            session,
        })
    }

    /// Joins the named organization or creates a personal one.
    ///
    /// An unknown slug is a hard error; silently creating an organization
    /// the user expected to join would strand the account.
    async fn resolve_organization(
        &self,
        request: &RegisterRequest,
    ) -> Result<Organization, AuthError> {
        if let Some(ref slug) = request.organization_slug {
            return self
                .organizations
                .find_by_slug(slug)
                .await?
                .ok_or(AuthError::OrganizationNotFound);
        }

        let name = format!(
            "{} {}'s Organization",
            request.first_name.trim(),
            request.last_name.trim()
        );
        let slug = format!(
            "{}-{}-{}",
            request.first_name.trim().to_lowercase(),
            request.last_name.trim().to_lowercase(),
            Utc::now().timestamp()
        );
        self.organizations.create(&name, &slug).await
    }

    async fn issue_verification_token(&self, user_id: i64) -> Result<String, AuthError> {
        let token = generate_token(DEFAULT_TOKEN_LENGTH);
        let expires_at = Utc::now() + self.config.registration.email_verification_expiry;
        self.verifications
            .create(user_id, &hash_token(&token), expires_at)
            .await?;
        Ok(token)
    }
}
