#![allow(dead_code)]

use std::sync::Arc;

use palisade::config::AuthConfig;
use palisade::crypto::Argon2Hasher;
use palisade::flows::{
    ForgotPasswordFlow, LoginFlow, LoginRequest, LogoutFlow, RefreshFlow, RegisterFlow,
    RegisterRequest, ResetPasswordFlow, TwoFactorFlow, VerifyEmailFlow,
};
use palisade::mfa::{InMemoryChallengeStore, InMemoryMfaStateStore, MfaService, NullDispatcher};
use palisade::rate_limit::{ClientIdentity, InMemoryRateLimitStore, RateLimiter};
use palisade::repository::{
    InMemoryEmailVerificationRepository, InMemoryOrganizationRepository,
    InMemoryPasswordResetRepository, InMemoryUserRepository,
};
use palisade::session::{DeviceInfo, InMemorySessionRepository, Location, SessionManager};
use palisade::token::{InMemoryRotationStore, TokenConfig, TokenService};

pub const ACCESS_SECRET: &str = "access-secret-32-bytes-long-ok-1";
pub const REFRESH_SECRET: &str = "refresh-secret-32-bytes-long-ok1";
pub const PASSWORD: &str = "correct horse battery staple";

/// A full in-memory deployment of the library.
pub struct Stack {
    pub users: Arc<InMemoryUserRepository>,
    pub organizations: Arc<InMemoryOrganizationRepository>,
    pub resets: Arc<InMemoryPasswordResetRepository>,
    pub verifications: Arc<InMemoryEmailVerificationRepository>,
    pub hasher: Arc<Argon2Hasher>,
    pub sessions: SessionManager,
    pub mfa: MfaService,
    pub limiter: RateLimiter,
    pub config: AuthConfig,
}

impl Stack {
    pub fn new(config: AuthConfig) -> Self {
        let users = Arc::new(InMemoryUserRepository::new());
        let organizations = Arc::new(InMemoryOrganizationRepository::new());
        let resets = Arc::new(InMemoryPasswordResetRepository::new());
        let verifications = Arc::new(InMemoryEmailVerificationRepository::new());
        let hasher = Arc::new(Argon2Hasher::default());

        let token_config = TokenConfig::new(ACCESS_SECRET, REFRESH_SECRET).unwrap();
        let tokens = TokenService::new(token_config, Arc::new(InMemoryRotationStore::new()));
        let sessions = SessionManager::new(
            Arc::new(InMemorySessionRepository::new()),
            tokens,
            config.session.clone(),
        );
        let mfa = MfaService::new(
            users.clone(),
            Arc::new(InMemoryMfaStateStore::new()),
            Arc::new(InMemoryChallengeStore::new()),
            Arc::new(NullDispatcher),
            config.mfa.clone(),
        );
        let limiter =
            RateLimiter::new(Arc::new(InMemoryRateLimitStore::new())).with_default_limits();

        Self {
            users,
            organizations,
            resets,
            verifications,
            hasher,
            sessions,
            mfa,
            limiter,
            config,
        }
    }

    pub fn login_flow(&self) -> LoginFlow {
        LoginFlow::new(
            self.users.clone(),
            self.hasher.clone(),
            self.sessions.clone(),
            self.mfa.clone(),
            self.limiter.clone(),
            self.config.clone(),
        )
    }

    pub fn register_flow(&self) -> RegisterFlow {
        RegisterFlow::new(
            self.users.clone(),
            self.organizations.clone(),
            self.verifications.clone(),
            self.hasher.clone(),
            self.sessions.clone(),
            self.limiter.clone(),
            self.config.clone(),
        )
    }

    pub fn refresh_flow(&self) -> RefreshFlow {
        RefreshFlow::new(self.sessions.clone())
    }

    pub fn logout_flow(&self) -> LogoutFlow {
        LogoutFlow::new(self.sessions.clone())
    }

    pub fn forgot_password_flow(&self) -> ForgotPasswordFlow {
        ForgotPasswordFlow::new(
            self.users.clone(),
            self.resets.clone(),
            self.limiter.clone(),
            self.config.clone(),
        )
    }

    pub fn reset_password_flow(&self) -> ResetPasswordFlow {
        ResetPasswordFlow::new(
            self.users.clone(),
            self.resets.clone(),
            self.hasher.clone(),
            self.sessions.clone(),
            self.config.clone(),
        )
    }

    pub fn verify_email_flow(&self) -> VerifyEmailFlow {
        VerifyEmailFlow::new(
            self.users.clone(),
            self.verifications.clone(),
            self.config.clone(),
        )
    }

    pub fn two_factor_flow(&self) -> TwoFactorFlow {
        TwoFactorFlow::new(self.users.clone(), self.hasher.clone(), self.mfa.clone())
    }
}

pub fn device() -> DeviceInfo {
    DeviceInfo::new("web", "Firefox", "Linux", "desktop")
}

pub fn location() -> Location {
    Location::new("203.0.113.9").with_geo("US", "Portland")
}

pub fn client() -> ClientIdentity {
    ClientIdentity::new("203.0.113.9", "Mozilla/5.0")
}

pub fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_owned(),
        password: PASSWORD.to_owned(),
        first_name: "Ada".to_owned(),
        last_name: "Lovelace".to_owned(),
        organization_slug: None,
        device: device(),
        location: location(),
        client: client(),
    }
}

pub fn login_request(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: email.to_owned(),
        password: password.to_owned(),
        two_factor_code: None,
        remember_me: false,
        device: device(),
        location: location(),
        client: client(),
    }
}

/// A current code for a base32 TOTP secret, offset by `steps` from now.
pub fn totp_code(secret: &str, steps: i64) -> String {
    use totp_rs::{Algorithm, Secret, TOTP};
    let bytes = Secret::Encoded(secret.to_owned()).to_bytes().unwrap();
    let at = (chrono::Utc::now().timestamp() + steps * 30).max(0) as u64;
    TOTP::new(Algorithm::SHA1, 6, 1, 30, bytes, None, "account".to_owned())
        .unwrap()
        .generate(at)
}
