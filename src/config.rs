//! Configuration for the palisade authentication core.
//!
//! Everything time-bounded in the library (token lifetimes, session expiry,
//! MFA challenge windows, store I/O timeouts) is driven from here. Use
//! `AuthConfig::default()` for sensible production defaults.

use chrono::Duration;

use crate::authz::Role;

/// Top-level configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Session lifetime and activity-log settings.
    pub session: SessionConfig,

    /// Multi-factor authentication settings.
    pub mfa: MfaConfig,

    /// Registration and password-reset behavior.
    pub registration: RegistrationConfig,

    /// Timeout applied to each credential-store call.
    ///
    /// A timed-out lookup surfaces as `UpstreamUnavailable`, never as
    /// `InvalidCredentials`.
    pub store_timeout: Duration,

    /// Backoff before the single retry of a failed store call.
    pub retry_backoff: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            mfa: MfaConfig::default(),
            registration: RegistrationConfig::default(),
            store_timeout: Duration::seconds(5),
            retry_backoff: Duration::milliseconds(100),
        }
    }
}

impl AuthConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stricter settings: shorter sessions, mandatory email verification.
    pub fn strict() -> Self {
        Self {
            session: SessionConfig {
                ttl: Duration::hours(8),
                activity_cap: 50,
            },
            registration: RegistrationConfig {
                require_email_verification: true,
                ..RegistrationConfig::default()
            },
            ..Self::default()
        }
    }
}

/// Session lifetime settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a session lives. Expiry is fixed at creation time; activity
    /// bumps the last-activity timestamp but does not extend the session.
    ///
    /// Default: 24 hours
    pub ttl: Duration,

    /// Maximum number of activity entries retained per session.
    ///
    /// Default: 100
    pub activity_cap: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(24),
            activity_cap: 100,
        }
    }
}

/// Multi-factor authentication settings.
#[derive(Debug, Clone)]
pub struct MfaConfig {
    /// Issuer shown in authenticator apps (the `otpauth://` label).
    pub issuer: String,

    /// Number of single-use backup codes generated at setup.
    ///
    /// Default: 10
    pub backup_code_count: usize,

    /// Maximum verification attempts per challenge before `TooManyAttempts`.
    ///
    /// Default: 3
    pub max_challenge_attempts: u32,

    /// Lifetime of a TOTP challenge. Default: 5 minutes.
    pub totp_challenge_ttl: Duration,

    /// Lifetime of an SMS challenge. Default: 10 minutes.
    pub sms_challenge_ttl: Duration,

    /// Lifetime of an email challenge. Default: 15 minutes.
    pub email_challenge_ttl: Duration,

    /// Timeout for the out-of-band code dispatch (SMS/email).
    pub dispatch_timeout: Duration,
}

impl Default for MfaConfig {
    fn default() -> Self {
        Self {
            issuer: "palisade".to_owned(),
            backup_code_count: 10,
            max_challenge_attempts: 3,
            totp_challenge_ttl: Duration::minutes(5),
            sms_challenge_ttl: Duration::minutes(10),
            email_challenge_ttl: Duration::minutes(15),
            dispatch_timeout: Duration::seconds(10),
        }
    }
}

/// Registration and password-reset behavior.
#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    /// When true, new accounts start as pending-verification and receive no
    /// tokens until the email is verified.
    ///
    /// Default: false
    pub require_email_verification: bool,

    /// Role assigned to self-serve registrations.
    ///
    /// Default: `Role::Student`
    pub default_role: Role,

    /// How long password reset tokens remain valid.
    ///
    /// Default: 15 minutes
    pub password_reset_expiry: Duration,

    /// How long email verification tokens remain valid.
    ///
    /// Default: 24 hours
    pub email_verification_expiry: Duration,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            require_email_verification: false,
            default_role: Role::Student,
            password_reset_expiry: Duration::minutes(15),
            email_verification_expiry: Duration::hours(24),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AuthConfig::default();

        assert_eq!(config.session.ttl, Duration::hours(24));
        assert_eq!(config.session.activity_cap, 100);
        assert_eq!(config.mfa.backup_code_count, 10);
        assert_eq!(config.mfa.max_challenge_attempts, 3);
        assert_eq!(
            config.registration.password_reset_expiry,
            Duration::minutes(15)
        );
        assert!(!config.registration.require_email_verification);
    }

    #[test]
    fn test_strict_config() {
        let config = AuthConfig::strict();

        assert_eq!(config.session.ttl, Duration::hours(8));
        assert!(config.registration.require_email_verification);
    }

    #[test]
    fn test_challenge_ttls_are_method_dependent() {
        let config = MfaConfig::default();
        assert!(config.totp_challenge_ttl < config.sms_challenge_ttl);
        assert!(config.sms_challenge_ttl < config.email_challenge_ttl);
    }
}
