//! Palisade is an embeddable identity and session security core.
//!
//! It covers credential verification, access/refresh token issuance with
//! mandatory rotation, TOTP-based multi-factor authentication, multi-device
//! session tracking with suspicious-activity summaries, attempt rate
//! limiting, and role/permission evaluation.
//!
//! Storage is abstracted behind repository traits. In-memory implementations
//! are provided for single-instance deployments and tests; implement the
//! traits to plug in your own database or cache.

pub mod authz;
pub mod config;
pub mod crypto;
pub mod flows;
pub mod mfa;
pub mod rate_limit;
pub mod repository;
pub mod session;
pub mod token;
pub mod validators;

use std::fmt;

pub use authz::{PermissionEvaluator, Role};
pub use config::AuthConfig;
pub use flows::{LoginFlow, LoginOutcome, RefreshFlow, RegisterFlow};
pub use mfa::MfaService;
pub use rate_limit::RateLimiter;
pub use repository::{AccountStatus, UserAccount, UserRepository};
pub use session::SessionManager;
pub use token::{TokenPair, TokenService};

/// Errors produced by the authentication core.
///
/// Credential and token failures are deliberately coarse: callers must not be
/// able to distinguish "no such email" from "wrong password", or a forged
/// token from an expired one. Finer detail is logged server-side only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong password.
    InvalidCredentials,
    /// The account has been administratively suspended.
    AccountSuspended,
    /// The account has been deactivated.
    AccountInactive,
    /// The account exists but the email address is not verified yet.
    EmailVerificationRequired,
    /// The account has MFA enabled and no code was given.
    TwoFactorRequired,
    /// The supplied TOTP or backup code did not verify.
    InvalidTwoFactor,
    /// Malformed, expired, forged, or already-rotated token.
    TokenInvalid,
    /// The client exceeded a rate-limit window and is blocked.
    TooManyAttempts,
    /// Role, permission, or organization-scope check failed.
    Forbidden,
    /// The credential store or an outbound dispatch timed out; retryable.
    UpstreamUnavailable,
    /// Malformed input (email syntax, weak password, bad name).
    ValidationError(String),
    /// An account with this email already exists.
    UserAlreadyExists,
    /// The referenced organization slug does not exist.
    OrganizationNotFound,
    /// MFA operation on an account that never completed setup.
    MfaNotConfigured,
    /// Password hashing or hash parsing failed.
    PasswordHashError,
    /// The library was constructed with invalid settings.
    ConfigurationError(String),
    /// The backing store reported a failure.
    StorageError(String),
}

impl std::error::Error for AuthError {}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid email or password"),
            AuthError::AccountSuspended => write!(f, "Account is suspended"),
            AuthError::AccountInactive => write!(f, "Account is inactive"),
            AuthError::EmailVerificationRequired => write!(f, "Email verification required"),
            AuthError::TwoFactorRequired => write!(f, "Two-factor code required"),
            AuthError::InvalidTwoFactor => write!(f, "Invalid two-factor code"),
            AuthError::TokenInvalid => write!(f, "Invalid token"),
            AuthError::TooManyAttempts => write!(f, "Too many attempts, try again later"),
            AuthError::Forbidden => write!(f, "Forbidden"),
            AuthError::UpstreamUnavailable => write!(f, "Service temporarily unavailable"),
            AuthError::ValidationError(msg) => write!(f, "Validation failed: {msg}"),
            AuthError::UserAlreadyExists => write!(f, "User already exists"),
            AuthError::OrganizationNotFound => write!(f, "Organization not found"),
            AuthError::MfaNotConfigured => write!(f, "Two-factor authentication is not set up"),
            AuthError::PasswordHashError => write!(f, "Failed to process password"),
            AuthError::ConfigurationError(msg) => write!(f, "Configuration error: {msg}"),
            AuthError::StorageError(msg) => write!(f, "Storage error: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors_are_generic() {
        // The display text must not leak which check failed.
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid email or password"
        );
        assert_eq!(AuthError::TokenInvalid.to_string(), "Invalid token");
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(AuthError::TokenInvalid, AuthError::TokenInvalid);
        assert_ne!(AuthError::TokenInvalid, AuthError::InvalidCredentials);
    }
}
