use std::fmt;

use chrono::Duration;

use crate::AuthError;

/// Minimum required length for signing secrets in bytes.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Configuration for token signing and lifetimes.
///
/// Access and refresh tokens are signed with distinct secrets so a leaked
/// access-side secret cannot mint refresh tokens.
#[derive(Clone)]
pub struct TokenConfig {
    pub(crate) access_secret: String,
    pub(crate) refresh_secret: String,
    /// Access token lifetime. Default: 15 minutes.
    pub(crate) access_expiry: Duration,
    /// Standard refresh token lifetime. Default: 7 days.
    pub(crate) refresh_expiry: Duration,
    /// Remember-me refresh token lifetime. Default: 30 days.
    pub(crate) extended_refresh_expiry: Duration,
    pub(crate) issuer: Option<String>,
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_secret", &"[REDACTED]")
            .field("refresh_secret", &"[REDACTED]")
            .field("access_expiry", &self.access_expiry)
            .field("refresh_expiry", &self.refresh_expiry)
            .field("extended_refresh_expiry", &self.extended_refresh_expiry)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl TokenConfig {
    /// Creates a token configuration from two distinct signing secrets.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if either secret is shorter than 32
    /// bytes, or if the two secrets are identical.
    pub fn new(
        access_secret: impl Into<String>,
        refresh_secret: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let access_secret = access_secret.into();
        let refresh_secret = refresh_secret.into();

        for (name, secret) in [("access", &access_secret), ("refresh", &refresh_secret)] {
            if secret.len() < MIN_SECRET_LENGTH {
                return Err(AuthError::ConfigurationError(format!(
                    "{name} secret must be at least {MIN_SECRET_LENGTH} bytes, got {}",
                    secret.len()
                )));
            }
        }
        if access_secret == refresh_secret {
            return Err(AuthError::ConfigurationError(
                "access and refresh secrets must differ".to_owned(),
            ));
        }

        Ok(Self {
            access_secret,
            refresh_secret,
            access_expiry: Duration::minutes(15),
            refresh_expiry: Duration::days(7),
            extended_refresh_expiry: Duration::days(30),
            issuer: None,
        })
    }

    /// Sets the access token lifetime.
    #[must_use]
    pub fn with_access_expiry(mut self, expiry: Duration) -> Self {
        self.access_expiry = expiry;
        self
    }

    /// Sets the standard refresh token lifetime.
    #[must_use]
    pub fn with_refresh_expiry(mut self, expiry: Duration) -> Self {
        self.refresh_expiry = expiry;
        self
    }

    /// Sets the remember-me refresh token lifetime.
    #[must_use]
    pub fn with_extended_refresh_expiry(mut self, expiry: Duration) -> Self {
        self.extended_refresh_expiry = expiry;
        self
    }

    /// Sets the issuer claim.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn access_expiry(&self) -> Duration {
        self.access_expiry
    }

    pub fn refresh_expiry(&self) -> Duration {
        self.refresh_expiry
    }

    pub fn extended_refresh_expiry(&self) -> Duration {
        self.extended_refresh_expiry
    }
}
