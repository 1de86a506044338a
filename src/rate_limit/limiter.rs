use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::limit::{ClientIdentity, Limit};
use super::store::RateLimitStore;
use crate::AuthError;

/// The outcome of a rate-limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed {
        /// Attempts left in the current window, after this one.
        remaining: u32,
        reset_at: DateTime<Utc>,
    },
    Blocked {
        /// Seconds until the client may retry.
        retry_after: i64,
    },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Checks client identities against named limit profiles.
///
/// Every check counts as an attempt; callers that want failed-attempts-only
/// accounting call `clear` on success.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    limits: HashMap<String, Limit>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>) -> Self {
        Self {
            store,
            limits: HashMap::new(),
        }
    }

    /// Registers the built-in login, password-reset, and registration
    /// profiles.
    #[must_use]
    pub fn with_default_limits(self) -> Self {
        self.with_limit("login", Limit::login())
            .with_limit("password_reset", Limit::password_reset())
            .with_limit("registration", Limit::registration())
    }

    #[must_use]
    pub fn with_limit(mut self, name: impl Into<String>, limit: Limit) -> Self {
        self.limits.insert(name.into(), limit);
        self
    }

    /// Counts one attempt against the named limit and decides.
    ///
    /// An unregistered limit name is a wiring mistake and surfaces as a
    /// configuration error rather than an open gate.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self, identity), fields(limit = name))
    )]
    pub async fn check(
        &self,
        name: &str,
        identity: &ClientIdentity,
    ) -> Result<RateLimitDecision, AuthError> {
        let limit = self.limits.get(name).ok_or_else(|| {
            AuthError::ConfigurationError(format!("unknown rate limit '{name}'"))
        })?;

        let key = Self::store_key(name, identity);
        let entry = self
            .store
            .record_attempt(&key, limit.max_attempts, limit.window, limit.block)
            .await?;

        let now = Utc::now();
        if entry.is_blocked(now) || entry.attempts > limit.max_attempts {
            let retry_after = entry.retry_after(now).max(1);
            log::warn!(
                target: "palisade_rate_limit",
                "msg=\"rate_limited\" limit={name} retry_after={retry_after}"
            );
            return Ok(RateLimitDecision::Blocked { retry_after });
        }

        Ok(RateLimitDecision::Allowed {
            remaining: limit.max_attempts - entry.attempts,
            reset_at: entry.reset_at,
        })
    }

    /// Forgets the client's counter for the named limit, e.g. after a
    /// successful login.
    pub async fn clear(&self, name: &str, identity: &ClientIdentity) -> Result<(), AuthError> {
        self.store.reset(&Self::store_key(name, identity)).await
    }

    /// Reclaims elapsed counters across all limits.
    pub async fn sweep(&self) -> Result<u64, AuthError> {
        self.store.sweep().await
    }

    fn store_key(name: &str, identity: &ClientIdentity) -> String {
        format!("{name}:{}", identity.key())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("limits", &self.limits.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
