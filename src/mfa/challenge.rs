use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MfaConfig;
use crate::AuthError;

/// How a second factor is verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MfaMethod {
    Totp,
    Sms,
    Email,
}

impl MfaMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Totp => "totp",
            Self::Sms => "sms",
            Self::Email => "email",
        }
    }

    /// Challenge lifetime; slower delivery channels get longer windows.
    pub fn challenge_ttl(&self, config: &MfaConfig) -> Duration {
        match self {
            Self::Totp => config.totp_challenge_ttl,
            Self::Sms => config.sms_challenge_ttl,
            Self::Email => config.email_challenge_ttl,
        }
    }
}

impl std::fmt::Display for MfaMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pending second-factor verification.
///
/// TOTP challenges carry no server code (the client's authenticator
/// produces it); SMS and email challenges store the hash of the code that
/// was dispatched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MfaChallenge {
    pub id: String,
    pub user_id: i64,
    pub method: MfaMethod,
    #[serde(skip_serializing)]
    pub code_hash: Option<String>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub used: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl MfaChallenge {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn attempts_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

/// Storage for pending challenges.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    async fn insert(&self, challenge: MfaChallenge) -> Result<(), AuthError>;

    async fn find(&self, challenge_id: &str) -> Result<Option<MfaChallenge>, AuthError>;

    /// Increments the attempt counter and returns the updated challenge.
    async fn record_attempt(&self, challenge_id: &str)
        -> Result<Option<MfaChallenge>, AuthError>;

    async fn mark_used(&self, challenge_id: &str) -> Result<(), AuthError>;

    /// Removes challenges past expiry. Returns the count.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError>;
}

fn lock_poisoned() -> AuthError {
    AuthError::StorageError("lock poisoned".to_owned())
}

/// In-memory challenge store for single-instance deployments.
#[derive(Debug, Default)]
pub struct InMemoryChallengeStore {
    challenges: Arc<RwLock<HashMap<String, MfaChallenge>>>,
}

impl InMemoryChallengeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChallengeStore for InMemoryChallengeStore {
    async fn insert(&self, challenge: MfaChallenge) -> Result<(), AuthError> {
        let mut challenges = self.challenges.write().map_err(|_| lock_poisoned())?;
        challenges.insert(challenge.id.clone(), challenge);
        Ok(())
    }

    async fn find(&self, challenge_id: &str) -> Result<Option<MfaChallenge>, AuthError> {
        let challenges = self.challenges.read().map_err(|_| lock_poisoned())?;
        Ok(challenges.get(challenge_id).cloned())
    }

    async fn record_attempt(
        &self,
        challenge_id: &str,
    ) -> Result<Option<MfaChallenge>, AuthError> {
        let mut challenges = self.challenges.write().map_err(|_| lock_poisoned())?;
        Ok(challenges.get_mut(challenge_id).map(|challenge| {
            challenge.attempts += 1;
            challenge.clone()
        }))
    }

    async fn mark_used(&self, challenge_id: &str) -> Result<(), AuthError> {
        let mut challenges = self.challenges.write().map_err(|_| lock_poisoned())?;
        if let Some(challenge) = challenges.get_mut(challenge_id) {
            challenge.used = true;
        }
        Ok(())
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let mut challenges = self.challenges.write().map_err(|_| lock_poisoned())?;
        let before = challenges.len();
        challenges.retain(|_, challenge| !challenge.is_expired(now));
        Ok(before.saturating_sub(challenges.len()) as u64)
    }
}
