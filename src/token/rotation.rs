use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::AuthError;

/// Registry of refresh token ids that have already been exchanged.
///
/// Rotation makes every refresh token single-use: exchanging it records its
/// `jti` here, and a replay of the same token fails verification. Entries
/// only need to live as long as the token itself, so implementations may
/// drop them once the recorded expiry passes.
#[async_trait]
pub trait RefreshRotationStore: Send + Sync {
    /// Records the jti as consumed. Returns `false` if it was already
    /// consumed (a replay). The check-and-insert must be atomic.
    async fn consume(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<bool, AuthError>;

    /// Removes entries whose token expiry has passed. Returns the count.
    async fn sweep(&self) -> Result<u64, AuthError>;
}

/// In-memory rotation registry for single-instance deployments.
#[derive(Clone, Default)]
pub struct InMemoryRotationStore {
    consumed: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
}

impl InMemoryRotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.consumed.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RefreshRotationStore for InMemoryRotationStore {
    async fn consume(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<bool, AuthError> {
        let mut consumed = self
            .consumed
            .write()
            .map_err(|_| AuthError::StorageError("lock poisoned".to_owned()))?;

        if consumed.contains_key(jti) {
            return Ok(false);
        }
        consumed.insert(jti.to_owned(), expires_at);
        Ok(true)
    }

    async fn sweep(&self) -> Result<u64, AuthError> {
        let mut consumed = self
            .consumed
            .write()
            .map_err(|_| AuthError::StorageError("lock poisoned".to_owned()))?;

        let now = Utc::now();
        let before = consumed.len();
        consumed.retain(|_, expires_at| *expires_at > now);
        Ok(before.saturating_sub(consumed.len()) as u64)
    }
}
