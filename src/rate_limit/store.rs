use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::AuthError;

/// A counter entry for one identity within one limit.
#[derive(Debug, Clone)]
pub struct RateLimitEntry {
    pub attempts: u32,
    pub reset_at: DateTime<Utc>,
    pub blocked_until: Option<DateTime<Utc>>,
}

impl RateLimitEntry {
    pub fn is_blocked(&self, now: DateTime<Utc>) -> bool {
        self.blocked_until.is_some_and(|until| until > now)
    }

    /// Seconds until the block lifts (0 when not blocked).
    pub fn retry_after(&self, now: DateTime<Utc>) -> i64 {
        self.blocked_until
            .map_or(0, |until| (until - now).num_seconds().max(0))
    }

    /// An entry is reclaimable when its window and any block have elapsed.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.reset_at <= now && !self.is_blocked(now)
    }
}

/// Storage for rate-limit counters; implement for a shared cache in
/// multi-instance deployments.
///
/// `record_attempt` is the whole read-modify-write unit: increment, compare
/// against the budget, and possibly escalate to a block, atomically. A race
/// that double-counts or misses a block is a correctness bug.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Registers one attempt and returns the entry state after it.
    ///
    /// While a block is active the entry is returned unchanged: blocked
    /// clients must not advance the counter by hammering.
    async fn record_attempt(
        &self,
        key: &str,
        max_attempts: u32,
        window: Duration,
        block: Duration,
    ) -> Result<RateLimitEntry, AuthError>;

    async fn get(&self, key: &str) -> Result<Option<RateLimitEntry>, AuthError>;

    async fn reset(&self, key: &str) -> Result<(), AuthError>;

    /// Removes entries whose window and block have both elapsed.
    async fn sweep(&self) -> Result<u64, AuthError>;
}

/// In-memory counter store for single-instance deployments.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    entries: Arc<RwLock<HashMap<String, RateLimitEntry>>>,
}

impl InMemoryRateLimitStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn record_attempt(
        &self,
        key: &str,
        max_attempts: u32,
        window: Duration,
        block: Duration,
    ) -> Result<RateLimitEntry, AuthError> {
        let now = Utc::now();
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AuthError::StorageError("lock poisoned".to_owned()))?;

        let entry = entries
            .entry(key.to_owned())
            .and_modify(|entry| {
                if entry.is_blocked(now) {
                    // Deny without counting; nothing changes until the
                    // block lifts.
                } else if entry.reset_at <= now {
                    // Window elapsed without a block: lazy reset.
                    entry.attempts = 1;
                    entry.reset_at = now + window;
                    entry.blocked_until = None;
                } else {
                    entry.attempts += 1;
                    if entry.attempts > max_attempts {
                        entry.blocked_until = Some(now + block);
                    }
                }
            })
            .or_insert_with(|| RateLimitEntry {
                attempts: 1,
                reset_at: now + window,
                blocked_until: None,
            });

        Ok(entry.clone())
    }

    async fn get(&self, key: &str) -> Result<Option<RateLimitEntry>, AuthError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AuthError::StorageError("lock poisoned".to_owned()))?;
        Ok(entries.get(key).cloned())
    }

    async fn reset(&self, key: &str) -> Result<(), AuthError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AuthError::StorageError("lock poisoned".to_owned()))?;
        entries.remove(key);
        Ok(())
    }

    async fn sweep(&self) -> Result<u64, AuthError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AuthError::StorageError("lock poisoned".to_owned()))?;

        let now = Utc::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_stale(now));
        Ok(before.saturating_sub(entries.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_within_window() {
        let store = InMemoryRateLimitStore::new();
        let window = Duration::minutes(15);
        let block = Duration::minutes(30);

        for expected in 1..=3 {
            let entry = store
                .record_attempt("k", 5, window, block)
                .await
                .unwrap();
            assert_eq!(entry.attempts, expected);
            assert!(!entry.is_blocked(Utc::now()));
        }
    }

    #[tokio::test]
    async fn test_exceeding_budget_escalates_to_block() {
        let store = InMemoryRateLimitStore::new();
        let window = Duration::minutes(15);
        let block = Duration::minutes(30);

        for _ in 0..2 {
            store.record_attempt("k", 2, window, block).await.unwrap();
        }
        let entry = store.record_attempt("k", 2, window, block).await.unwrap();
        assert!(entry.is_blocked(Utc::now()));
        // retry_after reflects the block duration, not the window.
        assert!(entry.retry_after(Utc::now()) > 15 * 60);
    }

    #[tokio::test]
    async fn test_blocked_entry_does_not_keep_counting() {
        let store = InMemoryRateLimitStore::new();
        let window = Duration::minutes(15);
        let block = Duration::minutes(30);

        for _ in 0..3 {
            store.record_attempt("k", 2, window, block).await.unwrap();
        }
        let blocked = store.record_attempt("k", 2, window, block).await.unwrap();
        let again = store.record_attempt("k", 2, window, block).await.unwrap();
        assert_eq!(blocked.attempts, again.attempts);
        assert_eq!(blocked.blocked_until, again.blocked_until);
    }

    #[tokio::test]
    async fn test_expired_window_resets_lazily() {
        let store = InMemoryRateLimitStore::new();
        // A zero-length window expires immediately; no block triggered.
        let window = Duration::zero();
        let block = Duration::minutes(30);

        store.record_attempt("k", 5, window, block).await.unwrap();
        let entry = store.record_attempt("k", 5, window, block).await.unwrap();
        assert_eq!(entry.attempts, 1);
    }

    #[tokio::test]
    async fn test_sweep_keeps_blocked_entries() {
        let store = InMemoryRateLimitStore::new();

        // Stale: window elapsed, never blocked.
        store
            .record_attempt("stale", 5, Duration::zero(), Duration::zero())
            .await
            .unwrap();

        // Blocked: short window, block far outlives it.
        for _ in 0..2 {
            store
                .record_attempt("blocked", 1, Duration::milliseconds(50), Duration::hours(1))
                .await
                .unwrap();
        }
        tokio::time::sleep(std::time::Duration::from_millis(60)).await;

        let removed = store.sweep().await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get("stale").await.unwrap().is_none());
        assert!(store.get("blocked").await.unwrap().is_some());
    }
}
