use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::AuthError;

/// A provisioned-but-unconfirmed enrollment.
///
/// Lives outside the credential record until the user proves they can
/// produce a code; only then does the secret move to durable storage.
#[derive(Debug, Clone)]
pub struct PendingEnrollment {
    pub user_id: i64,
    pub secret: String,
    pub backup_code_hashes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Ephemeral MFA state: staged enrollments and the used-step registry
/// that makes each TOTP code single-use.
#[async_trait]
pub trait MfaStateStore: Send + Sync {
    /// Stages an enrollment, replacing any previous unconfirmed one.
    async fn stage(&self, enrollment: PendingEnrollment) -> Result<(), AuthError>;

    async fn staged(&self, user_id: i64) -> Result<Option<PendingEnrollment>, AuthError>;

    /// Removes and returns the staged enrollment.
    async fn take_staged(&self, user_id: i64) -> Result<Option<PendingEnrollment>, AuthError>;

    /// Records a successful verification at `step`. Returns `false` when
    /// the step (or a later one) was already used, i.e. a code replay.
    /// The check-and-record must be atomic.
    async fn consume_step(&self, user_id: i64, step: u64) -> Result<bool, AuthError>;

    /// Drops all state for the user, e.g. on MFA disable.
    async fn clear(&self, user_id: i64) -> Result<(), AuthError>;
}

fn lock_poisoned() -> AuthError {
    AuthError::StorageError("lock poisoned".to_owned())
}

/// In-memory MFA state for single-instance deployments.
#[derive(Debug, Default)]
pub struct InMemoryMfaStateStore {
    staged: Arc<RwLock<HashMap<i64, PendingEnrollment>>>,
    last_step: Arc<RwLock<HashMap<i64, u64>>>,
}

impl InMemoryMfaStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MfaStateStore for InMemoryMfaStateStore {
    async fn stage(&self, enrollment: PendingEnrollment) -> Result<(), AuthError> {
        let mut staged = self.staged.write().map_err(|_| lock_poisoned())?;
        staged.insert(enrollment.user_id, enrollment);
        Ok(())
    }

    async fn staged(&self, user_id: i64) -> Result<Option<PendingEnrollment>, AuthError> {
        let staged = self.staged.read().map_err(|_| lock_poisoned())?;
        Ok(staged.get(&user_id).cloned())
    }

    async fn take_staged(&self, user_id: i64) -> Result<Option<PendingEnrollment>, AuthError> {
        let mut staged = self.staged.write().map_err(|_| lock_poisoned())?;
        Ok(staged.remove(&user_id))
    }

    async fn consume_step(&self, user_id: i64, step: u64) -> Result<bool, AuthError> {
        let mut last_step = self.last_step.write().map_err(|_| lock_poisoned())?;
        match last_step.get(&user_id) {
            Some(&used) if used >= step => Ok(false),
            _ => {
                last_step.insert(user_id, step);
                Ok(true)
            }
        }
    }

    async fn clear(&self, user_id: i64) -> Result<(), AuthError> {
        let mut staged = self.staged.write().map_err(|_| lock_poisoned())?;
        staged.remove(&user_id);
        drop(staged);

        let mut last_step = self.last_step.write().map_err(|_| lock_poisoned())?;
        last_step.remove(&user_id);
        Ok(())
    }
}
