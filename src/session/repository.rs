use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::session::{Session, SessionActivity};
use crate::AuthError;

/// Storage for session records.
///
/// Sessions are mutated on every authenticated request, so implementations
/// must keep each read-modify-write (activity bump, activity append,
/// deactivation) atomic.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert(&self, session: Session) -> Result<(), AuthError>;

    async fn find(&self, session_id: &str) -> Result<Option<Session>, AuthError>;

    /// Bumps the last-activity timestamp. Informational; does not extend
    /// expiry.
    async fn touch(&self, session_id: &str, now: DateTime<Utc>) -> Result<(), AuthError>;

    async fn deactivate(&self, session_id: &str) -> Result<(), AuthError>;

    /// Deactivates every active session of a user, optionally sparing one.
    /// Returns the number deactivated.
    async fn deactivate_for_user(
        &self,
        user_id: i64,
        except: Option<&str>,
    ) -> Result<u64, AuthError>;

    /// All sessions of a user, active and not, newest first.
    async fn for_user(&self, user_id: i64) -> Result<Vec<Session>, AuthError>;

    /// Appends an activity entry, discarding the oldest beyond `cap`.
    async fn append_activity(
        &self,
        session_id: &str,
        activity: SessionActivity,
        cap: usize,
    ) -> Result<(), AuthError>;

    /// Deactivates sessions past their expiry. Returns the count.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError>;
}

fn lock_poisoned() -> AuthError {
    AuthError::StorageError("lock poisoned".to_owned())
}

/// In-memory session store for single-instance deployments.
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl InMemorySessionRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert(&self, session: Session) -> Result<(), AuthError> {
        let mut sessions = self.sessions.write().map_err(|_| lock_poisoned())?;
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn find(&self, session_id: &str) -> Result<Option<Session>, AuthError> {
        let sessions = self.sessions.read().map_err(|_| lock_poisoned())?;
        Ok(sessions.get(session_id).cloned())
    }

    async fn touch(&self, session_id: &str, now: DateTime<Utc>) -> Result<(), AuthError> {
        let mut sessions = self.sessions.write().map_err(|_| lock_poisoned())?;
        if let Some(session) = sessions.get_mut(session_id) {
            session.last_activity_at = now;
        }
        Ok(())
    }

    async fn deactivate(&self, session_id: &str) -> Result<(), AuthError> {
        let mut sessions = self.sessions.write().map_err(|_| lock_poisoned())?;
        if let Some(session) = sessions.get_mut(session_id) {
            session.is_active = false;
        }
        Ok(())
    }

    async fn deactivate_for_user(
        &self,
        user_id: i64,
        except: Option<&str>,
    ) -> Result<u64, AuthError> {
        let mut sessions = self.sessions.write().map_err(|_| lock_poisoned())?;
        let mut count = 0;
        for session in sessions.values_mut() {
            if session.user_id == user_id
                && session.is_active
                && except != Some(session.id.as_str())
            {
                session.is_active = false;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn for_user(&self, user_id: i64) -> Result<Vec<Session>, AuthError> {
        let sessions = self.sessions.read().map_err(|_| lock_poisoned())?;
        let mut result: Vec<Session> = sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn append_activity(
        &self,
        session_id: &str,
        activity: SessionActivity,
        cap: usize,
    ) -> Result<(), AuthError> {
        let mut sessions = self.sessions.write().map_err(|_| lock_poisoned())?;
        if let Some(session) = sessions.get_mut(session_id) {
            session.activities.push(activity);
            if session.activities.len() > cap {
                let excess = session.activities.len() - cap;
                session.activities.drain(..excess);
            }
        }
        Ok(())
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let mut sessions = self.sessions.write().map_err(|_| lock_poisoned())?;
        let mut count = 0;
        for session in sessions.values_mut() {
            if session.is_active && session.is_expired(now) {
                session.is_active = false;
                count += 1;
            }
        }
        Ok(count)
    }
}
