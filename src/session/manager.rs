use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::repository::SessionRepository;
use super::session::{DeviceInfo, Location, Session, SessionActivity, SessionMetadata};
use crate::config::SessionConfig;
use crate::crypto::{generate_token, hash_token, DEFAULT_TOKEN_LENGTH};
use crate::token::{TokenPair, TokenService, TokenSubject};
use crate::AuthError;

/// Window the suspicious-activity heuristics look back over.
const RECENT_WINDOW_HOURS: i64 = 24;

/// A freshly created session with its one-time credentials.
///
/// `session_token` is the only copy of the plaintext; the store keeps a
/// hash.
#[derive(Debug, Clone)]
pub struct EstablishedSession {
    pub session: Session,
    pub session_token: String,
    pub tokens: TokenPair,
}

/// Heuristic flags surfaced for alerting, never enforcement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SuspiciousActivity {
    /// Sessions created from more than one country in the last 24 hours.
    pub multiple_locations: bool,
    /// A recent session's device fingerprint is outside the user's
    /// trusted-device set.
    pub unusual_devices: bool,
}

/// Per-user overview of session posture.
#[derive(Debug, Clone, Serialize)]
pub struct SecuritySummary {
    pub active_sessions: usize,
    pub total_sessions: usize,
    pub last_login_at: Option<DateTime<Utc>>,
    pub unique_devices: usize,
    pub unique_locations: usize,
    pub suspicious_activity: SuspiciousActivity,
}

/// Creates, validates, and retires sessions.
#[derive(Clone)]
pub struct SessionManager {
    repository: Arc<dyn SessionRepository>,
    tokens: TokenService,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(
        repository: Arc<dyn SessionRepository>,
        tokens: TokenService,
        config: SessionConfig,
    ) -> Self {
        Self {
            repository,
            tokens,
            config,
        }
    }

    pub fn token_service(&self) -> &TokenService {
        &self.tokens
    }

    /// Creates a new session and the token pair bound to it.
    ///
    /// Always a new row; concurrent logins from the same device coexist as
    /// separate sessions.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(user_id = subject.user_id))
    )]
    pub async fn create_session(
        &self,
        subject: &TokenSubject,
        device: DeviceInfo,
        location: Location,
        metadata: SessionMetadata,
    ) -> Result<EstablishedSession, AuthError> {
        let now = Utc::now();
        let session_id = generate_token(DEFAULT_TOKEN_LENGTH);
        let session_token = generate_token(DEFAULT_TOKEN_LENGTH);
        let remember_me = metadata.remember_me;

        let session = Session {
            id: session_id.clone(),
            user_id: subject.user_id,
            token_hash: hash_token(&session_token),
            fingerprint: device.fingerprint(),
            device,
            location,
            metadata,
            is_active: true,
            activities: Vec::new(),
            last_activity_at: now,
            created_at: now,
            expires_at: now + self.config.ttl,
        };

        self.repository.insert(session.clone()).await?;
        let tokens = self.tokens.issue_pair(subject, &session_id, remember_me)?;

        log::info!(
            target: "palisade_session",
            "msg=\"session_created\" user_id={} session_id={session_id}",
            subject.user_id
        );

        Ok(EstablishedSession {
            session,
            session_token,
            tokens,
        })
    }

    /// Returns the session when it is active, unexpired, and (when a token
    /// is presented) the token matches. Bumps the activity timestamp on a
    /// hit; expiry stays fixed at creation time.
    pub async fn validate_session(
        &self,
        session_id: &str,
        session_token: Option<&str>,
    ) -> Result<Option<Session>, AuthError> {
        let Some(session) = self.repository.find(session_id).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if !session.is_live(now) {
            return Ok(None);
        }
        if let Some(token) = session_token {
            if !session.token_matches(token) {
                log::warn!(
                    target: "palisade_session",
                    "msg=\"session_token_mismatch\" session_id={session_id}"
                );
                return Ok(None);
            }
        }

        self.repository.touch(session_id, now).await?;
        Ok(Some(session))
    }

    /// Appends to the session's capped activity log.
    pub async fn record_activity(
        &self,
        session_id: &str,
        action: &str,
        resource: Option<&str>,
        ip: &str,
    ) -> Result<(), AuthError> {
        let activity = SessionActivity {
            action: action.to_owned(),
            resource: resource.map(str::to_owned),
            timestamp: Utc::now(),
            ip: ip.to_owned(),
        };
        self.repository
            .append_activity(session_id, activity, self.config.activity_cap)
            .await
    }

    pub async fn invalidate_session(&self, session_id: &str) -> Result<(), AuthError> {
        self.repository.deactivate(session_id).await?;
        log::info!(
            target: "palisade_session",
            "msg=\"session_invalidated\" session_id={session_id}"
        );
        Ok(())
    }

    /// Deactivates every session of the user, optionally sparing the one
    /// performing the action (e.g. a password change from a live session).
    pub async fn invalidate_all_user_sessions(
        &self,
        user_id: i64,
        except_session_id: Option<&str>,
    ) -> Result<u64, AuthError> {
        let count = self
            .repository
            .deactivate_for_user(user_id, except_session_id)
            .await?;
        log::info!(
            target: "palisade_session",
            "msg=\"sessions_invalidated\" user_id={user_id} count={count}"
        );
        Ok(count)
    }

    pub async fn sessions_for_user(&self, user_id: i64) -> Result<Vec<Session>, AuthError> {
        self.repository.for_user(user_id).await
    }

    /// Deactivates sessions past their expiry. Run periodically; errors are
    /// the caller's to log, never to surface to request handlers.
    pub async fn sweep_expired(&self) -> Result<u64, AuthError> {
        self.repository.sweep_expired(Utc::now()).await
    }

    /// Builds the per-user security overview, including the
    /// multiple-locations and unusual-devices heuristics.
    pub async fn security_summary(&self, user_id: i64) -> Result<SecuritySummary, AuthError> {
        let sessions = self.repository.for_user(user_id).await?;
        let now = Utc::now();
        let recent_cutoff = now - Duration::hours(RECENT_WINDOW_HOURS);

        let active_sessions = sessions.iter().filter(|s| s.is_live(now)).count();
        let last_login_at = sessions.iter().map(|s| s.created_at).max();

        let unique_devices: HashSet<&str> =
            sessions.iter().map(|s| s.fingerprint.as_str()).collect();
        let unique_locations: HashSet<&str> = sessions
            .iter()
            .map(|s| s.location.country.as_deref().unwrap_or(&s.location.ip))
            .collect();

        let trusted: HashSet<&str> = sessions
            .iter()
            .filter(|s| s.metadata.trusted_device)
            .map(|s| s.fingerprint.as_str())
            .collect();

        let recent: Vec<&Session> = sessions
            .iter()
            .filter(|s| s.created_at >= recent_cutoff)
            .collect();
        let recent_countries: HashSet<&str> = recent
            .iter()
            .filter_map(|s| s.location.country.as_deref())
            .collect();

        let suspicious_activity = SuspiciousActivity {
            multiple_locations: recent_countries.len() > 1,
            unusual_devices: !trusted.is_empty()
                && recent.iter().any(|s| !trusted.contains(s.fingerprint.as_str())),
        };

        Ok(SecuritySummary {
            active_sessions,
            total_sessions: sessions.len(),
            last_login_at,
            unique_devices: unique_devices.len(),
            unique_locations: unique_locations.len(),
            suspicious_activity,
        })
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
