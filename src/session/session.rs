use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::hash_token;

/// The client device a session was established from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub platform: String,
    pub browser: String,
    pub os: String,
    pub device_type: String,
}

impl DeviceInfo {
    pub fn new(
        platform: impl Into<String>,
        browser: impl Into<String>,
        os: impl Into<String>,
        device_type: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            browser: browser.into(),
            os: os.into(),
            device_type: device_type.into(),
        }
    }

    /// Deterministic one-way fingerprint of the device triple.
    ///
    /// Used for unique-device counting and trusted-device comparison; the
    /// device type is presentation detail and stays out of the hash.
    pub fn fingerprint(&self) -> String {
        hash_token(&format!("{}|{}|{}", self.platform, self.browser, self.os))
    }
}

/// Where a session was established from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub ip: String,
    pub country: Option<String>,
    pub city: Option<String>,
}

impl Location {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            country: None,
            city: None,
        }
    }

    #[must_use]
    pub fn with_geo(mut self, country: impl Into<String>, city: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self.city = Some(city.into());
        self
    }
}

/// How a session was established.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// e.g. "password".
    pub login_method: String,
    pub trusted_device: bool,
    pub mfa_verified: bool,
    pub remember_me: bool,
}

impl SessionMetadata {
    pub fn password_login(mfa_verified: bool, remember_me: bool) -> Self {
        Self {
            login_method: "password".to_owned(),
            trusted_device: false,
            mfa_verified,
            remember_me,
        }
    }

    #[must_use]
    pub fn trusted(mut self) -> Self {
        self.trusted_device = true;
        self
    }
}

/// One entry in a session's append-only activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionActivity {
    pub action: String,
    pub resource: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub ip: String,
}

/// A tracked login session.
///
/// Deactivation is a flag flip, never a delete, so activity history and
/// security summaries stay correct after logout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: i64,

    /// SHA-256 of the opaque session token; the plaintext is returned once
    /// at creation and never stored.
    #[serde(skip_serializing)]
    pub token_hash: String,

    pub device: DeviceInfo,
    pub fingerprint: String,
    pub location: Location,
    pub metadata: SessionMetadata,
    pub is_active: bool,
    pub activities: Vec<SessionActivity>,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Active flag and expiry together; the source of truth for whether the
    /// session may authenticate requests.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now)
    }

    /// Constant-shape comparison of a presented session token.
    pub fn token_matches(&self, token: &str) -> bool {
        hash_token(token) == self.token_hash
    }
}
