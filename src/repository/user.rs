use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::authz::Role;
use crate::AuthError;

/// Account lifecycle state.
///
/// `PendingVerification → Active` happens via email verification;
/// `Active ↔ Suspended/Inactive` are administrative transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    PendingVerification,
    Active,
    Inactive,
    Suspended,
}

/// The durable credential record.
///
/// The MFA secret is only `Some` while setup is in progress or enabled;
/// backup codes are stored as SHA-256 hashes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    /// Case-folded at write time; unique case-insensitively.
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub status: AccountStatus,
    pub organization_id: Option<i64>,
    pub mfa_enabled: bool,
    #[serde(skip_serializing)]
    pub mfa_secret: Option<String>,
    #[serde(skip_serializing)]
    pub backup_codes: Vec<String>,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn is_email_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }

    /// Caller-facing projection; never includes the password hash, MFA
    /// secret, or backup codes.
    pub fn profile(&self) -> PublicProfile {
        PublicProfile {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: self.role,
            status: self.status,
            organization_id: self.organization_id,
            mfa_enabled: self.mfa_enabled,
            email_verified: self.is_email_verified(),
            last_login_at: self.last_login_at,
            created_at: self.created_at,
        }
    }
}

#[cfg(any(test, feature = "mocks"))]
impl UserAccount {
    /// Test fixture with sensible defaults.
    pub fn fixture(id: i64, email: &str, role: Role) -> Self {
        let now = Utc::now();
        UserAccount {
            id,
            email: email.to_lowercase(),
            hashed_password: "fakehashedpassword".to_owned(),
            first_name: "Test".to_owned(),
            last_name: "User".to_owned(),
            role,
            status: AccountStatus::Active,
            organization_id: None,
            mfa_enabled: false,
            mfa_secret: None,
            backup_codes: Vec::new(),
            email_verified_at: Some(now),
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Sanitized account view safe to return to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub status: AccountStatus,
    pub organization_id: Option<i64>,
    pub mfa_enabled: bool,
    pub email_verified: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a credential record.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub hashed_password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub status: AccountStatus,
    pub organization_id: Option<i64>,
}

/// Contract over the durable credential store.
///
/// Implementations must treat email comparisons case-insensitively.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserAccount>, AuthError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, AuthError>;
    async fn create(&self, new_user: NewUser) -> Result<UserAccount, AuthError>;
    async fn update_password(&self, user_id: i64, hashed_password: &str)
        -> Result<(), AuthError>;
    async fn update_status(&self, user_id: i64, status: AccountStatus) -> Result<(), AuthError>;
    /// Marks the email verified and activates a pending account.
    async fn mark_email_verified(&self, user_id: i64) -> Result<(), AuthError>;
    async fn record_login(&self, user_id: i64, at: DateTime<Utc>) -> Result<(), AuthError>;
    /// Writes the MFA secret, hashed backup codes, and enabled flag in one
    /// update. Passing `None`/empty/false clears MFA entirely.
    async fn set_mfa(
        &self,
        user_id: i64,
        secret: Option<String>,
        backup_codes: Vec<String>,
        enabled: bool,
    ) -> Result<(), AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_excludes_secrets() {
        let mut user = UserAccount::fixture(1, "User@Example.com", Role::Student);
        user.mfa_secret = Some("JBSWY3DPEHPK3PXP".to_owned());
        user.backup_codes = vec!["hash1".to_owned()];

        let json = serde_json::to_string(&user.profile()).unwrap();
        assert!(!json.contains("fakehashedpassword"));
        assert!(!json.contains("JBSWY3DPEHPK3PXP"));
        assert!(!json.contains("hash1"));
    }

    #[test]
    fn test_account_serialization_skips_password() {
        let user = UserAccount::fixture(1, "user@example.com", Role::Student);
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("hashed_password"));
    }
}
