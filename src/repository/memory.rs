//! In-memory repository implementations.
//!
//! Suitable for single-instance deployments and tests. Data is lost when the
//! process restarts; point the traits at a real database for anything else.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::AuthError;

use super::email_verification::{EmailVerificationRepository, EmailVerificationToken};
use super::organization::{Organization, OrganizationRepository};
use super::password_reset::{PasswordResetRepository, PasswordResetToken};
use super::user::{AccountStatus, NewUser, UserAccount, UserRepository};

fn lock_poisoned() -> AuthError {
    AuthError::StorageError("lock poisoned".to_owned())
}

/// In-memory credential store.
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<Vec<UserAccount>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Seeds an account directly, bypassing registration. Test convenience.
    pub fn insert(&self, user: UserAccount) -> Result<(), AuthError> {
        let mut users = self.users.write().map_err(|_| lock_poisoned())?;
        users.push(user);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserAccount>, AuthError> {
        let users = self.users.read().map_err(|_| lock_poisoned())?;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, AuthError> {
        let needle = email.to_lowercase();
        let users = self.users.read().map_err(|_| lock_poisoned())?;
        Ok(users.iter().find(|u| u.email == needle).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<UserAccount, AuthError> {
        let mut users = self.users.write().map_err(|_| lock_poisoned())?;

        let email = new_user.email.to_lowercase();
        if users.iter().any(|u| u.email == email) {
            return Err(AuthError::UserAlreadyExists);
        }

        let now = Utc::now();
        let user = UserAccount {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            email,
            hashed_password: new_user.hashed_password,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            role: new_user.role,
            status: new_user.status,
            organization_id: new_user.organization_id,
            mfa_enabled: false,
            mfa_secret: None,
            backup_codes: Vec::new(),
            email_verified_at: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update_password(
        &self,
        user_id: i64,
        hashed_password: &str,
    ) -> Result<(), AuthError> {
        self.mutate(user_id, |user| {
            hashed_password.clone_into(&mut user.hashed_password);
        })
    }

    async fn update_status(&self, user_id: i64, status: AccountStatus) -> Result<(), AuthError> {
        self.mutate(user_id, |user| user.status = status)
    }

    async fn mark_email_verified(&self, user_id: i64) -> Result<(), AuthError> {
        self.mutate(user_id, |user| {
            user.email_verified_at = Some(Utc::now());
            if user.status == AccountStatus::PendingVerification {
                user.status = AccountStatus::Active;
            }
        })
    }

    async fn record_login(&self, user_id: i64, at: DateTime<Utc>) -> Result<(), AuthError> {
        self.mutate(user_id, |user| user.last_login_at = Some(at))
    }

    async fn set_mfa(
        &self,
        user_id: i64,
        secret: Option<String>,
        backup_codes: Vec<String>,
        enabled: bool,
    ) -> Result<(), AuthError> {
        self.mutate(user_id, |user| {
            user.mfa_secret = secret;
            user.backup_codes = backup_codes;
            user.mfa_enabled = enabled;
        })
    }
}

impl InMemoryUserRepository {
    fn mutate<F>(&self, user_id: i64, apply: F) -> Result<(), AuthError>
    where
        F: FnOnce(&mut UserAccount),
    {
        let mut users = self.users.write().map_err(|_| lock_poisoned())?;
        match users.iter_mut().find(|u| u.id == user_id) {
            Some(user) => {
                apply(user);
                user.updated_at = Utc::now();
                Ok(())
            }
            None => Err(AuthError::StorageError(format!(
                "no user with id {user_id}"
            ))),
        }
    }
}

/// In-memory organization store.
#[derive(Clone, Default)]
pub struct InMemoryOrganizationRepository {
    organizations: Arc<RwLock<Vec<Organization>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryOrganizationRepository {
    pub fn new() -> Self {
        Self {
            organizations: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }
}

#[async_trait]
impl OrganizationRepository for InMemoryOrganizationRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>, AuthError> {
        let orgs = self.organizations.read().map_err(|_| lock_poisoned())?;
        Ok(orgs.iter().find(|o| o.slug == slug).cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Organization>, AuthError> {
        let orgs = self.organizations.read().map_err(|_| lock_poisoned())?;
        Ok(orgs.iter().find(|o| o.id == id).cloned())
    }

    async fn create(&self, name: &str, slug: &str) -> Result<Organization, AuthError> {
        let mut orgs = self.organizations.write().map_err(|_| lock_poisoned())?;
        let org = Organization {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            name: name.to_owned(),
            slug: slug.to_owned(),
            created_at: Utc::now(),
        };
        orgs.push(org.clone());
        Ok(org)
    }
}

/// In-memory password reset token store, keyed by token hash.
#[derive(Clone, Default)]
pub struct InMemoryPasswordResetRepository {
    tokens: Arc<RwLock<HashMap<String, PasswordResetToken>>>,
}

impl InMemoryPasswordResetRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PasswordResetRepository for InMemoryPasswordResetRepository {
    async fn create(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetToken, AuthError> {
        let token = PasswordResetToken {
            user_id,
            token_hash: token_hash.to_owned(),
            expires_at,
            used: false,
            created_at: Utc::now(),
        };
        self.tokens
            .write()
            .map_err(|_| lock_poisoned())?
            .insert(token_hash.to_owned(), token.clone());
        Ok(token)
    }

    async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<PasswordResetToken>, AuthError> {
        let tokens = self.tokens.read().map_err(|_| lock_poisoned())?;
        Ok(tokens.get(token_hash).cloned())
    }

    async fn consume(&self, token_hash: &str) -> Result<(), AuthError> {
        let mut tokens = self.tokens.write().map_err(|_| lock_poisoned())?;
        match tokens.get_mut(token_hash) {
            Some(token) => {
                token.used = true;
                Ok(())
            }
            None => Err(AuthError::TokenInvalid),
        }
    }

    async fn sweep_expired(&self) -> Result<u64, AuthError> {
        let mut tokens = self.tokens.write().map_err(|_| lock_poisoned())?;
        let now = Utc::now();
        let before = tokens.len();
        tokens.retain(|_, t| t.expires_at > now);
        Ok(before.saturating_sub(tokens.len()) as u64)
    }
}

/// In-memory email verification token store, keyed by token hash.
#[derive(Clone, Default)]
pub struct InMemoryEmailVerificationRepository {
    tokens: Arc<RwLock<HashMap<String, EmailVerificationToken>>>,
}

impl InMemoryEmailVerificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EmailVerificationRepository for InMemoryEmailVerificationRepository {
    async fn create(
        &self,
        user_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<EmailVerificationToken, AuthError> {
        let token = EmailVerificationToken {
            user_id,
            token_hash: token_hash.to_owned(),
            expires_at,
            used: false,
            created_at: Utc::now(),
        };
        self.tokens
            .write()
            .map_err(|_| lock_poisoned())?
            .insert(token_hash.to_owned(), token.clone());
        Ok(token)
    }

    async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<EmailVerificationToken>, AuthError> {
        let tokens = self.tokens.read().map_err(|_| lock_poisoned())?;
        Ok(tokens.get(token_hash).cloned())
    }

    async fn consume(&self, token_hash: &str) -> Result<(), AuthError> {
        let mut tokens = self.tokens.write().map_err(|_| lock_poisoned())?;
        match tokens.get_mut(token_hash) {
            Some(token) => {
                token.used = true;
                Ok(())
            }
            None => Err(AuthError::TokenInvalid),
        }
    }

    async fn sweep_expired(&self) -> Result<u64, AuthError> {
        let mut tokens = self.tokens.write().map_err(|_| lock_poisoned())?;
        let now = Utc::now();
        let before = tokens.len();
        tokens.retain(|_, t| t.expires_at > now);
        Ok(before.saturating_sub(tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::authz::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_owned(),
            hashed_password: "hash".to_owned(),
            first_name: "Ada".to_owned(),
            last_name: "Lovelace".to_owned(),
            role: Role::Student,
            status: AccountStatus::Active,
            organization_id: None,
        }
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_insensitive() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("Ada@Example.COM")).await.unwrap();

        let found = repo.find_by_email("ada@example.com").await.unwrap();
        assert!(found.is_some());
        let found = repo.find_by_email("ADA@EXAMPLE.COM").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected_case_insensitively() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("ada@example.com")).await.unwrap();

        let result = repo.create(new_user("ADA@example.com")).await;
        assert_eq!(result.unwrap_err(), AuthError::UserAlreadyExists);
    }

    #[tokio::test]
    async fn test_mark_email_verified_activates_pending_account() {
        let repo = InMemoryUserRepository::new();
        let mut pending = new_user("ada@example.com");
        pending.status = AccountStatus::PendingVerification;
        let user = repo.create(pending).await.unwrap();

        repo.mark_email_verified(user.id).await.unwrap();

        let user = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(user.status, AccountStatus::Active);
        assert!(user.is_email_verified());
    }

    #[tokio::test]
    async fn test_set_and_clear_mfa() {
        let repo = InMemoryUserRepository::new();
        let user = repo.create(new_user("ada@example.com")).await.unwrap();

        repo.set_mfa(
            user.id,
            Some("SECRET".to_owned()),
            vec!["h1".to_owned()],
            true,
        )
        .await
        .unwrap();
        let user = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert!(user.mfa_enabled);
        assert!(user.mfa_secret.is_some());

        repo.set_mfa(user.id, None, Vec::new(), false).await.unwrap();
        let user = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert!(!user.mfa_enabled);
        assert!(user.mfa_secret.is_none());
        assert!(user.backup_codes.is_empty());
    }

    #[tokio::test]
    async fn test_reset_token_lifecycle() {
        let repo = InMemoryPasswordResetRepository::new();
        let expires = Utc::now() + Duration::minutes(15);

        repo.create(1, "hash-a", expires).await.unwrap();
        let token = repo.find_by_hash("hash-a").await.unwrap().unwrap();
        assert!(token.is_usable(Utc::now()));

        repo.consume("hash-a").await.unwrap();
        let token = repo.find_by_hash("hash-a").await.unwrap().unwrap();
        assert!(!token.is_usable(Utc::now()));
    }

    #[tokio::test]
    async fn test_reset_token_sweep() {
        let repo = InMemoryPasswordResetRepository::new();
        repo.create(1, "stale", Utc::now() - Duration::minutes(1))
            .await
            .unwrap();
        repo.create(2, "fresh", Utc::now() + Duration::minutes(15))
            .await
            .unwrap();

        let removed = repo.sweep_expired().await.unwrap();
        assert_eq!(removed, 1);
        assert!(repo.find_by_hash("stale").await.unwrap().is_none());
        assert!(repo.find_by_hash("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_organization_slug_lookup() {
        let repo = InMemoryOrganizationRepository::new();
        repo.create("Acme University", "acme-university")
            .await
            .unwrap();

        assert!(repo.find_by_slug("acme-university").await.unwrap().is_some());
        assert!(repo.find_by_slug("missing").await.unwrap().is_none());
    }
}
