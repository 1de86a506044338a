use std::sync::Arc;

use crate::crypto::PasswordHasher;
use crate::mfa::{MfaEnrollment, MfaService};
use crate::repository::UserRepository;
use crate::AuthError;

/// Re-proof accepted when turning MFA off.
#[derive(Debug, Clone)]
pub enum DisableProof {
    /// A current TOTP code.
    Code(String),
    /// The account password.
    Password(String),
}

/// User-facing MFA management: enrollment and disablement with re-proof.
#[derive(Clone)]
pub struct TwoFactorFlow {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    mfa: MfaService,
}

impl TwoFactorFlow {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        mfa: MfaService,
    ) -> Self {
        Self { users, hasher, mfa }
    }

    /// Stages a secret and returns the enrollment material to show once.
    pub async fn setup(&self, user_id: i64) -> Result<MfaEnrollment, AuthError> {
        self.mfa.setup(user_id).await
    }

    /// Completes enrollment with the first authenticator code.
    pub async fn confirm(&self, user_id: i64, code: &str) -> Result<bool, AuthError> {
        self.mfa.confirm_setup(user_id, code).await
    }

    /// Turns MFA off after re-proof with a code or the password.
    pub async fn disable(&self, user_id: i64, proof: DisableProof) -> Result<(), AuthError> {
        match proof {
            DisableProof::Code(code) => self.mfa.disable(user_id, &code).await,
            DisableProof::Password(password) => {
                let user = self
                    .users
                    .find_by_id(user_id)
                    .await?
                    .ok_or(AuthError::InvalidCredentials)?;
                if !self.hasher.verify(&password, &user.hashed_password)? {
                    return Err(AuthError::InvalidCredentials);
                }
                self.mfa.clear(user_id).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::authz::Role;
    use crate::config::MfaConfig;
    use crate::crypto::Argon2Hasher;
    use crate::mfa::{
        InMemoryChallengeStore, InMemoryMfaStateStore, MfaState, NullDispatcher,
    };
    use crate::repository::{InMemoryUserRepository, UserAccount};

    const PASSWORD: &str = "correct horse battery staple";

    struct Harness {
        flow: TwoFactorFlow,
        mfa: MfaService,
    }

    fn harness() -> Harness {
        let users = Arc::new(InMemoryUserRepository::new());
        let mut user = UserAccount::fixture(1, "user@example.com", Role::Student);
        user.hashed_password = Argon2Hasher::default().hash(PASSWORD).unwrap();
        users.insert(user).unwrap();

        let mfa = MfaService::new(
            users.clone(),
            Arc::new(InMemoryMfaStateStore::new()),
            Arc::new(InMemoryChallengeStore::new()),
            Arc::new(NullDispatcher),
            MfaConfig::default(),
        );
        Harness {
            flow: TwoFactorFlow::new(users, Arc::new(Argon2Hasher::default()), mfa.clone()),
            mfa,
        }
    }

    fn totp_code(secret: &str, at: u64) -> String {
        use totp_rs::{Algorithm, Secret, TOTP};
        let bytes = Secret::Encoded(secret.to_owned()).to_bytes().unwrap();
        TOTP::new(Algorithm::SHA1, 6, 1, 30, bytes, None, "account".to_owned())
            .unwrap()
            .generate(at)
    }

    async fn enroll(h: &Harness) -> MfaEnrollment {
        let enrollment = h.flow.setup(1).await.unwrap();
        let code = totp_code(&enrollment.secret, Utc::now().timestamp() as u64 - 30);
        assert!(h.flow.confirm(1, &code).await.unwrap());
        enrollment
    }

    #[tokio::test]
    async fn test_enrollment_round_trip() {
        let h = harness();
        enroll(&h).await;
        assert_eq!(h.mfa.status(1).await.unwrap(), MfaState::Enabled);
    }

    #[tokio::test]
    async fn test_disable_with_code() {
        let h = harness();
        let enrollment = enroll(&h).await;

        let code = totp_code(&enrollment.secret, Utc::now().timestamp() as u64);
        h.flow.disable(1, DisableProof::Code(code)).await.unwrap();
        assert_eq!(h.mfa.status(1).await.unwrap(), MfaState::Unconfigured);
    }

    #[tokio::test]
    async fn test_disable_with_password() {
        let h = harness();
        enroll(&h).await;

        h.flow
            .disable(1, DisableProof::Password(PASSWORD.to_owned()))
            .await
            .unwrap();
        assert_eq!(h.mfa.status(1).await.unwrap(), MfaState::Unconfigured);
    }

    #[tokio::test]
    async fn test_disable_with_wrong_proof_rejected() {
        let h = harness();
        enroll(&h).await;

        assert_eq!(
            h.flow
                .disable(1, DisableProof::Code("000000".to_owned()))
                .await
                .unwrap_err(),
            AuthError::InvalidTwoFactor
        );
        assert_eq!(
            h.flow
                .disable(1, DisableProof::Password("wrong".to_owned()))
                .await
                .unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert_eq!(h.mfa.status(1).await.unwrap(), MfaState::Enabled);
    }
}
