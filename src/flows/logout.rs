use crate::session::SessionManager;
use crate::AuthError;

/// Ends sessions given a verified access token.
#[derive(Debug, Clone)]
pub struct LogoutFlow {
    sessions: SessionManager,
}

impl LogoutFlow {
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }

    /// Deactivates the session the access token is bound to.
    pub async fn execute(&self, access_token: &str) -> Result<(), AuthError> {
        let claims = self.sessions.token_service().verify_access(access_token)?;
        self.sessions.invalidate_session(&claims.sid).await
    }

    /// Deactivates every other session of the token's user, keeping the
    /// current one. Returns the number ended.
    pub async fn everywhere_else(&self, access_token: &str) -> Result<u64, AuthError> {
        let claims = self.sessions.token_service().verify_access(access_token)?;
        let user_id = claims.user_id()?;
        self.sessions
            .invalidate_all_user_sessions(user_id, Some(&claims.sid))
            .await
    }
}
