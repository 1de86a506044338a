use crate::session::SessionManager;
use crate::token::TokenPair;
use crate::AuthError;

/// Exchanges a refresh token for a new pair, with rotation.
///
/// The session the token is bound to must still be live; revoking a
/// session therefore also revokes its refresh tokens. The remember-me
/// class comes from the session record, with the token's own lifetime as
/// a fallback for sessions that predate the flag.
#[derive(Debug, Clone)]
pub struct RefreshFlow {
    sessions: SessionManager,
}

impl RefreshFlow {
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub async fn execute(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let tokens = self.sessions.token_service();
        let claims = tokens.verify_refresh(refresh_token)?;

        let Some(session) = self.sessions.validate_session(&claims.sid, None).await? else {
            log::warn!(
                target: "palisade_flows",
                "msg=\"refresh_for_dead_session\" sid={}",
                claims.sid
            );
            return Err(AuthError::TokenInvalid);
        };

        tokens
            .refresh(refresh_token, Some(session.metadata.remember_me))
            .await
    }
}
