use async_trait::async_trait;

use super::challenge::MfaMethod;
use crate::repository::UserAccount;
use crate::AuthError;

/// Delivers one-time codes out of band.
///
/// Delivery mechanics (SMS gateways, mail transport) live with the
/// implementer; this crate only requires that dispatch is async and
/// cancelable so it can be bounded by a timeout.
#[async_trait]
pub trait ChallengeDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        user: &UserAccount,
        method: MfaMethod,
        code: &str,
    ) -> Result<(), AuthError>;
}

/// Dispatcher that records delivery in the log and sends nothing.
///
/// Useful in development and as a default for TOTP-only deployments.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDispatcher;

#[async_trait]
impl ChallengeDispatcher for NullDispatcher {
    async fn dispatch(
        &self,
        user: &UserAccount,
        method: MfaMethod,
        _code: &str,
    ) -> Result<(), AuthError> {
        // The code itself never goes to the log.
        log::info!(
            target: "palisade_mfa",
            "msg=\"challenge_dispatched\" user_id={} method={method}",
            user.id
        );
        Ok(())
    }
}
