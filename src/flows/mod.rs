//! Auth orchestration flows.
//!
//! Each flow is a small action struct wired with the stores and services
//! it needs. Outcomes are typed enums rather than errors: a wrong
//! password is a normal branch of login, not an exceptional condition,
//! so `Err` is reserved for infrastructure failures.

mod login;
mod logout;
mod password_reset;
mod refresh;
mod register;
mod retry;
mod two_factor;
mod verify_email;

pub use login::{LoginFlow, LoginOutcome, LoginRequest};
pub use logout::LogoutFlow;
pub use password_reset::{ForgotPasswordFlow, ForgotPasswordOutcome, ResetPasswordFlow};
pub use refresh::RefreshFlow;
pub use register::{RegisterFlow, RegisterOutcome, RegisterRequest};
pub use two_factor::{DisableProof, TwoFactorFlow};
pub use verify_email::VerifyEmailFlow;

use crate::repository::PublicProfile;
use crate::token::TokenPair;

/// Everything a client needs after successful authentication.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub user: PublicProfile,
    pub tokens: TokenPair,
    pub session_id: String,
    /// Opaque session token, returned once; only its hash is stored.
    pub session_token: String,
}
