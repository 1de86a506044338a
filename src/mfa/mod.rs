//! Multi-factor authentication.
//!
//! MFA is a per-user state machine: unconfigured, provisioned (secret
//! staged, awaiting a first valid code), enabled (secret persisted to the
//! credential record), disabled. TOTP codes are checked against a small
//! clock-skew window and are single-use per time step; SMS and email
//! challenges carry a server-generated one-time code dispatched out of
//! band.

mod challenge;
mod dispatch;
mod service;
mod state;
pub mod totp;

pub use challenge::{ChallengeStore, InMemoryChallengeStore, MfaChallenge, MfaMethod};
pub use dispatch::{ChallengeDispatcher, NullDispatcher};
pub use service::{MfaEnrollment, MfaService, MfaState};
pub use state::{InMemoryMfaStateStore, MfaStateStore, PendingEnrollment};
