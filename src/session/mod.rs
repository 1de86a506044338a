//! Multi-device session tracking.
//!
//! Sessions are created at login, validated on every authenticated request,
//! and soft-deactivated on logout or expiry so their activity history stays
//! queryable. Expiry is fixed at creation; the last-activity timestamp is
//! informational only.

mod manager;
mod repository;
mod session;

pub use manager::{EstablishedSession, SecuritySummary, SessionManager, SuspiciousActivity};
pub use repository::{InMemorySessionRepository, SessionRepository};
pub use session::{DeviceInfo, Location, Session, SessionActivity, SessionMetadata};
