//! Storage abstractions for the durable credential store.
//!
//! The credential store is an external collaborator: palisade consumes these
//! traits and never prescribes a database engine. In-memory implementations
//! are provided for single-instance deployments and tests.
//!
//! # Traits
//!
//! | Trait | Description |
//! |-------|-------------|
//! | [`UserRepository`] | Credential record lookup and mutation |
//! | [`OrganizationRepository`] | Organization lookup/creation for registration |
//! | [`PasswordResetRepository`] | Single-use password reset tokens |
//! | [`EmailVerificationRepository`] | Single-use email verification tokens |

mod email_verification;
mod memory;
mod organization;
mod password_reset;
mod user;

pub use email_verification::{EmailVerificationRepository, EmailVerificationToken};
pub use memory::{
    InMemoryEmailVerificationRepository, InMemoryOrganizationRepository,
    InMemoryPasswordResetRepository, InMemoryUserRepository,
};
pub use organization::{Organization, OrganizationRepository};
pub use password_reset::{PasswordResetRepository, PasswordResetToken};
pub use user::{AccountStatus, NewUser, PublicProfile, UserAccount, UserRepository};
