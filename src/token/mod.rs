//! Signed access/refresh token pairs with mandatory refresh rotation.

mod claims;
mod config;
mod rotation;
mod service;

pub use claims::{Claims, TokenKind, TokenSubject};
pub use config::TokenConfig;
pub use rotation::{InMemoryRotationStore, RefreshRotationStore};
pub use service::{TokenPair, TokenService};
