//! Attempt rate limiting with escalating blocks.
//!
//! A fixed-window counter per client identity; exceeding the window's
//! attempt budget escalates to a block that denies immediately, without
//! further counting, until it elapses.

mod limit;
mod limiter;
mod store;

pub use limit::{ClientIdentity, Limit};
pub use limiter::{RateLimitDecision, RateLimiter};
pub use store::{InMemoryRateLimitStore, RateLimitEntry, RateLimitStore};
