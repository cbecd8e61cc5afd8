//! Per-client token-bucket rate limiting
//!
//! [`RateLimiter`] is the shared admission table; the HTTP side lives in
//! [`crate::middleware::rate_limit`].

mod bucket;
mod limiter;

pub use bucket::TokenBucket;
pub use limiter::{Decision, RateLimiter};
