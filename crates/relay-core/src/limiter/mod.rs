//! Inbound and outbound rate limiting.
//!
//! [`window`] holds the server-wide fixed-window limiter applied to every
//! inbound RPC request. [`pacer`] holds the single-worker queue that paces
//! outbound Birdeye calls under a trailing one-second window.

pub mod pacer;
pub mod window;

pub use pacer::{BirdeyePacer, PacerClosed};
pub use window::{RateLimitSnapshot, ServerRateLimiter};
