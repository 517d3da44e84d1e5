//! Server-wide fixed-window rate limiter.
//!
//! A single counter covers all inbound traffic. The window is reset by a
//! periodic timer task rather than per-call bookkeeping, so `current` keeps
//! climbing past the ceiling within a window — the 429 body is expected to
//! report how far over the limit a client went.

use parking_lot::Mutex;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::debug;

struct Window {
    count: u64,
    started_at: Instant,
}

/// Counters reported to clients alongside a 429 and on `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RateLimitSnapshot {
    pub current: u64,
    pub limit: u64,
    pub remaining: u64,
    pub reset_in_secs: u64,
}

/// Fixed-window limiter for total inbound request throughput.
pub struct ServerRateLimiter {
    window: Mutex<Window>,
    limit: u64,
    window_length: Duration,
}

impl ServerRateLimiter {
    #[must_use]
    pub fn new(limit: u64, window_length: Duration) -> Self {
        Self {
            window: Mutex::new(Window { count: 0, started_at: Instant::now() }),
            limit,
            window_length,
        }
    }

    /// Counts a request and reports whether it is within the ceiling.
    ///
    /// Exceeding the limit does not error; the HTTP middleware translates a
    /// `false` into a 429 carrying [`RateLimitSnapshot`].
    #[must_use]
    pub fn check(&self) -> bool {
        let mut window = self.window.lock();
        window.count += 1;
        window.count <= self.limit
    }

    /// Current counters, including seconds until the next timer reset.
    #[must_use]
    pub fn snapshot(&self) -> RateLimitSnapshot {
        let window = self.window.lock();
        let elapsed = window.started_at.elapsed();
        let reset_in = self.window_length.saturating_sub(elapsed);
        RateLimitSnapshot {
            current: window.count,
            limit: self.limit,
            remaining: self.limit.saturating_sub(window.count),
            reset_in_secs: reset_in.as_secs(),
        }
    }

    /// Zeroes the counter and restarts the window clock.
    pub fn reset(&self) {
        let mut window = self.window.lock();
        if window.count > self.limit {
            debug!(
                rejected = window.count - self.limit,
                "rate limit window closed with rejected requests"
            );
        }
        window.count = 0;
        window.started_at = Instant::now();
    }

    /// Spawns the periodic timer that resets the window.
    pub fn start_reset_task(self: &Arc<Self>) {
        let limiter = Arc::clone(self);
        let period = self.window_length;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiter.reset();
            }
        });
    }
}
