//! Rate limiter implementation
//!
//! Provides a single token bucket shared by every request of the API surface.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Token bucket parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    /// Sustained refill rate in tokens per second
    pub requests_per_second: f64,
    /// Bucket capacity
    pub burst: u32,
}

impl RateLimitConfig {
    pub fn new(requests_per_second: f64, burst: u32) -> Self {
        Self {
            requests_per_second,
            burst,
        }
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket admission control
///
/// The bucket starts full. `allow` never blocks: it refills according to the
/// elapsed time and takes one token if one is available.
#[derive(Debug)]
pub struct TokenBucket {
    rate: f64,
    capacity: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Create a full bucket
    pub fn new(config: RateLimitConfig) -> Self {
        let capacity = f64::from(config.burst);

        Self {
            rate: config.requests_per_second.max(0.0),
            capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Try to take one token now
    pub fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    /// Try to take one token at the given instant
    pub fn allow_at(&self, now: Instant) -> bool {
        // The critical section cannot panic, so a poisoned lock still holds valid state
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let elapsed = now.saturating_duration_since(state.last_refill);
        if now > state.last_refill {
            state.last_refill = now;
        }
        state.tokens = (state.tokens + elapsed.as_secs_f64() * self.rate).min(self.capacity);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently available, without refilling
    pub fn available(&self) -> f64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tokens
    }

    /// Time until the next token becomes available, if one ever will
    ///
    /// `None` also covers waits too long to represent as a `Duration`.
    pub fn retry_after(&self) -> Option<Duration> {
        if self.rate <= 0.0 || self.capacity < 1.0 {
            return None;
        }

        let missing = (1.0 - self.available()).max(0.0);
        Duration::try_from_secs_f64(missing / self.rate).ok()
    }
}
