//! Token-bucket rate limiting for calls to external providers.
//!
//! The pipeline paces embedding and vector index traffic through injected
//! [`RateLimiter`] handles instead of scattering fixed sleeps through the
//! ingestion loop, keeping the policy in one place and out of the pipeline
//! logic. With a zero refill interval the limiter is a no-op, which is how
//! tests run without wall-clock delays.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// A token bucket granting one permit per [`RateLimiter::acquire`] call.
pub struct RateLimiter {
    capacity: u32,
    refill_interval: Duration,
    state: Mutex<BucketState>,
}

struct BucketState {
    tokens: u32,
    last_refill: Instant,
}

impl RateLimiter {
    /// Create a limiter holding at most `capacity` tokens, refilled one token
    /// per `refill_interval`. Capacity is clamped to at least one.
    pub fn new(capacity: u32, refill_interval: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            refill_interval,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Create a limiter that never delays. Used when pacing is disabled.
    pub fn unthrottled() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Wait until a token is available and consume it.
    pub async fn acquire(&self) {
        if self.refill_interval.is_zero() {
            return;
        }

        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                self.refill(&mut state, now);
                if state.tokens > 0 {
                    state.tokens -= 1;
                    return;
                }
                state.last_refill + self.refill_interval - now
            };
            tokio::time::sleep(wait).await;
        }
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        let elapsed = now.saturating_duration_since(state.last_refill);
        let intervals = (elapsed.as_nanos() / self.refill_interval.as_nanos()) as u32;
        if intervals > 0 {
            state.tokens = state.tokens.saturating_add(intervals).min(self.capacity);
            state.last_refill += self.refill_interval * intervals;
        }
    }
}
