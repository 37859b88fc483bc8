//! Client-side rate limiter
//!
//! Token bucket in its GCRA form: the bucket state is a single "theoretical
//! arrival time". Each acquisition reserves the next free slot under a
//! mutex and then sleeps outside the lock until that slot begins, so
//! waiters are admitted roughly in request order and the call rate never
//! exceeds the configured limit.

use super::error::ApiError;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Default call rate when none is configured
pub const DEFAULT_RATE_LIMIT: f64 = 10.0;

pub struct RateLimiter {
    /// Spacing between tokens; zero disables limiting
    interval: Duration,
    /// Head start granted by the burst, `interval * (burst - 1)`
    window: Duration,
    state: Mutex<BucketState>,
}

struct BucketState {
    /// Time at which the bucket is next empty
    next_free: Instant,
}

impl RateLimiter {
    /// Limiter admitting `rate` calls per second with up to `burst` calls
    /// back to back. A non-positive or non-finite rate disables limiting.
    ///
    /// Fails when the token spacing or the burst window cannot be
    /// represented as a [`Duration`].
    pub fn new(rate: f64, burst: u32) -> Result<Self, ApiError> {
        let interval = if rate.is_finite() && rate > 0.0 {
            Duration::try_from_secs_f64(1.0 / rate).map_err(|_| {
                ApiError::InvalidRequest(format!("rate limit {rate} calls/s is too small"))
            })?
        } else {
            Duration::ZERO
        };

        let burst = burst.max(1);
        let window = interval.checked_mul(burst - 1).ok_or_else(|| {
            ApiError::InvalidRequest(format!(
                "burst of {burst} at {rate} calls/s overflows the limiter window"
            ))
        })?;

        let now = Instant::now();
        if now.checked_add(interval).is_none() {
            return Err(ApiError::InvalidRequest(format!(
                "rate limit {rate} calls/s is too small"
            )));
        }

        Ok(Self {
            interval,
            window,
            state: Mutex::new(BucketState { next_free: now }),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Reserve the next slot and return how long to wait for it
    fn reserve(&self) -> Result<Duration, ApiError> {
        if self.interval.is_zero() {
            return Ok(Duration::ZERO);
        }

        let now = Instant::now();
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let slot = state.next_free.max(now);
        state.next_free = slot.checked_add(self.interval).ok_or_else(|| {
            ApiError::InvalidRequest("rate limiter schedule overflowed".to_string())
        })?;

        Ok(slot.saturating_duration_since(now).saturating_sub(self.window))
    }

    /// Wait for a token. A reservation abandoned through cancellation is
    /// not handed back.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        let wait = self.reserve()?;
        if wait.is_zero() {
            return Ok(());
        }

        tracing::trace!(wait_ms = wait.as_millis() as u64, "Rate limiter delaying call");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            _ = tokio::time::sleep(wait) => Ok(()),
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        let interval = Duration::from_secs_f64(1.0 / DEFAULT_RATE_LIMIT);
        Self {
            interval,
            window: Duration::ZERO,
            state: Mutex::new(BucketState {
                next_free: Instant::now(),
            }),
        }
    }
}
