//! Exponential-backoff retry at the request boundary.
//!
//! [`RetryPolicy`] describes the schedule; [`RetryPolicy::run`] drives an
//! async operation through it. The retryability decision belongs to the
//! caller (a predicate over the error type), so this module stays agnostic
//! of what is being retried.
//!
//! The helper wraps one full request exchange, never individual body
//! chunks. Cancellation is honored between attempts: dropping the returned
//! future during the backoff sleep abandons the loop.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Retry schedule: attempt `n` (1-indexed) waits
/// `min(max_delay, base_delay * 2^(n-1))` before retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Create a policy from its three knobs.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// The backoff delay applied after attempt `n` (1-indexed) fails.
    ///
    /// Doubles per attempt, capped at `max_delay`. Saturates instead of
    /// overflowing for absurd attempt numbers.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63);
        let factor = 1u64 << exponent;
        let delay = self.base_delay.saturating_mul(u32::try_from(factor).unwrap_or(u32::MAX));
        delay.min(self.max_delay)
    }

    /// Run `op` under this policy.
    ///
    /// `op` is a factory producing a fresh future per attempt.
    /// `is_retryable` decides whether a given error is worth another
    /// attempt. On exhaustion the **last** error is returned.
    ///
    /// # Errors
    ///
    /// Returns the last error once attempts are exhausted or the first
    /// non-retryable error immediately.
    pub async fn run<T, E, F, Fut, P>(&self, is_retryable: P, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_err = None;

        for attempt in 1..=attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !is_retryable(&err) || attempt == attempts {
                        return Err(err);
                    }
                    let delay = self.delay_for_attempt(attempt);
                    warn!(attempt, %err, ?delay, "attempt failed, backing off");
                    tokio::time::sleep(delay).await;
                    last_err = Some(err);
                }
            }
        }

        debug!("retry loop exhausted");
        // Unreachable in practice: the loop always returns on the final
        // attempt. Kept to satisfy the compiler without panicking.
        match last_err {
            Some(err) => Err(err),
            None => unreachable!("retry loop ran zero attempts"),
        }
    }
}
