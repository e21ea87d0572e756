//! Per-endpoint circuit breaker.
//!
//! A three-state machine guarding an endpoint:
//!
//! - `Closed`: requests pass through; consecutive failures are counted.
//! - `Open`: fail fast until the reset timeout elapses.
//! - `HalfOpen`: exactly one probe request passes; its outcome decides the
//!   next state.
//!
//! The policy is consecutive-failure counting (a success in `Closed` resets
//! the count), not a windowed failure rate. All state lives behind a single
//! `tokio::sync::Mutex`, so transitions serialize without any lock
//! ordering to reason about. Time comes from [`tokio::time::Instant`],
//! which lets tests pause and advance the clock.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::ClientError;

/// Circuit breaker configuration.
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    /// Consecutive failures that trip the breaker.
    pub failure_threshold: u32,
    /// How long the breaker stays open before allowing a probe.
    pub reset_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
        }
    }
}

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Requests pass; failures are being counted.
    Closed,
    /// Requests fail fast.
    Open,
    /// One probe request is allowed through.
    HalfOpen,
}

#[derive(Debug)]
enum Inner {
    Closed { failure_count: u32 },
    Open { opened_at: Instant },
    HalfOpen,
}

/// A cloneable circuit breaker for one endpoint.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Arc<Mutex<Inner>>,
}

impl CircuitBreaker {
    /// Create a breaker with the given configuration.
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Arc::new(Mutex::new(Inner::Closed { failure_count: 0 })),
        }
    }

    /// Check whether a request may proceed.
    ///
    /// In `Open`, transitions lazily to `HalfOpen` once the reset timeout
    /// has elapsed; the call that observes the transition becomes the
    /// probe.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::CircuitOpen`] while the breaker is open.
    pub async fn check(&self) -> Result<(), ClientError> {
        let mut inner = self.inner.lock().await;
        match *inner {
            Inner::Closed { .. } | Inner::HalfOpen => Ok(()),
            Inner::Open { opened_at } => {
                let elapsed = opened_at.elapsed();
                if elapsed >= self.config.reset_timeout {
                    debug!("breaker half-open, allowing probe");
                    *inner = Inner::HalfOpen;
                    Ok(())
                } else {
                    Err(ClientError::CircuitOpen {
                        retry_after: self.config.reset_timeout - elapsed,
                    })
                }
            }
        }
    }

    /// Record a successful request.
    pub async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        match *inner {
            Inner::Closed { failure_count } if failure_count > 0 => {
                *inner = Inner::Closed { failure_count: 0 };
            }
            Inner::HalfOpen => {
                debug!("probe succeeded, closing breaker");
                *inner = Inner::Closed { failure_count: 0 };
            }
            _ => {}
        }
    }

    /// Record a failed request.
    pub async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        match *inner {
            Inner::Closed { failure_count } => {
                let failure_count = failure_count + 1;
                if failure_count >= self.config.failure_threshold {
                    warn!(failure_count, "failure threshold reached, opening breaker");
                    *inner = Inner::Open {
                        opened_at: Instant::now(),
                    };
                } else {
                    *inner = Inner::Closed { failure_count };
                }
            }
            Inner::HalfOpen => {
                warn!("probe failed, re-opening breaker");
                *inner = Inner::Open {
                    opened_at: Instant::now(),
                };
            }
            Inner::Open { .. } => {}
        }
    }

    /// The current state.
    pub async fn state(&self) -> BreakerState {
        match *self.inner.lock().await {
            Inner::Closed { .. } => BreakerState::Closed,
            Inner::Open { .. } => BreakerState::Open,
            Inner::HalfOpen => BreakerState::HalfOpen,
        }
    }

    /// The current consecutive-failure count (zero outside `Closed`).
    pub async fn failure_count(&self) -> u32 {
        match *self.inner.lock().await {
            Inner::Closed { failure_count } => failure_count,
            _ => 0,
        }
    }

    /// Time remaining until an open breaker allows a probe, if open.
    pub async fn time_until_reset(&self) -> Option<Duration> {
        match *self.inner.lock().await {
            Inner::Open { opened_at } => Some(
                self.config
                    .reset_timeout
                    .saturating_sub(opened_at.elapsed()),
            ),
            _ => None,
        }
    }

    /// Manually close the breaker and clear the failure count.
    pub async fn reset(&self) {
        *self.inner.lock().await = Inner::Closed { failure_count: 0 };
    }

    /// Manually open the breaker.
    pub async fn trip(&self) {
        *self.inner.lock().await = Inner::Open {
            opened_at: Instant::now(),
        };
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}
