//! Shared foundation for the CybS3 stack.
//!
//! This crate holds the pieces every other crate leans on: the client-side
//! error taxonomy with its retryability rules and process exit codes, the
//! exponential-backoff retry helper, the per-endpoint circuit breaker, and a
//! couple of small shared types (credentials, region).
//!
//! Nothing here performs I/O on its own; the retry helper and circuit
//! breaker only use the tokio clock.

pub mod breaker;
pub mod error;
pub mod retry;
pub mod types;

pub use breaker::{BreakerConfig, BreakerState, CircuitBreaker};
pub use error::{ClientError, ClientResult};
pub use retry::RetryPolicy;
pub use types::{Credentials, Region};
