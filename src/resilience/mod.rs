//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call attempt:
//!     → circuit_breaker.rs (gate: is the endpoint worth trying?)
//!     → attempt runs with a deadline
//!     → On failure: retries.rs (retryable?), backoff.rs (how long to wait)
//!     → Every outcome feeds back into circuit_breaker.rs
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline; retries never extend it
//! - Jittered backoff prevents thundering herd
//! - Circuit breaker prevents hammering a known-bad endpoint
//! - Retry decisions and backoff are pure functions; only the breaker
//!   holds state

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;

pub use backoff::calculate_backoff;
pub use circuit_breaker::{CircuitBreaker, CircuitPermit, CircuitState};
pub use retries::should_retry;
