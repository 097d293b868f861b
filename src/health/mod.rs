//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Transport.check_server_health(endpoint)
//!     → circuit breaker gate (OPEN ⇒ skip probe, report unhealthy)
//!     → prober.rs (GET / POST ping / AUTO fallback)
//!     → probe outcome feeds circuit breaker state
//!       (success while HALF_OPEN closes the circuit)
//! ```
//!
//! # Design Decisions
//! - GET and POST strategies are complementary; AUTO falls back only on
//!   405, any other GET outcome is final
//! - A liveness probe must not block as long as a real call: short fixed
//!   timeout, separate from the call deadline
//! - Health state lives in the circuit breaker, not here

pub mod prober;

pub use prober::HealthProber;
