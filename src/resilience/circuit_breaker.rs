//! Per-endpoint circuit breaker.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: endpoint assumed down, calls fail fast
//! - Half-Open: testing if the endpoint recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= threshold
//! Open → Half-Open: after reset timeout elapses
//! Half-Open → Closed: trial call succeeds (failure_count reset)
//! Half-Open → Open: trial call fails or is abandoned (timeout restarts)
//! ```
//!
//! # Design Decisions
//! - Per-endpoint state, created lazily on first use via the concurrent
//!   map's entry API (no duplicate breakers under concurrent first-use)
//! - Fail fast in Open state, no waiting
//! - Exactly one trial call in Half-Open (a recovering endpoint must not
//!   be hammered)
//! - Admission hands out an RAII [`CircuitPermit`]; a permit dropped
//!   without an outcome counts as a failure, so a caller that cancels its
//!   future mid-flight can never leave the trial slot claimed forever
//! - Bookkeeping is serialized per endpoint; the guarded operations
//!   themselves run concurrently

use std::future::Future;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::error::{EngineResult, Fault};
use crate::observability::metrics;

/// Breaker state for one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// An admitted call attempt.
///
/// The holder must report the outcome via [`record_success`] or
/// [`record_failure`]. Dropping the permit without reporting — the attempt
/// was cancelled before a response arrived — records a failure, which also
/// releases a Half-Open trial slot by reopening the circuit.
///
/// [`record_success`]: CircuitPermit::record_success
/// [`record_failure`]: CircuitPermit::record_failure
pub struct CircuitPermit<'a> {
    breaker: &'a CircuitBreaker,
    endpoint_id: String,
    reported: bool,
}

impl CircuitPermit<'_> {
    /// Report a successful attempt and release the permit.
    pub fn record_success(mut self) {
        self.reported = true;
        self.breaker.record_success(&self.endpoint_id);
    }

    /// Report a failed attempt and release the permit.
    pub fn record_failure(mut self) {
        self.reported = true;
        self.breaker.record_failure(&self.endpoint_id);
    }
}

impl Drop for CircuitPermit<'_> {
    fn drop(&mut self) {
        // Cancelled mid-flight: no response ever arrived.
        if !self.reported {
            self.breaker.record_failure(&self.endpoint_id);
        }
    }
}

#[derive(Debug)]
struct CircuitEntry {
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
    /// Set while the single Half-Open trial call is in flight.
    probe_in_flight: bool,
}

impl Default for CircuitEntry {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            opened_at: None,
            probe_in_flight: false,
        }
    }
}

/// Failure-tracking state machine, one entry per endpoint id.
pub struct CircuitBreaker {
    entries: DashMap<String, CircuitEntry>,
    failure_threshold: u32,
    reset_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            failure_threshold,
            reset_timeout,
        }
    }

    /// Gate a call attempt, handing out a permit on admission.
    ///
    /// Open and still inside the reset timeout: rejects without invoking
    /// anything. Open with the timeout elapsed: transitions to Half-Open
    /// and admits exactly one trial call; concurrent attempts during the
    /// trial are rejected.
    pub fn try_acquire(&self, endpoint_id: &str) -> EngineResult<CircuitPermit<'_>> {
        let mut entry = self.entries.entry(endpoint_id.to_string()).or_default();
        match entry.state {
            CircuitState::Closed => {}
            CircuitState::Open => {
                let elapsed = entry.opened_at.map(|t| t.elapsed()).unwrap_or(Duration::ZERO);
                if elapsed < self.reset_timeout {
                    return Err(Fault::server_unavailable(format!(
                        "circuit open for endpoint {}",
                        endpoint_id
                    )));
                }
                entry.state = CircuitState::HalfOpen;
                entry.probe_in_flight = true;
                tracing::info!(endpoint_id = %endpoint_id, "circuit half-open, admitting trial call");
                metrics::record_circuit_transition(endpoint_id, CircuitState::HalfOpen);
            }
            CircuitState::HalfOpen => {
                if entry.probe_in_flight {
                    return Err(Fault::server_unavailable(format!(
                        "circuit half-open for endpoint {}, trial call in flight",
                        endpoint_id
                    )));
                }
                entry.probe_in_flight = true;
            }
        }
        drop(entry);
        Ok(CircuitPermit {
            breaker: self,
            endpoint_id: endpoint_id.to_string(),
            reported: false,
        })
    }

    /// Read-only gate: would a call be admitted right now?
    ///
    /// Unlike [`try_acquire`] this never transitions state and never claims
    /// the Half-Open trial slot, so it can be consulted before per-call
    /// work (negotiation, signing) that a known-bad endpoint should skip.
    ///
    /// [`try_acquire`]: CircuitBreaker::try_acquire
    pub fn check(&self, endpoint_id: &str) -> EngineResult<()> {
        let entry = match self.entries.get(endpoint_id) {
            Some(entry) => entry,
            None => return Ok(()),
        };
        match entry.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let elapsed = entry.opened_at.map(|t| t.elapsed()).unwrap_or(Duration::ZERO);
                if elapsed < self.reset_timeout {
                    Err(Fault::server_unavailable(format!(
                        "circuit open for endpoint {}",
                        endpoint_id
                    )))
                } else {
                    Ok(())
                }
            }
            CircuitState::HalfOpen => {
                if entry.probe_in_flight {
                    Err(Fault::server_unavailable(format!(
                        "circuit half-open for endpoint {}, trial call in flight",
                        endpoint_id
                    )))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Record a successful attempt: resets the failure count and closes a
    /// half-open circuit.
    pub fn record_success(&self, endpoint_id: &str) {
        let mut entry = self.entries.entry(endpoint_id.to_string()).or_default();
        entry.failure_count = 0;
        entry.probe_in_flight = false;
        if entry.state != CircuitState::Closed {
            tracing::info!(endpoint_id = %endpoint_id, "circuit closed after successful trial");
            entry.state = CircuitState::Closed;
            entry.opened_at = None;
            metrics::record_circuit_transition(endpoint_id, CircuitState::Closed);
        }
    }

    /// Record a failed attempt. A Half-Open failure reopens immediately;
    /// a Closed failure opens once the threshold is reached. A cancelled
    /// attempt that never got a response counts as a failure too.
    pub fn record_failure(&self, endpoint_id: &str) {
        let mut entry = self.entries.entry(endpoint_id.to_string()).or_default();
        entry.probe_in_flight = false;
        match entry.state {
            CircuitState::HalfOpen => {
                entry.state = CircuitState::Open;
                entry.opened_at = Some(Instant::now());
                tracing::warn!(endpoint_id = %endpoint_id, "trial call failed, circuit reopened");
                metrics::record_circuit_transition(endpoint_id, CircuitState::Open);
            }
            CircuitState::Closed => {
                entry.failure_count += 1;
                if entry.failure_count >= self.failure_threshold {
                    entry.state = CircuitState::Open;
                    entry.opened_at = Some(Instant::now());
                    tracing::warn!(
                        endpoint_id = %endpoint_id,
                        failure_count = entry.failure_count,
                        "failure threshold reached, circuit opened"
                    );
                    metrics::record_circuit_transition(endpoint_id, CircuitState::Open);
                }
            }
            CircuitState::Open => {
                entry.failure_count += 1;
            }
        }
    }

    /// Run an operation under the breaker's gate, feeding its outcome back
    /// into the failure accounting. Cancelling the returned future mid-
    /// operation counts as a failure via the permit's drop.
    pub async fn execute<T, E, Fut>(
        &self,
        endpoint_id: &str,
        operation: Fut,
    ) -> EngineResult<Result<T, E>>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.try_acquire(endpoint_id)?;
        let outcome = operation.await;
        match &outcome {
            Ok(_) => permit.record_success(),
            Err(_) => permit.record_failure(),
        }
        Ok(outcome)
    }

    /// Current state for an endpoint (Closed if never seen).
    pub fn state(&self, endpoint_id: &str) -> CircuitState {
        self.entries
            .get(endpoint_id)
            .map(|e| e.state)
            .unwrap_or(CircuitState::Closed)
    }

    /// Current consecutive failure count for an endpoint.
    pub fn failure_count(&self, endpoint_id: &str) -> u32 {
        self.entries
            .get(endpoint_id)
            .map(|e| e.failure_count)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, reset_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(threshold, Duration::from_millis(reset_ms))
    }

    #[test]
    fn test_closed_by_default() {
        let cb = breaker(3, 1000);
        assert_eq!(cb.state("ep-1"), CircuitState::Closed);
        assert!(cb.check("ep-1").is_ok());
        cb.try_acquire("ep-1").unwrap().record_success();
        assert_eq!(cb.state("ep-1"), CircuitState::Closed);
    }

    #[test]
    fn test_opens_after_threshold_failures() {
        let cb = breaker(3, 1000);
        cb.record_failure("ep-1");
        cb.record_failure("ep-1");
        assert_eq!(cb.state("ep-1"), CircuitState::Closed);
        cb.record_failure("ep-1");
        assert_eq!(cb.state("ep-1"), CircuitState::Open);
        assert!(matches!(
            cb.try_acquire("ep-1"),
            Err(Fault::ServerUnavailable { .. })
        ));
        assert!(matches!(
            cb.check("ep-1"),
            Err(Fault::ServerUnavailable { .. })
        ));
    }

    #[test]
    fn test_success_resets_failure_count() {
        let cb = breaker(3, 1000);
        cb.record_failure("ep-1");
        cb.record_failure("ep-1");
        cb.record_success("ep-1");
        assert_eq!(cb.failure_count("ep-1"), 0);
        cb.record_failure("ep-1");
        cb.record_failure("ep-1");
        assert_eq!(cb.state("ep-1"), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_open_rejects_without_invoking_operation() {
        let cb = breaker(1, 60_000);
        cb.record_failure("ep-1");
        assert_eq!(cb.state("ep-1"), CircuitState::Open);

        let mut invoked = false;
        let outcome = cb
            .execute("ep-1", async {
                invoked = true;
                Ok::<_, ()>(())
            })
            .await;
        assert!(matches!(outcome, Err(Fault::ServerUnavailable { .. })));
        assert!(!invoked);
    }

    #[tokio::test]
    async fn test_half_open_after_reset_then_closes_on_success() {
        let cb = breaker(1, 10);
        cb.record_failure("ep-1");
        assert_eq!(cb.state("ep-1"), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let permit = cb.try_acquire("ep-1").unwrap();
        assert_eq!(cb.state("ep-1"), CircuitState::HalfOpen);

        permit.record_success();
        assert_eq!(cb.state("ep-1"), CircuitState::Closed);
        assert_eq!(cb.failure_count("ep-1"), 0);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens() {
        let cb = breaker(1, 10);
        cb.record_failure("ep-1");
        tokio::time::sleep(Duration::from_millis(20)).await;
        let permit = cb.try_acquire("ep-1").unwrap();
        permit.record_failure();
        assert_eq!(cb.state("ep-1"), CircuitState::Open);
        // Timeout restarted: immediate acquire rejected again.
        assert!(cb.try_acquire("ep-1").is_err());
    }

    #[tokio::test]
    async fn test_half_open_admits_single_trial() {
        let cb = breaker(1, 10);
        cb.record_failure("ep-1");
        tokio::time::sleep(Duration::from_millis(20)).await;
        let permit = cb.try_acquire("ep-1").unwrap();
        // Second attempt during the trial is rejected.
        assert!(cb.try_acquire("ep-1").is_err());
        permit.record_success();
    }

    #[tokio::test]
    async fn test_abandoned_trial_reopens_instead_of_wedging() {
        let cb = breaker(1, 10);
        cb.record_failure("ep-1");
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Trial admitted, then the caller cancels it mid-flight.
        let trial = cb.execute("ep-1", std::future::pending::<Result<(), ()>>());
        let outcome = tokio::time::timeout(Duration::from_millis(5), trial).await;
        assert!(outcome.is_err());

        // The dropped permit counted as a failure and reopened the
        // circuit; the trial slot is not stuck claimed.
        assert_eq!(cb.state("ep-1"), CircuitState::Open);

        // After the reset timeout a fresh trial is admitted and can close.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let permit = cb.try_acquire("ep-1").unwrap();
        assert_eq!(cb.state("ep-1"), CircuitState::HalfOpen);
        permit.record_success();
        assert_eq!(cb.state("ep-1"), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_check_never_claims_trial_slot() {
        let cb = breaker(1, 10);
        cb.record_failure("ep-1");
        tokio::time::sleep(Duration::from_millis(20)).await;

        // A passing check leaves the circuit Open and the slot free.
        assert!(cb.check("ep-1").is_ok());
        assert!(cb.check("ep-1").is_ok());
        assert_eq!(cb.state("ep-1"), CircuitState::Open);

        // The real acquire still gets the one trial.
        let permit = cb.try_acquire("ep-1").unwrap();
        assert!(cb.check("ep-1").is_err());
        permit.record_success();
        assert!(cb.check("ep-1").is_ok());
    }

    #[test]
    fn test_endpoints_are_independent() {
        let cb = breaker(1, 1000);
        cb.record_failure("ep-1");
        assert_eq!(cb.state("ep-1"), CircuitState::Open);
        assert_eq!(cb.state("ep-2"), CircuitState::Closed);
        cb.try_acquire("ep-2").unwrap().record_success();
        assert_eq!(cb.state("ep-2"), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_concurrent_failures_not_lost() {
        use std::sync::Arc;
        let cb = Arc::new(breaker(1000, 1000));
        let mut handles = Vec::new();
        for _ in 0..100 {
            let cb = cb.clone();
            handles.push(tokio::spawn(async move {
                cb.record_failure("ep-1");
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(cb.failure_count("ep-1"), 100);
    }
}
