//! Metrics collection.
//!
//! # Responsibilities
//! - Record call attempts, outcomes, and latency per endpoint
//! - Track retries, circuit breaker transitions, and probe results
//!
//! # Metrics
//! - `mcp_calls_total` (counter): calls by endpoint, outcome
//! - `mcp_call_duration_seconds` (histogram): end-to-end call latency
//! - `mcp_retries_total` (counter): retry attempts by endpoint
//! - `mcp_circuit_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `mcp_endpoint_health` (gauge): 1=healthy, 0=unhealthy
//!
//! # Design Decisions
//! - Uses the `metrics` facade only; the exporter/registry is an external
//!   collaborator and the macros no-op without one
//! - Low-cardinality labels: endpoint id and outcome class, never call ids

use std::time::Duration;

use crate::resilience::circuit_breaker::CircuitState;

/// Record the outcome of a completed call.
pub fn record_call(endpoint_id: &str, outcome: &'static str) {
    metrics::counter!(
        "mcp_calls_total",
        "endpoint" => endpoint_id.to_string(),
        "outcome" => outcome,
    )
    .increment(1);
}

/// Record end-to-end call latency.
pub fn record_call_duration(endpoint_id: &str, duration: Duration) {
    metrics::histogram!(
        "mcp_call_duration_seconds",
        "endpoint" => endpoint_id.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Record a retry attempt.
pub fn record_retry(endpoint_id: &str) {
    metrics::counter!(
        "mcp_retries_total",
        "endpoint" => endpoint_id.to_string(),
    )
    .increment(1);
}

/// Record a circuit breaker state transition.
pub fn record_circuit_transition(endpoint_id: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    metrics::gauge!(
        "mcp_circuit_state",
        "endpoint" => endpoint_id.to_string(),
    )
    .set(value);
}

/// Record a health probe result.
pub fn record_endpoint_health(endpoint_id: &str, healthy: bool) {
    metrics::gauge!(
        "mcp_endpoint_health",
        "endpoint" => endpoint_id.to_string(),
    )
    .set(if healthy { 1.0 } else { 0.0 });
}
