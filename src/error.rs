//! Engine fault taxonomy.
//!
//! # Responsibilities
//! - Classify every failure the engine can surface to a caller
//! - Carry structured detail maps for diagnostics
//!
//! # Design Decisions
//! - Faults are values, not panics; nothing inside the engine unwinds
//! - Response parsing never produces a `Fault` directly — it degrades to an
//!   ERROR-status `CallResult` instead (see `protocol::envelope`)
//! - Callers can branch on `kind()` without destructuring

use serde_json::{Map, Value};
use thiserror::Error;

/// Discriminant for [`Fault`], useful for matching and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Malformed call, caught before any network activity.
    Validation,
    /// Version mismatch or response shape violation.
    Protocol,
    /// Connection failure, timeout, exhausted retries, bad HTTP status.
    Transport,
    /// The request signer reported a credentials problem.
    Authentication,
    /// The circuit breaker is open for this endpoint.
    ServerUnavailable,
}

impl FaultKind {
    /// Stable lowercase label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::Validation => "validation",
            FaultKind::Protocol => "protocol",
            FaultKind::Transport => "transport",
            FaultKind::Authentication => "authentication",
            FaultKind::ServerUnavailable => "server_unavailable",
        }
    }
}

/// Errors raised across the engine boundary.
///
/// A `Fault` means "the call never got a meaningful answer". A server that
/// answered with an application-level error produces an ERROR-status
/// [`crate::protocol::CallResult`], not a `Fault`.
#[derive(Debug, Error)]
pub enum Fault {
    /// The call failed structural validation.
    #[error("validation error: {message}")]
    Validation { message: String, details: Map<String, Value> },

    /// Protocol-level incompatibility with the endpoint.
    #[error("protocol error: {message}")]
    Protocol { message: String, details: Map<String, Value> },

    /// The request could not be delivered or answered.
    #[error("transport error: {message}")]
    Transport { message: String, details: Map<String, Value> },

    /// The signer collaborator could not authenticate the request.
    #[error("authentication error: {message}")]
    Authentication { message: String, details: Map<String, Value> },

    /// The endpoint's circuit is open; the call was not attempted.
    #[error("server unavailable: {message}")]
    ServerUnavailable { message: String, details: Map<String, Value> },
}

impl Fault {
    pub fn validation(message: impl Into<String>) -> Self {
        Fault::Validation { message: message.into(), details: Map::new() }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Fault::Protocol { message: message.into(), details: Map::new() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Fault::Transport { message: message.into(), details: Map::new() }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Fault::Authentication { message: message.into(), details: Map::new() }
    }

    pub fn server_unavailable(message: impl Into<String>) -> Self {
        Fault::ServerUnavailable { message: message.into(), details: Map::new() }
    }

    /// Attach a detail entry, consuming and returning the fault.
    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details_mut().insert(key.into(), value);
        self
    }

    pub fn kind(&self) -> FaultKind {
        match self {
            Fault::Validation { .. } => FaultKind::Validation,
            Fault::Protocol { .. } => FaultKind::Protocol,
            Fault::Transport { .. } => FaultKind::Transport,
            Fault::Authentication { .. } => FaultKind::Authentication,
            Fault::ServerUnavailable { .. } => FaultKind::ServerUnavailable,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Fault::Validation { message, .. }
            | Fault::Protocol { message, .. }
            | Fault::Transport { message, .. }
            | Fault::Authentication { message, .. }
            | Fault::ServerUnavailable { message, .. } => message,
        }
    }

    pub fn details(&self) -> &Map<String, Value> {
        match self {
            Fault::Validation { details, .. }
            | Fault::Protocol { details, .. }
            | Fault::Transport { details, .. }
            | Fault::Authentication { details, .. }
            | Fault::ServerUnavailable { details, .. } => details,
        }
    }

    fn details_mut(&mut self) -> &mut Map<String, Value> {
        match self {
            Fault::Validation { details, .. }
            | Fault::Protocol { details, .. }
            | Fault::Transport { details, .. }
            | Fault::Authentication { details, .. }
            | Fault::ServerUnavailable { details, .. } => details,
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, Fault>;
