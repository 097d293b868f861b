//! Client-side protocol engine for JSON-RPC-over-HTTP MCP servers.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │                 TRANSPORT                     │
//!   Call ────────────┼─▶ circuit gate ─▶ protocol ─▶ auth ─▶ retry  │
//!                    │    (breaker)      (format)   (signer)  loop  │
//!                    │                                         │    │
//!   CallResult ◀─────┼── protocol (parse) ◀── pooled HTTP ◀────┘    │
//!                    │                                               │
//!                    │  ┌─────────────────────────────────────────┐ │
//!                    │  │          Cross-Cutting Concerns          │ │
//!                    │  │  config │ health probe │ observability  │ │
//!                    │  └─────────────────────────────────────────┘ │
//!                    └──────────────────────────────────────────────┘
//! ```
//!
//! The engine validates and formats outbound calls, negotiates a wire
//! protocol version per endpoint, and drives every call through a retry
//! loop guarded by a per-endpoint circuit breaker. Response parsing is
//! total: a server that answered — however malformed — always yields a
//! [`CallResult`]; a [`Fault`] is reserved for calls that never got a
//! meaningful answer.

// Core subsystems
pub mod config;
pub mod error;
pub mod protocol;
pub mod transport;

// Traffic management
pub mod health;
pub mod resilience;

// Cross-cutting concerns
pub mod observability;

pub use config::EngineConfig;
pub use error::{Fault, FaultKind};
pub use protocol::{Call, CallResult, EndpointInfo, HealthCheckMode, ResultStatus};
pub use resilience::CircuitState;
pub use transport::{RequestSigner, SignerError, Transport};
