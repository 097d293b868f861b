//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the engine.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the client engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Protocol settings (client version, format adapters).
    pub protocol: ProtocolConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Health probe settings.
    pub health_check: HealthCheckConfig,

    /// HTTP transport settings.
    pub transport: TransportConfig,
}

/// Protocol-level settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// The protocol version this client speaks natively.
    pub client_version: String,

    /// Endpoint ids that only understand the tools/call envelope shape.
    pub tools_call_endpoints: Vec<String>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            client_version: crate::protocol::version::CLIENT_PROTOCOL_VERSION.to_string(),
            tools_call_endpoints: Vec::new(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub backoff_factor_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,

    /// Seconds the circuit stays open before admitting a trial call.
    pub reset_timeout_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_secs: 60,
        }
    }
}

/// Health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Probe timeout in seconds, independent of the call timeout.
    pub timeout_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self { timeout_secs: 5 }
    }
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Default overall per-call deadline in seconds; a call's own timeout
    /// overrides it.
    pub request_timeout_secs: u64,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Maximum idle pooled connections per host.
    pub max_idle_per_host: usize,

    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 5,
            max_idle_per_host: 32,
            user_agent: concat!("mcp-engine/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
