//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check value ranges (timeouts and thresholds strictly positive)
//! - Check the client version is one the downgrade chain knows
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: EngineConfig → Result<(), Vec<ValidationError>>
//! - Runs before a config is accepted into the engine

use crate::config::schema::EngineConfig;
use crate::protocol::version;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut require_positive = |field: &str, value: u64| {
        if value == 0 {
            errors.push(ValidationError {
                field: field.to_string(),
                message: "must be strictly positive".to_string(),
            });
        }
    };

    require_positive("retries.backoff_factor_ms", config.retries.backoff_factor_ms);
    require_positive("retries.max_delay_ms", config.retries.max_delay_ms);
    require_positive(
        "circuit_breaker.failure_threshold",
        config.circuit_breaker.failure_threshold as u64,
    );
    require_positive(
        "circuit_breaker.reset_timeout_secs",
        config.circuit_breaker.reset_timeout_secs,
    );
    require_positive("health_check.timeout_secs", config.health_check.timeout_secs);
    require_positive(
        "transport.request_timeout_secs",
        config.transport.request_timeout_secs,
    );
    require_positive(
        "transport.connect_timeout_secs",
        config.transport.connect_timeout_secs,
    );

    if config.retries.max_delay_ms < config.retries.backoff_factor_ms {
        errors.push(ValidationError {
            field: "retries.max_delay_ms".to_string(),
            message: "must be >= retries.backoff_factor_ms".to_string(),
        });
    }

    if !version::is_known_version(&config.protocol.client_version) {
        errors.push(ValidationError {
            field: "protocol.client_version".to_string(),
            message: format!(
                "unknown protocol version {}",
                config.protocol.client_version
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
