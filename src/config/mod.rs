//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → EngineConfig (validated, immutable)
//!     → consumed once at Transport construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a new Transport takes a new config
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CircuitBreakerConfig, EngineConfig, HealthCheckConfig, ProtocolConfig, RetryConfig,
    TransportConfig,
};
