//! Structured logging initialization.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for embedding applications
//! - Respect RUST_LOG, falling back to a sensible engine default
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging throughout the engine
//! - Initialization is optional: hosts that already install a subscriber
//!   simply skip this, and `try_init` keeps double-init harmless

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a tracing subscriber with env-filter support.
///
/// Safe to call when a subscriber is already installed; the second init is
/// a no-op.
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mcp_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
