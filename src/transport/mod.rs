//! Transport subsystem.
//!
//! # Data Flow
//! ```text
//! caller → client.rs Transport.send_request
//!        → circuit breaker gate
//!        → protocol handler (negotiate, format)
//!        → auth.rs RequestSigner
//!        → pooled HTTP call, retry loop with backoff
//!        → protocol handler (parse)
//!        → caller
//! ```
//!
//! # Design Decisions
//! - The transport owns the pooled client and the breaker map; they are
//!   the only shared mutable state
//! - Signing is a trait seam: the engine never interprets auth_config
//! - Worker-per-call: each send_request runs on its caller's task

pub mod auth;
pub mod client;

pub use auth::{RequestSigner, SignerError};
pub use client::Transport;
