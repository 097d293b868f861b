//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms via the metrics facade)
//!
//! Consumers:
//!     → the host application's subscriber and metrics exporter
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event (endpoint_id, status, error)
//! - Metrics are cheap facade calls; no exporter is bundled
//! - The host owns subscriber and exporter installation

pub mod logging;
pub mod metrics;
