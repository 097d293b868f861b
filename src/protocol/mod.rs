//! Protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call:
//!     Call → validation.rs (per-kind registry)
//!          → version.rs (negotiate against endpoint's advertised set)
//!          → envelope.rs (JSON-RPC envelope + per-version transform)
//!
//! Inbound response:
//!     raw JSON → envelope.rs (JSON-RPC or legacy parse, shape checks)
//!              → CallResult (total; never an error return)
//! ```
//!
//! # Design Decisions
//! - Call content is opaque except where a known kind mandates shape
//! - Unknown kinds pass validation (server-defined extension calls)
//! - All version skew logic lives here; the transport never inspects
//!   envelopes

pub mod envelope;
pub mod types;
pub mod validation;
pub mod version;

pub use envelope::{FormattedCall, ProtocolHandler};
pub use types::{Call, CallResult, EndpointInfo, HealthCheckMode, JsonMap, ResultStatus};
pub use validation::ValidatorRegistry;
pub use version::CLIENT_PROTOCOL_VERSION;
