//! Core protocol data types.
//!
//! These types are the contract between the engine and its callers: an
//! outbound [`Call`], an inbound [`CallResult`], and the [`EndpointInfo`]
//! records supplied by the discovery collaborator.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque structured payload carried by calls and results.
pub type JsonMap = Map<String, Value>;

/// A single logical outbound operation.
///
/// `kind` and `content` are always present; everything else is optional.
/// The engine treats `content` as opaque except where a known `kind`
/// mandates a shape (see `protocol::validation`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    /// Operation identifier, e.g. "chat" or "tools/call".
    pub kind: String,

    /// Operation payload; keys depend on `kind`.
    pub content: JsonMap,

    /// Capabilities the endpoint must advertise for this call.
    #[serde(default)]
    pub required_capabilities: Vec<String>,

    /// Endpoint the caller would prefer to handle this call.
    #[serde(default)]
    pub preferred_endpoint_id: Option<String>,

    /// Caller metadata, merged into the envelope under `_mcp_metadata`.
    #[serde(default)]
    pub metadata: Option<JsonMap>,

    /// Extra transport-layer headers; never serialized into the envelope.
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,

    /// Overall deadline for this call, overriding the configured default.
    #[serde(default)]
    pub timeout: Option<Duration>,
}

impl Call {
    pub fn new(kind: impl Into<String>, content: JsonMap) -> Self {
        Self {
            kind: kind.into(),
            content,
            required_capabilities: Vec::new(),
            preferred_endpoint_id: None,
            metadata: None,
            headers: None,
            timeout: None,
        }
    }

    pub fn with_metadata(mut self, metadata: JsonMap) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_required_capabilities(mut self, caps: Vec<String>) -> Self {
        self.required_capabilities = caps;
        self
    }
}

/// Outcome classification of a [`CallResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Error,
}

/// The outcome of a [`Call`].
///
/// An ERROR-status result means the server answered with an application
/// error; it is still an `Ok` return from the transport. Invariant: error
/// results always carry `error_code` and `message` in `content`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallResult {
    pub status: ResultStatus,

    /// Success payload, or `error_code`/`message`/`details` on error.
    pub content: JsonMap,

    /// The endpoint that produced this result.
    pub endpoint_id: String,

    /// Correlates to the request id that produced this result.
    pub call_id: String,

    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub metadata: JsonMap,
}

impl CallResult {
    pub fn is_success(&self) -> bool {
        self.status == ResultStatus::Success
    }

    /// Error code, present on every ERROR-status result.
    pub fn error_code(&self) -> Option<&str> {
        self.content.get("error_code").and_then(Value::as_str)
    }

    /// Error message, present on every ERROR-status result.
    pub fn error_message(&self) -> Option<&str> {
        self.content.get("message").and_then(Value::as_str)
    }
}

/// How to probe an endpoint for liveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthCheckMode {
    /// GET first, fall back to the POST ping only on 405.
    #[default]
    Auto,
    /// Lightweight GET against the health URL.
    Get,
    /// Minimal JSON-RPC ping over POST.
    Post,
}

/// An endpoint record supplied by the discovery collaborator.
///
/// The engine never mutates or persists these beyond the current call or
/// health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointInfo {
    /// Unique endpoint identifier, also the circuit breaker key.
    pub endpoint_id: String,

    /// Base URL calls are POSTed to.
    pub url: String,

    /// Probe URL; defaults to `url` when absent.
    #[serde(default)]
    pub health_check_url: Option<String>,

    #[serde(default)]
    pub health_check_mode: HealthCheckMode,

    /// Opaque signer configuration; absence means unauthenticated.
    #[serde(default)]
    pub auth_config: Option<Value>,

    /// Capabilities this endpoint advertises. Empty means unknown, which
    /// disables the pre-flight capability check.
    #[serde(default)]
    pub capabilities: HashSet<String>,

    /// Protocol versions the endpoint advertises. Empty means the
    /// discovery layer supplied no version data; the client assumes its
    /// own version is understood.
    #[serde(default)]
    pub protocol_versions: Vec<String>,
}

impl EndpointInfo {
    pub fn new(endpoint_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            endpoint_id: endpoint_id.into(),
            url: url.into(),
            health_check_url: None,
            health_check_mode: HealthCheckMode::Auto,
            auth_config: None,
            capabilities: HashSet::new(),
            protocol_versions: Vec::new(),
        }
    }

    /// URL to probe for liveness.
    pub fn health_url(&self) -> &str {
        self.health_check_url.as_deref().unwrap_or(&self.url)
    }
}
