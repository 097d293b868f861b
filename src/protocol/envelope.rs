//! Wire envelope formatting and parsing.
//!
//! # Data Flow
//! ```text
//! Outbound:
//!     Call → validate → JSON-RPC 2.0 envelope (+ _mcp_metadata merge)
//!          → tools/call adapter for allow-listed endpoints
//!          → per-version request transform
//!
//! Inbound:
//!     raw JSON → JSON-RPC branch (result / error / neither)
//!              → legacy branch (status/content/server_id/request_id/timestamp)
//!              → kind-specific success-shape check
//!              → CallResult (always; parsing has no other failure mode)
//! ```
//!
//! # Design Decisions
//! - `parse_result` is total: every malformed payload degrades to an
//!   ERROR-status result carrying the raw response, never an error return
//! - Version-specific behavior lives in small transform tables, so adding
//!   protocol version N+1 only adds a table entry
//! - The tools/call shape is a format adapter keyed by known endpoint
//!   identity, not a generic rule

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::config::ProtocolConfig;
use crate::error::{EngineResult, Fault};
use crate::protocol::types::{Call, CallResult, JsonMap, ResultStatus};
use crate::protocol::validation::{ValidatorFn, ValidatorRegistry};
use crate::protocol::version;

/// A formatted outbound call, ready for the transport.
#[derive(Debug, Clone)]
pub struct FormattedCall {
    /// The JSON-RPC envelope to POST.
    pub envelope: Value,
    /// Generated request id, echoed back as the result's `call_id`.
    pub call_id: String,
    /// Transport-layer headers riding alongside the envelope.
    pub headers: HashMap<String, String>,
}

/// Validates outbound calls, negotiates versions, and converts between
/// calls/results and their wire envelopes.
pub struct ProtocolHandler {
    client_version: String,
    validators: ValidatorRegistry,
    /// Endpoints that only understand the tools/call convention.
    tools_call_endpoints: HashSet<String>,
}

impl ProtocolHandler {
    pub fn new(config: &ProtocolConfig) -> Self {
        Self {
            client_version: config.client_version.clone(),
            validators: ValidatorRegistry::with_builtins(),
            tools_call_endpoints: config.tools_call_endpoints.iter().cloned().collect(),
        }
    }

    pub fn client_version(&self) -> &str {
        &self.client_version
    }

    /// Register a content validator for a new call kind.
    pub fn register_validator(&mut self, kind: impl Into<String>, validator: ValidatorFn) {
        self.validators.register(kind, validator);
    }

    pub fn validate_call(&self, call: &Call) -> EngineResult<()> {
        self.validators.validate(call)
    }

    /// Negotiate a wire version against the endpoint's advertised set.
    pub fn negotiate_version(&self, advertised: &[String]) -> EngineResult<String> {
        version::negotiate_best(&self.client_version, advertised)
    }

    /// Serialize a call into its wire envelope. Fails closed on validation.
    pub fn format_call(
        &self,
        call: &Call,
        negotiated_version: &str,
        endpoint_id: &str,
    ) -> EngineResult<FormattedCall> {
        self.validate_call(call)?;

        let call_id = Uuid::new_v4().to_string();
        let headers = call.headers.clone().unwrap_or_default();

        if self.uses_tools_call_adapter(call, endpoint_id) {
            let envelope = self.format_tools_call(call, &call_id)?;
            return Ok(FormattedCall { envelope, call_id, headers });
        }

        let mut params = call.content.clone();
        if let Some(metadata) = &call.metadata {
            params.insert("_mcp_metadata".into(), Value::Object(metadata.clone()));
        }
        apply_request_transform(negotiated_version, &mut params);

        let envelope = json!({
            "jsonrpc": "2.0",
            "id": call_id,
            "method": call.kind,
            "params": Value::Object(params),
        });
        Ok(FormattedCall { envelope, call_id, headers })
    }

    fn uses_tools_call_adapter(&self, call: &Call, endpoint_id: &str) -> bool {
        if self.tools_call_endpoints.contains(endpoint_id) {
            return true;
        }
        call.preferred_endpoint_id
            .as_deref()
            .map(|id| self.tools_call_endpoints.contains(id))
            .unwrap_or(false)
    }

    fn format_tools_call(&self, call: &Call, call_id: &str) -> EngineResult<Value> {
        let name = call
            .content
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Fault::validation("tools/call endpoints require content.name as a string")
            })?;
        let arguments = call
            .content
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        Ok(json!({
            "jsonrpc": "2.0",
            "method": "tools/call",
            "params": { "name": name, "arguments": arguments },
            "id": call_id,
        }))
    }

    /// Deserialize and validate an inbound response.
    ///
    /// Total: the only caller-visible failure mode is an ERROR-status
    /// result. Anything unparseable comes back with the original payload
    /// under `details.raw_response`.
    pub fn parse_result(
        &self,
        raw: &Value,
        endpoint_id: &str,
        kind: Option<&str>,
        negotiated_version: &str,
    ) -> CallResult {
        match self.parse_inner(raw, endpoint_id, kind, negotiated_version) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    endpoint_id = %endpoint_id,
                    error = %e,
                    "unparseable response, degrading to error result"
                );
                error_result(
                    endpoint_id,
                    "",
                    "-32700",
                    &format!("unparseable response: {}", e.message()),
                    Some(json!({ "raw_response": raw.clone() })),
                )
            }
        }
    }

    fn parse_inner(
        &self,
        raw: &Value,
        endpoint_id: &str,
        kind: Option<&str>,
        negotiated_version: &str,
    ) -> EngineResult<CallResult> {
        let body = raw
            .as_object()
            .ok_or_else(|| Fault::protocol("response is not a JSON object"))?;

        if body.get("jsonrpc").and_then(Value::as_str) == Some("2.0") {
            return Ok(self.parse_jsonrpc(body, endpoint_id, kind));
        }
        Ok(self.parse_legacy(body, endpoint_id, kind, negotiated_version))
    }

    fn parse_jsonrpc(&self, body: &JsonMap, endpoint_id: &str, kind: Option<&str>) -> CallResult {
        let call_id = id_to_string(body.get("id"));

        if let Some(error) = body.get("error") {
            let (code, message, data) = match error.as_object() {
                Some(err) => (
                    err.get("code").map(value_to_code).unwrap_or_else(|| "-1".into()),
                    err.get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("Unknown error")
                        .to_string(),
                    err.get("data").cloned(),
                ),
                None => ("-1".into(), "Unknown error".into(), None),
            };
            return error_result(endpoint_id, &call_id, &code, &message, data);
        }

        if let Some(result) = body.get("result") {
            let content = match result {
                Value::Object(map) => map.clone(),
                other => {
                    let mut map = JsonMap::new();
                    map.insert("result".into(), other.clone());
                    map
                }
            };
            return self.finish_success(content, endpoint_id, &call_id, JsonMap::new(), kind);
        }

        // Neither result nor error: not a valid JSON-RPC response.
        error_result(endpoint_id, &call_id, "-32600", "Invalid response: missing result and error", None)
    }

    fn parse_legacy(
        &self,
        body: &JsonMap,
        endpoint_id: &str,
        kind: Option<&str>,
        negotiated_version: &str,
    ) -> CallResult {
        let mut body = body.clone();
        for (from, to) in response_field_renames(negotiated_version) {
            if let Some(value) = body.remove(*from) {
                body.entry(to.to_string()).or_insert(value);
            }
        }

        for field in ["status", "content", "server_id", "request_id", "timestamp"] {
            if !body.contains_key(field) {
                return error_result(
                    endpoint_id,
                    "",
                    "-32600",
                    &format!("invalid legacy response: missing field {}", field),
                    None,
                );
            }
        }

        let server_id = body
            .get("server_id")
            .and_then(Value::as_str)
            .unwrap_or(endpoint_id)
            .to_string();
        let call_id = id_to_string(body.get("request_id"));
        let timestamp = parse_timestamp(body.get("timestamp"), &server_id);
        let metadata = body
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let content = match body.get("content") {
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                let mut map = JsonMap::new();
                map.insert("result".into(), other.clone());
                map
            }
            None => JsonMap::new(),
        };

        let success = body.get("status").and_then(Value::as_str) == Some("success");
        if !success {
            // Error results always carry error_code and message.
            let mut content = content;
            content
                .entry("error_code")
                .or_insert_with(|| Value::String("-1".into()));
            content
                .entry("message")
                .or_insert_with(|| Value::String("Unknown error".into()));
            return CallResult {
                status: ResultStatus::Error,
                content,
                endpoint_id: server_id,
                call_id,
                timestamp,
                metadata,
            };
        }

        let mut result = self.finish_success(content, &server_id, &call_id, metadata, kind);
        result.timestamp = timestamp;
        result
    }

    /// Apply the kind-specific success-shape check, downgrading violations
    /// to an ERROR result rather than failing the parse.
    fn finish_success(
        &self,
        content: JsonMap,
        endpoint_id: &str,
        call_id: &str,
        metadata: JsonMap,
        kind: Option<&str>,
    ) -> CallResult {
        if let Some(kind) = kind {
            if let Err(violation) = check_success_shape(kind, &content) {
                tracing::warn!(
                    endpoint_id = %endpoint_id,
                    kind = %kind,
                    violation = %violation,
                    "success result failed content shape check"
                );
                return error_result(
                    endpoint_id,
                    call_id,
                    "protocol_violation",
                    &violation,
                    Some(json!({ "raw_content": Value::Object(content) })),
                );
            }
        }
        CallResult {
            status: ResultStatus::Success,
            content,
            endpoint_id: endpoint_id.to_string(),
            call_id: call_id.to_string(),
            timestamp: Utc::now(),
            metadata,
        }
    }
}

/// Per-version outbound transforms. Version 1.0 servers reject unknown
/// streaming directives, so those fields are stripped before send.
fn apply_request_transform(version: &str, params: &mut JsonMap) {
    match version {
        "1.0" => {
            for field in ["stream", "stream_options", "streaming"] {
                params.remove(field);
            }
        }
        _ => {}
    }
}

/// Per-version inbound field renames for the legacy envelope.
fn response_field_renames(version: &str) -> &'static [(&'static str, &'static str)] {
    match version {
        "1.0" => &[("body", "content")],
        _ => &[],
    }
}

/// Kind-specific requirements on a SUCCESS result's content.
fn check_success_shape(kind: &str, content: &JsonMap) -> Result<(), String> {
    match kind {
        "chat" => {
            let message = content
                .get("message")
                .and_then(Value::as_object)
                .ok_or_else(|| "chat result must contain message".to_string())?;
            if !message.contains_key("role") || !message.contains_key("content") {
                return Err("chat result message must contain role and content".into());
            }
            Ok(())
        }
        "embedding" => {
            if !content.contains_key("embedding") && !content.contains_key("embeddings") {
                return Err("embedding result must contain embedding data".into());
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn id_to_string(id: Option<&Value>) -> String {
    match id {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn value_to_code(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => "-1".into(),
    }
}

/// Tolerant timestamp parsing: failures log and substitute now.
fn parse_timestamp(value: Option<&Value>, endpoint_id: &str) -> DateTime<Utc> {
    if let Some(Value::String(raw)) = value {
        match DateTime::parse_from_rfc3339(raw) {
            Ok(ts) => return ts.with_timezone(&Utc),
            Err(e) => {
                tracing::debug!(
                    endpoint_id = %endpoint_id,
                    raw = %raw,
                    error = %e,
                    "unparseable response timestamp, substituting now"
                );
            }
        }
    }
    Utc::now()
}

fn error_result(
    endpoint_id: &str,
    call_id: &str,
    code: &str,
    message: &str,
    details: Option<Value>,
) -> CallResult {
    let mut content = JsonMap::new();
    content.insert("error_code".into(), Value::String(code.into()));
    content.insert("message".into(), Value::String(message.into()));
    if let Some(details) = details {
        content.insert("details".into(), details);
    }
    CallResult {
        status: ResultStatus::Error,
        content,
        endpoint_id: endpoint_id.to_string(),
        call_id: call_id.to_string(),
        timestamp: Utc::now(),
        metadata: JsonMap::new(),
    }
}
