//! The transport: orchestrates protocol handling, resilience, and HTTP.
//!
//! # Data Flow
//! ```text
//! send_request(endpoint, call)
//!     → validate call + capability pre-flight
//!     → negotiate protocol version
//!     → format envelope, sign via RequestSigner
//!     → retry loop under the overall per-call deadline:
//!         circuit gate → POST → outcome feeds the breaker
//!         → retryable? sleep jittered backoff, repeat
//!     → parse_result (total) → CallResult
//! ```
//!
//! # Design Decisions
//! - One pooled HTTP client for the transport's lifetime, released exactly
//!   once and idempotently by `close()` — never a process-wide singleton
//! - A known-bad endpoint is rejected before negotiation and signing; the
//!   per-attempt gate then covers circuits that open mid-loop
//! - An attempt cancelled mid-flight still counts against the breaker: its
//!   circuit permit records a failure when dropped without an outcome
//! - An ERROR-status CallResult is an `Ok` return; a `Fault` means the
//!   call never got a meaningful answer

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use crate::config::schema::EngineConfig;
use crate::config::validation::validate_config;
use crate::error::{EngineResult, Fault};
use crate::health::HealthProber;
use crate::observability::metrics;
use crate::protocol::envelope::{FormattedCall, ProtocolHandler};
use crate::protocol::types::{Call, CallResult, EndpointInfo};
use crate::protocol::validation::ValidatorFn;
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::resilience::retries::should_retry;
use crate::transport::auth::{RequestSigner, SignerError};

/// Outcome of one HTTP attempt, before retry classification.
enum AttemptError {
    /// The server answered with a non-success HTTP status.
    Status(u16),
    /// The request never produced an HTTP response.
    Connection(String),
}

/// Client-side protocol engine transport.
pub struct Transport {
    config: EngineConfig,
    /// Pooled client; `None` after close.
    client: Mutex<Option<reqwest::Client>>,
    protocol: ProtocolHandler,
    breaker: CircuitBreaker,
    signer: Option<Arc<dyn RequestSigner>>,
}

impl Transport {
    /// Build a transport from a validated configuration.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        if let Err(errors) = validate_config(&config) {
            let summary = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Fault::validation(format!("invalid engine config: {}", summary)));
        }

        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(config.transport.max_idle_per_host)
            .tcp_keepalive(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(config.transport.connect_timeout_secs))
            .user_agent(config.transport.user_agent.clone())
            .build()
            .map_err(|e| Fault::transport(format!("failed to build http client: {}", e)))?;

        let protocol = ProtocolHandler::new(&config.protocol);
        let breaker = CircuitBreaker::new(
            config.circuit_breaker.failure_threshold,
            Duration::from_secs(config.circuit_breaker.reset_timeout_secs),
        );

        tracing::info!(
            client_version = %config.protocol.client_version,
            max_retries = config.retries.max_retries,
            failure_threshold = config.circuit_breaker.failure_threshold,
            "transport initialized"
        );

        Ok(Self {
            config,
            client: Mutex::new(Some(client)),
            protocol,
            breaker,
            signer: None,
        })
    }

    /// Attach the external request signer.
    pub fn with_signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Register a content validator for a new call kind.
    pub fn register_validator(&mut self, kind: impl Into<String>, validator: ValidatorFn) {
        self.protocol.register_validator(kind, validator);
    }

    /// Current circuit state for an endpoint.
    pub fn circuit_state(&self, endpoint_id: &str) -> CircuitState {
        self.breaker.state(endpoint_id)
    }

    /// Send a call to an endpoint.
    ///
    /// Returns `Ok` for any response the server produced, including
    /// application errors (ERROR-status results). Returns a `Fault` when
    /// the call never got a meaningful answer: validation failure, version
    /// incompatibility, open circuit, credentials failure, exhausted
    /// retries, or deadline expiry.
    pub async fn send_request(
        &self,
        endpoint: &EndpointInfo,
        call: &Call,
    ) -> EngineResult<CallResult> {
        let http = self.pooled_client()?;
        let started = Instant::now();
        let outcome = self.send_inner(&http, endpoint, call).await;

        let label = match &outcome {
            Ok(result) if result.is_success() => "success",
            Ok(_) => "server_error",
            Err(fault) => fault.kind().as_str(),
        };
        metrics::record_call(&endpoint.endpoint_id, label);
        metrics::record_call_duration(&endpoint.endpoint_id, started.elapsed());
        outcome
    }

    async fn send_inner(
        &self,
        http: &reqwest::Client,
        endpoint: &EndpointInfo,
        call: &Call,
    ) -> EngineResult<CallResult> {
        self.protocol.validate_call(call)?;
        self.check_capabilities(endpoint, call)?;

        if let Err(e) = url::Url::parse(&endpoint.url) {
            return Err(Fault::validation(format!(
                "invalid endpoint url '{}': {}",
                endpoint.url, e
            )));
        }

        // Fail fast on a known-bad endpoint before spending negotiation
        // and signer work on the call. The read-only check leaves any
        // half-open trial slot for the attempt loop's gate to claim.
        self.breaker.check(&endpoint.endpoint_id)?;

        let version = self.protocol.negotiate_version(&endpoint.protocol_versions)?;
        let formatted = self
            .protocol
            .format_call(call, &version, &endpoint.endpoint_id)?;
        let headers = self.sign_request(endpoint, &formatted).await?;

        let deadline = call
            .timeout
            .unwrap_or(Duration::from_secs(self.config.transport.request_timeout_secs));

        let attempts = self.attempt_loop(http, endpoint, &formatted, &headers, &call.kind, &version);
        match tokio::time::timeout(deadline, attempts).await {
            Ok(outcome) => outcome,
            Err(_) => {
                // An attempt cancelled mid-flight is recorded by its
                // dropped permit; a deadline firing during a backoff sleep
                // adds nothing, since that attempt was already counted.
                tracing::warn!(
                    endpoint_id = %endpoint.endpoint_id,
                    timeout_ms = deadline.as_millis() as u64,
                    "call deadline exceeded"
                );
                Err(Fault::transport(format!(
                    "call deadline of {}ms exceeded",
                    deadline.as_millis()
                ))
                .with_detail("timeout_ms", json!(deadline.as_millis() as u64)))
            }
        }
    }

    fn check_capabilities(&self, endpoint: &EndpointInfo, call: &Call) -> EngineResult<()> {
        // An empty advertised set means capabilities are unknown; the
        // pre-flight check only applies when discovery supplied them.
        if endpoint.capabilities.is_empty() {
            return Ok(());
        }
        let missing: Vec<&str> = call
            .required_capabilities
            .iter()
            .filter(|cap| !endpoint.capabilities.contains(*cap))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(Fault::validation(format!(
            "endpoint {} lacks required capabilities: {}",
            endpoint.endpoint_id,
            missing.join(", ")
        ))
        .with_detail("missing_capabilities", json!(missing)))
    }

    async fn sign_request(
        &self,
        endpoint: &EndpointInfo,
        formatted: &FormattedCall,
    ) -> EngineResult<std::collections::HashMap<String, String>> {
        let mut headers = formatted.headers.clone();
        let signer = match (&self.signer, &endpoint.auth_config) {
            (Some(signer), Some(_)) => signer,
            _ => return Ok(headers),
        };
        match signer
            .sign("POST", &endpoint.url, &headers, &formatted.envelope, endpoint)
            .await
        {
            Ok(auth_headers) => {
                headers.extend(auth_headers);
                Ok(headers)
            }
            Err(SignerError::Credentials(message)) => {
                Err(Fault::authentication(message))
            }
            Err(SignerError::Other(message)) => {
                tracing::warn!(
                    endpoint_id = %endpoint.endpoint_id,
                    error = %message,
                    "signer failed, proceeding unauthenticated"
                );
                Ok(headers)
            }
        }
    }

    async fn attempt_loop(
        &self,
        http: &reqwest::Client,
        endpoint: &EndpointInfo,
        formatted: &FormattedCall,
        headers: &std::collections::HashMap<String, String>,
        kind: &str,
        version: &str,
    ) -> EngineResult<CallResult> {
        let retry_cfg = &self.config.retries;
        let mut attempt: u32 = 0;
        loop {
            let permit = self.breaker.try_acquire(&endpoint.endpoint_id)?;

            let status = match self.attempt_once(http, endpoint, formatted, headers).await {
                Ok(raw) => {
                    permit.record_success();
                    return Ok(self.protocol.parse_result(
                        &raw,
                        &endpoint.endpoint_id,
                        Some(kind),
                        version,
                    ));
                }
                Err(AttemptError::Status(status)) => {
                    permit.record_failure();
                    tracing::warn!(
                        endpoint_id = %endpoint.endpoint_id,
                        status = status,
                        attempt = attempt,
                        "call attempt failed: http status"
                    );
                    Some(status)
                }
                Err(AttemptError::Connection(message)) => {
                    permit.record_failure();
                    tracing::warn!(
                        endpoint_id = %endpoint.endpoint_id,
                        error = %message,
                        attempt = attempt,
                        "call attempt failed: connection error"
                    );
                    None
                }
            };

            if !should_retry(status, attempt, retry_cfg.max_retries) {
                let mut fault = Fault::transport(format!(
                    "call to endpoint {} failed after {} attempts",
                    endpoint.endpoint_id,
                    attempt + 1
                ))
                .with_detail("attempts", json!(attempt + 1));
                if let Some(status) = status {
                    fault = fault.with_detail("status", json!(status));
                }
                return Err(fault);
            }

            attempt += 1;
            metrics::record_retry(&endpoint.endpoint_id);
            let delay = calculate_backoff(attempt, retry_cfg.backoff_factor_ms, retry_cfg.max_delay_ms);
            tracing::debug!(
                endpoint_id = %endpoint.endpoint_id,
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                "backing off before retry"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt_once(
        &self,
        http: &reqwest::Client,
        endpoint: &EndpointInfo,
        formatted: &FormattedCall,
        headers: &std::collections::HashMap<String, String>,
    ) -> Result<Value, AttemptError> {
        let mut request = http.post(&endpoint.url).json(&formatted.envelope);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AttemptError::Connection(e.to_string()))?;

        let status = response.status().as_u16();
        if status >= 400 {
            return Err(AttemptError::Status(status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AttemptError::Connection(format!("failed to read body: {}", e)))?;
        // Non-JSON bodies flow into parse_result, which degrades them to
        // an ERROR result carrying the raw payload.
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }

    /// Check endpoint liveness, honoring its configured probe mode.
    ///
    /// An endpoint with an open circuit is reported unhealthy without a
    /// network call; a successful probe while half-open closes the circuit.
    pub async fn check_server_health(&self, endpoint: &EndpointInfo) -> bool {
        let http = match self.pooled_client() {
            Ok(http) => http,
            Err(_) => return false,
        };

        let permit = match self.breaker.try_acquire(&endpoint.endpoint_id) {
            Ok(permit) => permit,
            Err(fault) => {
                tracing::debug!(
                    endpoint_id = %endpoint.endpoint_id,
                    reason = %fault,
                    "skipping health probe"
                );
                metrics::record_endpoint_health(&endpoint.endpoint_id, false);
                return false;
            }
        };

        let prober = HealthProber::new(
            http,
            Duration::from_secs(self.config.health_check.timeout_secs),
        );
        let healthy = prober.probe(endpoint).await;
        if healthy {
            permit.record_success();
        } else {
            permit.record_failure();
        }
        healthy
    }

    /// Release the pooled connection client. Idempotent; subsequent calls
    /// through this transport fail with a TRANSPORT fault.
    pub fn close(&self) {
        let mut slot = self.client.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.take().is_some() {
            tracing::info!("transport closed, connection pool released");
        }
    }

    /// Whether `close()` has been called.
    pub fn is_closed(&self) -> bool {
        self.client
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }

    fn pooled_client(&self) -> EngineResult<reqwest::Client> {
        self.client
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or_else(|| Fault::transport("transport is closed"))
    }
}
