//! Endpoint liveness probing.
//!
//! # Responsibilities
//! - Probe an endpoint with a lightweight GET or a JSON-RPC ping over POST
//! - In AUTO mode, fall back from GET to POST only on 405 Method Not Allowed
//! - Keep probes on a short fixed timeout, independent of call timeouts
//!
//! # Design Decisions
//! - Any status < 400 counts as healthy: the goal is reachability, not
//!   protocol correctness
//! - The prober shares the transport's pooled client but overrides the
//!   per-request timeout
//! - Circuit breaker interaction lives in the transport, not here

use std::time::Duration;

use serde_json::json;
use uuid::Uuid;

use crate::observability::metrics;
use crate::protocol::types::{EndpointInfo, HealthCheckMode};

/// Determines whether an endpoint is currently reachable and responsive.
pub struct HealthProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl HealthProber {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Probe the endpoint according to its configured mode.
    pub async fn probe(&self, endpoint: &EndpointInfo) -> bool {
        let healthy = match endpoint.health_check_mode {
            HealthCheckMode::Get => self.probe_get(endpoint).await.map(|s| s < 400).unwrap_or(false),
            HealthCheckMode::Post => self.probe_post(endpoint).await,
            HealthCheckMode::Auto => match self.probe_get(endpoint).await {
                // 405: the endpoint does not speak GET; try the ping.
                Ok(405) => self.probe_post(endpoint).await,
                Ok(status) => status < 400,
                Err(()) => false,
            },
        };
        metrics::record_endpoint_health(&endpoint.endpoint_id, healthy);
        healthy
    }

    async fn probe_get(&self, endpoint: &EndpointInfo) -> Result<u16, ()> {
        let outcome = self
            .client
            .get(endpoint.health_url())
            .timeout(self.timeout)
            .send()
            .await;
        match outcome {
            Ok(response) => Ok(response.status().as_u16()),
            Err(e) => {
                tracing::warn!(
                    endpoint_id = %endpoint.endpoint_id,
                    error = %e,
                    "health check GET failed"
                );
                Err(())
            }
        }
    }

    async fn probe_post(&self, endpoint: &EndpointInfo) -> bool {
        let ping = json!({
            "jsonrpc": "2.0",
            "id": Uuid::new_v4().to_string(),
            "method": "ping",
            "params": {},
        });
        let outcome = self
            .client
            .post(endpoint.health_url())
            .timeout(self.timeout)
            .json(&ping)
            .send()
            .await;
        match outcome {
            Ok(response) => {
                let status = response.status().as_u16();
                if status >= 400 {
                    tracing::warn!(
                        endpoint_id = %endpoint.endpoint_id,
                        status = status,
                        "health check ping failed: non-success status"
                    );
                }
                status < 400
            }
            Err(e) => {
                tracing::warn!(
                    endpoint_id = %endpoint.endpoint_id,
                    error = %e,
                    "health check ping failed"
                );
                false
            }
        }
    }
}
