//! Request signing seam.
//!
//! # Responsibilities
//! - Define the contract the external signer collaborator implements
//! - Distinguish credentials problems (abort the call) from other signer
//!   failures (log and proceed unauthenticated)
//!
//! # Design Decisions
//! - The distinction is a typed enum, not error-text sniffing; signers
//!   wrapping unstructured upstream errors can use `from_text` as the
//!   documented fallback classifier

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::protocol::types::EndpointInfo;

/// Errors a [`RequestSigner`] can report.
#[derive(Debug, Error)]
pub enum SignerError {
    /// The signer's credentials are missing, expired, or rejected. The
    /// call aborts with an AUTHENTICATION fault.
    #[error("credentials error: {0}")]
    Credentials(String),

    /// Any other signer failure. The call proceeds unauthenticated.
    #[error("signer error: {0}")]
    Other(String),
}

impl SignerError {
    /// Fallback classifier for signers that only have unstructured error
    /// text from an upstream library.
    pub fn from_text(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("credential")
            || lower.contains("authentication")
            || lower.contains("unauthorized")
        {
            SignerError::Credentials(message)
        } else {
            SignerError::Other(message)
        }
    }
}

/// External collaborator that adds authentication headers to a request.
///
/// Keyed by the endpoint's `auth_config`; the engine never interprets that
/// value itself.
#[async_trait]
pub trait RequestSigner: Send + Sync {
    /// Produce the authentication headers for one outbound request.
    async fn sign(
        &self,
        method: &str,
        url: &str,
        headers: &HashMap<String, String>,
        body: &Value,
        endpoint: &EndpointInfo,
    ) -> Result<HashMap<String, String>, SignerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_classifies_credentials() {
        assert!(matches!(
            SignerError::from_text("invalid credentials for role x"),
            SignerError::Credentials(_)
        ));
        assert!(matches!(
            SignerError::from_text("Authentication token expired"),
            SignerError::Credentials(_)
        ));
        assert!(matches!(
            SignerError::from_text("401 Unauthorized"),
            SignerError::Credentials(_)
        ));
    }

    #[test]
    fn test_from_text_defaults_to_other() {
        assert!(matches!(
            SignerError::from_text("connection reset by peer"),
            SignerError::Other(_)
        ));
    }
}
