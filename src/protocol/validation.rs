//! Per-kind call validation.
//!
//! # Responsibilities
//! - Enforce the structural rules common to every call
//! - Deep-validate content for known kinds via a registry
//! - Pass unknown kinds through (server-defined extension calls)
//!
//! # Design Decisions
//! - Registry of `kind → validator fn`, not a central branch chain; new
//!   kinds are added by registration
//! - Validation runs before any network activity and fails closed

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{EngineResult, Fault};
use crate::protocol::types::Call;

/// A structural validator for one call kind.
pub type ValidatorFn = fn(&Call) -> EngineResult<()>;

/// Registry mapping call kinds to their content validators.
pub struct ValidatorRegistry {
    validators: HashMap<String, ValidatorFn>,
}

impl ValidatorRegistry {
    /// Empty registry; every kind passes the common checks only.
    pub fn new() -> Self {
        Self { validators: HashMap::new() }
    }

    /// Registry seeded with the built-in kinds.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("chat", validate_chat);
        registry.register("embedding", validate_embedding);
        registry.register("generation", validate_generation);
        registry.register("action", validate_action);
        registry
    }

    /// Register (or replace) the validator for a kind.
    pub fn register(&mut self, kind: impl Into<String>, validator: ValidatorFn) {
        self.validators.insert(kind.into(), validator);
    }

    /// Validate a call: common rules first, then the kind validator if one
    /// is registered. Unknown kinds pass.
    pub fn validate(&self, call: &Call) -> EngineResult<()> {
        if call.kind.is_empty() {
            return Err(Fault::validation("call kind must not be empty"));
        }
        if let Some(timeout) = call.timeout {
            if timeout.is_zero() {
                return Err(Fault::validation("call timeout must be strictly positive"));
            }
        }
        match self.validators.get(&call.kind) {
            Some(validator) => validator(call),
            None => Ok(()),
        }
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn validate_chat(call: &Call) -> EngineResult<()> {
    let messages = call
        .content
        .get("messages")
        .ok_or_else(|| Fault::validation("chat call requires content.messages"))?;
    let messages = messages
        .as_array()
        .ok_or_else(|| Fault::validation("chat content.messages must be a list"))?;
    for (i, message) in messages.iter().enumerate() {
        let obj = message.as_object().ok_or_else(|| {
            Fault::validation(format!("chat message {} must be a map", i))
        })?;
        if !obj.contains_key("role") || !obj.contains_key("content") {
            return Err(Fault::validation(format!(
                "chat message {} must contain role and content",
                i
            )));
        }
    }
    Ok(())
}

fn validate_embedding(call: &Call) -> EngineResult<()> {
    let text = call
        .content
        .get("text")
        .ok_or_else(|| Fault::validation("embedding call requires content.text"))?;
    let ok = match text {
        Value::String(_) => true,
        Value::Array(items) => items.iter().all(Value::is_string),
        _ => false,
    };
    if !ok {
        return Err(Fault::validation(
            "embedding content.text must be a string or a list of strings",
        ));
    }
    Ok(())
}

fn validate_generation(call: &Call) -> EngineResult<()> {
    match call.content.get("prompt") {
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err(Fault::validation("generation content.prompt must be a string")),
        None => Err(Fault::validation("generation call requires content.prompt")),
    }
}

fn validate_action(call: &Call) -> EngineResult<()> {
    match call.content.get("action") {
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err(Fault::validation("action content.action must be a string")),
        None => Err(Fault::validation("action call requires content.action")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::JsonMap;
    use serde_json::json;
    use std::time::Duration;

    fn call_with(kind: &str, content: Value) -> Call {
        let map = match content {
            Value::Object(map) => map,
            other => {
                let mut map = JsonMap::new();
                map.insert("value".into(), other);
                map
            }
        };
        Call::new(kind, map)
    }

    #[test]
    fn test_chat_accepts_well_formed() {
        let registry = ValidatorRegistry::with_builtins();
        let call = call_with(
            "chat",
            json!({"messages": [{"role": "user", "content": "hi"}]}),
        );
        assert!(registry.validate(&call).is_ok());
    }

    #[test]
    fn test_chat_rejects_missing_messages() {
        let registry = ValidatorRegistry::with_builtins();
        let call = call_with("chat", json!({"prompt": "hi"}));
        assert!(registry.validate(&call).is_err());
    }

    #[test]
    fn test_chat_rejects_message_without_role() {
        let registry = ValidatorRegistry::with_builtins();
        let call = call_with("chat", json!({"messages": [{"content": "hi"}]}));
        assert!(registry.validate(&call).is_err());
    }

    #[test]
    fn test_embedding_accepts_string_and_list() {
        let registry = ValidatorRegistry::with_builtins();
        assert!(registry
            .validate(&call_with("embedding", json!({"text": "hello"})))
            .is_ok());
        assert!(registry
            .validate(&call_with("embedding", json!({"text": ["a", "b"]})))
            .is_ok());
    }

    #[test]
    fn test_embedding_rejects_mixed_list() {
        let registry = ValidatorRegistry::with_builtins();
        let call = call_with("embedding", json!({"text": ["a", 3]}));
        assert!(registry.validate(&call).is_err());
    }

    #[test]
    fn test_generation_requires_string_prompt() {
        let registry = ValidatorRegistry::with_builtins();
        assert!(registry
            .validate(&call_with("generation", json!({"prompt": "write"})))
            .is_ok());
        assert!(registry
            .validate(&call_with("generation", json!({"prompt": 42})))
            .is_err());
    }

    #[test]
    fn test_action_requires_action_field() {
        let registry = ValidatorRegistry::with_builtins();
        assert!(registry
            .validate(&call_with("action", json!({"action": "restart"})))
            .is_ok());
        assert!(registry.validate(&call_with("action", json!({}))).is_err());
    }

    #[test]
    fn test_unknown_kind_passes_through() {
        let registry = ValidatorRegistry::with_builtins();
        let call = call_with("custom/extension", json!({"anything": true}));
        assert!(registry.validate(&call).is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let registry = ValidatorRegistry::with_builtins();
        let call = call_with("chat", json!({"messages": []}))
            .with_timeout(Duration::from_secs(0));
        assert!(registry.validate(&call).is_err());
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = ValidatorRegistry::with_builtins();
        registry.register("search", |call| {
            call.content
                .get("query")
                .and_then(Value::as_str)
                .map(|_| ())
                .ok_or_else(|| Fault::validation("search requires content.query"))
        });
        assert!(registry
            .validate(&call_with("search", json!({"query": "rust"})))
            .is_ok());
        assert!(registry.validate(&call_with("search", json!({}))).is_err());
    }
}
