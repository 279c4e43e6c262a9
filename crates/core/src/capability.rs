//! Capability trait and registry.
//!
//! Capabilities are what let the assistant act: look rows up, call a
//! webhook, search documents, do arithmetic, send mail. Each one validates
//! its own arguments and returns a JSON payload. The registry normalizes
//! every failure into an error payload so the reasoning loop always gets a
//! result back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};
use crate::error::CapabilityError;
use crate::provider::ToolDefinition;

/// A request to invoke a capability, issued by the reasoning loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityRequest {
    /// Matches the model's tool call id
    pub call_id: String,

    pub name: String,

    /// Arguments as a JSON object
    pub arguments: Value,
}

/// Outcome classification of a capability invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityStatus {
    Ok,
    Error,
}

impl CapabilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }

    /// Parse an explicit status marker. `"error"` is the only failing value;
    /// anything else a handler reports (`"sent"`, `"indexed"`, ...) is a success.
    pub fn from_marker(marker: &str) -> Self {
        if marker.eq_ignore_ascii_case("error") {
            Self::Error
        } else {
            Self::Ok
        }
    }

    /// Classify a payload that carries no out-of-band status.
    ///
    /// A `status` field on a JSON object wins. Otherwise falls back to a
    /// substring check on the rendered payload, which misclassifies legitimate
    /// content mentioning "error".
    pub fn infer(rendered: &str) -> Self {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(rendered) {
            if let Some(marker) = map.get("status").and_then(Value::as_str) {
                return Self::from_marker(marker);
            }
        }
        if rendered.to_ascii_lowercase().contains("error") {
            Self::Error
        } else {
            Self::Ok
        }
    }
}

/// The normalized result of one capability invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityResult {
    pub call_id: String,
    pub status: CapabilityStatus,
    pub payload: Value,
}

impl CapabilityResult {
    /// Text fed back to the model. Strings are passed through unquoted.
    pub fn render(&self) -> String {
        match &self.payload {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// The core Capability trait.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Unique name the model calls this capability by (e.g. "sql_fetch").
    fn name(&self) -> &str;

    /// What this capability does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing the arguments.
    fn parameters_schema(&self) -> Value;

    /// Run the capability. Policy checks happen before any side effect.
    async fn invoke(&self, arguments: Value) -> std::result::Result<Value, CapabilityError>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Fetch a required string argument.
pub fn required_str<'a>(arguments: &'a Value, key: &str) -> std::result::Result<&'a str, CapabilityError> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| CapabilityError::InvalidArguments(format!("Missing '{key}' parameter")))
}

/// Name → handler table.
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Box<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            capabilities: HashMap::new(),
        }
    }

    /// Register a capability. Replaces any existing one with the same name.
    pub fn register(&mut self, capability: Box<dyn Capability>) {
        let name = capability.name().to_string();
        self.capabilities.insert(name, capability);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Capability> {
        self.capabilities.get(name).map(|c| c.as_ref())
    }

    /// Definitions for the model, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<_> = self.capabilities.values().map(|c| c.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Invoke a capability by name. Never fails: errors become payloads of
    /// the form `{status: "error", error_type, message}`.
    pub async fn invoke(&self, request: &CapabilityRequest) -> CapabilityResult {
        let start = Instant::now();
        let outcome = match self.capabilities.get(&request.name) {
            Some(capability) => capability.invoke(request.arguments.clone()).await,
            None => Err(CapabilityError::NotFound(request.name.clone())),
        };

        match outcome {
            Ok(payload) => {
                debug!(
                    capability = %request.name,
                    call_id = %request.call_id,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Capability succeeded"
                );
                CapabilityResult {
                    call_id: request.call_id.clone(),
                    status: CapabilityStatus::Ok,
                    payload,
                }
            }
            Err(e) => {
                warn!(
                    capability = %request.name,
                    call_id = %request.call_id,
                    error_type = e.error_type(),
                    error = %e,
                    "Capability failed"
                );
                CapabilityResult {
                    call_id: request.call_id.clone(),
                    status: CapabilityStatus::Error,
                    payload: json!({
                        "status": "error",
                        "error_type": e.error_type(),
                        "message": e.to_string(),
                    }),
                }
            }
        }
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.capabilities.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
