//! Document retrieval capability.

use std::sync::Arc;

use async_trait::async_trait;
use optimus_core::capability::{Capability, required_str};
use optimus_core::error::CapabilityError;
use optimus_rag::{RagError, RetrievalEngine, clamp_top_k};
use serde_json::{Value, json};

pub struct RagLookupCapability {
    engine: Arc<RetrievalEngine>,
    default_top_k: usize,
}

impl RagLookupCapability {
    pub fn new(engine: Arc<RetrievalEngine>, default_top_k: usize) -> Self {
        Self {
            engine,
            default_top_k,
        }
    }
}

/// `top_k` from the arguments: absent means the default, numbers are clamped.
fn top_k_argument(arguments: &Value, default: usize) -> Result<usize, CapabilityError> {
    match arguments.get("top_k") {
        None | Some(Value::Null) => Ok(clamp_top_k(default as i64)),
        Some(v) => v
            .as_i64()
            .or_else(|| v.as_f64().map(|f| f as i64))
            .map(clamp_top_k)
            .ok_or_else(|| CapabilityError::InvalidArguments("'top_k' must be an integer".into())),
    }
}

#[async_trait]
impl Capability for RagLookupCapability {
    fn name(&self) -> &str {
        "rag_lookup"
    }

    fn description(&self) -> &str {
        "Look up relevant passages in the indexed company documents (policies, manuals). \
         Returns the most similar chunks with a similarity score."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "What to look up" },
                "top_k": {
                    "type": "integer",
                    "description": "Number of chunks to return (1-20)",
                    "default": self.default_top_k,
                    "minimum": 1,
                    "maximum": 20
                }
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, CapabilityError> {
        let query = required_str(&arguments, "query")?;
        let top_k = top_k_argument(&arguments, self.default_top_k)?;

        let chunks = self.engine.query(query, top_k).await.map_err(|e| match e {
            RagError::Validation(msg) => CapabilityError::InvalidArguments(msg),
            other => CapabilityError::UpstreamFailure(other.to_string()),
        })?;

        serde_json::to_value(chunks).map_err(|e| CapabilityError::UpstreamFailure(e.to_string()))
    }
}
