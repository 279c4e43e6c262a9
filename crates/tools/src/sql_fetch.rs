//! Read-only SQL capability.

use std::sync::Arc;

use async_trait::async_trait;
use optimus_core::capability::{Capability, required_str};
use optimus_core::error::CapabilityError;
use optimus_core::store::RelationalStore;
use optimus_security::SqlPolicy;
use serde_json::{Value, json};
use tracing::debug;

pub struct SqlFetchCapability {
    store: Arc<dyn RelationalStore>,
}

impl SqlFetchCapability {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Capability for SqlFetchCapability {
    fn name(&self) -> &str {
        "sql_fetch"
    }

    fn description(&self) -> &str {
        "Execute a read-only SQL query (SELECT only) against the operations database and \
         return the rows as objects."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "A single SELECT statement"
                }
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, CapabilityError> {
        let query = required_str(&arguments, "query")?;
        SqlPolicy::check(query).map_err(|e| CapabilityError::PolicyViolation(e.to_string()))?;

        let rows = self
            .store
            .fetch(query)
            .await
            .map_err(|e| CapabilityError::UpstreamFailure(e.to_string()))?;
        debug!(rows = rows.len(), "sql_fetch complete");

        Ok(Value::Array(rows.into_iter().map(Value::Object).collect()))
    }
}
