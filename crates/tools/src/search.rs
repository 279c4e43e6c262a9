//! Search capability: deterministic synthetic results, no network.

use async_trait::async_trait;
use optimus_core::capability::{Capability, required_str};
use optimus_core::error::CapabilityError;
use serde::Serialize;
use serde_json::{Value, json};

const RESULT_COUNT: usize = 3;

pub struct SearchCapability;

#[derive(Debug, Serialize)]
struct SearchResult {
    title: String,
    snippet: String,
    url: String,
}

#[async_trait]
impl Capability for SearchCapability {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search internal and external information sources for a query. Returns titles, \
         snippets and URLs."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "The search query" }
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, CapabilityError> {
        let query = required_str(&arguments, "query")?;
        serde_json::to_value(results_for(query))
            .map_err(|e| CapabilityError::UpstreamFailure(e.to_string()))
    }
}

fn results_for(query: &str) -> Vec<SearchResult> {
    (1..=RESULT_COUNT)
        .map(|i| SearchResult {
            title: format!("Result {i} for {query}"),
            snippet: format!("This is a mock search snippet {i} about '{query}'."),
            url: format!("https://example.com/{i}"),
        })
        .collect()
}
