//! Built-in capabilities for Optimus.
//!
//! Capabilities give the assistant the ability to act: query the
//! operations database, call a webhook, look up company documents, do
//! arithmetic, send mail and search.

pub mod calculator;
pub mod http_request;
pub mod rag_lookup;
pub mod search;
pub mod send_mail;
pub mod sql_fetch;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use optimus_config::{AppConfig, HttpMode, ToolsConfig};
use optimus_core::capability::CapabilityRegistry;
use optimus_core::error::CapabilityError;
use optimus_core::store::RelationalStore;
use optimus_rag::RetrievalEngine;
use optimus_security::UrlAllowlist;

pub use calculator::{CalculatorCapability, EvalError, evaluate};
pub use http_request::{HttpCall, HttpRequestCapability, HttpResponse, HttpTransport, MockTransport, ReqwestTransport};
pub use rag_lookup::RagLookupCapability;
pub use search::SearchCapability;
pub use send_mail::SendMailCapability;
pub use sql_fetch::SqlFetchCapability;

/// The transport selected by `tools.http_mode`.
pub fn http_transport(config: &ToolsConfig) -> Result<Box<dyn HttpTransport>, CapabilityError> {
    Ok(match config.http_mode {
        HttpMode::Live => Box::new(ReqwestTransport::new(Duration::from_secs(
            config.http_timeout_secs,
        ))?),
        HttpMode::Mock => Box::new(MockTransport),
    })
}

/// Registry with all six built-in capabilities.
pub fn default_registry(
    config: &AppConfig,
    relational: Arc<dyn RelationalStore>,
    retrieval: Arc<RetrievalEngine>,
    transport: Box<dyn HttpTransport>,
) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry.register(Box::new(SqlFetchCapability::new(relational)));
    registry.register(Box::new(HttpRequestCapability::new(
        UrlAllowlist::new(config.tools.http_allowlist.iter().cloned()),
        transport,
    )));
    registry.register(Box::new(RagLookupCapability::new(retrieval, config.rag.default_top_k)));
    registry.register(Box::new(CalculatorCapability));
    registry.register(Box::new(SendMailCapability));
    registry.register(Box::new(SearchCapability));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::WordEmbedder;
    use optimus_core::capability::{CapabilityRequest, CapabilityStatus};
    use optimus_rag::Chunker;
    use optimus_store::{InMemoryChunkStore, NoDatabase};
    use serde_json::json;

    fn registry() -> CapabilityRegistry {
        let engine = RetrievalEngine::new(
            Arc::new(InMemoryChunkStore::new()),
            Arc::new(WordEmbedder),
            Chunker::default(),
        );
        default_registry(
            &AppConfig::default(),
            Arc::new(NoDatabase),
            Arc::new(engine),
            Box::new(MockTransport),
        )
    }

    fn request(name: &str, arguments: serde_json::Value) -> CapabilityRequest {
        CapabilityRequest {
            call_id: "call_1".into(),
            name: name.into(),
            arguments,
        }
    }

    #[test]
    fn registers_all_six() {
        assert_eq!(
            registry().names(),
            vec!["calculator", "http_request", "rag_lookup", "search", "send_mail", "sql_fetch"]
        );
    }

    #[tokio::test]
    async fn policy_violation_is_normalized() {
        let result = registry()
            .invoke(&request("sql_fetch", json!({"query": "DELETE FROM orders"})))
            .await;
        assert_eq!(result.status, CapabilityStatus::Error);
        assert_eq!(result.payload["status"], "error");
        assert_eq!(result.payload["error_type"], "PolicyViolation");
        assert_eq!(
            result.payload["message"],
            "Only SELECT statements are allowed in sql_fetch tool"
        );
    }

    #[tokio::test]
    async fn calculator_through_dispatch() {
        let registry = registry();
        let ok = registry
            .invoke(&request("calculator", json!({"expression": "-5^2"})))
            .await;
        assert_eq!(ok.status, CapabilityStatus::Ok);
        assert_eq!(ok.payload["result"], -25.0);

        let bad = registry
            .invoke(&request("calculator", json!({"expression": "__import__('os')"})))
            .await;
        assert_eq!(bad.payload["error_type"], "ValidationError");
    }

    #[tokio::test]
    async fn missing_database_is_upstream_failure() {
        let result = registry()
            .invoke(&request("sql_fetch", json!({"query": "SELECT 1"})))
            .await;
        assert_eq!(result.payload["error_type"], "UpstreamFailure");
    }

    #[tokio::test]
    async fn unknown_capability() {
        let result = registry().invoke(&request("shell", json!({}))).await;
        assert_eq!(result.payload["error_type"], "UnknownCapability");
    }

    #[test]
    fn transport_follows_mode() {
        let mut config = ToolsConfig::default();
        assert!(http_transport(&config).is_ok());
        config.http_mode = HttpMode::Mock;
        assert!(http_transport(&config).is_ok());
    }
}
