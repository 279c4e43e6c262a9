//! Provider trait: the abstraction over the language model.
//!
//! A Provider sends a conversation to a model and returns either a complete
//! assistant message or a stream of deltas. It can also embed text, which the
//! retrieval engine uses for both ingestion and queries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use crate::error::ProviderError;
use crate::message::{Message, MessageToolCall};

/// A single model call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// Model name as understood by the provider (e.g. "gpt-4o-mini")
    pub model: String,

    pub messages: Vec<Message>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Capabilities the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    #[serde(default)]
    pub stream: bool,
}

fn default_temperature() -> f32 {
    0.0
}

/// A capability definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,

    pub description: String,

    /// JSON Schema describing the parameters
    pub parameters: serde_json::Value,
}

/// A complete (non-streaming) response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub message: Message,

    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A single chunk in a streaming response.
///
/// Content arrives as deltas. Tool calls arrive fully assembled, on the
/// chunk that carries them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    #[serde(default)]
    pub done: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// An embedding request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// The model to use for embeddings (e.g., "text-embedding-3-small").
    pub model: String,

    /// The texts to embed.
    pub inputs: Vec<String>,
}

/// An embedding response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// One vector per input text, in input order.
    pub embeddings: Vec<Vec<f32>>,

    pub model: String,
}

/// Receiving side of a streamed completion.
pub type ChunkReceiver = mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>;

/// The core Provider trait.
///
/// The reasoning loop calls `complete()` or `stream()` without knowing which
/// backend sits behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "google").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Send a request and get a stream of response chunks.
    ///
    /// Default implementation calls `complete()` and wraps the result as a single chunk.
    async fn stream(&self, request: ProviderRequest) -> std::result::Result<ChunkReceiver, ProviderError> {
        let response = self.complete(request).await?;
        let (tx, rx) = mpsc::channel(1);
        let _ = tx
            .send(Ok(StreamChunk {
                content: Some(response.message.content),
                tool_calls: response.message.tool_calls,
                done: true,
                usage: response.usage,
            }))
            .await;
        Ok(rx)
    }

    /// Generate embeddings for the given texts.
    async fn embed(
        &self,
        _request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, ProviderError> {
        Err(ProviderError::NotConfigured(format!(
            "Provider '{}' does not support embeddings",
            self.name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned;

    #[async_trait]
    impl Provider for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                message: Message::assistant("hello"),
                usage: None,
                model: "m".into(),
            })
        }
    }

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![Message::user("hi")],
            temperature: default_temperature(),
            max_tokens: None,
            tools: vec![],
            stream: true,
        }
    }

    #[tokio::test]
    async fn default_stream_wraps_complete() {
        let mut rx = Canned.stream(request()).await.unwrap();
        let chunk = rx.recv().await.unwrap().unwrap();
        assert_eq!(chunk.content.as_deref(), Some("hello"));
        assert!(chunk.done);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn default_embed_is_not_configured() {
        let err = Canned
            .embed(EmbeddingRequest {
                model: "e".into(),
                inputs: vec!["x".into()],
            })
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn tool_definition_serialization() {
        let tool = ToolDefinition {
            name: "calculator".into(),
            description: "Evaluate arithmetic".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": { "expression": { "type": "string" } },
                "required": ["expression"]
            }),
        };
        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("calculator"));
        assert!(json.contains("expression"));
    }
}
