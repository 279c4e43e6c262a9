//! OpenAI-compatible provider implementation.
//!
//! Serves both configured backends: OpenAI itself and Google Gemini through
//! its OpenAI-compatible endpoint.
//!
//! Supports:
//! - Chat completions (non-streaming and streaming SSE)
//! - Tool use / function calling
//! - Embeddings

use async_trait::async_trait;
use futures::StreamExt;
use optimus_core::error::ProviderError;
use optimus_core::message::{Message, MessageToolCall, Role};
use optimus_core::provider::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::System => "system".into(),
                    Role::Tool => "tool".into(),
                },
                content: Some(m.content.clone()),
                tool_calls: (!m.tool_calls.is_empty()).then(|| {
                    m.tool_calls
                        .iter()
                        .map(|tc| ApiToolCall {
                            id: tc.id.clone(),
                            r#type: "function".into(),
                            function: ApiFunction {
                                name: tc.name.clone(),
                                arguments: tc.arguments.clone(),
                            },
                        })
                        .collect()
                }),
                tool_call_id: m.tool_call_id.clone(),
            })
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn chat_body(request: &ProviderRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": stream,
        });

        if stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        body
    }

    /// POST a JSON body and map non-success statuses to provider errors.
    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
        accept_sse: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/{path}", self.base_url);
        let mut builder = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body);
        if accept_sse {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        match status {
            200 => Ok(response),
            429 => Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            }),
            401 | 403 => Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            )),
            _ => {
                let error_body = response.text().await.unwrap_or_default();
                warn!(provider = %self.name, status, body = %error_body, "Provider returned error");
                Err(ProviderError::ApiError {
                    status_code: status,
                    message: error_body,
                })
            }
        }
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self
            .post("chat/completions", &Self::chat_body(&request, false), false)
            .await?;

        let api_response: ApiResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse response: {e}"),
        })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })?;

        let mut message = Message::assistant(choice.message.content.unwrap_or_default());
        message.tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| MessageToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        Ok(ProviderResponse {
            message,
            usage: api_response.usage.map(Usage::from),
            model: api_response.model,
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let response = self
            .post("chat/completions", &Self::chat_body(&request, true), true)
            .await?;

        let (tx, rx) = mpsc::channel(64);
        let provider_name = self.name.clone();

        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut decoder = SseDecoder::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                for chunk in decoder.push(&String::from_utf8_lossy(&bytes), &provider_name) {
                    let done = chunk.done;
                    if tx.send(Ok(chunk)).await.is_err() {
                        return; // receiver dropped
                    }
                    if done {
                        return;
                    }
                }
            }

            // Stream ended without [DONE]
            let _ = tx.send(Ok(decoder.finish())).await;
        });

        Ok(rx)
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        debug!(
            provider = %self.name,
            model = %request.model,
            count = request.inputs.len(),
            "Sending embedding request"
        );

        let body = serde_json::json!({
            "model": request.model,
            "input": request.inputs,
            "encoding_format": "float",
        });
        let response = self.post("embeddings", &body, false).await?;

        let api_resp: EmbeddingApiResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse embedding response: {e}"),
        })?;

        Ok(api_resp.into_response())
    }
}

/// Incremental decoder for an OpenAI-style SSE completion stream.
///
/// Content deltas are emitted as they arrive. Tool call fragments are
/// accumulated by index and emitted, in index order, on the final chunk.
#[derive(Default)]
struct SseDecoder {
    buffer: String,
    tool_calls: BTreeMap<u32, ToolCallAccumulator>,
    usage: Option<Usage>,
}

impl SseDecoder {
    fn push(&mut self, text: &str, provider_name: &str) -> Vec<StreamChunk> {
        self.buffer.push_str(text);
        let mut out = Vec::new();

        while let Some(line_end) = self.buffer.find('\n') {
            let line = self.buffer[..line_end].trim_end_matches('\r').to_string();
            self.buffer.drain(..=line_end);

            // Skip empty lines and SSE comments
            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();

            if data == "[DONE]" {
                out.push(self.finish());
                return out;
            }

            match serde_json::from_str::<StreamResponse>(data) {
                Ok(resp) => {
                    if let Some(choice) = resp.choices.first() {
                        self.accumulate(&choice.delta);
                        if let Some(content) = choice.delta.content.as_ref().filter(|c| !c.is_empty()) {
                            out.push(StreamChunk {
                                content: Some(content.clone()),
                                ..StreamChunk::default()
                            });
                        }
                    }
                    if let Some(usage) = resp.usage {
                        self.usage = Some(usage.into());
                    }
                }
                Err(e) => {
                    trace!(provider = %provider_name, data = %data, error = %e, "Ignoring unparseable SSE chunk");
                }
            }
        }

        out
    }

    fn accumulate(&mut self, delta: &StreamDelta) {
        for tc in delta.tool_calls.iter().flatten() {
            let acc = self.tool_calls.entry(tc.index).or_default();
            if let Some(id) = &tc.id {
                acc.id = id.clone();
            }
            if let Some(func) = &tc.function {
                if let Some(name) = &func.name {
                    acc.name = name.clone();
                }
                if let Some(args) = &func.arguments {
                    acc.arguments.push_str(args);
                }
            }
        }
    }

    fn finish(&mut self) -> StreamChunk {
        StreamChunk {
            content: None,
            tool_calls: std::mem::take(&mut self.tool_calls)
                .into_values()
                .map(ToolCallAccumulator::into_tool_call)
                .collect(),
            done: true,
            usage: self.usage.take(),
        }
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

impl From<ApiUsage> for Usage {
    fn from(u: ApiUsage) -> Self {
        Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

// --- Embedding API types ---

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

impl EmbeddingApiResponse {
    /// Vectors in input order, whatever order the server listed them in.
    fn into_response(mut self) -> EmbeddingResponse {
        self.data.sort_by_key(|d| d.index);
        EmbeddingResponse {
            embeddings: self.data.into_iter().map(|d| d.embedding).collect(),
            model: self.model,
        }
    }
}

// --- Streaming SSE types ---

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct StreamToolCallDelta {
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Default)]
struct ToolCallAccumulator {
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallAccumulator {
    fn into_tool_call(self) -> MessageToolCall {
        MessageToolCall {
            id: self.id,
            name: self.name,
            arguments: self.arguments,
        }
    }
}
