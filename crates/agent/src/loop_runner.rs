//! The reasoning loop.
//!
//! The loop sends the conversation to the model; when the model requests
//! capabilities they are dispatched one at a time, in the order the model
//! listed them, and their results are appended before the model is called
//! again. The loop ends when the model answers without requesting any
//! capability, or when the iteration limit is reached.

use std::sync::Arc;

use async_trait::async_trait;
use optimus_core::capability::{CapabilityRegistry, CapabilityRequest, CapabilityResult, CapabilityStatus};
use optimus_core::error::AgentError;
use optimus_core::event::{MODEL_NODE, ReasoningEvent, TOOLS_NODE};
use optimus_core::message::{Message, MessageToolCall};
use optimus_core::provider::{Provider, ProviderRequest};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Returned instead of an answer when the iteration limit is hit.
pub const MAX_ITERATIONS_MESSAGE: &str =
    "I've reached the maximum number of tool call iterations. Please provide further guidance.";

/// Events of one streamed run. An `Err` ends the run.
pub type EventReceiver = mpsc::Receiver<Result<ReasoningEvent, AgentError>>;

/// A constructed reasoning loop, shared by every query on its session.
///
/// Implementations hold no per-query state.
#[async_trait]
pub trait ReasoningLoop: Send + Sync {
    /// Run to completion and return the last model message.
    async fn run(&self, query: &str) -> Result<Message, AgentError>;

    /// Start a run whose events arrive on the returned receiver.
    ///
    /// Dropping the receiver stops the run at its next event.
    async fn stream(&self, query: &str) -> Result<EventReceiver, AgentError>;
}

/// Production loop over a [`Provider`] and a [`CapabilityRegistry`].
#[derive(Clone)]
pub struct ToolCallingLoop {
    provider: Arc<dyn Provider>,
    model: String,
    registry: Arc<CapabilityRegistry>,
    system_prompt: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_iterations: usize,
}

impl ToolCallingLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        registry: Arc<CapabilityRegistry>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            registry,
            system_prompt: system_prompt.into(),
            temperature: 0.0,
            max_tokens: None,
            max_iterations: 10,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Model turns per query. At least one.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn initial_messages(&self, query: &str) -> Vec<Message> {
        vec![Message::system(&self.system_prompt), Message::user(query)]
    }

    fn request(&self, messages: &[Message], stream: bool) -> ProviderRequest {
        ProviderRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: self.registry.definitions(),
            stream,
        }
    }

    /// Dispatch one requested call and wrap the result as a tool message.
    async fn dispatch(&self, call: &MessageToolCall) -> Message {
        let result = match parse_arguments(&call.arguments) {
            Ok(arguments) => {
                self.registry
                    .invoke(&CapabilityRequest {
                        call_id: call.id.clone(),
                        name: call.name.clone(),
                        arguments,
                    })
                    .await
            }
            Err(message) => CapabilityResult {
                call_id: call.id.clone(),
                status: CapabilityStatus::Error,
                payload: json!({
                    "status": "error",
                    "error_type": "ValidationError",
                    "message": message,
                }),
            },
        };

        Message::tool_result(&call.id, &call.name, result.render())
            .with_metadata("status", json!(result.status.as_str()))
    }

    async fn drive(&self, query: &str, tx: mpsc::Sender<Result<ReasoningEvent, AgentError>>) {
        let mut messages = self.initial_messages(query);

        for iteration in 1..=self.max_iterations {
            debug!(iteration, model = %self.model, "Reasoning loop iteration");

            let mut chunks = match self.provider.stream(self.request(&messages, true)).await {
                Ok(rx) => rx,
                Err(e) => {
                    let _ = tx.send(Err(e.into())).await;
                    return;
                }
            };

            let mut content = String::new();
            let mut tool_calls = Vec::new();
            while let Some(chunk) = chunks.recv().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx.send(Err(e.into())).await;
                        return;
                    }
                };
                if let Some(delta) = chunk.content.filter(|d| !d.is_empty()) {
                    content.push_str(&delta);
                    if tx.send(Ok(ReasoningEvent::fragment(delta))).await.is_err() {
                        debug!("Event receiver dropped, stopping run");
                        return;
                    }
                }
                tool_calls.extend(chunk.tool_calls);
                if chunk.done {
                    break;
                }
            }

            if tool_calls.is_empty() {
                info!(iterations = iteration, model = %self.model, "Reasoning loop finished");
                return;
            }

            let mut assistant = Message::assistant(content);
            assistant.tool_calls = tool_calls;
            let calls = assistant.tool_calls.clone();
            messages.push(assistant.clone());
            if tx
                .send(Ok(ReasoningEvent::update(MODEL_NODE, vec![assistant])))
                .await
                .is_err()
            {
                return;
            }

            for call in &calls {
                let result = self.dispatch(call).await;
                messages.push(result.clone());
                if tx
                    .send(Ok(ReasoningEvent::update(TOOLS_NODE, vec![result])))
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }

        warn!(max_iterations = self.max_iterations, "Max tool iterations reached");
        let _ = tx.send(Ok(ReasoningEvent::fragment(MAX_ITERATIONS_MESSAGE))).await;
    }
}

/// Empty argument strings mean "no arguments".
fn parse_arguments(raw: &str) -> Result<Value, String> {
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(raw).map_err(|e| format!("Invalid tool arguments JSON: {e}"))
}

#[async_trait]
impl ReasoningLoop for ToolCallingLoop {
    async fn run(&self, query: &str) -> Result<Message, AgentError> {
        let mut messages = self.initial_messages(query);

        for iteration in 1..=self.max_iterations {
            debug!(iteration, model = %self.model, "Reasoning loop iteration");

            let response = self.provider.complete(self.request(&messages, false)).await?;
            if response.message.tool_calls.is_empty() {
                info!(iterations = iteration, model = %response.model, "Reasoning loop finished");
                return Ok(response.message);
            }

            debug!(tool_count = response.message.tool_calls.len(), "Executing tool calls");
            let calls = response.message.tool_calls.clone();
            messages.push(response.message);
            for call in &calls {
                let result = self.dispatch(call).await;
                messages.push(result);
            }
        }

        warn!(max_iterations = self.max_iterations, "Max tool iterations reached");
        Ok(Message::assistant(MAX_ITERATIONS_MESSAGE))
    }

    async fn stream(&self, query: &str) -> Result<EventReceiver, AgentError> {
        let (tx, rx) = mpsc::channel(16);
        let this = self.clone();
        let query = query.to_string();
        tokio::spawn(async move {
            this.drive(&query, tx).await;
        });
        Ok(rx)
    }
}
