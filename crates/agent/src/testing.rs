//! Shared test doubles for loop, pipeline and service tests.

use std::sync::Mutex;

use async_trait::async_trait;
use optimus_core::error::ProviderError;
use optimus_core::message::{Message, MessageToolCall};
use optimus_core::provider::{
    ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage,
};
use tokio::sync::mpsc;

/// A provider that returns a sequence of scripted responses.
///
/// Each call returns the next response in the queue and records the
/// request. Panics if more calls are made than responses provided.
/// Streamed responses arrive word by word, with any tool calls on the
/// closing chunk.
pub struct ScriptedProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    failure: Option<ProviderError>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            failure: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            failure: Some(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            panic!("ScriptedProvider: no more responses (call #{call})");
        }
        Ok(responses.remove(0))
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.next(request)
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        let response = self.next(request)?;
        let words: Vec<String> = response
            .message
            .content
            .split_inclusive(' ')
            .map(str::to_string)
            .collect();

        let (tx, rx) = mpsc::channel(words.len() + 1);
        for word in words {
            let _ = tx
                .send(Ok(StreamChunk {
                    content: Some(word),
                    ..Default::default()
                }))
                .await;
        }
        let _ = tx
            .send(Ok(StreamChunk {
                content: None,
                tool_calls: response.message.tool_calls,
                done: true,
                usage: response.usage,
            }))
            .await;
        Ok(rx)
    }
}

fn usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// A plain text response (no tool calls).
pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: usage(),
        model: "mock-model".into(),
    }
}

/// A response requesting tool calls, with optional thought content.
pub fn tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    let mut message = Message::assistant(thought);
    message.tool_calls = tool_calls;
    ProviderResponse {
        message,
        usage: usage(),
        model: "mock-model".into(),
    }
}

/// A tool call with id `call_<name>`.
pub fn tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: args.to_string(),
    }
}
