//! Client-facing stream frames.
//!
//! Every reasoning event is mapped to a stable vocabulary (kind, status,
//! label) that a UI can render as an execution timeline, and serialized as a
//! text-event-stream frame:
//!
//! - `agent_step` with kind `tool_call` (status `pending`) for each
//!   capability the model requested
//! - `agent_step` with kind `tool_result` (status `ok` or `error`) for each
//!   capability result
//! - `agent_step` with kind `thought` (status `in_progress`) for anything else
//! - `final_answer` carrying the whole answer so far

use optimus_core::capability::CapabilityStatus;
use optimus_core::event::ReasoningEvent;
use optimus_core::message::{Message, Role};
use serde::{Deserialize, Serialize};

/// Longest preview, in characters, before truncation.
pub const PREVIEW_CHARS: usize = 160;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    AgentStep { step: Step },
    FinalAnswer { content: String },
}

impl Frame {
    pub fn final_answer(content: impl Into<String>) -> Self {
        Self::FinalAnswer {
            content: content.into(),
        }
    }

    /// `data: <json>\n\n`
    pub fn to_sse(&self) -> String {
        let data = serde_json::to_string(self).unwrap_or_default();
        format!("data: {data}\n\n")
    }

    pub fn frame_type(&self) -> &'static str {
        match self {
            Self::AgentStep { .. } => "agent_step",
            Self::FinalAnswer { .. } => "final_answer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    ToolCall,
    ToolResult,
    Thought,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Ok,
    Error,
}

impl From<CapabilityStatus> for StepStatus {
    fn from(status: CapabilityStatus) -> Self {
        match status {
            CapabilityStatus::Ok => Self::Ok,
            CapabilityStatus::Error => Self::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Loop node that produced the update (`model`, `tools`)
    pub node: String,
    pub label: String,
    pub status: StepStatus,
    pub kind: StepKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Serialized as `tool_call_id`, the key the web client reads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    pub messages: Vec<SerializedMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<&Message> for SerializedMessage {
    fn from(message: &Message) -> Self {
        Self {
            kind: message.role.as_str().to_string(),
            content: message.content.clone(),
            name: message.name.clone(),
        }
    }
}

/// Human label for a capability call.
pub fn call_label(capability: &str) -> String {
    match capability {
        "sql_fetch" => "Querying the database".into(),
        "http_request" => "Calling an external API".into(),
        "rag_lookup" => "Searching company documents".into(),
        "calculator" => "Calculating".into(),
        "send_mail" => "Sending email".into(),
        "search" => "Searching the web".into(),
        other => format!("Running {other}"),
    }
}

/// Human label for a capability result.
pub fn result_label(capability: &str) -> String {
    match capability {
        "sql_fetch" => "Database results".into(),
        "http_request" => "API response".into(),
        "rag_lookup" => "Relevant documents".into(),
        "calculator" => "Calculation result".into(),
        "send_mail" => "Email status".into(),
        "search" => "Search results".into(),
        other => format!("{other} result"),
    }
}

pub const THOUGHT_LABEL: &str = "Thinking";

/// Truncate to [`PREVIEW_CHARS`] characters, appending `…` when cut.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

/// Result status: explicit metadata first, then the payload itself.
fn result_status(message: &Message) -> CapabilityStatus {
    match message.status() {
        Some(marker) => CapabilityStatus::from_marker(marker),
        None => CapabilityStatus::infer(&message.content),
    }
}

/// Map one reasoning event to step frames, in message order.
///
/// Final fragments produce no step frame; they belong to answer extraction.
pub fn label_event(event: &ReasoningEvent) -> Vec<Frame> {
    let ReasoningEvent::Update { node, messages } = event else {
        return Vec::new();
    };

    let mut frames = Vec::new();
    let mut thought_messages = Vec::new();

    for message in messages {
        match message.role {
            Role::Assistant if !message.tool_calls.is_empty() => {
                for call in &message.tool_calls {
                    frames.push(Frame::AgentStep {
                        step: Step {
                            node: node.clone(),
                            label: call_label(&call.name),
                            status: StepStatus::Pending,
                            kind: StepKind::ToolCall,
                            tool_name: Some(call.name.clone()),
                            tool_call_id: Some(call.id.clone()),
                            preview: Some(preview(&call.arguments)),
                            messages: vec![message.into()],
                        },
                    });
                }
            }
            Role::Tool => {
                let name = message.name.clone().unwrap_or_default();
                frames.push(Frame::AgentStep {
                    step: Step {
                        node: node.clone(),
                        label: result_label(&name),
                        status: result_status(message).into(),
                        kind: StepKind::ToolResult,
                        tool_name: message.name.clone(),
                        tool_call_id: message.tool_call_id.clone(),
                        preview: Some(preview(&message.content)),
                        messages: vec![message.into()],
                    },
                });
            }
            _ => thought_messages.push(SerializedMessage::from(message)),
        }
    }

    if frames.is_empty() || !thought_messages.is_empty() {
        frames.push(Frame::AgentStep {
            step: Step {
                node: node.clone(),
                label: THOUGHT_LABEL.into(),
                status: StepStatus::InProgress,
                kind: StepKind::Thought,
                tool_name: None,
                tool_call_id: None,
                preview: None,
                messages: thought_messages,
            },
        });
    }

    frames
}
