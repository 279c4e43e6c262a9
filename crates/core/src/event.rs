//! Reasoning events: what a running reasoning loop yields.
//!
//! Events are consumed exactly once, in arrival order, by the streaming
//! pipeline that labels them and extracts the final answer.

use serde::{Deserialize, Serialize};
use crate::message::Message;

/// Name of the graph node that produced an update.
pub const MODEL_NODE: &str = "model";
pub const TOOLS_NODE: &str = "tools";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReasoningEvent {
    /// A step completed: the model requested capabilities, or capabilities
    /// returned results.
    Update { node: String, messages: Vec<Message> },

    /// A piece of model output text.
    FinalFragment { delta: String },
}

impl ReasoningEvent {
    pub fn update(node: impl Into<String>, messages: Vec<Message>) -> Self {
        Self::Update {
            node: node.into(),
            messages,
        }
    }

    pub fn fragment(delta: impl Into<String>) -> Self {
        Self::FinalFragment { delta: delta.into() }
    }
}
