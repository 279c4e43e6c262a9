//! Per-query frame pipeline: labeling plus answer extraction.

use optimus_core::event::ReasoningEvent;

use crate::extraction::FinalAnswerExtractor;
use crate::frame::{Frame, label_event};

/// Turns the ordered reasoning events of one query into frames.
///
/// Holds the query's extraction state, so it is never shared between
/// queries.
#[derive(Debug, Default)]
pub struct FramePipeline {
    extractor: FinalAnswerExtractor,
}

impl FramePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: &ReasoningEvent) -> Vec<Frame> {
        match event {
            ReasoningEvent::FinalFragment { delta } => self
                .extractor
                .push(delta)
                .map(Frame::final_answer)
                .into_iter()
                .collect(),
            ReasoningEvent::Update { messages, .. } => {
                if messages.iter().any(|m| !m.tool_calls.is_empty()) {
                    self.extractor.reset();
                }
                label_event(event)
            }
        }
    }

    /// End of stream.
    pub fn finish(self) -> Option<Frame> {
        self.extractor.finish().map(Frame::final_answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::StepKind;
    use optimus_core::event::{MODEL_NODE, TOOLS_NODE};
    use optimus_core::message::{Message, MessageToolCall};

    fn kinds(frames: &[Frame]) -> Vec<String> {
        frames
            .iter()
            .map(|f| match f {
                Frame::AgentStep { step } => match step.kind {
                    StepKind::ToolCall => "call".to_string(),
                    StepKind::ToolResult => "result".to_string(),
                    StepKind::Thought => "thought".to_string(),
                },
                Frame::FinalAnswer { content } => format!("answer:{content}"),
            })
            .collect()
    }

    #[test]
    fn frames_follow_event_order() {
        let mut call = Message::assistant("");
        call.tool_calls.push(MessageToolCall {
            id: "call_a".into(),
            name: "sql_fetch".into(),
            arguments: r#"{"sql":"SELECT 1"}"#.into(),
        });

        let events = vec![
            ReasoningEvent::update(MODEL_NODE, vec![call]),
            ReasoningEvent::update(TOOLS_NODE, vec![Message::tool_result("call_a", "sql_fetch", "[]")]),
            ReasoningEvent::update("summarize", vec![]),
            ReasoningEvent::fragment("<FINAL_ANSWER>No rows."),
        ];

        let mut pipeline = FramePipeline::new();
        let mut frames = Vec::new();
        for event in &events {
            frames.extend(pipeline.push(event));
        }
        frames.extend(pipeline.finish());

        assert_eq!(kinds(&frames), vec!["call", "result", "thought", "answer:No rows."]);
    }

    #[test]
    fn text_from_tool_call_turns_is_not_flushed() {
        let mut call = Message::assistant("Let me compute that first. ");
        call.tool_calls.push(MessageToolCall {
            id: "call_calc".into(),
            name: "calculator".into(),
            arguments: r#"{"expression":"2+2"}"#.into(),
        });

        let mut pipeline = FramePipeline::new();
        let mut frames = pipeline.push(&ReasoningEvent::fragment("Let me compute that first. "));
        frames.extend(pipeline.push(&ReasoningEvent::update(MODEL_NODE, vec![call])));
        frames.extend(pipeline.push(&ReasoningEvent::fragment("The answer is 4.")));
        frames.extend(pipeline.finish());

        assert_eq!(kinds(&frames), vec!["call", "answer:The answer is 4."]);
    }

    #[test]
    fn degraded_stream_flushes_once_at_end() {
        let mut pipeline = FramePipeline::new();
        assert!(pipeline.push(&ReasoningEvent::fragment("The total ")).is_empty());
        assert!(pipeline.push(&ReasoningEvent::fragment("is 4.")).is_empty());
        assert_eq!(pipeline.finish(), Some(Frame::final_answer("The total is 4.")));
    }
}
