//! The agent pipeline.
//!
//! A query flows through:
//!
//! 1. **Session lookup**: one reasoning loop per (provider, model), built on
//!    first use and cached
//! 2. **Reasoning loop**: model turns interleaved with capability dispatch
//! 3. **Framing**: every loop event is labeled for the client
//! 4. **Extraction**: the user-facing answer is separated from internal
//!    reasoning by the `<FINAL_ANSWER>` delimiter
//!
//! Single-shot queries skip framing and extract once from the last message.

pub mod extraction;
pub mod frame;
pub mod loop_runner;
pub mod pipeline;
pub mod prompt;
pub mod service;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use extraction::{FinalAnswerExtractor, extract_final_answer};
pub use frame::{Frame, SerializedMessage, Step, StepKind, StepStatus, label_event, preview};
pub use loop_runner::{EventReceiver, MAX_ITERATIONS_MESSAGE, ReasoningLoop, ToolCallingLoop};
pub use pipeline::FramePipeline;
pub use prompt::{FINAL_ANSWER_CLOSE, FINAL_ANSWER_DELIMITER, SYSTEM_PROMPT, system_prompt};
pub use service::{AgentService, FrameReceiver, LoopFactory, ProviderLoopFactory};
pub use session::{SessionCache, SessionKey};
