//! # Optimus Core
//!
//! Domain types, traits, and error definitions for the Optimus operations
//! assistant. Every collaborator (model provider, stores, capabilities) is a
//! trait here; implementations live in their own crates and can be swapped
//! for test doubles.

pub mod error;
pub mod message;
pub mod provider;
pub mod capability;
pub mod store;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{AgentError, CapabilityError, Error, ProviderError, Result, StoreError};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{
    ChunkReceiver, EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest,
    ProviderResponse, StreamChunk, ToolDefinition, Usage,
};
pub use capability::{
    Capability, CapabilityRegistry, CapabilityRequest, CapabilityResult, CapabilityStatus,
};
pub use store::{ChunkStore, Embedder, NewChunk, NewDocument, RelationalStore, RetrievedChunk, Row};
pub use event::ReasoningEvent;
