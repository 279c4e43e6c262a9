//! LLM provider implementations for Optimus.
//!
//! All providers implement the `optimus_core::Provider` trait.
//! The factory builds the right one from configuration.

pub mod embedder;
pub mod factory;
pub mod openai_compat;

pub use embedder::ProviderEmbedder;
pub use factory::{ProviderFactory, SUPPORTED_PROVIDERS};
pub use openai_compat::OpenAiCompatProvider;
