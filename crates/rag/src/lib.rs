//! Document ingestion and retrieval for Optimus.
//!
//! Text is split into overlapping chunks, embedded in one batch and stored
//! with its document. Queries embed the question with the same embedder and
//! rank stored chunks by cosine similarity.

pub mod chunker;
pub mod engine;
pub mod extract;
pub mod seed;

#[cfg(test)]
pub(crate) mod testing;

pub use chunker::Chunker;
pub use engine::{MAX_TOP_K, MIN_TOP_K, RetrievalEngine, clamp_top_k};
pub use seed::{SEED_FILENAME, ensure_seed_document};

use optimus_core::error::StoreError;

/// Retrieval and ingestion errors.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    /// Bad input: empty query or document, `top_k` out of range, unsupported file type
    #[error("{0}")]
    Validation(String),

    /// The embedder failed
    #[error("Embedding failed: {0}")]
    Upstream(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
