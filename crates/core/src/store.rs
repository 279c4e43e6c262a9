//! Storage traits: the relational store, the chunk store, and the embedder.
//!
//! The relational store answers read-only queries for `sql_fetch`. The chunk
//! store owns documents and their embedded chunks and answers
//! nearest-neighbour queries for retrieval.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::StoreError;

/// One relational row: column name → value, in column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A chunk ready to be stored alongside its document.
#[derive(Debug, Clone)]
pub struct NewChunk {
    /// Position within the document, contiguous from 0
    pub chunk_index: u32,

    pub content: String,

    /// Chunks without an embedding are stored but never retrieved
    pub embedding: Option<Vec<f32>>,

    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// A document and all of its chunks, inserted together.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub content_type: String,
    pub chunks: Vec<NewChunk>,
}

/// A chunk returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub document_id: String,
    pub content: String,

    /// Cosine similarity, `1 - distance`, in [-1, 1]
    pub score: f32,

    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Document + chunk persistence with vector search.
///
/// Implementations: in-memory (tests, demos), PostgreSQL with pgvector.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Backend name (e.g. "memory", "postgres").
    fn name(&self) -> &str;

    /// Insert a document with its chunks atomically. Returns the document id.
    async fn insert_document(&self, document: NewDocument) -> std::result::Result<String, StoreError>;

    /// The `k` embedded chunks closest to `vector` by cosine distance,
    /// most similar first.
    async fn nearest_neighbors(
        &self,
        vector: &[f32],
        k: usize,
    ) -> std::result::Result<Vec<RetrievedChunk>, StoreError>;

    /// Id of a stored document with this filename, if any.
    async fn find_document(&self, filename: &str) -> std::result::Result<Option<String>, StoreError>;
}

/// Read-only access to the operational database.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// Run a query and return its rows. Callers enforce statement policy.
    async fn fetch(&self, sql: &str) -> std::result::Result<Vec<Row>, StoreError>;
}

/// Text → vector. The same embedder must be used for ingestion and queries.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieved_chunk_serialization() {
        let chunk = RetrievedChunk {
            id: "c1".into(),
            document_id: "d1".into(),
            content: "Electronics carry a 15% restocking fee".into(),
            score: 0.91,
            metadata: serde_json::Map::new(),
        };
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["document_id"], "d1");
        assert!(json["score"].as_f64().unwrap() > 0.9);
    }
}
