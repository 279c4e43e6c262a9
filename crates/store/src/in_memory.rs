//! In-memory chunk store: useful for testing and for running without a database.

use async_trait::async_trait;
use optimus_core::error::StoreError;
use optimus_core::store::{ChunkStore, NewDocument, RetrievedChunk};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::vector::{IndexedChunk, nearest};

#[derive(Debug, Clone)]
struct StoredDocument {
    id: String,
    filename: String,
}

#[derive(Default)]
struct Inner {
    documents: Vec<StoredDocument>,
    chunks: Vec<IndexedChunk>,
}

/// Keeps documents and chunks in insertion order; ranks with brute-force
/// cosine distance.
#[derive(Clone, Default)]
pub struct InMemoryChunkStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn document_count(&self) -> usize {
        self.inner.read().await.documents.len()
    }

    pub async fn chunk_count(&self) -> usize {
        self.inner.read().await.chunks.len()
    }

    /// Chunk indices of a document, in storage order.
    pub async fn chunk_indices(&self, document_id: &str) -> Vec<u32> {
        self.inner
            .read()
            .await
            .chunks
            .iter()
            .filter(|c| c.document_id == document_id)
            .filter_map(|c| c.metadata.get("chunk_index").and_then(|v| v.as_u64()))
            .map(|i| i as u32)
            .collect()
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert_document(&self, document: NewDocument) -> Result<String, StoreError> {
        let document_id = Uuid::new_v4().to_string();
        let chunks: Vec<IndexedChunk> = document
            .chunks
            .into_iter()
            .map(|chunk| {
                let mut metadata = chunk.metadata;
                metadata.insert("chunk_index".into(), chunk.chunk_index.into());
                IndexedChunk {
                    id: Uuid::new_v4().to_string(),
                    document_id: document_id.clone(),
                    content: chunk.content,
                    embedding: chunk.embedding,
                    metadata,
                }
            })
            .collect();

        let mut inner = self.inner.write().await;
        inner.documents.push(StoredDocument {
            id: document_id.clone(),
            filename: document.filename,
        });
        inner.chunks.extend(chunks);
        Ok(document_id)
    }

    async fn nearest_neighbors(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>, StoreError> {
        let inner = self.inner.read().await;
        Ok(nearest(&inner.chunks, vector, k))
    }

    async fn find_document(&self, filename: &str) -> Result<Option<String>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .documents
            .iter()
            .find(|d| d.filename == filename)
            .map(|d| d.id.clone()))
    }
}
