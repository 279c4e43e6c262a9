//! Retrieval engine: ingestion and similarity queries over a chunk store.
//!
//! The same [`Embedder`] is used for both, so query vectors and stored
//! vectors live in the same space.

use std::sync::Arc;

use optimus_core::store::{ChunkStore, Embedder, NewChunk, NewDocument, RetrievedChunk};
use tracing::{debug, info};

use crate::chunker::Chunker;
use crate::extract::{content_type_of, extract_text};
use crate::RagError;

/// Smallest and largest accepted `top_k`.
pub const MIN_TOP_K: usize = 1;
pub const MAX_TOP_K: usize = 20;

/// Clamp a caller-supplied `top_k` into `[MIN_TOP_K, MAX_TOP_K]`.
pub fn clamp_top_k(top_k: i64) -> usize {
    top_k.clamp(MIN_TOP_K as i64, MAX_TOP_K as i64) as usize
}

pub struct RetrievalEngine {
    store: Arc<dyn ChunkStore>,
    embedder: Arc<dyn Embedder>,
    chunker: Chunker,
}

impl RetrievalEngine {
    pub fn new(store: Arc<dyn ChunkStore>, embedder: Arc<dyn Embedder>, chunker: Chunker) -> Self {
        Self {
            store,
            embedder,
            chunker,
        }
    }

    pub fn store(&self) -> &Arc<dyn ChunkStore> {
        &self.store
    }

    /// The `top_k` stored chunks most similar to `text`, most similar first.
    ///
    /// `top_k` must lie in `[1, 20]`; callers that want clamping use
    /// [`clamp_top_k`] first.
    pub async fn query(&self, text: &str, top_k: usize) -> Result<Vec<RetrievedChunk>, RagError> {
        if text.trim().is_empty() {
            return Err(RagError::Validation("Query must not be empty".into()));
        }
        if !(MIN_TOP_K..=MAX_TOP_K).contains(&top_k) {
            return Err(RagError::Validation(format!(
                "top_k must be between {MIN_TOP_K} and {MAX_TOP_K}, got {top_k}"
            )));
        }

        let vector = self
            .embedder
            .embed(&[text.to_string()])
            .await
            .map_err(|e| RagError::Upstream(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Upstream("Embedder returned no vector for the query".into()))?;

        let results = self.store.nearest_neighbors(&vector, top_k).await?;
        debug!(top_k, returned = results.len(), store = self.store.name(), "Retrieval query");
        Ok(results)
    }

    /// Chunk, embed and store a text document. Returns the document id.
    pub async fn index_text(
        &self,
        filename: &str,
        content_type: &str,
        text: &str,
    ) -> Result<String, RagError> {
        let pieces = self.chunker.split(text);
        if pieces.is_empty() {
            return Err(RagError::Validation(
                "Provided text contained no extractable text".into(),
            ));
        }

        let embeddings = self
            .embedder
            .embed(&pieces)
            .await
            .map_err(|e| RagError::Upstream(e.to_string()))?;
        if embeddings.len() != pieces.len() {
            return Err(RagError::Upstream(format!(
                "Expected {} embeddings, got {}",
                pieces.len(),
                embeddings.len()
            )));
        }

        let chunks = pieces
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (content, embedding))| NewChunk {
                chunk_index: index as u32,
                content,
                embedding: Some(embedding),
                metadata: serde_json::Map::new(),
            })
            .collect::<Vec<_>>();
        let chunk_count = chunks.len();

        let document_id = self
            .store
            .insert_document(NewDocument {
                filename: filename.to_string(),
                content_type: content_type.to_string(),
                chunks,
            })
            .await?;

        info!(document_id = %document_id, filename, chunks = chunk_count, "Indexed document");
        Ok(document_id)
    }

    /// Index an uploaded file. PDF uploads are rejected.
    pub async fn index_upload(
        &self,
        filename: &str,
        declared_content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, RagError> {
        let content_type = content_type_of(declared_content_type);
        let text = extract_text(filename, &content_type, bytes)?;
        self.index_text(filename, &content_type, &text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::KeywordEmbedder;
    use optimus_core::error::StoreError;
    use optimus_store::InMemoryChunkStore;

    fn engine(store: &InMemoryChunkStore) -> RetrievalEngine {
        RetrievalEngine::new(
            Arc::new(store.clone()),
            Arc::new(KeywordEmbedder::new()),
            Chunker::new(60, 10),
        )
    }

    #[tokio::test]
    async fn index_then_query_ranks_relevant_chunk_first() {
        let store = InMemoryChunkStore::new();
        let engine = engine(&store);

        engine
            .index_text("shipping.txt", "text/plain", "Orders ship within two days by courier.")
            .await
            .unwrap();
        let policy = engine
            .index_text(
                "returns.txt",
                "text/plain",
                "Electronics returns carry a restocking fee when the box is opened.",
            )
            .await
            .unwrap();

        let results = engine.query("restocking fee for electronics returns", 5).await.unwrap();
        assert_eq!(results[0].document_id, policy);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(results.iter().all(|r| (-1.0..=1.0).contains(&r.score)));
    }

    #[tokio::test]
    async fn result_length_is_min_of_top_k_and_stored() {
        let store = InMemoryChunkStore::new();
        let engine = engine(&store);
        engine.index_text("a.txt", "text/plain", "returns policy").await.unwrap();
        engine.index_text("b.txt", "text/plain", "shipping courier").await.unwrap();

        assert_eq!(engine.query("returns", 1).await.unwrap().len(), 1);
        assert_eq!(engine.query("returns", 20).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn chunk_indices_are_contiguous() {
        let store = InMemoryChunkStore::new();
        let engine = engine(&store);
        let text = "returns policy electronics. ".repeat(20);
        let id = engine.index_text("long.txt", "text/plain", &text).await.unwrap();

        let indices = store.chunk_indices(&id).await;
        assert!(indices.len() > 1);
        assert_eq!(indices, (0..indices.len() as u32).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn empty_text_is_validation_error() {
        let store = InMemoryChunkStore::new();
        let err = engine(&store).index_text("e.txt", "text/plain", "   ").await.unwrap_err();
        assert!(matches!(err, RagError::Validation(ref m) if m == "Provided text contained no extractable text"));
        assert_eq!(store.document_count().await, 0);
    }

    #[tokio::test]
    async fn top_k_out_of_range_rejected() {
        let store = InMemoryChunkStore::new();
        let engine = engine(&store);
        assert!(matches!(engine.query("q", 0).await, Err(RagError::Validation(_))));
        assert!(matches!(engine.query("q", 21).await, Err(RagError::Validation(_))));
        assert!(matches!(engine.query("  ", 5).await, Err(RagError::Validation(_))));
    }

    #[test]
    fn clamp_top_k_bounds() {
        assert_eq!(clamp_top_k(-3), 1);
        assert_eq!(clamp_top_k(0), 1);
        assert_eq!(clamp_top_k(7), 7);
        assert_eq!(clamp_top_k(500), 20);
    }

    struct FailingEmbedder;

    #[async_trait::async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
            Err(StoreError::EmbeddingFailed("Missing OpenAI API key".into()))
        }
    }

    #[tokio::test]
    async fn embedding_failure_is_fatal_for_ingestion() {
        let store = InMemoryChunkStore::new();
        let engine = RetrievalEngine::new(
            Arc::new(store.clone()),
            Arc::new(FailingEmbedder),
            Chunker::default(),
        );
        let err = engine.index_text("a.txt", "text/plain", "hello").await.unwrap_err();
        assert!(matches!(err, RagError::Upstream(_)));
        assert_eq!(store.document_count().await, 0);
    }

    #[tokio::test]
    async fn pdf_upload_rejected() {
        let store = InMemoryChunkStore::new();
        let err = engine(&store)
            .index_upload("report.pdf", Some("application/pdf"), b"%PDF")
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));
    }

    #[tokio::test]
    async fn text_upload_is_indexed() {
        let store = InMemoryChunkStore::new();
        let id = engine(&store)
            .index_upload("notes.txt", None, b"restocking fee applies")
            .await
            .unwrap();
        assert_eq!(store.find_document("notes.txt").await.unwrap(), Some(id));
    }
}
