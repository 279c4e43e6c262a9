//! Vector similarity utilities.
//!
//! Pure-Rust cosine similarity and nearest-neighbour ranking, used by the
//! in-memory chunk store. The PostgreSQL store delegates the same ranking to
//! pgvector's `<=>` operator.

use optimus_core::RetrievedChunk;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is empty, zero, or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom).clamp(-1.0, 1.0) as f32
}

/// Cosine distance in [0, 2]; smaller is closer.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// A stored chunk as the in-memory ranker sees it.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub id: String,
    pub document_id: String,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Rank chunks by cosine distance to `query` and keep the `k` closest.
///
/// Chunks without an embedding, or whose dimensionality differs from the
/// query's, are skipped. Equal distances keep store order. Scores are
/// `1 - distance` and therefore non-increasing in the output.
pub fn nearest(chunks: &[IndexedChunk], query: &[f32], k: usize) -> Vec<RetrievedChunk> {
    let mut scored: Vec<(f32, &IndexedChunk)> = chunks
        .iter()
        .filter_map(|chunk| {
            let emb = chunk.embedding.as_ref()?;
            if emb.len() != query.len() || emb.is_empty() {
                return None;
            }
            Some((cosine_distance(emb, query), chunk))
        })
        .collect();

    // sort_by is stable: ties keep insertion order
    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored
        .into_iter()
        .map(|(distance, chunk)| RetrievedChunk {
            id: chunk.id.clone(),
            document_id: chunk.document_id.clone(),
            content: chunk.content.clone(),
            score: 1.0 - distance,
            metadata: chunk.metadata.clone(),
        })
        .collect()
}

/// Render a vector in pgvector's text format, e.g. `[0.1,0.2,0.3]`.
pub fn to_pgvector_literal(v: &[f32]) -> String {
    format!(
        "[{}]",
        v.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(",")
    )
}
