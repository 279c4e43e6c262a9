//! Shared test doubles.

use async_trait::async_trait;
use optimus_core::error::StoreError;
use optimus_core::store::Embedder;

/// Embeds text as letter frequencies: deterministic, never the zero vector
/// for alphabetic input.
pub struct WordEmbedder;

#[async_trait]
impl Embedder for WordEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0f32; 26];
                for c in t.to_lowercase().chars().filter(char::is_ascii_lowercase) {
                    v[(c as u8 - b'a') as usize] += 1.0;
                }
                v
            })
            .collect())
    }
}
