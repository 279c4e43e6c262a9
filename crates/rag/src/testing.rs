//! Shared test doubles.

use async_trait::async_trait;
use optimus_core::error::StoreError;
use optimus_core::store::Embedder;
use std::sync::atomic::{AtomicUsize, Ordering};

const VOCABULARY: [&str; 10] = [
    "returns",
    "restocking",
    "fee",
    "electronics",
    "shipping",
    "courier",
    "orders",
    "policy",
    "days",
    "box",
];

/// Bag-of-words embedder over a fixed vocabulary, with one trailing bucket
/// for every other word so no text embeds to the zero vector.
pub struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; VOCABULARY.len() + 1];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            let slot = VOCABULARY
                .iter()
                .position(|k| *k == word)
                .unwrap_or(VOCABULARY.len());
            v[slot] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}
