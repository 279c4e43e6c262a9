//! `optimus search`: Query the document index.

use optimus_rag::{MAX_TOP_K, MIN_TOP_K};

use crate::runtime::Runtime;

pub async fn run(query: String, top_k: i64) -> Result<(), Box<dyn std::error::Error>> {
    let top_k = usize::try_from(top_k)
        .ok()
        .filter(|k| (MIN_TOP_K..=MAX_TOP_K).contains(k))
        .ok_or_else(|| format!("top_k must be between {MIN_TOP_K} and {MAX_TOP_K}"))?;

    let runtime = Runtime::build(super::load_config()?).await?;
    let results = runtime.retrieval.query(&query, top_k).await?;

    if results.is_empty() {
        println!("No matching documents.");
        return Ok(());
    }
    for (rank, chunk) in results.iter().enumerate() {
        println!("{}. [{:.3}] {}", rank + 1, chunk.score, chunk.content.trim());
    }

    Ok(())
}
