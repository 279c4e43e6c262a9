//! `optimus ingest`: Index a document for retrieval.

use std::path::PathBuf;

use crate::runtime::Runtime;

pub async fn run(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    if config.database.url.is_none() {
        println!("⚠️  No database configured; the document is indexed in memory and discarded on exit");
    }

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.txt".into());

    let runtime = Runtime::build(config).await?;
    let document_id = runtime.retrieval.index_upload(&filename, None, &bytes).await?;

    println!("✅ Indexed {filename}");
    println!("   Document: {document_id}");
    Ok(())
}
