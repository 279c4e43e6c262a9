//! Bundled seed document.

use tracing::{debug, info};

use crate::engine::RetrievalEngine;
use crate::RagError;

pub const SEED_FILENAME: &str = "company_policies_seed.txt";
pub const SEED_TEXT: &str = include_str!("../data/company_policies_seed.txt");

/// Index the return-policy document unless the store already holds a
/// document with its filename. Returns the new document id, if one was created.
pub async fn ensure_seed_document(engine: &RetrievalEngine) -> Result<Option<String>, RagError> {
    if let Some(existing) = engine.store().find_document(SEED_FILENAME).await? {
        debug!(document_id = %existing, "Seed document already indexed");
        return Ok(None);
    }

    let document_id = engine.index_text(SEED_FILENAME, "text/plain", SEED_TEXT).await?;
    info!(document_id = %document_id, "Indexed seed document");
    Ok(Some(document_id))
}
