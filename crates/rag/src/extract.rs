//! Text extraction from uploaded documents.

use crate::RagError;

const PDF_CONTENT_TYPES: [&str; 2] = ["application/pdf", "application/x-pdf"];

/// Normalized content type of an upload; missing means plain text.
pub fn content_type_of(declared: Option<&str>) -> String {
    declared
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_lowercase())
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| "text/plain".into())
}

/// Decode an upload into text. Bytes are read as UTF-8, lossily.
///
/// PDF documents are rejected: only text extraction is supported.
pub fn extract_text(filename: &str, content_type: &str, bytes: &[u8]) -> Result<String, RagError> {
    if PDF_CONTENT_TYPES.contains(&content_type) || filename.to_lowercase().ends_with(".pdf") {
        return Err(RagError::Validation(format!(
            "PDF documents are not supported: {filename}"
        )));
    }

    Ok(String::from_utf8_lossy(bytes).into_owned())
}
