//! Fixed-size text splitter with overlap.
//!
//! Windows are measured in characters. A window that does not reach the end
//! of the text is pulled back to the last whitespace in its second half so
//! words are not cut, and the next window starts `overlap` characters before
//! the cut.

use optimus_config::RagConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    /// `chunk_overlap` is capped below `chunk_size`; a zero size is treated as 1.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into ordered, trimmed, non-empty chunks.
    ///
    /// Whitespace-only input yields no chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let mut end = (start + self.chunk_size).min(chars.len());

            if end < chars.len() {
                let floor = start + self.chunk_size / 2;
                if let Some(cut) = (floor..end).rev().find(|&i| chars[i].is_whitespace()) {
                    end = cut + 1;
                }
            }

            let piece: String = chars[start..end].iter().collect();
            let piece = piece.trim();
            if !piece.is_empty() {
                chunks.push(piece.to_string());
            }

            if end >= chars.len() {
                break;
            }
            start = end.saturating_sub(self.chunk_overlap).max(start + 1);
        }

        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::from_config(&RagConfig::default())
    }
}
