//! Sliding-window text chunker.
//!
//! Splits document text into fixed-size character windows that advance by
//! `window - overlap`, so consecutive chunks share exactly `overlap`
//! characters of context. Counts characters rather than bytes, so multi-byte
//! text never splits inside a code point.
//!
//! Each chunk receives a deterministic id derived from its document ID and
//! index, plus a SHA-256 hash of its text.

use sha2::{Digest, Sha256};

use crate::config::ChunkingConfig;
use crate::models::{Chunk, Document};

/// Split text into overlapping windows of `window` characters.
/// Returns chunks with contiguous indices starting at 0; the final chunk may
/// be shorter and always reaches the end of the text.
pub fn chunk_text(document_id: &str, text: &str, window: usize, overlap: usize) -> Vec<Chunk> {
    // Byte offset of every char boundary, including the end of the text.
    let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    boundaries.push(text.len());
    let total_chars = boundaries.len() - 1;

    if total_chars <= window {
        return vec![make_chunk(document_id, 0, text)];
    }

    let stride = window - overlap;
    let mut chunks = Vec::new();
    let mut start = 0usize;

    loop {
        let end = (start + window).min(total_chars);
        let piece = &text[boundaries[start]..boundaries[end]];
        chunks.push(make_chunk(document_id, chunks.len(), piece));
        if end == total_chars {
            break;
        }
        start += stride;
    }

    chunks
}

/// Chunk every document in corpus order.
pub fn chunk_corpus(documents: &[Document], config: &ChunkingConfig) -> Vec<Chunk> {
    documents
        .iter()
        .flat_map(|doc| {
            chunk_text(
                &doc.id,
                &doc.text,
                config.window_chars,
                config.overlap_chars,
            )
        })
        .collect()
}

fn make_chunk(document_id: &str, index: usize, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: format!("{}#{:04}", document_id, index),
        document_id: document_id.to_string(),
        chunk_index: index,
        text: text.to_string(),
        hash,
    }
}
