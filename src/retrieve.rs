//! Fan-out retrieval and evidence fusion.
//!
//! Runs one index search per query variant concurrently, then fuses the
//! per-variant hit lists into a single deduplicated evidence set. A chunk
//! retrieved by several variants outranks a chunk retrieved once, on the
//! theory that agreement across phrasings is a stronger signal than any
//! single similarity score.

use futures::future::join_all;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::PipelineError;
use crate::index::{SearchHit, VectorIndex};

/// One fused evidence chunk, ready for prompt assembly.
#[derive(Debug, Clone)]
pub struct EvidenceChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub source_label: String,
    pub url: Option<String>,
    pub text: String,
    /// How many variants retrieved this chunk.
    pub variant_hits: usize,
    /// Best similarity score across those variants.
    pub best_score: f32,
    entry_ordinal: usize,
}

/// Search the index once per variant (concurrently) and fuse the results.
///
/// Individual variant failures are logged and dropped; the turn only fails
/// retrieval when every variant search failed. The fused set is bounded by
/// `variants.len() * k`.
pub async fn retrieve_evidence(
    index: &VectorIndex,
    variants: &[String],
    k: usize,
) -> Result<Vec<EvidenceChunk>, PipelineError> {
    let searches = variants.iter().map(|variant| index.search(variant, k));
    let results = join_all(searches).await;

    let mut per_variant = Vec::with_capacity(variants.len());
    let mut failures = 0usize;

    for (variant, result) in variants.iter().zip(results) {
        match result {
            Ok(hits) => per_variant.push(hits),
            Err(err) => {
                failures += 1;
                tracing::warn!(variant = %variant, error = %err, "variant search failed");
            }
        }
    }

    if per_variant.is_empty() {
        return Err(PipelineError::Retrieval(format!(
            "all {} variant searches failed",
            failures
        )));
    }

    Ok(fuse(&per_variant))
}

/// Fuse per-variant hit lists by chunk identity.
///
/// Order: variant hit count desc, then best score desc, then index
/// insertion order asc so equal evidence ranks deterministically.
pub fn fuse(per_variant: &[Vec<SearchHit>]) -> Vec<EvidenceChunk> {
    let mut merged: HashMap<String, EvidenceChunk> = HashMap::new();

    for hits in per_variant {
        for hit in hits {
            match merged.get_mut(&hit.chunk_id) {
                Some(existing) => {
                    existing.variant_hits += 1;
                    if hit.score > existing.best_score {
                        existing.best_score = hit.score;
                    }
                }
                None => {
                    merged.insert(
                        hit.chunk_id.clone(),
                        EvidenceChunk {
                            chunk_id: hit.chunk_id.clone(),
                            document_id: hit.document_id.clone(),
                            source_label: hit.source_label.clone(),
                            url: hit.url.clone(),
                            text: hit.text.clone(),
                            variant_hits: 1,
                            best_score: hit.score,
                            entry_ordinal: hit.entry_ordinal,
                        },
                    );
                }
            }
        }
    }

    let mut fused: Vec<EvidenceChunk> = merged.into_values().collect();
    fused.sort_by(|a, b| {
        b.variant_hits
            .cmp(&a.variant_hits)
            .then_with(|| {
                b.best_score
                    .partial_cmp(&a.best_score)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.entry_ordinal.cmp(&b.entry_ordinal))
    });

    fused
}
