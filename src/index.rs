//! In-memory vector index over corpus chunks.
//!
//! The index is built exactly once at startup and is immutable afterwards.
//! It owns every chunk, its embedding vector, and the source metadata
//! resolved from the parent document, in insertion (corpus) order. Search
//! is a brute-force cosine scan, which is the right tool at this corpus
//! scale: a few hundred pages chunk to a few thousand vectors.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::embedding::{cosine_similarity, EmbeddingProvider};
use crate::error::PipelineError;
use crate::models::{Chunk, Document};

/// One retrieved chunk with its similarity score. An owned snapshot, so
/// hits can cross task boundaries without borrowing the index.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk_id: String,
    pub document_id: String,
    pub source_label: String,
    pub url: Option<String>,
    /// Position of the chunk in the index, used as the deterministic
    /// tie-breaker downstream.
    pub entry_ordinal: usize,
    pub score: f32,
    pub text: String,
}

struct IndexEntry {
    chunk: Chunk,
    source_label: String,
    url: Option<String>,
    vector: Vec<f32>,
}

/// Brute-force cosine index. Exclusive owner of all chunks and vectors.
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl VectorIndex {
    /// Embed every chunk and assemble the index. Any provider failure here
    /// is fatal: the caller aborts startup rather than serve a partial
    /// index.
    pub async fn build(
        documents: &[Document],
        chunks: Vec<Chunk>,
        embedder: Arc<dyn EmbeddingProvider>,
        batch_size: usize,
    ) -> Result<Self, PipelineError> {
        let meta: HashMap<&str, (&str, Option<&str>)> = documents
            .iter()
            .map(|d| (d.id.as_str(), (d.source_label.as_str(), d.url.as_deref())))
            .collect();

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());

        for batch in texts.chunks(batch_size.max(1)) {
            let batch_vectors = embedder
                .embed(batch)
                .await
                .map_err(PipelineError::Embedding)?;
            vectors.extend(batch_vectors);
        }

        if vectors.len() != chunks.len() {
            return Err(PipelineError::Embedding(anyhow::anyhow!(
                "expected {} vectors, provider returned {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                let (source_label, url) = meta
                    .get(chunk.document_id.as_str())
                    .copied()
                    .unwrap_or(("unknown", None));
                IndexEntry {
                    source_label: source_label.to_string(),
                    url: url.map(str::to_string),
                    chunk,
                    vector,
                }
            })
            .collect();

        Ok(Self { entries, embedder })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embed the query with the index's own provider, score every entry,
    /// and return the top `k` hits. A `k` larger than the index simply
    /// returns everything ranked.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, PipelineError> {
        let mut query_vectors = self
            .embedder
            .embed(&[query.to_string()])
            .await
            .map_err(PipelineError::Embedding)?;
        let query_vector = query_vectors
            .pop()
            .ok_or_else(|| PipelineError::Embedding(anyhow::anyhow!("empty embedding response")))?;

        Ok(self.rank(&query_vector, k))
    }

    /// Score and rank against an already-embedded query. Stable sort, so
    /// equal scores keep insertion order.
    fn rank(&self, query_vector: &[f32], k: usize) -> Vec<SearchHit> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(query_vector, &entry.vector)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, score)| {
                let entry = &self.entries[i];
                SearchHit {
                    chunk_id: entry.chunk.id.clone(),
                    document_id: entry.chunk.document_id.clone(),
                    source_label: entry.source_label.clone(),
                    url: entry.url.clone(),
                    entry_ordinal: i,
                    score,
                    text: entry.chunk.text.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    /// Deterministic bag-of-chars embedder for tests.
    struct CharBagEmbedder {
        dims: usize,
        calls: AtomicUsize,
    }

    impl CharBagEmbedder {
        fn new(dims: usize) -> Self {
            Self {
                dims,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CharBagEmbedder {
        fn model_name(&self) -> &str {
            "char-bag"
        }
        fn dims(&self) -> usize {
            self.dims
        }
        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; self.dims];
                    for c in t.chars() {
                        v[(c as usize) % self.dims] += 1.0;
                    }
                    v
                })
                .collect())
        }
    }

    fn test_index(vectors: Vec<Vec<f32>>) -> VectorIndex {
        let entries = vectors
            .into_iter()
            .enumerate()
            .map(|(i, vector)| IndexEntry {
                chunk: Chunk {
                    id: format!("doc#{:04}", i),
                    document_id: "doc".to_string(),
                    chunk_index: i,
                    text: format!("chunk {}", i),
                    hash: String::new(),
                },
                source_label: "doc.json".to_string(),
                url: None,
                vector,
            })
            .collect();
        VectorIndex {
            entries,
            embedder: Arc::new(CharBagEmbedder::new(4)),
        }
    }

    #[test]
    fn test_rank_orders_by_score_desc() {
        let index = test_index(vec![
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![0.7, 0.7],
        ]);
        let hits = index.rank(&[1.0, 0.0], 3);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].entry_ordinal, 1);
        assert_eq!(hits[1].entry_ordinal, 2);
        assert_eq!(hits[2].entry_ordinal, 0);
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_rank_ties_keep_insertion_order() {
        let index = test_index(vec![
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
        ]);
        // Cosine is scale-invariant: all three score 1.0 against [1, 0].
        let hits = index.rank(&[1.0, 0.0], 3);
        let ordinals: Vec<usize> = hits.iter().map(|h| h.entry_ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
    }

    #[test]
    fn test_rank_truncates_to_k() {
        let index = test_index(vec![vec![1.0, 0.0]; 10]);
        assert_eq!(index.rank(&[1.0, 0.0], 4).len(), 4);
        // k beyond the index returns everything.
        assert_eq!(index.rank(&[1.0, 0.0], 100).len(), 10);
    }

    #[tokio::test]
    async fn test_build_embeds_in_batches() {
        let embedder = Arc::new(CharBagEmbedder::new(8));
        let documents = vec![crate::models::Document {
            id: "doc".to_string(),
            source_label: "doc.json".to_string(),
            url: Some("https://example.com".to_string()),
            kind: crate::models::DocKind::Page,
            text: String::new(),
            captured_at: chrono::Utc::now(),
        }];
        let chunks: Vec<Chunk> = (0..5)
            .map(|i| Chunk {
                id: format!("doc#{:04}", i),
                document_id: "doc".to_string(),
                chunk_index: i,
                text: format!("text {}", i),
                hash: String::new(),
            })
            .collect();

        let index = VectorIndex::build(&documents, chunks, embedder.clone(), 2)
            .await
            .unwrap();

        assert_eq!(index.len(), 5);
        // 5 chunks at batch size 2: three provider calls.
        assert_eq!(embedder.calls.load(AtomicOrdering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_search_finds_exact_chunk_text() {
        let embedder = Arc::new(CharBagEmbedder::new(16));
        let documents = vec![crate::models::Document {
            id: "doc".to_string(),
            source_label: "doc.json".to_string(),
            url: None,
            kind: crate::models::DocKind::Page,
            text: String::new(),
            captured_at: chrono::Utc::now(),
        }];
        let chunks = vec![
            Chunk {
                id: "doc#0000".to_string(),
                document_id: "doc".to_string(),
                chunk_index: 0,
                text: "advisory services for small businesses".to_string(),
                hash: String::new(),
            },
            Chunk {
                id: "doc#0001".to_string(),
                document_id: "doc".to_string(),
                chunk_index: 1,
                text: "zzzz qqqq xxxx".to_string(),
                hash: String::new(),
            },
        ];

        let index = VectorIndex::build(&documents, chunks, embedder, 64).await.unwrap();
        let hits = index
            .search("advisory services for small businesses", 1)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "doc#0000");
        assert_eq!(hits[0].source_label, "doc.json");
    }
}
