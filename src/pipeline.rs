//! Startup assembly and per-turn orchestration.
//!
//! [`Pipeline::build`] runs the one-time startup phase: load corpus, chunk,
//! embed, index. Everything in it is fatal; the process either comes up
//! fully ready or not at all. After that the pipeline is immutable and
//! shared as `Arc<Pipeline>` across sessions.
//!
//! [`Pipeline::answer`] runs one turn and is deliberately infallible: every
//! failure mode maps to one of the fixed fallback answers, so a query can
//! never go unanswered and can never crash a session.

use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;

use crate::chunk;
use crate::config::Config;
use crate::corpus::{self, CorpusReport};
use crate::embedding::{self, EmbeddingProvider};
use crate::error::PipelineError;
use crate::expand;
use crate::index::VectorIndex;
use crate::llm::{self, ChatProvider};
use crate::models::{Answer, EvidenceRef};
use crate::retrieve::{self, EvidenceChunk};
use crate::synthesis;

/// Counts reported after a successful startup.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub documents: usize,
    pub skipped: usize,
    pub chunks: usize,
    pub embed_model: String,
    pub chat_model: String,
}

/// The immutable post-startup handle. Owns the index and the chat provider;
/// holds only the config values a turn needs.
pub struct Pipeline {
    index: VectorIndex,
    chat: Arc<dyn ChatProvider>,
    variants: usize,
    per_variant_k: usize,
    org_name: String,
    summary: BuildSummary,
}

impl Pipeline {
    /// Full startup path with real providers. Any error aborts startup.
    pub async fn build(config: &Config) -> Result<Self> {
        let embedder = embedding::create_provider(&config.gemini)?;
        let chat = llm::create_provider(&config.gemini)?;
        let report = corpus::load_corpus(&config.corpus)?;
        Self::with_providers(config, report, embedder, chat).await
    }

    /// Assemble from an already-loaded corpus and injected providers.
    pub async fn with_providers(
        config: &Config,
        report: CorpusReport,
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatProvider>,
    ) -> Result<Self> {
        let documents = report.documents;
        tracing::info!(
            documents = documents.len(),
            skipped = report.skipped.len(),
            "corpus loaded"
        );

        let chunks = chunk::chunk_corpus(&documents, &config.chunking);
        tracing::info!(chunks = chunks.len(), "corpus chunked");

        let summary = BuildSummary {
            documents: documents.len(),
            skipped: report.skipped.len(),
            chunks: chunks.len(),
            embed_model: embedder.model_name().to_string(),
            chat_model: chat.model_name().to_string(),
        };

        let index =
            VectorIndex::build(&documents, chunks, embedder, config.gemini.batch_size).await?;
        tracing::info!(entries = index.len(), "vector index ready");

        Ok(Self {
            index,
            chat,
            variants: config.retrieval.variants,
            per_variant_k: config.retrieval.per_variant_k,
            org_name: config.synthesis.org_name.clone(),
            summary,
        })
    }

    /// Counts captured during startup, for logs and the health probe.
    pub fn summary(&self) -> &BuildSummary {
        &self.summary
    }

    /// Run one turn. Always resolves to exactly one [`Answer`].
    pub async fn answer(&self, query: &str) -> Answer {
        let started = Instant::now();
        let answer = self.run_turn(query).await;
        tracing::info!(
            kind = ?answer.kind,
            evidence = answer.evidence.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "turn completed"
        );
        answer
    }

    async fn run_turn(&self, query: &str) -> Answer {
        let query = match validate_query(query) {
            Ok(q) => q,
            Err(_) => return Answer::invalid(),
        };

        let variants = expand::expand_query(self.chat.as_ref(), query, self.variants).await;
        tracing::debug!(variants = variants.len(), "query expanded");

        let evidence =
            match retrieve::retrieve_evidence(&self.index, &variants, self.per_variant_k).await {
                Ok(evidence) => evidence,
                Err(err) => {
                    tracing::warn!(error = %err, "retrieval failed for turn");
                    return Answer::no_evidence();
                }
            };

        if evidence.is_empty() {
            return Answer::no_evidence();
        }

        match synthesis::synthesize(self.chat.as_ref(), &self.org_name, &evidence, query).await {
            Ok(text) => Answer::grounded(text, evidence_refs(&evidence)),
            Err(PipelineError::SafetyBlocked { reason }) => {
                tracing::warn!(%reason, "synthesis blocked by safety policy");
                Answer::safety_blocked()
            }
            Err(err) => {
                tracing::warn!(error = %err, "synthesis failed");
                Answer::failure()
            }
        }
    }
}

fn validate_query(query: &str) -> Result<&str, PipelineError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::EmptyQuery);
    }
    Ok(trimmed)
}

fn evidence_refs(evidence: &[EvidenceChunk]) -> Vec<EvidenceRef> {
    evidence
        .iter()
        .map(|chunk| EvidenceRef {
            chunk_id: chunk.chunk_id.clone(),
            source_label: chunk.source_label.clone(),
            url: chunk.url.clone(),
            variant_hits: chunk.variant_hits,
            best_score: chunk.best_score,
        })
        .collect()
}
