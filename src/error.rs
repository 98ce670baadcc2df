//! Pipeline error taxonomy.
//!
//! Startup errors (`EmptyCorpus`, `Embedding` during index build) abort the
//! process. Per-turn errors never escape [`crate::pipeline::Pipeline::answer`];
//! they are mapped to one of the fixed fallback answers instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Loading produced zero usable documents.
    #[error("corpus produced no usable documents")]
    EmptyCorpus,

    /// The embedding provider failed or returned malformed vectors.
    #[error("embedding provider: {0}")]
    Embedding(#[source] anyhow::Error),

    /// Query expansion failed. Callers degrade to the original query.
    #[error("query expansion: {0}")]
    Expansion(#[source] anyhow::Error),

    /// Every variant search failed, so the turn has no evidence.
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    /// The chat model refused the synthesis prompt on safety grounds.
    #[error("answer blocked by safety policy: {reason}")]
    SafetyBlocked { reason: String },

    /// The chat provider failed outright.
    #[error("chat provider: {0}")]
    Generation(#[source] anyhow::Error),

    /// The query was empty or whitespace-only.
    #[error("query is empty")]
    EmptyQuery,
}
