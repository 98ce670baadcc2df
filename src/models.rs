//! Core data models used throughout Corpus Chat.
//!
//! These types represent the documents, chunks, and answers that flow
//! through the loading, retrieval, and synthesis pipeline.

use chrono::{DateTime, Utc};

/// Where a document came from inside the fixed corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    /// One scraped page record from the pages directory.
    Page,
    /// The curated research summary text file.
    ResearchSummary,
}

/// Normalized corpus document held in memory for the process lifetime.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub source_label: String,
    pub url: Option<String>,
    pub kind: DocKind,
    pub text: String,
    pub captured_at: DateTime<Utc>,
}

/// A chunk of a document's text.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub hash: String,
}

/// Pointer from an answer back to one piece of supporting evidence.
#[derive(Debug, Clone)]
pub struct EvidenceRef {
    pub chunk_id: String,
    pub source_label: String,
    pub url: Option<String>,
    /// How many query variants retrieved this chunk.
    pub variant_hits: usize,
    /// Best cosine similarity across the variants that hit it.
    pub best_score: f32,
}

/// How a turn resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    /// Synthesized from retrieved evidence.
    Grounded,
    /// Retrieval produced nothing usable.
    NoEvidence,
    /// The chat model refused on safety grounds.
    SafetyBlocked,
    /// A provider failed mid-turn.
    Failure,
    /// The query was empty or whitespace.
    Invalid,
    /// The pipeline never initialized.
    Unready,
}

/// The single outcome of one turn. Every query resolves to exactly one of
/// these, whatever happened along the way.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub kind: AnswerKind,
    pub evidence: Vec<EvidenceRef>,
}

impl Answer {
    pub fn grounded(text: String, evidence: Vec<EvidenceRef>) -> Self {
        Self {
            text,
            kind: AnswerKind::Grounded,
            evidence,
        }
    }

    pub fn no_evidence() -> Self {
        Self::fixed(
            "Sorry, I couldn't find relevant information to answer your question.",
            AnswerKind::NoEvidence,
        )
    }

    pub fn safety_blocked() -> Self {
        Self::fixed(
            "The response was blocked due to safety settings.",
            AnswerKind::SafetyBlocked,
        )
    }

    pub fn failure() -> Self {
        Self::fixed(
            "Sorry, an error occurred while trying to answer your question.",
            AnswerKind::Failure,
        )
    }

    pub fn invalid() -> Self {
        Self::fixed("Please enter a valid question.", AnswerKind::Invalid)
    }

    pub fn unready() -> Self {
        Self::fixed(
            "Sorry, the chatbot is currently unavailable due to an initialization error.",
            AnswerKind::Unready,
        )
    }

    fn fixed(text: &str, kind: AnswerKind) -> Self {
        Self {
            text: text.to_string(),
            kind,
            evidence: Vec::new(),
        }
    }
}

/// Status line pushed to a session as soon as it connects.
pub const STATUS_READY: &str = "Chatbot is ready. Ask your question!";
pub const STATUS_UNREADY: &str = "Error: Chatbot is not available. Initialization failed.";
