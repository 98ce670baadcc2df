//! Fixed-corpus loader.
//!
//! The corpus is given ahead of time: a directory of formatted scrape
//! records (one JSON object per file, `{url, page_content, scraped_at}`)
//! plus an optional research summary text file. Every record passes through
//! a typed parse step with a per-record accept/skip outcome, so one
//! malformed file never aborts the load and every skip stays observable.

use anyhow::Result;
use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::error::PipelineError;
use crate::models::{DocKind, Document};

/// One scrape record as written by the formatting step.
#[derive(Debug, Deserialize)]
struct PageRecord {
    url: String,
    page_content: String,
    #[serde(default)]
    scraped_at: Option<String>,
}

/// A record that failed the parse step, with the reason it was dropped.
#[derive(Debug, Clone)]
pub struct SkippedRecord {
    pub file: String,
    pub reason: String,
}

/// Outcome of a corpus load: the accepted documents plus every skip.
#[derive(Debug)]
pub struct CorpusReport {
    pub documents: Vec<Document>,
    pub skipped: Vec<SkippedRecord>,
}

/// Load the full corpus from disk. Fails only when zero documents survive
/// overall; a missing pages directory is logged and skipped (the research
/// file alone can carry the corpus), and individual bad records are
/// reported in the returned [`CorpusReport`].
pub fn load_corpus(config: &CorpusConfig) -> Result<CorpusReport> {
    let mut documents = Vec::new();
    let mut skipped = Vec::new();

    if config.pages_dir.exists() {
        load_pages(config, &mut documents, &mut skipped)?;
    } else {
        tracing::warn!(
            dir = %config.pages_dir.display(),
            "pages directory not found, no scraped pages will be loaded"
        );
    }

    if let Some(research_path) = &config.research_file {
        match load_research(research_path) {
            Ok(Some(doc)) => documents.push(doc),
            Ok(None) => {
                tracing::warn!(file = %research_path.display(), "research file missing, continuing without it");
            }
            Err(reason) => {
                tracing::warn!(file = %research_path.display(), %reason, "skipping research file");
                skipped.push(SkippedRecord {
                    file: research_path.display().to_string(),
                    reason,
                });
            }
        }
    }

    if documents.is_empty() {
        return Err(PipelineError::EmptyCorpus.into());
    }

    Ok(CorpusReport { documents, skipped })
}

/// Scan the pages directory and parse every matching record.
fn load_pages(
    config: &CorpusConfig,
    documents: &mut Vec<Document>,
    skipped: &mut Vec<SkippedRecord>,
) -> Result<()> {
    let pages_dir = &config.pages_dir;
    let include_set = build_globset(&config.include_globs)?;

    // Collect matching files first so parse order is deterministic.
    let mut files: Vec<(String, std::path::PathBuf)> = Vec::new();
    for entry in WalkDir::new(pages_dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(pages_dir).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if !include_set.is_match(&rel_str) {
            continue;
        }

        files.push((rel_str, path.to_path_buf()));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));

    for (rel_str, path) in files {
        match load_page(&path, &rel_str) {
            Ok(doc) => documents.push(doc),
            Err(reason) => {
                tracing::warn!(file = %rel_str, %reason, "skipping corpus record");
                skipped.push(SkippedRecord {
                    file: rel_str,
                    reason,
                });
            }
        }
    }

    Ok(())
}

fn load_page(path: &Path, rel_str: &str) -> std::result::Result<Document, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| format!("unreadable: {}", e))?;

    let record: PageRecord =
        serde_json::from_str(&raw).map_err(|e| format!("invalid record: {}", e))?;

    if record.page_content.trim().is_empty() {
        return Err("empty page_content".to_string());
    }

    Ok(Document {
        id: document_id(rel_str),
        source_label: rel_str.to_string(),
        url: Some(record.url),
        kind: DocKind::Page,
        text: record.page_content,
        captured_at: parse_captured_at(record.scraped_at.as_deref()),
    })
}

/// `Ok(None)` means the file simply is not there, which is tolerated.
fn load_research(path: &Path) -> std::result::Result<Option<Document>, String> {
    if !path.exists() {
        return Ok(None);
    }

    let text = std::fs::read_to_string(path).map_err(|e| format!("unreadable: {}", e))?;
    if text.trim().is_empty() {
        return Err("empty research file".to_string());
    }

    let label = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    Ok(Some(Document {
        id: document_id(&label),
        source_label: label,
        url: None,
        kind: DocKind::ResearchSummary,
        text,
        captured_at: Utc::now(),
    }))
}

/// Stable document id: first 16 hex chars of the SHA-256 of the source label.
fn document_id(source_label: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_label.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

fn parse_captured_at(scraped_at: Option<&str>) -> DateTime<Utc> {
    scraped_at
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CorpusConfig;
    use std::fs;
    use tempfile::TempDir;

    fn corpus_config(dir: &TempDir) -> CorpusConfig {
        CorpusConfig {
            pages_dir: dir.path().join("pages"),
            research_file: None,
            include_globs: vec!["*.json".to_string()],
        }
    }

    fn write_page(dir: &TempDir, name: &str, body: &str) {
        let pages = dir.path().join("pages");
        fs::create_dir_all(&pages).unwrap();
        fs::write(pages.join(name), body).unwrap();
    }

    #[test]
    fn test_loads_valid_records_in_name_order() {
        let dir = TempDir::new().unwrap();
        write_page(
            &dir,
            "b-about.json",
            r#"{"url":"https://example.com/about","page_content":"About the firm.","scraped_at":"2025-05-01T10:00:00.000Z"}"#,
        );
        write_page(
            &dir,
            "a-home.json",
            r#"{"url":"https://example.com/","page_content":"Welcome home."}"#,
        );

        let report = load_corpus(&corpus_config(&dir)).unwrap();
        assert_eq!(report.documents.len(), 2);
        assert!(report.skipped.is_empty());
        assert_eq!(report.documents[0].source_label, "a-home.json");
        assert_eq!(report.documents[1].source_label, "b-about.json");
        assert_eq!(report.documents[1].kind, DocKind::Page);
        assert_eq!(
            report.documents[1].url.as_deref(),
            Some("https://example.com/about")
        );
        assert_eq!(
            report.documents[1].captured_at.to_rfc3339(),
            "2025-05-01T10:00:00+00:00"
        );
    }

    #[test]
    fn test_bad_records_skip_without_aborting() {
        let dir = TempDir::new().unwrap();
        write_page(&dir, "good.json", r#"{"url":"u","page_content":"text"}"#);
        write_page(&dir, "no-url.json", r#"{"page_content":"text"}"#);
        write_page(&dir, "blank.json", r#"{"url":"u","page_content":"   "}"#);
        write_page(&dir, "broken.json", "{not json");

        let report = load_corpus(&corpus_config(&dir)).unwrap();
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].source_label, "good.json");
        assert_eq!(report.skipped.len(), 3);

        let skipped_files: Vec<&str> =
            report.skipped.iter().map(|s| s.file.as_str()).collect();
        assert!(skipped_files.contains(&"no-url.json"));
        assert!(skipped_files.contains(&"blank.json"));
        assert!(skipped_files.contains(&"broken.json"));
    }

    #[test]
    fn test_zero_documents_is_an_error() {
        let dir = TempDir::new().unwrap();
        write_page(&dir, "broken.json", "{not json");

        let err = load_corpus(&corpus_config(&dir)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::EmptyCorpus)
        ));
    }

    #[test]
    fn test_research_file_appended_after_pages() {
        let dir = TempDir::new().unwrap();
        write_page(&dir, "page.json", r#"{"url":"u","page_content":"page text"}"#);
        let research = dir.path().join("research.txt");
        fs::write(&research, "Curated research notes.").unwrap();

        let mut config = corpus_config(&dir);
        config.research_file = Some(research);

        let report = load_corpus(&config).unwrap();
        assert_eq!(report.documents.len(), 2);
        let doc = report.documents.last().unwrap();
        assert_eq!(doc.kind, DocKind::ResearchSummary);
        assert_eq!(doc.source_label, "research.txt");
        assert!(doc.url.is_none());
    }

    #[test]
    fn test_missing_research_file_is_tolerated() {
        let dir = TempDir::new().unwrap();
        write_page(&dir, "page.json", r#"{"url":"u","page_content":"page text"}"#);

        let mut config = corpus_config(&dir);
        config.research_file = Some(dir.path().join("nope.txt"));

        let report = load_corpus(&config).unwrap();
        assert_eq!(report.documents.len(), 1);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_missing_pages_dir_tolerated_when_research_carries_corpus() {
        let dir = TempDir::new().unwrap();
        let research = dir.path().join("research.txt");
        fs::write(&research, "Curated research notes.").unwrap();

        // pages/ is never created; the research file is the whole corpus.
        let mut config = corpus_config(&dir);
        config.research_file = Some(research);

        let report = load_corpus(&config).unwrap();
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].kind, DocKind::ResearchSummary);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_missing_pages_dir_without_research_is_fatal() {
        let dir = TempDir::new().unwrap();

        let err = load_corpus(&corpus_config(&dir)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::EmptyCorpus)
        ));
    }

    #[test]
    fn test_document_ids_are_stable() {
        assert_eq!(document_id("home.json"), document_id("home.json"));
        assert_ne!(document_id("home.json"), document_id("about.json"));
        assert_eq!(document_id("home.json").len(), 16);
    }
}
