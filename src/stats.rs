//! Corpus statistics and load health overview.
//!
//! Loads and chunks the corpus without touching any provider, then prints
//! a summary: document and skip counts, chunk totals, and the largest
//! sources. Used by `cchat corpus` to sanity-check a corpus before paying
//! for an embedding run.

use anyhow::Result;
use std::collections::HashMap;

use crate::chunk;
use crate::config::Config;
use crate::corpus;
use crate::models::DocKind;

pub fn run_corpus_stats(config: &Config) -> Result<()> {
    let report = corpus::load_corpus(&config.corpus)?;
    let chunks = chunk::chunk_corpus(&report.documents, &config.chunking);

    let pages = report
        .documents
        .iter()
        .filter(|d| d.kind == DocKind::Page)
        .count();
    let research = report.documents.len() - pages;

    println!("Corpus Chat — Corpus Overview");
    println!("=============================");
    println!();
    println!("  Pages dir:   {}", config.corpus.pages_dir.display());
    if let Some(research_file) = &config.corpus.research_file {
        println!("  Research:    {}", research_file.display());
    }
    println!();
    println!(
        "  Documents:   {} ({} pages, {} research)",
        report.documents.len(),
        pages,
        research
    );
    println!("  Skipped:     {}", report.skipped.len());
    for skip in &report.skipped {
        println!("    - {}: {}", skip.file, skip.reason);
    }
    println!(
        "  Chunks:      {} (window {}, overlap {})",
        chunks.len(),
        config.chunking.window_chars,
        config.chunking.overlap_chars
    );
    println!();

    // Per-source breakdown, largest first
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for chunk in &chunks {
        *counts.entry(chunk.document_id.as_str()).or_default() += 1;
    }

    let mut rows: Vec<(&str, usize)> = report
        .documents
        .iter()
        .map(|d| {
            (
                d.source_label.as_str(),
                counts.get(d.id.as_str()).copied().unwrap_or(0),
            )
        })
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    println!("  Largest sources:");
    for (label, count) in rows.iter().take(10) {
        println!("    {:>5}  {}", count, label);
    }

    Ok(())
}
