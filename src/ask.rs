//! One-shot question answering from the CLI.
//!
//! Builds the full pipeline (so it needs the API key and network access,
//! exactly like `serve`), runs a single turn, and prints the answer plus
//! the evidence it was grounded on.

use anyhow::Result;

use crate::config::Config;
use crate::pipeline::Pipeline;

pub async fn run_ask(config: &Config, question: &str) -> Result<()> {
    let pipeline = Pipeline::build(config).await?;
    let summary = pipeline.summary();
    tracing::info!(
        documents = summary.documents,
        chunks = summary.chunks,
        embed_model = %summary.embed_model,
        chat_model = %summary.chat_model,
        "pipeline ready"
    );

    let answer = pipeline.answer(question).await;

    println!("{}", answer.text);

    if !answer.evidence.is_empty() {
        println!();
        println!("Sources:");
        for (i, evidence) in answer.evidence.iter().enumerate() {
            println!(
                "{}. [{:.2}] {} ({} variant{})",
                i + 1,
                evidence.best_score,
                evidence.source_label,
                evidence.variant_hits,
                if evidence.variant_hits == 1 { "" } else { "s" }
            );
            if let Some(url) = &evidence.url {
                println!("    url: {}", url);
            }
        }
    }

    Ok(())
}
