//! Multi-query expansion.
//!
//! Asks the chat model for paraphrased versions of the user's question, so
//! retrieval sees several phrasings of the same intent. Expansion is best
//! effort: any provider failure, safety block, or unusable output degrades
//! the turn to the original question alone. It never fails a turn.

use crate::error::PipelineError;
use crate::llm::{ChatProvider, Generation};

/// Expand `question` into `[original, variant1, ..]`. The original is
/// always first and always present; at most `variants` paraphrases follow.
pub async fn expand_query(chat: &dyn ChatProvider, question: &str, variants: usize) -> Vec<String> {
    let mut all = vec![question.to_string()];
    if variants == 0 {
        return all;
    }

    match try_expand(chat, question, variants).await {
        Ok(parsed) => all.extend(parsed),
        Err(err) => {
            tracing::warn!(error = %err, "query expansion degraded to original question");
        }
    }

    all
}

async fn try_expand(
    chat: &dyn ChatProvider,
    question: &str,
    variants: usize,
) -> Result<Vec<String>, PipelineError> {
    let prompt = expansion_prompt(question, variants);

    match chat.generate(&prompt).await {
        Ok(Generation::Text(text)) => {
            let parsed = parse_variants(&text, question, variants);
            if parsed.is_empty() {
                Err(PipelineError::Expansion(anyhow::anyhow!(
                    "no usable variants in model output"
                )))
            } else {
                Ok(parsed)
            }
        }
        Ok(Generation::Blocked { reason }) => Err(PipelineError::Expansion(anyhow::anyhow!(
            "expansion prompt blocked: {}",
            reason
        ))),
        Err(e) => Err(PipelineError::Expansion(e)),
    }
}

fn expansion_prompt(question: &str, variants: usize) -> String {
    format!(
        "You are an AI language model assistant. Your task is to generate {} different \
         versions of the given user question to retrieve relevant documents from a vector \
         database. By generating multiple perspectives on the user question, your goal is \
         to help the user overcome some of the limitations of distance-based similarity \
         search. Provide these alternative questions separated by newlines. Do not number \
         them.\n\nOriginal question: {}",
        variants, question
    )
}

/// Parse newline-separated variants out of model output. Strips list
/// markers the model adds despite instructions, drops empties, dedupes
/// case-insensitively against the original question and each other, and
/// truncates to `limit`.
fn parse_variants(output: &str, original: &str, limit: usize) -> Vec<String> {
    let original_lower = original.trim().to_lowercase();
    let mut seen = vec![original_lower];
    let mut variants = Vec::new();

    for line in output.lines() {
        let cleaned = strip_list_marker(line);
        if cleaned.is_empty() {
            continue;
        }

        let lower = cleaned.to_lowercase();
        if seen.contains(&lower) {
            continue;
        }
        seen.push(lower);

        variants.push(cleaned.to_string());
        if variants.len() == limit {
            break;
        }
    }

    variants
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let line = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .unwrap_or(line);

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return rest.trim_start();
        }
    }

    line
}
