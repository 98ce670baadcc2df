//! Grounded answer synthesis.
//!
//! Builds the one prompt of the turn: strict grounding instructions for the
//! configured organization, the fused evidence under numbered source
//! headers, then the user's question. The model is told to answer from the
//! context alone and to say so politely when the context has nothing
//! relevant, rather than invent an answer.

use crate::error::PipelineError;
use crate::llm::{ChatProvider, Generation};
use crate::retrieve::EvidenceChunk;

/// Assemble the grounding prompt for one turn.
pub fn grounding_prompt(org_name: &str, evidence: &[EvidenceChunk], question: &str) -> String {
    let mut context = String::new();
    for (i, chunk) in evidence.iter().enumerate() {
        context.push_str(&format!("[{}] {}\n{}\n\n", i + 1, chunk.source_label, chunk.text));
    }

    format!(
        "You are a friendly and professional assistant representing {org}.\n\
         IMPORTANT: The user might refer to {org} using terms like \"the company\", \
         \"the firm\", or \"this organization\". Treat these as referring to {org}.\n\n\
         Your primary goal is to answer the user's question accurately based *strictly* \
         on the information found in the provided context documents below.\n\
         Follow these steps:\n\
         1. Carefully read the user's question and all of the provided context.\n\
         2. If the context contains the information needed, answer directly and \
         professionally using *only* that information, synthesizing across documents \
         where needed.\n\
         3. If the information IS present in the context, provide it even when the \
         question says \"the company\" instead of naming {org}.\n\
         4. Only if the specific information is genuinely not found in the context, \
         politely state that the specific detail isn't available in the provided \
         website information.\n\
         5. Do not invent information or use external knowledge.\n\
         6. Maintain a helpful, positive, and professional tone.\n\n\
         Context:\n{context}\n\
         Question: {question}\n\n\
         Helpful Answer:",
        org = org_name,
        context = context,
        question = question
    )
}

/// Run the grounding prompt through the chat model and classify the
/// outcome. A safety refusal and a provider failure map to different
/// error variants because they surface as different fixed answers.
pub async fn synthesize(
    chat: &dyn ChatProvider,
    org_name: &str,
    evidence: &[EvidenceChunk],
    question: &str,
) -> Result<String, PipelineError> {
    let prompt = grounding_prompt(org_name, evidence, question);

    match chat.generate(&prompt).await {
        Ok(Generation::Text(text)) => Ok(text.trim().to_string()),
        Ok(Generation::Blocked { reason }) => Err(PipelineError::SafetyBlocked { reason }),
        Err(e) => Err(PipelineError::Generation(e)),
    }
}
