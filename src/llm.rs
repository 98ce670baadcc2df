//! Chat provider abstraction and the Gemini implementation.
//!
//! Both query expansion and answer synthesis go through [`ChatProvider`].
//! A content-safety refusal is a typed [`Generation::Blocked`] outcome
//! rather than an error, so callers can tell "the model declined" apart
//! from "the call failed". Like the embedding client, calls carry a bounded
//! timeout and are never retried.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{GeminiConfig, API_KEY_ENV};

/// Outcome of a single generation call.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    /// The model produced text.
    Text(String),
    /// The provider refused to answer on safety grounds.
    Blocked { reason: String },
}

/// Trait for chat completion providers.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-2.0-flash"`).
    fn model_name(&self) -> &str;
    /// Run one prompt through the model.
    async fn generate(&self, prompt: &str) -> Result<Generation>;
}

/// Chat provider using the Gemini API.
///
/// Calls `POST /v1beta/models/{model}:generateContent` with a fixed low
/// temperature so grounded answers stay close to the supplied context.
pub struct GeminiChat {
    model: String,
    temperature: f64,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiChat {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => key,
            _ => bail!("{} environment variable not set", API_KEY_ENV),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model: config.chat_model.clone(),
            temperature: config.temperature,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl ChatProvider for GeminiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<Generation> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );

        let body = serde_json::json!({
            "contents": [ { "role": "user", "parts": [ { "text": prompt } ] } ],
            "generationConfig": { "temperature": self.temperature },
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Gemini chat API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_generate_response(&json)
    }
}

/// Parse the `generateContent` response JSON.
///
/// Block markers are checked before text extraction: a blocked prompt has
/// `promptFeedback.blockReason` and no candidates; a blocked completion has
/// a candidate whose `finishReason` is `"SAFETY"`.
fn parse_generate_response(json: &serde_json::Value) -> Result<Generation> {
    if let Some(reason) = json
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .and_then(|r| r.as_str())
    {
        return Ok(Generation::Blocked {
            reason: reason.to_string(),
        });
    }

    let candidate = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: no candidates"))?;

    if let Some(finish) = candidate.get("finishReason").and_then(|r| r.as_str()) {
        if finish == "SAFETY" {
            return Ok(Generation::Blocked {
                reason: finish.to_string(),
            });
        }
    }

    let parts = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing content parts"))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<&str>>()
        .join("");

    if text.trim().is_empty() {
        bail!("Invalid Gemini response: empty candidate text");
    }

    Ok(Generation::Text(text))
}

/// Create the chat provider from configuration.
pub fn create_provider(config: &GeminiConfig) -> Result<Arc<dyn ChatProvider>> {
    Ok(Arc::new(GeminiChat::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_candidate() {
        let json = serde_json::json!({
            "candidates": [ {
                "content": { "role": "model", "parts": [ { "text": "Hello there." } ] },
                "finishReason": "STOP",
            } ]
        });
        assert_eq!(
            parse_generate_response(&json).unwrap(),
            Generation::Text("Hello there.".to_string())
        );
    }

    #[test]
    fn test_parse_multi_part_candidate() {
        let json = serde_json::json!({
            "candidates": [ {
                "content": { "parts": [ { "text": "Part one. " }, { "text": "Part two." } ] },
            } ]
        });
        assert_eq!(
            parse_generate_response(&json).unwrap(),
            Generation::Text("Part one. Part two.".to_string())
        );
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let json = serde_json::json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        });
        assert_eq!(
            parse_generate_response(&json).unwrap(),
            Generation::Blocked {
                reason: "SAFETY".to_string()
            }
        );
    }

    #[test]
    fn test_parse_blocked_candidate() {
        let json = serde_json::json!({
            "candidates": [ { "finishReason": "SAFETY" } ]
        });
        assert_eq!(
            parse_generate_response(&json).unwrap(),
            Generation::Blocked {
                reason: "SAFETY".to_string()
            }
        );
    }

    #[test]
    fn test_parse_no_candidates_is_error() {
        let json = serde_json::json!({ "candidates": [] });
        assert!(parse_generate_response(&json).is_err());
    }

    #[test]
    fn test_parse_empty_text_is_error() {
        let json = serde_json::json!({
            "candidates": [ { "content": { "parts": [ { "text": "  " } ] } } ]
        });
        assert!(parse_generate_response(&json).is_err());
    }
}
