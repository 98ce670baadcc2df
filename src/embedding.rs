//! Embedding provider abstraction and the Gemini implementation.
//!
//! Defines the [`EmbeddingProvider`] trait plus [`GeminiEmbeddings`], which
//! calls the Gemini `batchEmbedContents` REST endpoint. Also provides
//! [`cosine_similarity`] for scoring vectors in the in-memory index.
//!
//! Provider calls carry a bounded timeout and are never retried: a failed
//! call fails the stage that issued it, and the pipeline decides whether
//! that is fatal (index build) or degrades the turn (query embedding).

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{GeminiConfig, API_KEY_ENV};

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"embedding-001"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `768`).
    fn dims(&self) -> usize;
    /// Embed a batch of texts, returning one vector per input in input
    /// order. Every vector has exactly [`dims`](Self::dims) components.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embedding provider using the Gemini API.
///
/// Calls `POST /v1beta/models/{model}:batchEmbedContents` with the
/// configured model. Requires the `GOOGLE_API_KEY` environment variable.
pub struct GeminiEmbeddings {
    model: String,
    dims: usize,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiEmbeddings {
    /// Create a new Gemini embedding provider from configuration.
    ///
    /// Fails fast when `GOOGLE_API_KEY` is not in the environment, so a
    /// misconfigured deployment dies at startup rather than on the first
    /// query.
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => key,
            _ => bail!("{} environment variable not set", API_KEY_ENV),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model: config.embed_model.clone(),
            dims: config.dims,
            api_key,
            client,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddings {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let requests: Vec<serde_json::Value> = texts
            .iter()
            .map(|text| {
                serde_json::json!({
                    "model": format!("models/{}", self.model),
                    "content": { "parts": [ { "text": text } ] },
                })
            })
            .collect();

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:batchEmbedContents",
            self.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&serde_json::json!({ "requests": requests }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Gemini embedding API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        let vectors = parse_batch_response(&json)?;

        if vectors.len() != texts.len() {
            bail!(
                "Gemini embedding API returned {} vectors for {} inputs",
                vectors.len(),
                texts.len()
            );
        }
        for vec in &vectors {
            if vec.len() != self.dims {
                bail!(
                    "Gemini embedding API returned {}-dim vector, expected {}",
                    vec.len(),
                    self.dims
                );
            }
        }

        Ok(vectors)
    }
}

/// Parse the `batchEmbedContents` response JSON.
///
/// Extracts the `embeddings[].values` arrays and returns them in order.
fn parse_batch_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing embeddings array"))?;

    let mut vectors = Vec::with_capacity(embeddings.len());

    for item in embeddings {
        let values = item
            .get("values")
            .and_then(|v| v.as_array())
            .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing values"))?;

        let vec: Vec<f32> = values
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        vectors.push(vec);
    }

    Ok(vectors)
}

/// Create the embedding provider from configuration.
pub fn create_provider(config: &GeminiConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(Arc::new(GeminiEmbeddings::new(config)?))
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors, vectors of
/// different lengths, or near-zero norms.
///
/// ```rust
/// use corpus_chat::embedding::cosine_similarity;
///
/// let sim = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]);
/// assert!((sim - 1.0).abs() < 1e-6);
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_empty_and_mismatched() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_parse_batch_response() {
        let json = serde_json::json!({
            "embeddings": [
                { "values": [0.1, 0.2, 0.3] },
                { "values": [0.4, 0.5, 0.6] },
            ]
        });
        let vectors = parse_batch_response(&json).unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), 3);
        assert!((vectors[1][0] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_parse_batch_response_missing_embeddings() {
        let json = serde_json::json!({ "error": { "message": "bad request" } });
        assert!(parse_batch_response(&json).is_err());
    }
}
