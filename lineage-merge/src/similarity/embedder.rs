//! Sentence embedding service client
//!
//! The scorer only needs "sentences in, one vector per sentence out". The HTTP
//! client talks to an Ollama-style `/api/embed` endpoint:
//!
//! ```text
//! POST {url}  {"model": "...", "input": ["sentence", ...]}
//! 200         {"embeddings": [[f32, ...], ...]}
//! ```

use async_trait::async_trait;
use lineage_common::config::EmbeddingSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("lineage-merge/", env!("CARGO_PKG_VERSION"));

/// Embedding client errors
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Service returned an error status
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Failed to parse the response body
    #[error("Parse error: {0}")]
    Parse(String),

    /// Response vector count did not match the request
    #[error("Expected {expected} embeddings, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Produces one embedding vector per input sentence, in input order
#[async_trait]
pub trait SentenceEmbedder: Send + Sync {
    async fn embed(&self, sentences: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// HTTP embedding service client
pub struct HttpEmbedder {
    http_client: reqwest::Client,
    url: String,
    model: String,
}

impl HttpEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self, EmbeddingError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            url: settings.url.clone(),
            model: settings.model.clone(),
        })
    }
}

#[async_trait]
impl SentenceEmbedder for HttpEmbedder {
    async fn embed(&self, sentences: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if sentences.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(count = sentences.len(), url = %self.url, "Requesting sentence embeddings");

        let response = self
            .http_client
            .post(&self.url)
            .json(&EmbedRequest {
                model: &self.model,
                input: sentences,
            })
            .send()
            .await
            .map_err(|e| EmbeddingError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api(status.as_u16(), body));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Parse(e.to_string()))?;

        if parsed.embeddings.len() != sentences.len() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: sentences.len(),
                actual: parsed.embeddings.len(),
            });
        }

        Ok(parsed.embeddings)
    }
}
