//! Query and chunk embedding.
//!
//! [`OllamaEmbedder`] calls a local Ollama instance's `POST /api/embed`
//! endpoint. Requests are not retried: a failure surfaces as a
//! [`RetrievalError::Embedding`] to whoever asked for the vector.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::RetrievalError;

/// Default Ollama endpoint.
pub const DEFAULT_EMBED_URL: &str = "http://localhost:11434";
/// Default embedding model.
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";

/// Turns text into dense vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier, recorded for diagnostics.
    fn model_name(&self) -> &str;

    /// Embeds each input text, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] if the backend is unreachable or answers
    /// with a malformed payload.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError>;
}

/// Embedder backed by an Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaEmbedder {
    /// Creates an embedder for `model` served at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Embedding`] if the HTTP client cannot be built.
    pub fn new(
        url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RetrievalError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RetrievalError::Embedding {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(format!("{}/api/embed", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::Embedding {
                message: format!("Ollama connection error (is Ollama running at {}?): {e}", self.url),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Embedding {
                message: format!("Ollama API error {status}: {text}"),
            });
        }

        let payload = response
            .text()
            .await
            .map_err(|e| RetrievalError::InvalidResponse {
                message: e.to_string(),
            })?;
        let vectors = parse_embed_response(&payload)?;

        if vectors.len() != texts.len() {
            return Err(RetrievalError::InvalidResponse {
                message: format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    vectors.len()
                ),
            });
        }

        debug!(model = %self.model, count = vectors.len(), "embedded texts");
        Ok(vectors)
    }
}

/// Body of a successful `/api/embed` response.
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Decodes the `embeddings` array from an Ollama response body.
fn parse_embed_response(body: &str) -> Result<Vec<Vec<f32>>, RetrievalError> {
    serde_json::from_str::<EmbedResponse>(body)
        .map(|r| r.embeddings)
        .map_err(|e| RetrievalError::InvalidResponse {
            message: format!("malformed embed response: {e}"),
        })
}
