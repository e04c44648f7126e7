//! OpenAI-compatible embedding backend
//!
//! Talks to any provider exposing `POST {base_url}/embeddings` with the
//! OpenAI request/response shape (OpenAI, Azure-compatible proxies, vLLM,
//! Ollama's OpenAI shim).

use super::{check_dimension, Embedder, EmbeddingError};
use crate::config::EmbeddingConfig;
use crate::types::Embedding;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Deserialize)]
struct ProviderErrorDetail {
    message: String,
}

/// HTTP client for an OpenAI-compatible embeddings endpoint
#[derive(Clone)]
pub struct OpenAiEmbedder {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
    timeout: Duration,
}

impl OpenAiEmbedder {
    /// Build a client with the configured request timeout
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let timeout = config.timeout();
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dimension: config.dimension,
            timeout,
        })
    }

    /// Full URL of the embeddings endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, err: reqwest::Error) -> EmbeddingError {
        if err.is_timeout() {
            EmbeddingError::Timeout(self.timeout)
        } else {
            EmbeddingError::Transport(err)
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        debug!(model = %self.model, chars = text.chars().count(), "Requesting query embedding");

        let mut req = self.http.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: text,
        });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| self.transport_error(e))?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = provider_message(&body);
            return Err(match status {
                StatusCode::BAD_REQUEST
                | StatusCode::PAYLOAD_TOO_LARGE
                | StatusCode::UNPROCESSABLE_ENTITY => EmbeddingError::Rejected(message),
                _ => EmbeddingError::Provider {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let parsed: EmbeddingResponse = serde_json::from_slice(&body)
            .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;
        // One input string, so exactly one vector back
        let mut data = parsed.data;
        if data.len() != 1 {
            return Err(EmbeddingError::MalformedResponse(format!(
                "expected exactly one embedding, got {}",
                data.len()
            )));
        }
        let vector = data.swap_remove(0).embedding;
        check_dimension(self.dimension, &vector)?;

        debug!(dimension = vector.len(), "Query embedding received");
        Ok(Embedding::new(vector, self.model.clone()))
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Pull `error.message` out of a provider error body, falling back to raw text.
fn provider_message(body: &[u8]) -> String {
    serde_json::from_slice::<ProviderErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).trim().to_string())
}
