//! Embedding Module
//!
//! Converts free-text queries into fixed-length vectors.
//!
//! ## Architecture
//!
//! - **Embedder**: async trait every backend implements; injected into the
//!   search pipeline as `Arc<dyn Embedder>` so tests can substitute fakes
//! - **OpenAiEmbedder**: OpenAI-compatible `/embeddings` HTTP backend
//!
//! No retries happen at this layer. A failed call surfaces as an
//! [`EmbeddingError`] and the caller decides what to do with it.

use crate::types::Embedding;
use async_trait::async_trait;
use std::time::Duration;

mod openai;

pub use openai::OpenAiEmbedder;

/// Embedding failures
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("input rejected by embedding model: {0}")]
    Rejected(String),
    #[error("embedding provider returned status {status}: {message}")]
    Provider { status: u16, message: String },
    #[error("embedding request timed out after {0:?}")]
    Timeout(Duration),
    #[error("embedding transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),
    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("embedding request cancelled")]
    Cancelled,
}

/// Unified trait for embedding backends
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Produce exactly one vector of length [`dimension`](Self::dimension)
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Model identifier sent to the provider
    fn model(&self) -> &str;

    /// Length L of every vector this embedder returns
    fn dimension(&self) -> usize;
}

/// Reject vectors whose length differs from the configured dimension.
pub(crate) fn check_dimension(expected: usize, vector: &[f32]) -> Result<(), EmbeddingError> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: vector.len(),
        })
    }
}
