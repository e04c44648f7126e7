//! Retrieval Module - namespace-scoped nearest-neighbor search
//!
//! The `Retriever` trait abstracts the vector index so backends can be
//! swapped:
//! - `QdrantRetriever`: Qdrant REST points search (production)
//! - `InMemoryRetriever`: cosine scan over records held in process (offline
//!   runs and tests)
//!
//! Every backend funnels its raw hits through [`rank_hits`], which enforces
//! the shared contract: non-increasing scores, at most `limit` hits, and no
//! hit from outside the requested namespace.

use crate::types::{Embedding, SearchHit};
use async_trait::async_trait;
use std::time::Duration;

mod in_memory;
mod qdrant;

pub use in_memory::{IndexedStep, InMemoryRetriever};
pub use qdrant::QdrantRetriever;

/// Retrieval failures
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("result limit must be at least 1, got {0}")]
    InvalidLimit(usize),
    #[error("collection '{0}' does not exist")]
    CollectionNotFound(String),
    #[error("vector index returned status {status}: {message}")]
    Index { status: u16, message: String },
    #[error("search request timed out after {0:?}")]
    Timeout(Duration),
    #[error("vector index transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed search response: {0}")]
    MalformedResponse(String),
    #[error("query vector has {actual} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("query vector component {index} is not finite")]
    NonFiniteQuery { index: usize },
    #[error("hit {id} belongs to namespace '{found}', requested '{expected}'")]
    NamespaceViolation {
        id: String,
        expected: String,
        found: String,
    },
    #[error("search request cancelled")]
    Cancelled,
}

/// Trait for vector index backends
///
/// Implementations must be thread-safe (Send + Sync) since one retriever is
/// shared by every concurrent query.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return at most `limit` hits from `namespace`, most similar first.
    ///
    /// An empty namespace yields `Ok(vec![])`, not an error.
    async fn search(
        &self,
        query: &Embedding,
        namespace: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, RetrievalError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Reject a zero limit before any I/O happens.
pub fn check_limit(limit: usize) -> Result<(), RetrievalError> {
    if limit == 0 {
        Err(RetrievalError::InvalidLimit(limit))
    } else {
        Ok(())
    }
}

/// Reject NaN or infinite components; they would poison every score.
pub fn check_query(query: &Embedding) -> Result<(), RetrievalError> {
    match query.as_slice().iter().position(|x| !x.is_finite()) {
        Some(index) => Err(RetrievalError::NonFiniteQuery { index }),
        None => Ok(()),
    }
}

/// Apply the ranking contract to raw backend hits.
///
/// Sorting is stable, so equal scores keep the backend's native order.
pub fn rank_hits(
    mut hits: Vec<SearchHit>,
    namespace: &str,
    limit: usize,
) -> Result<Vec<SearchHit>, RetrievalError> {
    if let Some(stray) = hits.iter().find(|h| h.payload.namespace != namespace) {
        return Err(RetrievalError::NamespaceViolation {
            id: stray.id.to_string(),
            expected: namespace.to_string(),
            found: stray.payload.namespace.clone(),
        });
    }

    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(limit);
    Ok(hits)
}
