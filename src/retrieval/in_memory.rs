//! In-memory retriever: namespace filter first, cosine similarity second
//!
//! Records are held in a `RwLock<Vec<_>>` and scanned linearly. That is
//! O(n) per query but plenty for offline runs and test fixtures with a few
//! thousand steps.

use super::{check_limit, check_query, rank_hits, RetrievalError, Retriever};
use crate::types::{Embedding, PointId, SearchHit, StepPayload};
use async_trait::async_trait;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// A stored step with its precomputed vector
#[derive(Debug, Clone)]
pub struct IndexedStep {
    pub id: PointId,
    pub vector: Vec<f32>,
    pub payload: StepPayload,
}

/// In-process vector index with a fixed dimension
pub struct InMemoryRetriever {
    dimension: usize,
    steps: RwLock<Vec<IndexedStep>>,
}

impl InMemoryRetriever {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            steps: RwLock::new(Vec::new()),
        }
    }

    /// Add one step. Replaces any existing step with the same id.
    pub fn insert(&self, step: IndexedStep) -> Result<(), RetrievalError> {
        if step.vector.len() != self.dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimension,
                actual: step.vector.len(),
            });
        }

        let mut steps = self.write();
        steps.retain(|s| s.id != step.id);
        steps.push(step);
        Ok(())
    }

    /// Add many steps, stopping at the first dimension mismatch.
    pub fn extend<I>(&self, steps: I) -> Result<(), RetrievalError>
    where
        I: IntoIterator<Item = IndexedStep>,
    {
        for step in steps {
            self.insert(step)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<IndexedStep>> {
        self.steps.read().unwrap_or_else(|e| {
            warn!("RwLock poisoned on InMemoryRetriever read, recovering");
            e.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<IndexedStep>> {
        self.steps.write().unwrap_or_else(|e| {
            warn!("RwLock poisoned on InMemoryRetriever write, recovering");
            e.into_inner()
        })
    }
}

#[async_trait]
impl Retriever for InMemoryRetriever {
    async fn search(
        &self,
        query: &Embedding,
        namespace: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        check_limit(limit)?;
        if query.len() != self.dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        check_query(query)?;

        let hits: Vec<SearchHit> = {
            let steps = self.read();
            // Phase 1: metadata filter, so out-of-namespace records are never scored
            // Phase 2: cosine similarity against the query
            steps
                .iter()
                .filter(|s| s.payload.namespace == namespace)
                .map(|s| SearchHit {
                    id: s.id.clone(),
                    score: cosine_similarity(query.as_slice(), &s.vector),
                    payload: s.payload.clone(),
                })
                .collect()
        };

        debug!(namespace, candidates = hits.len(), "In-memory scan complete");
        rank_hits(hits, namespace, limit)
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}

/// Cosine similarity in [-1, 1]; zero-norm vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0_f32, 0.0_f32, 0.0_f32), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}
