//! Query embedding produced by an [`Embedder`](crate::embedding::Embedder)

use serde::{Deserialize, Serialize};

/// Fixed-length vector representation of a query.
///
/// Only embeddings produced by the same model are comparable, so the model
/// identifier travels with the vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    vector: Vec<f32>,
    model: String,
}

impl Embedding {
    pub fn new(vector: Vec<f32>, model: impl Into<String>) -> Self {
        Self {
            vector,
            model: model.into(),
        }
    }

    /// Vector components
    pub fn as_slice(&self) -> &[f32] {
        &self.vector
    }

    /// Model identifier that produced this vector
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Vector length (L)
    pub fn len(&self) -> usize {
        self.vector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vector.is_empty()
    }

    /// Whether two embeddings can be compared by distance
    pub fn is_comparable_with(&self, other: &Self) -> bool {
        self.model == other.model && self.vector.len() == other.vector.len()
    }
}
