//! Shared data structures for workflow-step retrieval
//!
//! This module defines the values that flow through the search pipeline:
//! - Stage 1: Embedding (query vector produced by the embedder)
//! - Stage 2: SearchHit / StepPayload (ranked records returned by the retriever)
//!
//! Display records produced by the presenter live in [`crate::presenter`].

mod embedding;
mod step;

pub use embedding::*;
pub use step::*;
