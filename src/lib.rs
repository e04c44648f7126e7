//! workflow-search: Semantic Retrieval of Workflow Steps
//!
//! Answers natural-language questions ("How do I set up a light node?") by
//! embedding the question and pulling the most similar procedural steps from
//! a vector index, scoped to one document namespace.
//!
//! ## Architecture
//!
//! - **Embedder**: query text → fixed-length vector (OpenAI-compatible HTTP)
//! - **Retriever**: namespace-filtered nearest-neighbor search (Qdrant REST,
//!   or an in-memory index)
//! - **Presenter**: ranked hits → display records
//! - **SearchPipeline**: runs the three in sequence with injected backends
//! - **Health**: reachability probes for the graph database, vector index
//!   and cache

pub mod config;
pub mod types;
pub mod embedding;
pub mod retrieval;
pub mod presenter;
pub mod pipeline;
pub mod health;

// Re-export configuration
pub use config::{ConfigError, SearchConfig};

// Re-export commonly used types
pub use types::{Embedding, PointId, SearchHit, StepPayload};

// Re-export pipeline components
pub use embedding::{Embedder, EmbeddingError, OpenAiEmbedder};
pub use retrieval::{InMemoryRetriever, IndexedStep, QdrantRetriever, RetrievalError, Retriever};
pub use presenter::{present, DisplayRecord, PresentationError};
pub use pipeline::{PipelineError, PipelineStats, SearchPipeline};

// Re-export health check components
pub use health::{HealthReport, ProbeError, ProbeResult, ServiceProbe};
