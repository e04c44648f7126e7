//! Search Pipeline Module
//!
//! ## 3-Stage Query Sequence
//!
//! ```text
//! STAGE 1: Embed     query text → vector          (Embedder)
//! STAGE 2: Retrieve  vector + namespace → hits     (Retriever)
//! STAGE 3: Present   hits → display records        (presenter::present)
//! ```
//!
//! GUARANTEE: Stage 2 only runs if Stage 1 produced a vector, and nothing is
//! returned unless all three stages succeed.

mod coordinator;

pub use coordinator::{PipelineError, PipelineStats, SearchPipeline};
