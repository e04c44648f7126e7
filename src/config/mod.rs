//! Search Configuration Module
//!
//! Provides the pipeline configuration loaded from TOML files plus
//! environment overrides.
//!
//! ## Loading Order
//!
//! 1. Explicit path passed on the command line
//! 2. `WORKFLOW_SEARCH_CONFIG` environment variable (path to TOML file)
//! 3. `workflow_search.toml` in the current working directory
//! 4. Built-in defaults
//!
//! Credentials and endpoints may then be overridden from the environment
//! (`OPENAI_API_KEY`, `QDRANT_URL`, `NEO4J_URI`, `REDIS_URL`, ...). Binaries
//! read a `.env` file with `dotenvy` before loading.
//!
//! ## Usage
//!
//! ```ignore
//! let config = SearchConfig::load(None)?;
//! let pipeline = SearchPipeline::from_config(&config)?;
//! ```
//!
//! The config is passed explicitly to whatever needs it; there is no
//! process-wide instance.

mod search_config;
pub mod validation;

pub use search_config::*;
