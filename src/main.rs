//! workflow-search - ask a question, get the matching workflow steps
//!
//! Embeds the question, searches one namespace of the vector index and
//! prints the ranked steps.
//!
//! # Usage
//!
//! ```bash
//! # Default example question against the configured namespace
//! cargo run --release
//!
//! # Custom question, other namespace, three results
//! cargo run --release -- "How do I run a bridge node?" --namespace bridge-node --limit 3
//! ```
//!
//! # Environment Variables
//!
//! - `OPENAI_API_KEY`: Embedding provider key
//! - `QDRANT_URL` / `QDRANT_API_KEY`: Vector index location and key
//! - `WORKFLOW_SEARCH_CONFIG`: Path to a TOML config file
//! - `RUST_LOG`: Logging level (default: warn, logs go to stderr)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

use workflow_search::presenter::render_report;
use workflow_search::{SearchConfig, SearchPipeline};

/// Question asked when none is given on the command line
const DEFAULT_QUERY: &str = "How do I set up a light node?";

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "workflow-search")]
#[command(about = "Semantic search over procedural workflow steps")]
#[command(version)]
struct CliArgs {
    /// Natural-language question
    #[arg(default_value = DEFAULT_QUERY)]
    query: String,

    /// Namespace to search (overrides config and SEARCH_NAMESPACE)
    #[arg(short, long)]
    namespace: Option<String>,

    /// Maximum number of steps to return
    #[arg(short, long)]
    limit: Option<usize>,

    /// Path to a TOML config file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    let mut config =
        SearchConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(namespace) = args.namespace {
        config.search.namespace = namespace;
    }
    if let Some(limit) = args.limit {
        config.search.limit = limit;
    }
    config.validate().context("Invalid command-line override")?;

    info!(
        namespace = %config.search.namespace,
        collection = %config.vector_store.collection,
        model = %config.embedding.model,
        "Running query"
    );

    let pipeline =
        SearchPipeline::from_config(&config).context("Failed to initialize search pipeline")?;

    // Ctrl+C abandons the in-flight request
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        shutdown_token.cancel();
    });

    let records = pipeline
        .run_cancellable(&args.query, &cancel_token)
        .await
        .context("Search failed")?;

    print!(
        "{}",
        render_report(&args.query, pipeline.namespace(), &records)
    );
    Ok(())
}
