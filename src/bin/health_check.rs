//! Service health check for the search stack.
//!
//! Probes the graph database, the vector index and the cache, prints a
//! summary and exits 0 when everything is reachable, 1 otherwise.
//!
//! Usage:
//!   cargo run --bin health-check
//!   cargo run --bin health-check -- --config workflow_search.toml --json

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use workflow_search::health::{self, CacheProbe, GraphProbe, ServiceProbe, VectorStoreProbe};
use workflow_search::SearchConfig;

/// Reachability checks for Neo4j, Qdrant and Redis.
#[derive(Parser)]
#[command(name = "health-check")]
struct Args {
    /// Path to a TOML config file.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn build_probes(config: &SearchConfig) -> Result<Vec<Box<dyn ServiceProbe>>> {
    let graph = GraphProbe::new(&config.services.graph_uri).context("graph database URI")?;
    let vector = VectorStoreProbe::new(
        &config.vector_store.url,
        config.vector_store.api_key.clone(),
        &config.vector_store.collection,
        config.services.probe_timeout(),
    )
    .context("vector store URL")?;
    let cache = CacheProbe::new(&config.services.cache_url).context("cache URL")?;

    Ok(vec![Box::new(graph), Box::new(vector), Box::new(cache)])
}

async fn run(args: Args) -> Result<ExitCode> {
    let config = SearchConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let probes = build_probes(&config)?;

    info!("Checking {} services...", probes.len());
    let report = health::check_all(&probes, config.services.probe_timeout()).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }

    // exit_code() is 0 or 1
    Ok(ExitCode::from(report.exit_code() as u8))
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Health check failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
