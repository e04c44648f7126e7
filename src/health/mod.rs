//! Service Health Checks
//!
//! Reachability probes for the services the search pipeline depends on:
//! the graph database (Bolt), the vector index (Qdrant REST) and the cache
//! (Redis). Each probe runs under its own timeout; the aggregate report
//! decides the process exit code of the `health-check` binary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{info, warn};

mod probes;

pub use probes::{CacheProbe, GraphProbe, VectorStoreProbe};

/// Probe failures
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("invalid service URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("could not connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned status {0}")]
    Status(u16),
}

/// One availability probe
#[async_trait]
pub trait ServiceProbe: Send + Sync {
    /// Service label for the report ("Neo4j", "Qdrant", "Redis")
    fn service(&self) -> &'static str;

    /// Where the probe connects, with credentials stripped
    fn target(&self) -> String;

    /// Check reachability; on success returns a short detail string
    async fn check(&self) -> Result<String, ProbeError>;
}

/// Outcome of a single probe
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub service: String,
    pub target: String,
    pub healthy: bool,
    pub detail: String,
    pub latency_ms: u64,
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.healthy { "✓" } else { "✗" };
        write!(
            f,
            "{mark} {:<8} {} ({} ms): {}",
            self.service, self.target, self.latency_ms, self.detail
        )
    }
}

/// Aggregate of all probes in one run
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub checked_at: DateTime<Utc>,
    pub results: Vec<ProbeResult>,
}

impl HealthReport {
    pub fn all_healthy(&self) -> bool {
        self.results.iter().all(|r| r.healthy)
    }

    pub fn healthy_count(&self) -> usize {
        self.results.iter().filter(|r| r.healthy).count()
    }

    /// 0 when every service is reachable, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.all_healthy())
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Service health ({})", self.checked_at.to_rfc3339())?;
        for r in &self.results {
            writeln!(f, "  {r}")?;
        }
        let summary = if self.all_healthy() {
            "all services reachable"
        } else {
            "some services unreachable"
        };
        write!(
            f,
            "{}/{} healthy: {summary}",
            self.healthy_count(),
            self.results.len()
        )
    }
}

/// Run one probe under `timeout`, never failing.
pub async fn run_probe(probe: &dyn ServiceProbe, timeout: Duration) -> ProbeResult {
    let started = Instant::now();
    let outcome = match tokio::time::timeout(timeout, probe.check()).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::Timeout(timeout)),
    };
    let latency_ms = started.elapsed().as_millis() as u64;

    let (healthy, detail) = match outcome {
        Ok(detail) => {
            info!(service = probe.service(), latency_ms, "✓ {}", detail);
            (true, detail)
        }
        Err(e) => {
            warn!(service = probe.service(), latency_ms, error = %e, "Probe failed");
            (false, e.to_string())
        }
    };

    ProbeResult {
        service: probe.service().to_string(),
        target: probe.target(),
        healthy,
        detail,
        latency_ms,
    }
}

/// Run every probe concurrently and collect the report in input order.
pub async fn check_all(probes: &[Box<dyn ServiceProbe>], timeout: Duration) -> HealthReport {
    let results =
        futures::future::join_all(probes.iter().map(|p| run_probe(p.as_ref(), timeout))).await;
    HealthReport {
        checked_at: Utc::now(),
        results,
    }
}
