//! Search Configuration - provider endpoints, index location, search scope
//!
//! Every section implements `Default` so a missing file (or a file that sets
//! only a handful of keys) still yields a runnable configuration pointing at
//! local services.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "WORKFLOW_SEARCH_CONFIG";

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "workflow_search.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for the search pipeline and its service probes.
///
/// Load with `SearchConfig::load()` which searches:
/// 1. An explicit path (CLI `--config`)
/// 2. `$WORKFLOW_SEARCH_CONFIG`
/// 3. `./workflow_search.toml`
/// 4. Built-in defaults
///
/// Environment overrides are applied on top, then the result is validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Embedding provider
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Vector index holding the workflow steps
    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    /// Search scope and result count
    #[serde(default)]
    pub search: SearchSettings,

    /// Availability probes (graph database, cache)
    #[serde(default)]
    pub services: ServicesConfig,
}

impl SearchConfig {
    /// Load configuration using the standard search order.
    ///
    /// An explicit path must load cleanly. The env-var and working-directory
    /// files fall back to the next source with a warning.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::load_file(explicit)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn load_file(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        // 1. Explicit path
        if let Some(path) = explicit {
            let config = Self::load_from_file(path)?;
            info!(path = %path.display(), "Loaded search config");
            return Ok(config);
        }

        // 2. Env var
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded search config from {}", CONFIG_PATH_ENV);
                        return Ok(config);
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_PATH_ENV);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_PATH_ENV);
            }
        }

        // 3. ./workflow_search.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded search config from ./{}", LOCAL_CONFIG_FILE);
                    return Ok(config);
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        // 4. Defaults
        info!("No config file found, using built-in defaults");
        Ok(Self::default())
    }

    /// Load from a specific TOML file path. Unknown keys are logged, not fatal.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse a TOML document without touching the filesystem or environment.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (env-like key → value).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OPENAI_API_KEY") {
            self.embedding.api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.embedding.base_url = v;
        }
        if let Some(v) = get("EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Some(v) = get("EMBEDDING_DIMENSION") {
            match v.parse() {
                Ok(n) => self.embedding.dimension = n,
                Err(_) => warn!(value = %v, "Ignoring non-numeric EMBEDDING_DIMENSION"),
            }
        }
        if let Some(v) = get("QDRANT_URL") {
            self.vector_store.url = v;
        }
        if let Some(v) = get("QDRANT_API_KEY") {
            self.vector_store.api_key = Some(v);
        }
        if let Some(v) = get("QDRANT_COLLECTION") {
            self.vector_store.collection = v;
        }
        if let Some(v) = get("SEARCH_NAMESPACE") {
            self.search.namespace = v;
        }
        if let Some(v) = get("NEO4J_URI") {
            self.services.graph_uri = v;
        }
        if let Some(v) = get("REDIS_URL") {
            self.services.cache_url = v;
        }
    }

    /// Validate all values, collecting every problem before failing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        Self::check_non_empty(&self.embedding.base_url, "embedding.base_url", &mut errors);
        Self::check_non_empty(&self.embedding.model, "embedding.model", &mut errors);
        Self::check_non_empty(&self.vector_store.url, "vector_store.url", &mut errors);
        Self::check_non_empty(
            &self.vector_store.collection,
            "vector_store.collection",
            &mut errors,
        );
        Self::check_non_empty(&self.search.namespace, "search.namespace", &mut errors);
        Self::check_non_empty(&self.services.graph_uri, "services.graph_uri", &mut errors);
        Self::check_non_empty(&self.services.cache_url, "services.cache_url", &mut errors);

        if self.embedding.dimension == 0 {
            errors.push("embedding.dimension must be > 0".to_string());
        }
        if self.search.limit == 0 {
            errors.push("search.limit must be >= 1".to_string());
        }
        for (value, name) in [
            (self.embedding.timeout_secs, "embedding.timeout_secs"),
            (self.vector_store.timeout_secs, "vector_store.timeout_secs"),
            (self.services.probe_timeout_secs, "services.probe_timeout_secs"),
        ] {
            if value == 0 {
                errors.push(format!("{name} must be > 0"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_non_empty(value: &str, name: &str, errors: &mut Vec<String>) {
        if value.trim().is_empty() {
            errors.push(format!("{name} must not be empty"));
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

/// OpenAI-compatible embedding provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Vector length L produced by `model`
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
    /// Normally supplied through `OPENAI_API_KEY`
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout_secs(),
            api_key: None,
        }
    }
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
const fn default_embedding_dimension() -> usize {
    1536
}
const fn default_embedding_timeout_secs() -> u64 {
    30
}

/// Qdrant vector index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default = "default_vector_store_url")]
    pub url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Normally supplied through `QDRANT_API_KEY`
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_vector_store_timeout_secs")]
    pub timeout_secs: u64,
}

impl VectorStoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: default_vector_store_url(),
            collection: default_collection(),
            api_key: None,
            timeout_secs: default_vector_store_timeout_secs(),
        }
    }
}

fn default_vector_store_url() -> String {
    "http://localhost:6333".to_string()
}
fn default_collection() -> String {
    "workflow_steps".to_string()
}
const fn default_vector_store_timeout_secs() -> u64 {
    10
}

/// Which namespace to search and how many hits to return
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            limit: default_limit(),
        }
    }
}

fn default_namespace() -> String {
    "light-node".to_string()
}
const fn default_limit() -> usize {
    5
}

/// Services probed by the health check binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// Bolt endpoint of the graph database (`bolt://` or `neo4j://`)
    #[serde(default = "default_graph_uri")]
    pub graph_uri: String,
    /// Redis URL (`redis://[:password@]host:port[/db]`)
    #[serde(default = "default_cache_url")]
    pub cache_url: String,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl ServicesConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            graph_uri: default_graph_uri(),
            cache_url: default_cache_url(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

fn default_graph_uri() -> String {
    "bolt://localhost:7687".to_string()
}
fn default_cache_url() -> String {
    "redis://localhost:6379".to_string()
}
const fn default_probe_timeout_secs() -> u64 {
    5
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(_, e) => Some(e),
            ConfigError::Parse(_, e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}
