//! Qdrant REST retriever
//!
//! Issues `POST /collections/{name}/points/search` with a `must` filter on
//! the namespace payload key, so Qdrant only compares the query vector with
//! records from that namespace.

use super::{check_limit, check_query, rank_hits, RetrievalError, Retriever};
use crate::config::VectorStoreConfig;
use crate::types::{Embedding, PointId, SearchHit, StepPayload, NAMESPACE_KEY};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
    filter: Filter<'a>,
}

#[derive(Serialize)]
struct Filter<'a> {
    must: Vec<FieldCondition<'a>>,
}

#[derive(Serialize)]
struct FieldCondition<'a> {
    key: &'a str,
    #[serde(rename = "match")]
    matches: MatchValue<'a>,
}

#[derive(Serialize)]
struct MatchValue<'a> {
    value: &'a str,
}

impl<'a> Filter<'a> {
    fn namespace(namespace: &'a str) -> Self {
        Self {
            must: vec![FieldCondition {
                key: NAMESPACE_KEY,
                matches: MatchValue { value: namespace },
            }],
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    id: PointId,
    score: f32,
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct QdrantErrorBody {
    status: QdrantErrorStatus,
}

#[derive(Deserialize)]
struct QdrantErrorStatus {
    error: String,
}

/// HTTP client for a single Qdrant collection
#[derive(Clone)]
pub struct QdrantRetriever {
    http: reqwest::Client,
    base_url: String,
    collection: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl QdrantRetriever {
    /// Build a client with the configured request timeout
    pub fn new(config: &VectorStoreConfig) -> Result<Self, RetrievalError> {
        let timeout = config.timeout();
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            api_key: config.api_key.clone(),
            timeout,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn search_url(&self) -> String {
        format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection
        )
    }

    fn transport_error(&self, err: reqwest::Error) -> RetrievalError {
        if err.is_timeout() {
            RetrievalError::Timeout(self.timeout)
        } else {
            RetrievalError::Transport(err)
        }
    }
}

#[async_trait]
impl Retriever for QdrantRetriever {
    async fn search(
        &self,
        query: &Embedding,
        namespace: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        check_limit(limit)?;
        check_query(query)?;
        debug!(collection = %self.collection, namespace, limit, "Searching vector index");

        let mut req = self.http.post(self.search_url()).json(&SearchRequest {
            vector: query.as_slice(),
            limit,
            with_payload: true,
            filter: Filter::namespace(namespace),
        });
        if let Some(key) = &self.api_key {
            req = req.header("api-key", key);
        }

        let resp = req.send().await.map_err(|e| self.transport_error(e))?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| self.transport_error(e))?;

        match status {
            StatusCode::NOT_FOUND => {
                return Err(RetrievalError::CollectionNotFound(self.collection.clone()))
            }
            s if !s.is_success() => {
                return Err(RetrievalError::Index {
                    status: s.as_u16(),
                    message: index_message(&body),
                })
            }
            _ => {}
        }

        let parsed: SearchResponse = serde_json::from_slice(&body)
            .map_err(|e| RetrievalError::MalformedResponse(e.to_string()))?;

        let hits = parsed
            .result
            .into_iter()
            .map(into_hit)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(returned = hits.len(), "Vector index responded");
        rank_hits(hits, namespace, limit)
    }

    fn backend_name(&self) -> &'static str {
        "Qdrant"
    }
}

fn into_hit(point: ScoredPoint) -> Result<SearchHit, RetrievalError> {
    let raw = point.payload.ok_or_else(|| {
        RetrievalError::MalformedResponse(format!("point {} has no payload", point.id))
    })?;
    let payload: StepPayload = serde_json::from_value(raw).map_err(|e| {
        RetrievalError::MalformedResponse(format!("point {} payload: {e}", point.id))
    })?;

    Ok(SearchHit {
        id: point.id,
        score: point.score,
        payload,
    })
}

/// Pull `status.error` out of a Qdrant error body, falling back to raw text.
fn index_message(body: &[u8]) -> String {
    serde_json::from_slice::<QdrantErrorBody>(body)
        .map(|b| b.status.error)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).trim().to_string())
}
