//! Pipeline Regression Tests
//!
//! Drives `SearchPipeline` end to end with in-process backends: a
//! deterministic keyword embedder, the in-memory retriever, and scripted
//! fakes for failure paths. No network access.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use workflow_search::presenter::render_report;
use workflow_search::retrieval::rank_hits;
use workflow_search::{
    Embedder, Embedding, EmbeddingError, InMemoryRetriever, IndexedStep, PipelineError, PointId,
    RetrievalError, Retriever, SearchHit, SearchPipeline, StepPayload,
};

const VOCABULARY: [&str; 6] = ["light", "node", "bridge", "validator", "install", "sync"];

/// Bag-of-keywords embedder: one dimension per vocabulary word.
struct KeywordEmbedder;

impl KeywordEmbedder {
    fn vectorize(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        VOCABULARY
            .iter()
            .map(|w| lower.matches(w).count() as f32)
            .collect()
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        Ok(Embedding::new(Self::vectorize(text), "keyword-v1"))
    }

    fn model(&self) -> &str {
        "keyword-v1"
    }

    fn dimension(&self) -> usize {
        VOCABULARY.len()
    }
}

/// Embedder that always fails with a timeout.
struct TimingOutEmbedder;

#[async_trait]
impl Embedder for TimingOutEmbedder {
    async fn embed(&self, _text: &str) -> Result<Embedding, EmbeddingError> {
        Err(EmbeddingError::Timeout(Duration::from_secs(30)))
    }

    fn model(&self) -> &str {
        "unreachable"
    }

    fn dimension(&self) -> usize {
        VOCABULARY.len()
    }
}

/// Embedder that never answers.
struct StalledEmbedder;

#[async_trait]
impl Embedder for StalledEmbedder {
    async fn embed(&self, _text: &str) -> Result<Embedding, EmbeddingError> {
        std::future::pending().await
    }

    fn model(&self) -> &str {
        "stalled"
    }

    fn dimension(&self) -> usize {
        VOCABULARY.len()
    }
}

/// Retriever returning fixed hits and counting how often it was called.
struct ScriptedRetriever {
    hits: Vec<SearchHit>,
    calls: AtomicUsize,
}

impl ScriptedRetriever {
    fn new(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retriever for ScriptedRetriever {
    async fn search(
        &self,
        _query: &Embedding,
        namespace: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let in_namespace = self
            .hits
            .iter()
            .filter(|h| h.payload.namespace == namespace)
            .cloned()
            .collect();
        rank_hits(in_namespace, namespace, limit)
    }

    fn backend_name(&self) -> &'static str {
        "Scripted"
    }
}

/// Retriever that never answers.
struct StalledRetriever;

#[async_trait]
impl Retriever for StalledRetriever {
    async fn search(
        &self,
        _query: &Embedding,
        _namespace: &str,
        _limit: usize,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        std::future::pending().await
    }

    fn backend_name(&self) -> &'static str {
        "Stalled"
    }
}

fn step(id: u64, namespace: &str, name: &str, description: &str) -> IndexedStep {
    IndexedStep {
        id: PointId::Num(id),
        vector: KeywordEmbedder::vectorize(&format!("{name} {description}")),
        payload: StepPayload::new(namespace)
            .with_name(name)
            .with_description(description),
    }
}

/// Two populated namespaces sharing vocabulary.
fn two_namespace_index() -> Arc<InMemoryRetriever> {
    let index = InMemoryRetriever::new(VOCABULARY.len());
    index
        .extend([
            step(1, "light-node", "Install light node", "Install the light node binary"),
            step(2, "light-node", "Sync light node", "Sync headers from a bridge"),
            step(3, "light-node", "Fund light node", "Request tokens for the node wallet"),
            step(4, "light-node", "Check status", "Query the node over RPC"),
            step(10, "validator", "Install validator", "Install the validator node binary"),
            step(11, "validator", "Sync validator", "State sync the validator node"),
            step(12, "validator", "Bond stake", "Bond tokens to the validator"),
        ])
        .unwrap();
    Arc::new(index)
}

fn scored(id: u64, score: f32, name: &str) -> SearchHit {
    SearchHit {
        id: PointId::Num(id),
        score,
        payload: StepPayload::new("light-node")
            .with_name(name)
            .with_description(format!("{name} description"))
            .with_phase("setup"),
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn light_node_query_ranks_three_documents_by_score() {
    // Deliberately out of order; the retriever contract sorts them
    let retriever = Arc::new(ScriptedRetriever::new(vec![
        scored(2, 0.77, "Configure node"),
        scored(3, 0.52, "Start node"),
        scored(1, 0.91, "Install node"),
    ]));
    let pipeline = SearchPipeline::new(Arc::new(KeywordEmbedder), retriever, "light-node", 5);

    let records = pipeline.run("How do I set up a light node?").await.unwrap();

    let ranks: Vec<usize> = records.iter().map(|r| r.rank).collect();
    let scores: Vec<&str> = records.iter().map(|r| r.score.as_str()).collect();
    let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
    assert_eq!(scores, vec!["0.910", "0.770", "0.520"]);
    assert_eq!(titles, vec!["Install node", "Configure node", "Start node"]);
}

#[tokio::test]
async fn empty_namespace_reports_zero_results_without_error() {
    let pipeline = SearchPipeline::new(
        Arc::new(KeywordEmbedder),
        two_namespace_index(),
        "does-not-exist",
        5,
    );

    let records = pipeline.run("How do I set up a light node?").await.unwrap();
    assert!(records.is_empty());

    let report = render_report("How do I set up a light node?", "does-not-exist", &records);
    assert!(report.contains("No matching steps found."));
}

#[tokio::test]
async fn embedding_timeout_skips_retrieval() {
    let retriever = Arc::new(ScriptedRetriever::new(vec![scored(1, 0.9, "Install node")]));
    let pipeline = SearchPipeline::new(
        Arc::new(TimingOutEmbedder),
        retriever.clone(),
        "light-node",
        5,
    );

    let err = pipeline.run("How do I set up a light node?").await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Embedding(EmbeddingError::Timeout(_))
    ));
    assert_eq!(retriever.calls(), 0, "search must not run after embedding failed");
    assert_eq!(pipeline.stats().embedding_failures, 1);
}

#[tokio::test]
async fn cancellation_during_embedding_surfaces_as_embedding_error() {
    let retriever = Arc::new(ScriptedRetriever::new(Vec::new()));
    let pipeline = SearchPipeline::new(
        Arc::new(StalledEmbedder),
        retriever.clone(),
        "light-node",
        5,
    );

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let err = pipeline
        .run_cancellable("anything", &token)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Embedding(EmbeddingError::Cancelled)
    ));
    assert_eq!(retriever.calls(), 0);
}

#[tokio::test]
async fn cancellation_during_search_surfaces_as_retrieval_error() {
    let pipeline = SearchPipeline::new(
        Arc::new(KeywordEmbedder),
        Arc::new(StalledRetriever),
        "light-node",
        5,
    );

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let err = pipeline
        .run_cancellable("install light node", &token)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Retrieval(RetrievalError::Cancelled)
    ));
    let stats = pipeline.stats();
    assert_eq!(stats.embedding_failures, 0);
    assert_eq!(stats.retrieval_failures, 1);
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn no_cross_namespace_leakage_in_either_direction() {
    let index = two_namespace_index();

    for (namespace, foreign_ids) in [("light-node", [10u64, 11, 12]), ("validator", [1, 2, 3])] {
        let pipeline = SearchPipeline::new(
            Arc::new(KeywordEmbedder),
            index.clone(),
            namespace,
            50,
        );
        // Query deliberately phrased to match both corpora
        let query = Embedding::new(
            KeywordEmbedder::vectorize("install sync validator light node bridge"),
            "keyword-v1",
        );
        let hits = index.search(&query, namespace, 50).await.unwrap();

        assert!(!hits.is_empty());
        assert!(hits.iter().all(|h| h.payload.namespace == namespace));
        assert!(hits
            .iter()
            .all(|h| !foreign_ids.iter().any(|id| h.id == PointId::Num(*id))));

        let records = pipeline.run("install sync validator light node").await.unwrap();
        assert_eq!(records.len(), hits.len());
    }
}

#[tokio::test]
async fn result_count_bounded_by_limit_and_scores_non_increasing() {
    let index = two_namespace_index();
    let query = Embedding::new(KeywordEmbedder::vectorize("install light node"), "keyword-v1");

    for k in 1..=6 {
        let hits = index.search(&query, "light-node", k).await.unwrap();
        assert!(hits.len() <= k, "k={k} returned {}", hits.len());
        assert_eq!(hits.len(), k.min(4));
        assert!(
            hits.windows(2).all(|w| w[0].score >= w[1].score),
            "scores not sorted for k={k}"
        );
    }
}

#[tokio::test]
async fn zero_limit_is_a_retrieval_error() {
    let pipeline = SearchPipeline::new(
        Arc::new(KeywordEmbedder),
        two_namespace_index(),
        "light-node",
        0,
    );
    let err = pipeline.run("install").await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Retrieval(RetrievalError::InvalidLimit(0))
    ));
}

#[tokio::test]
async fn embedder_output_length_is_constant() {
    let embedder = KeywordEmbedder;
    for query in ["How do I set up a light node?", "validator", "", "sync sync sync"] {
        let embedding = embedder.embed(query).await.unwrap();
        assert_eq!(embedding.len(), embedder.dimension());
    }
}

#[tokio::test]
async fn shared_pipeline_serves_concurrent_queries() {
    let pipeline = Arc::new(SearchPipeline::new(
        Arc::new(KeywordEmbedder),
        two_namespace_index(),
        "light-node",
        2,
    ));

    let mut tasks = tokio::task::JoinSet::new();
    for query in ["install light node", "sync from bridge", "node status", "fund wallet"] {
        let pipeline = Arc::clone(&pipeline);
        tasks.spawn(async move { pipeline.run(query).await });
    }

    let mut completed = 0;
    while let Some(joined) = tasks.join_next().await {
        let records = joined.unwrap().unwrap();
        assert!(records.len() <= 2);
        completed += 1;
    }
    assert_eq!(completed, 4);
    assert_eq!(pipeline.stats().queries, 4);
}
