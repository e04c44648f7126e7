//! Search Pipeline - embed, retrieve, present
//!
//! The pipeline owns its collaborators as trait objects, built once at
//! startup and injected, so a test can swap either side for a fake. It
//! holds no per-query state, and one instance can serve concurrent queries.

use crate::config::SearchConfig;
use crate::embedding::{Embedder, EmbeddingError, OpenAiEmbedder};
use crate::presenter::{self, DisplayRecord, PresentationError};
use crate::retrieval::{QdrantRetriever, RetrievalError, Retriever};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Any failure of a pipeline stage
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
    #[error(transparent)]
    Presentation(#[from] PresentationError),
}

/// Counters since the pipeline was built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub queries: u64,
    pub embedding_failures: u64,
    pub retrieval_failures: u64,
    pub presentation_failures: u64,
    pub empty_results: u64,
}

#[derive(Default)]
struct StatCounters {
    queries: AtomicU64,
    embedding_failures: AtomicU64,
    retrieval_failures: AtomicU64,
    presentation_failures: AtomicU64,
    empty_results: AtomicU64,
}

/// Single-query semantic retrieval over one namespace
pub struct SearchPipeline {
    embedder: Arc<dyn Embedder>,
    retriever: Arc<dyn Retriever>,
    namespace: String,
    limit: usize,
    stats: StatCounters,
}

impl SearchPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        retriever: Arc<dyn Retriever>,
        namespace: impl Into<String>,
        limit: usize,
    ) -> Self {
        let namespace = namespace.into();
        info!(
            embedder = embedder.model(),
            retriever = retriever.backend_name(),
            namespace = %namespace,
            limit,
            "Search pipeline initialized"
        );
        Self {
            embedder,
            retriever,
            namespace,
            limit,
            stats: StatCounters::default(),
        }
    }

    /// Build the production pipeline (OpenAI-compatible embedder + Qdrant).
    pub fn from_config(config: &SearchConfig) -> Result<Self, PipelineError> {
        let embedder = OpenAiEmbedder::new(&config.embedding)?;
        let retriever = QdrantRetriever::new(&config.vector_store)?;
        Ok(Self::new(
            Arc::new(embedder),
            Arc::new(retriever),
            config.search.namespace.clone(),
            config.search.limit,
        ))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Run one query to completion.
    pub async fn run(&self, query: &str) -> Result<Vec<DisplayRecord>, PipelineError> {
        self.execute(query, None).await
    }

    /// Run one query, abandoning the in-flight call if `cancel` fires.
    ///
    /// Cancellation while embedding surfaces as [`EmbeddingError::Cancelled`],
    /// while searching as [`RetrievalError::Cancelled`].
    pub async fn run_cancellable(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<DisplayRecord>, PipelineError> {
        self.execute(query, Some(cancel)).await
    }

    pub fn stats(&self) -> PipelineStats {
        let s = &self.stats;
        PipelineStats {
            queries: s.queries.load(Ordering::Relaxed),
            embedding_failures: s.embedding_failures.load(Ordering::Relaxed),
            retrieval_failures: s.retrieval_failures.load(Ordering::Relaxed),
            presentation_failures: s.presentation_failures.load(Ordering::Relaxed),
            empty_results: s.empty_results.load(Ordering::Relaxed),
        }
    }

    async fn execute(
        &self,
        query: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<DisplayRecord>, PipelineError> {
        self.stats.queries.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();

        // STAGE 1: Embed
        let embedding = guarded(self.embedder.embed(query), cancel, EmbeddingError::Cancelled)
            .await
            .map_err(|e| {
                self.stats.embedding_failures.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "Query embedding failed, skipping search");
                e
            })?;
        debug!(
            dimension = embedding.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Stage 1 complete"
        );

        // STAGE 2: Retrieve
        let hits = guarded(
            self.retriever.search(&embedding, &self.namespace, self.limit),
            cancel,
            RetrievalError::Cancelled,
        )
        .await
        .map_err(|e| {
            self.stats.retrieval_failures.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, namespace = %self.namespace, "Vector search failed");
            e
        })?;
        drop(embedding);

        if hits.is_empty() {
            self.stats.empty_results.fetch_add(1, Ordering::Relaxed);
            warn!(
                namespace = %self.namespace,
                "No indexed steps matched; check that the namespace exists in the collection"
            );
        }

        // STAGE 3: Present
        let records = presenter::present(&hits).map_err(|e| {
            self.stats.presentation_failures.fetch_add(1, Ordering::Relaxed);
            e
        })?;

        info!(
            namespace = %self.namespace,
            results = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query complete"
        );
        Ok(records)
    }
}

/// Await `fut`, or fail with `cancelled` as soon as the token fires.
async fn guarded<T, E, F>(fut: F, cancel: Option<&CancellationToken>, cancelled: E) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
{
    match cancel {
        None => fut.await,
        Some(token) => tokio::select! {
            biased;
            () = token.cancelled() => Err(cancelled),
            result = fut => result,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::{IndexedStep, InMemoryRetriever};
    use crate::types::{Embedding, PointId, StepPayload};
    use async_trait::async_trait;

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Embedding, EmbeddingError> {
            Ok(Embedding::new(self.0.clone(), "fixed"))
        }

        fn model(&self) -> &str {
            "fixed"
        }

        fn dimension(&self) -> usize {
            self.0.len()
        }
    }

    fn index() -> Arc<InMemoryRetriever> {
        let index = InMemoryRetriever::new(2);
        index
            .insert(IndexedStep {
                id: PointId::Num(1),
                vector: vec![1.0, 0.0],
                payload: StepPayload::new("light-node").with_description("Install"),
            })
            .unwrap();
        index
            .insert(IndexedStep {
                id: PointId::Num(2),
                vector: vec![0.0, 1.0],
                payload: StepPayload::new("light-node"),
            })
            .unwrap();
        Arc::new(index)
    }

    #[tokio::test]
    async fn test_stats_track_outcomes() {
        let pipeline = SearchPipeline::new(
            Arc::new(FixedEmbedder(vec![1.0, 0.0])),
            index(),
            "light-node",
            1,
        );
        assert_eq!(pipeline.run("install").await.unwrap().len(), 1);

        let empty = SearchPipeline::new(
            Arc::new(FixedEmbedder(vec![1.0, 0.0])),
            index(),
            "nowhere",
            3,
        );
        assert!(empty.run("install").await.unwrap().is_empty());

        let stats = pipeline.stats();
        assert_eq!(stats.queries, 1);
        assert_eq!(stats.empty_results, 0);
        assert_eq!(empty.stats().empty_results, 1);
    }

    #[tokio::test]
    async fn test_presentation_failure_is_counted() {
        // Limit 2 pulls in the step with no description
        let pipeline = SearchPipeline::new(
            Arc::new(FixedEmbedder(vec![1.0, 0.0])),
            index(),
            "light-node",
            2,
        );
        let err = pipeline.run("install").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Presentation(PresentationError::MissingDescription { rank: 2, .. })
        ));
        assert_eq!(pipeline.stats().presentation_failures, 1);
    }

    #[tokio::test]
    async fn test_guarded_without_token_passes_through() {
        let out: Result<u8, &str> = guarded(async { Ok(7) }, None, "cancelled").await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test]
    async fn test_guarded_cancelled_token_wins() {
        let token = CancellationToken::new();
        token.cancel();
        let out: Result<u8, &str> =
            guarded(std::future::pending(), Some(&token), "cancelled").await;
        assert_eq!(out, Err("cancelled"));
    }
}
