//! Stage work for each worker kind.
//!
//! A handler runs only after its worker has claimed the request, and
//! finishes by writing the stage result in one store transaction. That write
//! is conditional on the claim still being held: `Ok(false)` means the claim
//! was lost (a sweep failed the request meanwhile) and nothing was written.

use std::sync::Arc;

use async_trait::async_trait;
use distill_core::entities::FetchedDocument;
use distill_core::enums::WorkerKind;
use distill_core::messages::StageTask;
use distill_db::PipelineStore;
use distill_inference::ContextReducer;
use distill_search::ContentFetcher;

use crate::error::PipelineError;
use crate::queue::TaskQueue;

#[async_trait]
pub trait StageHandler: Send + Sync {
    fn kind(&self) -> WorkerKind;

    /// Do the stage work for a claimed request and record its result.
    async fn run(&self, store: &PipelineStore, task: &StageTask) -> Result<bool, PipelineError>;

    /// Hand a request this stage has finished to the next stage.
    ///
    /// The worker also calls this for a delivery that finds its request
    /// already at `kind().on_success()`, since the worker that finished the
    /// stage may have died before forwarding it.
    async fn forward(&self, _task: &StageTask) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// Fetch documents for the topic, persist them, and queue the analysis task.
pub struct SearchStage {
    fetcher: Arc<dyn ContentFetcher>,
    queue: Arc<dyn TaskQueue>,
    analysis_queue: String,
    max_results: usize,
}

impl SearchStage {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        queue: Arc<dyn TaskQueue>,
        analysis_queue: impl Into<String>,
        max_results: usize,
    ) -> Self {
        Self {
            fetcher,
            queue,
            analysis_queue: analysis_queue.into(),
            max_results,
        }
    }
}

#[async_trait]
impl StageHandler for SearchStage {
    fn kind(&self) -> WorkerKind {
        WorkerKind::Search
    }

    async fn run(&self, store: &PipelineStore, task: &StageTask) -> Result<bool, PipelineError> {
        let documents = self.fetcher.fetch(&task.topic, self.max_results).await?;
        let with_content = documents.iter().filter(|d| d.content.is_some()).count();

        if !store.complete_search(&task.request_id, &documents).await? {
            return Ok(false);
        }
        tracing::info!(
            request_id = %task.request_id,
            documents = documents.len(),
            with_content,
            "search stage complete"
        );

        // The request is already `analyzing`; a publish error fails it from there.
        self.forward(task).await?;
        Ok(true)
    }

    async fn forward(&self, task: &StageTask) -> Result<(), PipelineError> {
        self.queue.publish(&self.analysis_queue, task).await
    }
}

/// Summarize the persisted documents and store the result.
pub struct AnalysisStage {
    reducer: ContextReducer,
}

impl AnalysisStage {
    #[must_use]
    pub const fn new(reducer: ContextReducer) -> Self {
        Self { reducer }
    }
}

#[async_trait]
impl StageHandler for AnalysisStage {
    fn kind(&self) -> WorkerKind {
        WorkerKind::Analysis
    }

    async fn run(&self, store: &PipelineStore, task: &StageTask) -> Result<bool, PipelineError> {
        let documents: Vec<FetchedDocument> = store
            .list_documents(&task.request_id)
            .await?
            .into_iter()
            .map(FetchedDocument::from)
            .collect();

        let reduction = self.reducer.summarize(&task.topic, &documents).await?;
        let latency_ms = u64::try_from(reduction.latency.as_millis()).unwrap_or(u64::MAX);

        let stored = store
            .complete_analysis(&task.request_id, &reduction.summary, reduction.tokens_used, latency_ms)
            .await?;
        if stored.is_some() {
            tracing::info!(
                request_id = %task.request_id,
                documents = documents.len(),
                strategy = ?reduction.strategy,
                tokens = reduction.tokens_used,
                latency_ms,
                "analysis stage complete"
            );
        }
        Ok(stored.is_some())
    }
}
