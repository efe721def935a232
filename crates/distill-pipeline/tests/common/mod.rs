//! Fakes and a wired-up pipeline for cross-crate tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use distill_core::entities::FetchedDocument;
use distill_db::PipelineStore;
use distill_inference::{ContextReducer, Generation, InferenceEngine, InferenceError, SamplingConfig, TokenBudget};
use distill_pipeline::{AnalysisStage, InMemoryQueue, SearchStage, Submitter, TaskQueue, Worker};
use distill_search::{ContentFetcher, FetchError};
use tokio::sync::Semaphore;

pub const SEARCH_QUEUE: &str = "search-queue";
pub const ANALYSIS_QUEUE: &str = "analysis-queue";

/// Returns a fixed document list and counts calls. With a gate, each fetch
/// blocks until [`FakeFetcher::release`].
#[derive(Default)]
pub struct FakeFetcher {
    documents: Vec<FetchedDocument>,
    fail: bool,
    gate: Option<Semaphore>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn returning(documents: Vec<FetchedDocument>) -> Self {
        Self {
            documents,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(16);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentFetcher for FakeFetcher {
    async fn fetch(&self, _topic: &str, max_results: usize) -> Result<Vec<FetchedDocument>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| FetchError::Parse("gate closed".into()))?;
        }
        if self.fail {
            return Err(FetchError::Api {
                status: 503,
                message: "search backend down".into(),
            });
        }
        Ok(self.documents.iter().take(max_results).cloned().collect())
    }
}

/// Whitespace words are tokens. Every generation reports 10 prompt tokens,
/// 2 completion tokens and 100ms.
#[derive(Default)]
pub struct FakeEngine {
    fail_synthesis: bool,
    map_calls: AtomicUsize,
    synthesis_calls: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
}

impl FakeEngine {
    pub fn failing_synthesis() -> Self {
        Self {
            fail_synthesis: true,
            ..Self::default()
        }
    }

    pub fn map_calls(&self) -> usize {
        self.map_calls.load(Ordering::SeqCst)
    }

    pub fn synthesis_calls(&self) -> usize {
        self.synthesis_calls.load(Ordering::SeqCst)
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }
}

fn generation(text: &str) -> Generation {
    Generation {
        text: text.to_string(),
        prompt_tokens: 10,
        completion_tokens: 2,
        latency: Duration::from_millis(100),
    }
}

#[async_trait]
impl InferenceEngine for FakeEngine {
    async fn generate(&self, _prompt: &str, sampling: &SamplingConfig) -> Result<Generation, InferenceError> {
        // Only the synthesis call sets top_p.
        if sampling.top_p.is_none() {
            self.map_calls.fetch_add(1, Ordering::SeqCst);
            return Ok(generation("partial summary"));
        }
        self.synthesis_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_synthesis {
            return Err(InferenceError::Generation("CUDA out of memory".into()));
        }
        Ok(generation("final summary"))
    }

    async fn generate_batch(
        &self,
        prompts: &[String],
        sampling: &SamplingConfig,
    ) -> Result<Vec<Generation>, InferenceError> {
        self.batch_sizes.lock().unwrap().push(prompts.len());
        let mut out = Vec::with_capacity(prompts.len());
        for prompt in prompts {
            out.push(self.generate(prompt, sampling).await?);
        }
        Ok(out)
    }

    async fn count_tokens(&self, text: &str) -> Result<u64, InferenceError> {
        Ok(text.split_whitespace().count() as u64)
    }

    fn model(&self) -> &str {
        "fake-engine"
    }
}

/// A document that renders to exactly `7 + words` tokens under [`FakeEngine`].
pub fn document(i: usize, words: usize) -> FetchedDocument {
    FetchedDocument::new(
        format!("https://example.com/doc-{i}"),
        Some("Source".to_string()),
        Some(vec!["lorem"; words].join(" ")),
    )
}

pub struct Pipeline {
    pub store: Arc<PipelineStore>,
    pub queue: Arc<InMemoryQueue>,
    pub fetcher: Arc<FakeFetcher>,
    pub engine: Arc<FakeEngine>,
    pub submitter: Submitter,
    pub search: Worker<SearchStage>,
    pub analysis: Worker<AnalysisStage>,
}

pub fn search_worker(
    store: Arc<PipelineStore>,
    queue: Arc<InMemoryQueue>,
    fetcher: Arc<FakeFetcher>,
) -> Worker<SearchStage> {
    let stage = SearchStage::new(fetcher, Arc::clone(&queue) as Arc<dyn TaskQueue>, ANALYSIS_QUEUE, 10);
    Worker::new(stage, store, queue, SEARCH_QUEUE)
}

pub async fn pipeline(fetcher: FakeFetcher, engine: FakeEngine, budget: TokenBudget) -> Pipeline {
    let store = Arc::new(PipelineStore::open_in_memory().await.unwrap());
    let queue = Arc::new(InMemoryQueue::new());
    let fetcher = Arc::new(fetcher);
    let engine = Arc::new(engine);

    let submitter = Submitter::new(Arc::clone(&store), Arc::clone(&queue) as Arc<dyn TaskQueue>, SEARCH_QUEUE);
    let search = search_worker(Arc::clone(&store), Arc::clone(&queue), Arc::clone(&fetcher));
    let reducer = ContextReducer::new(Arc::clone(&engine) as Arc<dyn InferenceEngine>, budget, "English");
    let analysis = Worker::new(
        AnalysisStage::new(reducer),
        Arc::clone(&store),
        Arc::clone(&queue) as Arc<dyn TaskQueue>,
        ANALYSIS_QUEUE,
    );

    Pipeline {
        store,
        queue,
        fetcher,
        engine,
        submitter,
        search,
        analysis,
    }
}

/// Budget far above anything the tests fetch.
pub const ROOMY: TokenBudget = TokenBudget {
    context: 100_000,
    chunk: 3_000,
};
