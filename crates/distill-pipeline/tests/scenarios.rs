//! End-to-end runs of both stages over an in-memory store and queue, with
//! fake fetcher and engine counting their calls.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ANALYSIS_QUEUE, FakeEngine, FakeFetcher, ROOMY, SEARCH_QUEUE, document, pipeline, search_worker};
use distill_core::enums::Stage;
use distill_core::messages::StageTask;
use distill_db::PipelineStore;
use distill_inference::TokenBudget;
use distill_pipeline::{InMemoryQueue, Outcome, TaskQueue};
use pretty_assertions::assert_eq;
use tokio::time::Instant;

#[tokio::test]
async fn short_documents_take_the_direct_path() {
    let p = pipeline(
        FakeFetcher::returning(vec![document(1, 20), document(2, 30)]),
        FakeEngine::default(),
        ROOMY,
    )
    .await;

    let request = p.submitter.submit("X").await.unwrap();
    assert_eq!(request.stage, Stage::Searching);

    assert_eq!(p.search.run_once(Duration::ZERO).await.unwrap(), Some(Outcome::Completed));
    assert_eq!(p.analysis.run_once(Duration::ZERO).await.unwrap(), Some(Outcome::Completed));

    let detail = p.store.get_request_detail(&request.id).await.unwrap();
    assert_eq!(detail.request.stage, Stage::Completed);
    assert!(detail.request.completed_at.is_some());
    assert_eq!(detail.documents.len(), 2);

    let summary = detail.summary.unwrap();
    assert_eq!(summary.summary, "final summary");
    assert_eq!(summary.tokens_used, 12);
    assert_eq!(summary.latency_ms, 100);

    assert_eq!(p.engine.map_calls(), 0);
    assert!(p.engine.batch_sizes().is_empty());
    assert_eq!(p.engine.synthesis_calls(), 1);
    assert_eq!(p.queue.in_flight_len().unwrap(), 0);
}

#[tokio::test]
async fn oversized_input_is_mapped_in_one_batch_then_reduced() {
    // Ten documents of 100 tokens each, about 1009 tokens joined, against a
    // 336-token context: three documents fit a 300-token chunk, so 3+3+3+1.
    let documents = (1..=10).map(|i| document(i, 93)).collect();
    let p = pipeline(
        FakeFetcher::returning(documents),
        FakeEngine::default(),
        TokenBudget {
            context: 336,
            chunk: 300,
        },
    )
    .await;

    let request = p.submitter.submit("X").await.unwrap();
    p.search.run_once(Duration::ZERO).await.unwrap();
    assert_eq!(p.analysis.run_once(Duration::ZERO).await.unwrap(), Some(Outcome::Completed));

    assert_eq!(p.engine.batch_sizes(), vec![4]);
    assert_eq!(p.engine.map_calls(), 4);
    assert_eq!(p.engine.synthesis_calls(), 1);

    let detail = p.store.get_request_detail(&request.id).await.unwrap();
    assert_eq!(detail.request.stage, Stage::Completed);
    assert_eq!(detail.documents.len(), 10);
    let summary = detail.summary.unwrap();
    assert_eq!(summary.tokens_used, 5 * 12);
    assert_eq!(summary.latency_ms, 500);
}

#[tokio::test]
async fn failed_synthesis_fails_the_request() {
    let p = pipeline(
        FakeFetcher::returning(vec![document(1, 10)]),
        FakeEngine::failing_synthesis(),
        ROOMY,
    )
    .await;

    let request = p.submitter.submit("X").await.unwrap();
    p.search.run_once(Duration::ZERO).await.unwrap();
    assert_eq!(p.analysis.run_once(Duration::ZERO).await.unwrap(), Some(Outcome::Failed));

    let failed = p.store.get_request(&request.id).await.unwrap();
    assert_eq!(failed.stage, Stage::Failed);
    let detail = failed.error_detail.unwrap();
    assert!(detail.contains("analysis stage failed"), "{detail}");
    assert!(detail.contains("CUDA out of memory"), "{detail}");
    assert!(failed.completed_at.is_none());
    assert_eq!(p.store.get_summary(&request.id).await.unwrap(), None);

    // The failure is durable, so the message was committed.
    assert_eq!(p.queue.in_flight_len().unwrap(), 0);
    assert_eq!(p.queue.ready_len(ANALYSIS_QUEUE).unwrap(), 0);
}

#[tokio::test]
async fn fetch_failure_fails_the_request() {
    let p = pipeline(FakeFetcher::failing(), FakeEngine::default(), ROOMY).await;

    let request = p.submitter.submit("X").await.unwrap();
    assert_eq!(p.search.run_once(Duration::ZERO).await.unwrap(), Some(Outcome::Failed));

    let failed = p.store.get_request(&request.id).await.unwrap();
    assert_eq!(failed.stage, Stage::Failed);
    assert!(failed.error_detail.unwrap().contains("search backend down"));
    assert!(p.store.list_documents(&request.id).await.unwrap().is_empty());
    assert_eq!(p.queue.ready_len(ANALYSIS_QUEUE).unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn simultaneous_search_claims_run_the_stage_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("distill.db");
    let path = path.to_str().unwrap();
    let store_a = Arc::new(PipelineStore::open_local(path, Duration::from_secs(5)).await.unwrap());
    let store_b = Arc::new(PipelineStore::open_local(path, Duration::from_secs(5)).await.unwrap());

    let request = store_a.create_request("X").await.unwrap();
    assert!(store_a.advance_stage(&request.id, Stage::Pending, Stage::Searching).await.unwrap());

    let queue = Arc::new(InMemoryQueue::new());
    queue
        .publish(SEARCH_QUEUE, &StageTask::new(request.id, "X"))
        .await
        .unwrap();
    assert!(queue.duplicate_next(SEARCH_QUEUE).unwrap());

    let fetcher = Arc::new(FakeFetcher::returning(vec![document(1, 5), document(2, 5), document(3, 5)]).gated());
    let worker_a = search_worker(Arc::clone(&store_a), Arc::clone(&queue), Arc::clone(&fetcher));
    let worker_b = search_worker(Arc::clone(&store_b), Arc::clone(&queue), Arc::clone(&fetcher));

    let a = tokio::spawn(async move { worker_a.run_once(Duration::from_secs(1)).await });
    let b = tokio::spawn(async move { worker_b.run_once(Duration::from_secs(1)).await });

    // Wait for the loser to give up while the winner is held inside fetch.
    let deadline = Instant::now() + Duration::from_secs(5);
    while !((a.is_finished() || b.is_finished()) && fetcher.calls() >= 1) {
        assert!(Instant::now() < deadline, "workers did not settle");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(fetcher.calls(), 1);
    let claimed = store_a.get_request(&request.id).await.unwrap();
    assert_eq!(claimed.stage, Stage::SearchInProgress);

    fetcher.release();
    let mut outcomes = vec![a.await.unwrap().unwrap().unwrap(), b.await.unwrap().unwrap().unwrap()];
    outcomes.sort_by_key(|o| *o == Outcome::Skipped);
    assert_eq!(outcomes, vec![Outcome::Completed, Outcome::Skipped]);

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(store_b.list_documents(&request.id).await.unwrap().len(), 3);
    assert_eq!(store_b.get_request(&request.id).await.unwrap().stage, Stage::Analyzing);
    assert_eq!(queue.ready_len(ANALYSIS_QUEUE).unwrap(), 1);
}
