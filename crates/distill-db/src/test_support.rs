//! Shared test utilities for distill-db unit tests.

pub(crate) mod helpers {
    use distill_core::entities::{FetchedDocument, Request};
    use distill_core::enums::{Stage, WorkerKind};

    use crate::store::PipelineStore;

    /// In-memory store with migrations applied.
    pub async fn test_store() -> PipelineStore {
        PipelineStore::open_in_memory().await.unwrap()
    }

    /// Create a request and walk it forward along the happy path until it
    /// reaches `stage`. Only non-terminal stages and `completed` are reachable.
    pub async fn request_at_stage(store: &PipelineStore, topic: &str, stage: Stage) -> Request {
        let request = store.create_request(topic).await.unwrap();
        let id = request.id;
        let path = [
            Stage::Searching,
            Stage::SearchInProgress,
            Stage::Analyzing,
            Stage::AnalysisInProgress,
            Stage::Completed,
        ];
        let mut current = Stage::Pending;
        for next in path {
            if current == stage {
                break;
            }
            match next {
                Stage::Searching => {
                    assert!(store.advance_stage(&id, current, next).await.unwrap());
                }
                Stage::SearchInProgress => {
                    assert!(store.try_claim(&id, WorkerKind::Search).await.unwrap());
                }
                Stage::Analyzing => {
                    assert!(store.complete_search(&id, &[]).await.unwrap());
                }
                Stage::AnalysisInProgress => {
                    assert!(store.try_claim(&id, WorkerKind::Analysis).await.unwrap());
                }
                Stage::Completed => {
                    store
                        .complete_analysis(&id, "done", 10, 5)
                        .await
                        .unwrap()
                        .unwrap();
                }
                Stage::Pending | Stage::Failed => unreachable!(),
            }
            current = next;
        }
        store.get_request(&id).await.unwrap()
    }

    pub fn doc(locator: &str, content: &str) -> FetchedDocument {
        FetchedDocument::new(locator, Some(format!("Title of {locator}")), Some(content.to_string()))
    }
}
