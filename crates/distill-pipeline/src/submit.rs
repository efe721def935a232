//! Request submission: the producer side of the pipeline.

use std::sync::Arc;

use distill_core::entities::Request;
use distill_core::enums::Stage;
use distill_core::messages::StageTask;
use distill_db::{DatabaseError, PipelineStore};

use crate::error::PipelineError;
use crate::queue::TaskQueue;

pub struct Submitter {
    store: Arc<PipelineStore>,
    queue: Arc<dyn TaskQueue>,
    search_queue: String,
}

impl Submitter {
    #[must_use]
    pub fn new(store: Arc<PipelineStore>, queue: Arc<dyn TaskQueue>, search_queue: impl Into<String>) -> Self {
        Self {
            store,
            queue,
            search_queue: search_queue.into(),
        }
    }

    /// Create a request for `topic` and hand it to the search workers.
    ///
    /// The request moves to `searching` before the task is published, so a
    /// worker can never receive a task for a request still in `pending`. If
    /// publishing fails the request is marked `failed`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Store`] for a blank topic or a store fault,
    /// and [`PipelineError::Queue`] if the search task cannot be published.
    pub async fn submit(&self, topic: &str) -> Result<Request, PipelineError> {
        let request = self.store.create_request(topic).await?;
        let id = request.id;

        if !self.store.advance_stage(&id, Stage::Pending, Stage::Searching).await? {
            return Err(DatabaseError::InvalidState(format!(
                "request {id} left pending before it was queued"
            ))
            .into());
        }

        let task = StageTask::new(id, request.topic.clone());
        if let Err(e) = self.queue.publish(&self.search_queue, &task).await {
            tracing::error!(request_id = %id, %e, "could not queue search task");
            if let Err(fail_err) = self
                .store
                .fail_request(&id, &format!("failed to queue search task: {e}"))
                .await
            {
                tracing::error!(request_id = %id, %fail_err, "could not mark request failed");
            }
            return Err(e);
        }

        tracing::info!(request_id = %id, topic = %request.topic, queue = %self.search_queue, "request submitted");
        Ok(self.store.get_request(&id).await?)
    }
}
