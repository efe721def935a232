//! Recovery for requests no task will ever reach.

use std::time::Duration;

use distill_core::enums::Stage;
use distill_db::PipelineStore;

use crate::error::PipelineError;
use crate::queue::TaskQueue;

/// Publish a fresh task for every request left in the queued `stage` with no
/// write for `older_than`. Returns how many were published.
///
/// # Errors
///
/// Returns [`PipelineError`] if the lookup or a publish fails. Requests
/// already looked up but not published are found again one period later.
pub async fn requeue_stranded(
    store: &PipelineStore,
    queue: &dyn TaskQueue,
    stage: Stage,
    queue_name: &str,
    older_than: Duration,
) -> Result<usize, PipelineError> {
    let tasks = store.touch_stranded(stage, older_than).await?;
    for task in &tasks {
        queue.publish(queue_name, task).await?;
        tracing::info!(request_id = %task.request_id, %stage, queue = queue_name, "requeued stranded request");
    }
    Ok(tasks.len())
}
