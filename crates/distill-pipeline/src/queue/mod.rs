//! The stage-queue collaborator.
//!
//! Delivery is at-least-once. A consumer commits a delivery only after the
//! outcome it triggered is durable; anything received and not committed is
//! eventually delivered again.

mod memory;
mod store;

pub use memory::InMemoryQueue;
pub use store::StoreQueue;

use std::time::Duration;

use async_trait::async_trait;
use distill_core::messages::StageTask;

use crate::error::PipelineError;

/// One received task, held until committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub queue: String,
    pub task: StageTask,
    /// Opaque to consumers; identifies this delivery to [`TaskQueue::commit`].
    pub id: i64,
    /// 1 on first delivery.
    pub attempt: u64,
}

#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn publish(&self, queue: &str, task: &StageTask) -> Result<(), PipelineError>;

    /// Wait up to `timeout` for the next task on `queue`.
    async fn receive(&self, queue: &str, timeout: Duration) -> Result<Option<Delivery>, PipelineError>;

    /// Mark a delivery consumed. Committing twice is not an error.
    async fn commit(&self, delivery: &Delivery) -> Result<(), PipelineError>;
}
