use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use distill_config::QueueConfig;
use distill_core::messages::StageTask;
use distill_db::PipelineStore;
use tokio::time::Instant;

use super::{Delivery, TaskQueue};
use crate::error::PipelineError;

/// Durable queue on the store's `queue_messages` table.
///
/// A received message is leased for `visibility`; if it is not committed by
/// then, the next `receive` delivers it again with a higher attempt number.
/// Undecodable payloads are acknowledged and skipped.
pub struct StoreQueue {
    store: Arc<PipelineStore>,
    visibility: Duration,
    poll_interval: Duration,
}

impl StoreQueue {
    #[must_use]
    pub const fn new(store: Arc<PipelineStore>, visibility: Duration, poll_interval: Duration) -> Self {
        Self {
            store,
            visibility,
            poll_interval,
        }
    }

    #[must_use]
    pub const fn from_config(store: Arc<PipelineStore>, config: &QueueConfig) -> Self {
        Self::new(store, config.visibility_timeout(), config.poll_interval())
    }

    /// Lease messages until one decodes, acking the ones that do not.
    async fn lease_next(&self, queue: &str) -> Result<Option<Delivery>, PipelineError> {
        while let Some(message) = self.store.lease_message(queue, self.visibility).await? {
            match StageTask::from_payload(&message.payload) {
                Ok(task) => {
                    return Ok(Some(Delivery {
                        queue: message.queue,
                        task,
                        id: message.id,
                        attempt: message.delivery_count,
                    }));
                }
                Err(e) => {
                    tracing::warn!(queue, message_id = message.id, %e, "dropping malformed message");
                    self.store.ack_message(message.id).await?;
                }
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl TaskQueue for StoreQueue {
    async fn publish(&self, queue: &str, task: &StageTask) -> Result<(), PipelineError> {
        let payload = task.to_payload()?;
        self.store.enqueue_message(queue, &payload).await?;
        Ok(())
    }

    async fn receive(&self, queue: &str, timeout: Duration) -> Result<Option<Delivery>, PipelineError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(delivery) = self.lease_next(queue).await? {
                if delivery.attempt > 1 {
                    tracing::info!(
                        queue,
                        request_id = %delivery.task.request_id,
                        attempt = delivery.attempt,
                        "redelivered message"
                    );
                }
                return Ok(Some(delivery));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    async fn commit(&self, delivery: &Delivery) -> Result<(), PipelineError> {
        if !self.store.ack_message(delivery.id).await? {
            tracing::debug!(message_id = delivery.id, "message already acknowledged");
        }
        Ok(())
    }
}
