use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use distill_core::messages::StageTask;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::{Delivery, TaskQueue};
use crate::error::PipelineError;

#[derive(Debug, Clone)]
struct Message {
    task: StageTask,
    attempt: u64,
}

#[derive(Default)]
struct State {
    ready: HashMap<String, VecDeque<Message>>,
    in_flight: HashMap<i64, (String, Message)>,
    next_id: i64,
}

/// Process-local queue with the same delivery semantics as a broker.
///
/// Redelivery is driven by hand: [`Self::requeue_uncommitted`] plays a
/// consumer crash or rebalance, [`Self::duplicate_next`] a double delivery.
#[derive(Default)]
pub struct InMemoryQueue {
    state: Mutex<State>,
    notify: Notify,
}

impl InMemoryQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, PipelineError> {
        self.state
            .lock()
            .map_err(|_| PipelineError::Queue("in-memory queue lock poisoned".into()))
    }

    fn try_take(&self, queue: &str) -> Result<Option<Delivery>, PipelineError> {
        let mut state = self.lock()?;
        let Some(message) = state.ready.get_mut(queue).and_then(VecDeque::pop_front) else {
            return Ok(None);
        };
        state.next_id += 1;
        let id = state.next_id;
        let delivery = Delivery {
            queue: queue.to_string(),
            task: message.task.clone(),
            id,
            attempt: message.attempt,
        };
        state.in_flight.insert(id, (queue.to_string(), message));
        Ok(Some(delivery))
    }

    /// Put every received-but-uncommitted task back at the head of its queue.
    /// Returns how many were requeued.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Queue`] if the queue state is poisoned.
    pub fn requeue_uncommitted(&self) -> Result<usize, PipelineError> {
        let count = {
            let mut state = self.lock()?;
            let mut in_flight: Vec<_> = state.in_flight.drain().collect();
            // Oldest delivery ends up first.
            in_flight.sort_by_key(|(id, _)| std::cmp::Reverse(*id));
            let count = in_flight.len();
            for (_, (queue, mut message)) in in_flight {
                message.attempt += 1;
                state.ready.entry(queue).or_default().push_front(message);
            }
            count
        };
        if count > 0 {
            self.notify.notify_waiters();
        }
        Ok(count)
    }

    /// Deliver the next task on `queue` twice. Returns `false` if the queue
    /// is empty.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Queue`] if the queue state is poisoned.
    pub fn duplicate_next(&self, queue: &str) -> Result<bool, PipelineError> {
        let mut state = self.lock()?;
        let Some(ready) = state.ready.get_mut(queue) else {
            return Ok(false);
        };
        let Some(head) = ready.front().cloned() else {
            return Ok(false);
        };
        ready.insert(
            1,
            Message {
                attempt: head.attempt + 1,
                ..head
            },
        );
        Ok(true)
    }

    /// Tasks waiting on `queue`, not counting in-flight deliveries.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Queue`] if the queue state is poisoned.
    pub fn ready_len(&self, queue: &str) -> Result<usize, PipelineError> {
        Ok(self.lock()?.ready.get(queue).map_or(0, VecDeque::len))
    }

    /// Deliveries received and not yet committed, across all queues.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Queue`] if the queue state is poisoned.
    pub fn in_flight_len(&self) -> Result<usize, PipelineError> {
        Ok(self.lock()?.in_flight.len())
    }
}

#[async_trait]
impl TaskQueue for InMemoryQueue {
    async fn publish(&self, queue: &str, task: &StageTask) -> Result<(), PipelineError> {
        self.lock()?.ready.entry(queue.to_string()).or_default().push_back(Message {
            task: task.clone(),
            attempt: 1,
        });
        self.notify.notify_waiters();
        Ok(())
    }

    async fn receive(&self, queue: &str, timeout: Duration) -> Result<Option<Delivery>, PipelineError> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register before checking so a publish in between is not missed.
            let notified = self.notify.notified();
            if let Some(delivery) = self.try_take(queue)? {
                return Ok(Some(delivery));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn commit(&self, delivery: &Delivery) -> Result<(), PipelineError> {
        if self.lock()?.in_flight.remove(&delivery.id).is_none() {
            tracing::debug!(delivery_id = delivery.id, "commit of unknown or already committed delivery");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use distill_core::ids::RequestId;
    use pretty_assertions::assert_eq;

    fn task(topic: &str) -> StageTask {
        StageTask::new(RequestId::new(), topic)
    }

    #[tokio::test]
    async fn fifo_per_queue() {
        let queue = InMemoryQueue::new();
        queue.publish("a", &task("first")).await.unwrap();
        queue.publish("b", &task("other")).await.unwrap();
        queue.publish("a", &task("second")).await.unwrap();

        let d1 = queue.receive("a", Duration::ZERO).await.unwrap().unwrap();
        let d2 = queue.receive("a", Duration::ZERO).await.unwrap().unwrap();
        assert_eq!(d1.task.topic, "first");
        assert_eq!(d2.task.topic, "second");
        assert!(queue.receive("a", Duration::ZERO).await.unwrap().is_none());
        assert_eq!(queue.ready_len("b").unwrap(), 1);
    }

    #[tokio::test]
    async fn uncommitted_deliveries_come_back() {
        let queue = InMemoryQueue::new();
        queue.publish("a", &task("t1")).await.unwrap();
        queue.publish("a", &task("t2")).await.unwrap();

        let d1 = queue.receive("a", Duration::ZERO).await.unwrap().unwrap();
        let d2 = queue.receive("a", Duration::ZERO).await.unwrap().unwrap();
        queue.commit(&d2).await.unwrap();

        assert_eq!(queue.requeue_uncommitted().unwrap(), 1);
        let again = queue.receive("a", Duration::ZERO).await.unwrap().unwrap();
        assert_eq!(again.task, d1.task);
        assert_eq!(again.attempt, 2);
        assert_ne!(again.id, d1.id);
    }

    #[tokio::test]
    async fn duplicate_next_delivers_twice() {
        let queue = InMemoryQueue::new();
        queue.publish("a", &task("dup")).await.unwrap();
        assert!(queue.duplicate_next("a").unwrap());
        assert!(!queue.duplicate_next("empty").unwrap());

        let d1 = queue.receive("a", Duration::ZERO).await.unwrap().unwrap();
        let d2 = queue.receive("a", Duration::ZERO).await.unwrap().unwrap();
        assert_eq!(d1.task, d2.task);
        assert_eq!((d1.attempt, d2.attempt), (1, 2));
    }

    #[tokio::test]
    async fn receive_wakes_on_publish() {
        let queue = std::sync::Arc::new(InMemoryQueue::new());
        let consumer = {
            let queue = std::sync::Arc::clone(&queue);
            tokio::spawn(async move { queue.receive("a", Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.publish("a", &task("late")).await.unwrap();

        let delivery = consumer.await.unwrap().unwrap().unwrap();
        assert_eq!(delivery.task.topic, "late");
    }

    #[tokio::test]
    async fn double_commit_is_harmless() {
        let queue = InMemoryQueue::new();
        queue.publish("a", &task("t")).await.unwrap();
        let d = queue.receive("a", Duration::ZERO).await.unwrap().unwrap();
        queue.commit(&d).await.unwrap();
        queue.commit(&d).await.unwrap();
        assert_eq!(queue.in_flight_len().unwrap(), 0);
    }
}
