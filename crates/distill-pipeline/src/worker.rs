//! The worker loop: receive, claim, run, record, commit.
//!
//! | Result of a delivery                  | Request            | Message    |
//! |---------------------------------------|--------------------|------------|
//! | claim lost or request past the stage  | untouched          | committed  |
//! | claim lost, stage done, not forwarded | forwarded again    | committed  |
//! | stage work succeeded                  | next stage         | committed  |
//! | stage work failed, failure recorded   | `failed`           | committed  |
//! | store or queue unreachable            | unchanged/in flight| redelivered|

use std::sync::Arc;
use std::time::Duration;

use distill_core::ids::RequestId;
use distill_db::{DatabaseError, PipelineStore};
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::queue::{Delivery, TaskQueue};
use crate::recovery::requeue_stranded;
use crate::stages::StageHandler;

const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// What happened to one delivery. Every outcome is durable, so the delivery
/// is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// Duplicate or stale delivery; nothing was done.
    Skipped,
    /// Stage work failed and the request is now `failed`.
    Failed,
}

#[derive(Debug, Clone, Copy)]
struct Sweep {
    stale_after: Duration,
    every: Duration,
}

pub struct Worker<H> {
    handler: H,
    store: Arc<PipelineStore>,
    queue: Arc<dyn TaskQueue>,
    queue_name: String,
    poll_timeout: Duration,
    sweep: Option<Sweep>,
    acked_retention: Option<Duration>,
}

impl<H: StageHandler> Worker<H> {
    pub fn new(
        handler: H,
        store: Arc<PipelineStore>,
        queue: Arc<dyn TaskQueue>,
        queue_name: impl Into<String>,
    ) -> Self {
        Self {
            handler,
            store,
            queue,
            queue_name: queue_name.into(),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            sweep: None,
            acked_retention: None,
        }
    }

    /// How long one receive waits before the loop checks for shutdown.
    #[must_use]
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Every `every` period, fail claims with no progress for `stale_after`
    /// and requeue requests waiting that long for this worker's stage.
    #[must_use]
    pub fn with_sweep(mut self, stale_after: Duration, every: Duration) -> Self {
        self.sweep = Some(Sweep { stale_after, every });
        self
    }

    /// Also purge store queue messages acknowledged longer ago than
    /// `retention` on each sweep.
    #[must_use]
    pub fn with_acked_retention(mut self, retention: Duration) -> Self {
        self.acked_retention = Some(retention);
        self
    }

    /// Process deliveries until `shutdown` is cancelled.
    ///
    /// Per-request faults never end the loop. A delivery whose outcome could
    /// not be recorded is left uncommitted for redelivery.
    pub async fn run(&self, shutdown: CancellationToken) {
        let kind = self.handler.kind();
        tracing::info!(worker = %kind, queue = %self.queue_name, "worker started");

        let mut sweep = self.sweep.map(|s| {
            let mut interval = tokio::time::interval(s.every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            (s, interval)
        });

        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => break,

                s = next_sweep(&mut sweep) => self.sweep_once(s.stale_after).await,

                received = self.queue.receive(&self.queue_name, self.poll_timeout) => match received {
                    Ok(Some(delivery)) => {
                        if let Err(e) = self.handle(&delivery).await {
                            tracing::error!(
                                worker = %kind,
                                request_id = %delivery.task.request_id,
                                %e,
                                "delivery left for redelivery"
                            );
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(worker = %kind, %e, "queue receive failed");
                        tokio::time::sleep(self.poll_timeout).await;
                    }
                },
            }
        }
        tracing::info!(worker = %kind, "worker stopped");
    }

    /// Receive at most one delivery, waiting up to `timeout`, and handle it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] on an infrastructure fault; the delivery is
    /// then not committed.
    pub async fn run_once(&self, timeout: Duration) -> Result<Option<Outcome>, PipelineError> {
        match self.queue.receive(&self.queue_name, timeout).await? {
            Some(delivery) => self.handle(&delivery).await.map(Some),
            None => Ok(None),
        }
    }

    /// Process one delivery and commit it once the outcome is durable.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the outcome could not be recorded.
    pub async fn handle(&self, delivery: &Delivery) -> Result<Outcome, PipelineError> {
        let outcome = self.process(delivery).await?;
        self.queue.commit(delivery).await?;
        Ok(outcome)
    }

    /// Claim the request and run the stage, without committing.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] when the store or queue failed before an
    /// outcome could be recorded.
    pub async fn process(&self, delivery: &Delivery) -> Result<Outcome, PipelineError> {
        let kind = self.handler.kind();
        let task = &delivery.task;
        let id = task.request_id;

        if !self.store.try_claim(&id, kind).await? {
            return self.skip(delivery).await;
        }
        tracing::info!(worker = %kind, request_id = %id, topic = %task.topic, "claimed");

        match self.handler.run(&self.store, task).await {
            Ok(true) => Ok(Outcome::Completed),
            Ok(false) => {
                tracing::warn!(worker = %kind, request_id = %id, "claim lost before the result was written");
                Ok(Outcome::Skipped)
            }
            Err(e) => self.record_failure(&id, e).await,
        }
    }

    /// A delivery that could not claim its request. If the request already
    /// sits at the stage this worker sets on success, forward it again: the
    /// worker that finished the stage may have died before publishing the
    /// next task. The next stage's claim absorbs any duplicate.
    async fn skip(&self, delivery: &Delivery) -> Result<Outcome, PipelineError> {
        let kind = self.handler.kind();
        let task = &delivery.task;
        let id = task.request_id;

        let stage = match self.store.get_request(&id).await {
            Ok(request) => request.stage,
            Err(DatabaseError::NoResult) => {
                tracing::warn!(worker = %kind, request_id = %id, "task for unknown request, skipping");
                return Ok(Outcome::Skipped);
            }
            Err(e) => return Err(e.into()),
        };

        if stage == kind.on_success() {
            self.handler.forward(task).await?;
            tracing::info!(worker = %kind, request_id = %id, attempt = delivery.attempt, %stage, "stage already done, forwarded");
        } else {
            tracing::debug!(worker = %kind, request_id = %id, attempt = delivery.attempt, %stage, "not claimed, skipping");
        }
        Ok(Outcome::Skipped)
    }

    async fn record_failure(&self, id: &RequestId, error: PipelineError) -> Result<Outcome, PipelineError> {
        let kind = self.handler.kind();
        let detail = format!("{kind} stage failed: {error}");

        match self.store.fail_request(id, &detail).await {
            Ok(marked) if !error.is_infrastructure() => {
                tracing::warn!(worker = %kind, request_id = %id, %error, marked, "stage failed");
                Ok(Outcome::Failed)
            }
            Ok(marked) => {
                tracing::error!(worker = %kind, request_id = %id, %error, marked, "stage failed on infrastructure fault");
                Err(error)
            }
            Err(fail_err) => {
                tracing::error!(worker = %kind, request_id = %id, %error, %fail_err, "could not record failure");
                Err(error)
            }
        }
    }

    /// One maintenance pass. Errors are logged; the next pass retries.
    pub async fn sweep_once(&self, stale_after: Duration) {
        let kind = self.handler.kind();
        match self.store.sweep_stale_claims(stale_after).await {
            Ok(0) => {}
            Ok(swept) => tracing::warn!(swept, "failed stale claims"),
            Err(e) => tracing::error!(%e, "stale-claim sweep failed"),
        }

        if let Err(e) = requeue_stranded(
            &self.store,
            self.queue.as_ref(),
            kind.claims(),
            &self.queue_name,
            stale_after,
        )
        .await
        {
            tracing::error!(worker = %kind, %e, "requeue of stranded requests failed");
        }

        if let Some(retention) = self.acked_retention {
            if let Err(e) = self.store.purge_acked_messages(retention).await {
                tracing::error!(%e, "queue purge failed");
            }
        }
    }
}

async fn next_sweep(sweep: &mut Option<(Sweep, Interval)>) -> Sweep {
    match sweep {
        Some((s, interval)) => {
            interval.tick().await;
            *s
        }
        None => std::future::pending().await,
    }
}
