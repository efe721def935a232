//! Stale-claim and stranded-request sweeps.
//!
//! A worker that dies while holding a claim leaves its request in an
//! in-progress stage forever: redeliveries cannot claim it and nobody else
//! will write to it. The stale-claim sweep fails every such request whose
//! last write is older than a cutoff.
//!
//! A producer that dies between moving a request into a queued stage and
//! publishing its task leaves the request waiting for a task that does not
//! exist. [`PipelineStore::touch_stranded`] finds those so their task can be
//! published again.

use std::time::Duration;

use distill_core::enums::Stage;
use distill_core::messages::StageTask;

use crate::error::DatabaseError;
use crate::helpers::{cutoff_before, format_timestamp, now, parse_request_id};
use crate::store::PipelineStore;

impl PipelineStore {
    /// Fail in-progress requests not updated within `older_than`.
    ///
    /// The error detail records the last update time. Returns how many
    /// requests were failed.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the update fails, or `InvalidState` if
    /// `older_than` is too large to subtract from the current time.
    pub async fn sweep_stale_claims(&self, older_than: Duration) -> Result<u64, DatabaseError> {
        let now = now();
        let cutoff = cutoff_before(now, older_than)?;

        let swept = self
            .db()
            .conn()
            .execute(
                "UPDATE requests
                 SET stage = ?1,
                     error_detail = 'stale claim: no progress since ' || updated_at,
                     updated_at = MAX(updated_at, ?2)
                 WHERE stage IN (?3, ?4) AND updated_at < ?5",
                libsql::params![
                    Stage::Failed.as_str(),
                    format_timestamp(now),
                    Stage::SearchInProgress.as_str(),
                    Stage::AnalysisInProgress.as_str(),
                    format_timestamp(cutoff)
                ],
            )
            .await?;

        if swept > 0 {
            tracing::warn!(swept, cutoff = %format_timestamp(cutoff), "failed stale claims");
        }
        Ok(swept)
    }

    /// Requests waiting in the queued `stage` with no write for `older_than`.
    ///
    /// `updated_at` is bumped in the same statement, so a request is returned
    /// at most once per `older_than` period even with concurrent sweepers.
    /// A request that is merely behind a long queue is returned too; the
    /// duplicate task that follows loses its claim.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` if `stage` is not `searching` or
    /// `analyzing`, or `older_than` is out of range.
    pub async fn touch_stranded(&self, stage: Stage, older_than: Duration) -> Result<Vec<StageTask>, DatabaseError> {
        if !matches!(stage, Stage::Searching | Stage::Analyzing) {
            return Err(DatabaseError::InvalidState(format!(
                "{stage} is not a queued stage"
            )));
        }
        let now = now();
        let cutoff = cutoff_before(now, older_than)?;

        let mut rows = self
            .db()
            .conn()
            .query(
                "UPDATE requests
                 SET updated_at = MAX(updated_at, ?1)
                 WHERE stage = ?2 AND updated_at < ?3
                 RETURNING id, topic",
                libsql::params![format_timestamp(now), stage.as_str(), format_timestamp(cutoff)],
            )
            .await?;

        let mut tasks = Vec::new();
        while let Some(row) = rows.next().await? {
            let id = parse_request_id(&row.get::<String>(0)?)?;
            tasks.push(StageTask::new(id, row.get::<String>(1)?));
        }
        if !tasks.is_empty() {
            tracing::warn!(stranded = tasks.len(), %stage, "requests waiting without progress");
        }
        Ok(tasks)
    }
}
