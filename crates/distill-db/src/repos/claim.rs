//! Claim protocol.
//!
//! A claim is one conditional `UPDATE`:
//!
//! ```sql
//! UPDATE requests SET stage = <in_progress>, updated_at = MAX(updated_at, <now>)
//! WHERE id = <id> AND stage = <expected>
//! ```
//!
//! `SQLite` serializes writers, and the `WHERE` clause is re-evaluated inside
//! the writer's own transaction, so of any number of concurrent claimers
//! exactly one sees the expected stage and updates the row. Every other
//! claimer, concurrent or arriving later with a redelivered message, updates
//! zero rows and gets `false`. Nobody waits on a row lock; the only wait is the
//! connection's busy timeout for the file's write lock, and running out of it
//! is a store error, not a lost claim.

use distill_core::enums::WorkerKind;
use distill_core::ids::RequestId;

use crate::error::DatabaseError;
use crate::helpers::{format_timestamp, now};
use crate::store::PipelineStore;

impl PipelineStore {
    /// Try to take ownership of `id` for `worker`'s stage.
    ///
    /// Returns `true` if the request moved from `worker.claims()` to
    /// `worker.in_progress()`. Returns `false`, without error, if the request
    /// is in any other stage or does not exist.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the store is unreachable or stays locked past
    /// the busy timeout. The caller must not acknowledge its message then.
    pub async fn try_claim(&self, id: &RequestId, worker: WorkerKind) -> Result<bool, DatabaseError> {
        let expected = worker.claims();
        let in_progress = worker.in_progress();

        let affected = self
            .db()
            .conn()
            .execute(
                "UPDATE requests SET stage = ?1, updated_at = MAX(updated_at, ?2)
                 WHERE id = ?3 AND stage = ?4",
                libsql::params![
                    in_progress.as_str(),
                    format_timestamp(now()),
                    id.to_string(),
                    expected.as_str()
                ],
            )
            .await?;

        let claimed = affected == 1;
        tracing::debug!(
            request_id = %id,
            worker = worker.as_str(),
            stage = %expected,
            claimed,
            "claim attempt"
        );
        Ok(claimed)
    }
}
