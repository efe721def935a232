//! Durable stage queue on the `queue_messages` table.
//!
//! At-least-once semantics: [`PipelineStore::lease_message`] hides a message
//! for a visibility window and bumps its delivery count; only
//! [`PipelineStore::ack_message`] removes it from circulation. A consumer that
//! dies before acking loses its lease when the window expires, and the message
//! is delivered again. Acknowledged rows are kept until
//! [`PipelineStore::purge_acked_messages`] deletes them.

use std::time::Duration;

use chrono::TimeDelta;

use crate::error::DatabaseError;
use crate::helpers::{cutoff_before, format_timestamp, get_u64, now};
use crate::store::PipelineStore;

/// A leased queue message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub id: i64,
    pub queue: String,
    pub payload: String,
    /// 1 on first delivery, incremented on every redelivery.
    pub delivery_count: u64,
}

impl PipelineStore {
    /// Append a message to `queue`, visible immediately.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the insert fails.
    pub async fn enqueue_message(&self, queue: &str, payload: &str) -> Result<i64, DatabaseError> {
        let ts = format_timestamp(now());
        let mut rows = self
            .db()
            .conn()
            .query(
                "INSERT INTO queue_messages (queue, payload, enqueued_at, visible_at)
                 VALUES (?1, ?2, ?3, ?3)
                 RETURNING id",
                libsql::params![queue, payload, ts],
            )
            .await?;
        let id: i64 = rows.next().await?.ok_or(DatabaseError::NoResult)?.get(0)?;
        tracing::debug!(queue, message_id = id, "message enqueued");
        Ok(id)
    }

    /// Lease the oldest visible, unacknowledged message of `queue`.
    ///
    /// The select and the lease happen in one statement, so two consumers can
    /// never lease the same message inside one visibility window.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the update fails.
    pub async fn lease_message(
        &self,
        queue: &str,
        visibility: Duration,
    ) -> Result<Option<QueuedMessage>, DatabaseError> {
        let now = now();
        let lease_until = TimeDelta::from_std(visibility)
            .ok()
            .and_then(|window| now.checked_add_signed(window))
            .ok_or_else(|| {
                DatabaseError::InvalidState(format!("visibility timeout {visibility:?} out of range"))
            })?;

        let mut rows = self
            .db()
            .conn()
            .query(
                "UPDATE queue_messages
                 SET visible_at = ?1, delivery_count = delivery_count + 1
                 WHERE id = (
                     SELECT id FROM queue_messages
                     WHERE queue = ?2 AND acked_at IS NULL AND visible_at <= ?3
                     ORDER BY id
                     LIMIT 1
                 )
                 RETURNING id, queue, payload, delivery_count",
                libsql::params![format_timestamp(lease_until), queue, format_timestamp(now)],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(QueuedMessage {
                id: row.get(0)?,
                queue: row.get(1)?,
                payload: row.get(2)?,
                delivery_count: get_u64(&row, 3)?,
            })),
            None => Ok(None),
        }
    }

    /// Acknowledge a message so it is never delivered again.
    ///
    /// Returns `false` if it was already acknowledged or does not exist.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the update fails.
    pub async fn ack_message(&self, id: i64) -> Result<bool, DatabaseError> {
        let affected = self
            .db()
            .conn()
            .execute(
                "UPDATE queue_messages SET acked_at = ?1 WHERE id = ?2 AND acked_at IS NULL",
                libsql::params![format_timestamp(now()), id],
            )
            .await?;
        Ok(affected == 1)
    }

    /// Delete messages acknowledged more than `older_than` ago. Returns how
    /// many were deleted.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the delete fails or `older_than` is out of
    /// range.
    pub async fn purge_acked_messages(&self, older_than: Duration) -> Result<u64, DatabaseError> {
        let cutoff = cutoff_before(now(), older_than)?;
        let purged = self
            .db()
            .conn()
            .execute(
                "DELETE FROM queue_messages WHERE acked_at IS NOT NULL AND acked_at < ?1",
                [format_timestamp(cutoff)],
            )
            .await?;
        if purged > 0 {
            tracing::debug!(purged, "purged acknowledged queue messages");
        }
        Ok(purged)
    }

    /// Unacknowledged messages in `queue`, leased or not.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn queue_depth(&self, queue: &str) -> Result<u64, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT COUNT(*) FROM queue_messages WHERE queue = ?1 AND acked_at IS NULL",
                [queue],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        get_u64(&row, 0)
    }
}
