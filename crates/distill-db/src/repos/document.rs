//! Gathered documents: the search stage's output.

use distill_core::entities::{FetchedDocument, GatheredDocument};
use distill_core::enums::{Stage, WorkerKind};
use distill_core::ids::RequestId;
use libsql::TransactionBehavior;

use crate::error::DatabaseError;
use crate::helpers::{format_timestamp, get_nullable_string, get_opt_string, now, parse_datetime, parse_request_id};
use crate::store::PipelineStore;

const SELECT_COLS: &str = "id, request_id, locator, title, content, created_at";

fn row_to_document(row: &libsql::Row) -> Result<GatheredDocument, DatabaseError> {
    Ok(GatheredDocument {
        id: row.get(0)?,
        request_id: parse_request_id(&row.get::<String>(1)?)?,
        locator: row.get(2)?,
        title: get_opt_string(row, 3)?,
        content: get_nullable_string(row, 4)?,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
    })
}

impl PipelineStore {
    /// Finish the search stage: persist `documents` and move the request from
    /// `search_in_progress` to `analyzing`, in one transaction.
    ///
    /// Returns `false` and writes nothing if the request is no longer in
    /// `search_in_progress` (for example, a stale-claim sweep failed it while
    /// the search was running).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if any statement fails; the transaction is then
    /// rolled back.
    pub async fn complete_search(
        &self,
        id: &RequestId,
        documents: &[FetchedDocument],
    ) -> Result<bool, DatabaseError> {
        let ts = format_timestamp(now());
        let tx = self
            .db()
            .conn()
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?;

        let affected = tx
            .execute(
                "UPDATE requests SET stage = ?1, updated_at = MAX(updated_at, ?2)
                 WHERE id = ?3 AND stage = ?4",
                libsql::params![
                    WorkerKind::Search.on_success().as_str(),
                    ts.as_str(),
                    id.to_string(),
                    Stage::SearchInProgress.as_str()
                ],
            )
            .await?;
        if affected == 0 {
            tx.rollback().await?;
            tracing::warn!(request_id = %id, "search result dropped: claim no longer held");
            return Ok(false);
        }

        for document in documents {
            tx.execute(
                "INSERT INTO documents (request_id, locator, title, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                libsql::params![
                    id.to_string(),
                    document.locator.as_str(),
                    document.title.as_deref(),
                    document.content.as_deref(),
                    ts.as_str()
                ],
            )
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(request_id = %id, documents = documents.len(), "search results stored");
        Ok(true)
    }

    /// Documents gathered for a request, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_documents(&self, id: &RequestId) -> Result<Vec<GatheredDocument>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM documents WHERE request_id = ?1 ORDER BY id"),
                [id.to_string()],
            )
            .await?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            documents.push(row_to_document(&row)?);
        }
        Ok(documents)
    }
}
