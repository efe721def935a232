//! Summary results: the analysis stage's output.

use distill_core::entities::SummaryResult;
use distill_core::enums::{Stage, WorkerKind};
use distill_core::ids::RequestId;
use libsql::TransactionBehavior;

use crate::error::DatabaseError;
use crate::helpers::{format_timestamp, get_u64, now, parse_datetime, parse_request_id, to_sql_int};
use crate::store::PipelineStore;

const SELECT_COLS: &str = "id, request_id, summary, tokens_used, latency_ms, created_at";

fn row_to_summary(row: &libsql::Row) -> Result<SummaryResult, DatabaseError> {
    Ok(SummaryResult {
        id: row.get(0)?,
        request_id: parse_request_id(&row.get::<String>(1)?)?,
        summary: row.get(2)?,
        tokens_used: get_u64(row, 3)?,
        latency_ms: get_u64(row, 4)?,
        created_at: parse_datetime(&row.get::<String>(5)?)?,
    })
}

impl PipelineStore {
    /// Finish the analysis stage: insert the summary and mark the request
    /// `completed` with `completed_at`, in one transaction.
    ///
    /// Returns `None` and writes nothing if the request is no longer in
    /// `analysis_in_progress`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` for an empty summary, or
    /// `DatabaseError` if a statement fails (the transaction is rolled back).
    pub async fn complete_analysis(
        &self,
        id: &RequestId,
        summary: &str,
        tokens_used: u64,
        latency_ms: u64,
    ) -> Result<Option<SummaryResult>, DatabaseError> {
        if summary.trim().is_empty() {
            return Err(DatabaseError::InvalidState(format!(
                "refusing to store an empty summary for request {id}"
            )));
        }

        let now = now();
        let ts = format_timestamp(now);
        let tx = self
            .db()
            .conn()
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await?;

        let affected = tx
            .execute(
                "UPDATE requests
                 SET stage = ?1, completed_at = ?2, updated_at = MAX(updated_at, ?2)
                 WHERE id = ?3 AND stage = ?4",
                libsql::params![
                    WorkerKind::Analysis.on_success().as_str(),
                    ts.as_str(),
                    id.to_string(),
                    Stage::AnalysisInProgress.as_str()
                ],
            )
            .await?;
        if affected == 0 {
            tx.rollback().await?;
            tracing::warn!(request_id = %id, "summary dropped: claim no longer held");
            return Ok(None);
        }

        let mut rows = tx
            .query(
                "INSERT INTO summaries (request_id, summary, tokens_used, latency_ms, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING id",
                libsql::params![
                    id.to_string(),
                    summary,
                    to_sql_int(tokens_used),
                    to_sql_int(latency_ms),
                    ts.as_str()
                ],
            )
            .await?;
        let summary_id: i64 = rows.next().await?.ok_or(DatabaseError::NoResult)?.get(0)?;
        drop(rows);

        tx.commit().await?;
        tracing::debug!(request_id = %id, tokens_used, latency_ms, "summary stored");
        Ok(Some(SummaryResult {
            id: summary_id,
            request_id: *id,
            summary: summary.to_string(),
            tokens_used,
            latency_ms,
            created_at: now,
        }))
    }

    /// The request's summary; `None` if it never completed.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn get_summary(&self, id: &RequestId) -> Result<Option<SummaryResult>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM summaries WHERE request_id = ?1"),
                [id.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_summary(&row)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{request_at_stage, test_store};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn complete_analysis_stores_summary_and_completes() {
        let store = test_store().await;
        let req = request_at_stage(&store, "topic", Stage::AnalysisInProgress).await;

        let stored = store
            .complete_analysis(&req.id, "The answer.", 1234, 5678)
            .await
            .unwrap()
            .expect("claim held");

        let fetched = store.get_summary(&req.id).await.unwrap().unwrap();
        assert_eq!(fetched, stored);
        assert_eq!(fetched.tokens_used, 1234);
        assert_eq!(fetched.latency_ms, 5678);

        let request = store.get_request(&req.id).await.unwrap();
        assert_eq!(request.stage, Stage::Completed);
        assert_eq!(request.completed_at, Some(stored.created_at));
        assert_eq!(request.error_detail, None);
    }

    #[tokio::test]
    async fn complete_analysis_without_claim_writes_nothing() {
        let store = test_store().await;
        let req = request_at_stage(&store, "topic", Stage::Analyzing).await;

        assert_eq!(store.complete_analysis(&req.id, "x", 1, 1).await.unwrap(), None);
        assert_eq!(store.get_summary(&req.id).await.unwrap(), None);
        assert_eq!(store.get_request(&req.id).await.unwrap().stage, Stage::Analyzing);
    }

    #[tokio::test]
    async fn second_completion_is_dropped() {
        let store = test_store().await;
        let req = request_at_stage(&store, "topic", Stage::AnalysisInProgress).await;

        assert!(store.complete_analysis(&req.id, "first", 1, 1).await.unwrap().is_some());
        assert!(store.complete_analysis(&req.id, "second", 1, 1).await.unwrap().is_none());
        let summary = store.get_summary(&req.id).await.unwrap().unwrap();
        assert_eq!(summary.summary, "first");
    }

    #[tokio::test]
    async fn empty_summary_rejected() {
        let store = test_store().await;
        let req = request_at_stage(&store, "topic", Stage::AnalysisInProgress).await;

        let err = store.complete_analysis(&req.id, "  \n", 1, 1).await.unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidState(_)));
        assert_eq!(
            store.get_request(&req.id).await.unwrap().stage,
            Stage::AnalysisInProgress
        );
    }
}
