//! Request repository: creation, reads, guarded stage writes, listing.

use distill_core::entities::Request;
use distill_core::enums::Stage;
use distill_core::ids::RequestId;
use distill_core::responses::{RequestDetail, RequestListItem, RequestPage};

use crate::error::DatabaseError;
use crate::helpers::{
    format_timestamp, get_opt_string, get_u64, now, parse_datetime, parse_enum,
    parse_optional_datetime, parse_request_id,
};
use crate::store::PipelineStore;

/// Largest page [`PipelineStore::list_requests`] returns.
pub const MAX_PAGE_SIZE: u32 = 100;

pub(crate) const SELECT_COLS: &str =
    "id, topic, stage, created_at, updated_at, completed_at, error_detail";

pub(crate) fn row_to_request(row: &libsql::Row) -> Result<Request, DatabaseError> {
    Ok(Request {
        id: parse_request_id(&row.get::<String>(0)?)?,
        topic: row.get(1)?,
        stage: parse_enum(&row.get::<String>(2)?)?,
        created_at: parse_datetime(&row.get::<String>(3)?)?,
        updated_at: parse_datetime(&row.get::<String>(4)?)?,
        completed_at: parse_optional_datetime(get_opt_string(row, 5)?.as_deref())?,
        error_detail: get_opt_string(row, 6)?,
    })
}

impl PipelineStore {
    /// Create a request in `pending`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` for a blank topic.
    pub async fn create_request(&self, topic: &str) -> Result<Request, DatabaseError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(DatabaseError::InvalidState("topic must not be empty".into()));
        }

        let id = RequestId::new();
        let now = now();
        let ts = format_timestamp(now);

        self.db()
            .conn()
            .execute(
                "INSERT INTO requests (id, topic, stage, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                libsql::params![id.to_string(), topic, Stage::Pending.as_str(), ts],
            )
            .await?;

        tracing::debug!(request_id = %id, "request created");
        Ok(Request {
            id,
            topic: topic.to_string(),
            stage: Stage::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
            error_detail: None,
        })
    }

    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` if no request has this identity.
    pub async fn get_request(&self, id: &RequestId) -> Result<Request, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM requests WHERE id = ?1"),
                [id.to_string()],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_request(&row)
    }

    /// Move a request from `from` to `to`, only if it is still in `from`.
    ///
    /// Returns `false` when the request has already left `from` (or does not
    /// exist). Used for edges that carry no payload, such as
    /// `pending -> searching` on submission.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::InvalidState` if `from -> to` is not an edge of
    /// the stage graph, or if `to` needs a payload (`completed`, `failed`)
    /// that has its own dedicated write.
    pub async fn advance_stage(
        &self,
        id: &RequestId,
        from: Stage,
        to: Stage,
    ) -> Result<bool, DatabaseError> {
        if !from.can_transition_to(to) || to.is_terminal() {
            return Err(DatabaseError::InvalidState(format!(
                "Cannot transition request {id} from {from} to {to}"
            )));
        }

        let affected = self
            .db()
            .conn()
            .execute(
                "UPDATE requests SET stage = ?1, updated_at = MAX(updated_at, ?2)
                 WHERE id = ?3 AND stage = ?4",
                libsql::params![
                    to.as_str(),
                    format_timestamp(now()),
                    id.to_string(),
                    from.as_str()
                ],
            )
            .await?;

        tracing::debug!(request_id = %id, %from, %to, advanced = affected == 1, "stage write");
        Ok(affected == 1)
    }

    /// Mark a non-terminal request `failed` with an error detail.
    ///
    /// Returns `false` if the request is already terminal or does not exist;
    /// a terminal stage is never overwritten.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the store is unreachable.
    pub async fn fail_request(&self, id: &RequestId, detail: &str) -> Result<bool, DatabaseError> {
        let detail = if detail.trim().is_empty() { "unknown error" } else { detail };

        let affected = self
            .db()
            .conn()
            .execute(
                "UPDATE requests
                 SET stage = ?1, error_detail = ?2, updated_at = MAX(updated_at, ?3)
                 WHERE id = ?4 AND stage NOT IN (?5, ?1)",
                libsql::params![
                    Stage::Failed.as_str(),
                    detail,
                    format_timestamp(now()),
                    id.to_string(),
                    Stage::Completed.as_str()
                ],
            )
            .await?;

        if affected == 1 {
            tracing::warn!(request_id = %id, error = detail, "request failed");
        }
        Ok(affected == 1)
    }

    /// Newest-first page of requests, optionally filtered by stage.
    ///
    /// `limit` is clamped to [`MAX_PAGE_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if a query fails.
    pub async fn list_requests(
        &self,
        stage: Option<Stage>,
        limit: u32,
        offset: u32,
    ) -> Result<RequestPage, DatabaseError> {
        let stage = stage.map(Stage::as_str);
        let limit = limit.min(MAX_PAGE_SIZE);

        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT COUNT(*) FROM requests WHERE (?1 IS NULL OR stage = ?1)",
                libsql::params![stage],
            )
            .await?;
        let total = match rows.next().await? {
            Some(row) => get_u64(&row, 0)?,
            None => 0,
        };

        let mut rows = self
            .db()
            .conn()
            .query(
                "SELECT r.id, r.topic, r.stage, r.created_at, r.updated_at, r.completed_at,
                        r.error_detail,
                        (SELECT COUNT(*) FROM documents d WHERE d.request_id = r.id)
                 FROM requests r
                 WHERE (?1 IS NULL OR r.stage = ?1)
                 ORDER BY r.created_at DESC, r.rowid DESC
                 LIMIT ?2 OFFSET ?3",
                libsql::params![stage, i64::from(limit), i64::from(offset)],
            )
            .await?;

        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(RequestListItem {
                request: row_to_request(&row)?,
                document_count: get_u64(&row, 7)?,
            });
        }
        Ok(RequestPage { total, items })
    }

    /// Request with its documents and summary, if any.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` if no request has this identity.
    pub async fn get_request_detail(&self, id: &RequestId) -> Result<RequestDetail, DatabaseError> {
        let request = self.get_request(id).await?;
        let documents = self.list_documents(id).await?;
        let summary = self.get_summary(id).await?;
        Ok(RequestDetail {
            request,
            documents,
            summary,
        })
    }
}
