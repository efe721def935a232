//! Aggregate metrics over the request store.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use distill_core::enums::Stage;
use distill_core::responses::{HourlyCount, PipelineMetrics};

use crate::error::DatabaseError;
use crate::helpers::{format_timestamp, get_u64, now, parse_datetime};
use crate::store::PipelineStore;

impl PipelineStore {
    /// Totals, per-stage counts, success rate, average inference latency and
    /// the hourly submission histogram for the last 24 hours.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if any aggregate query fails.
    pub async fn metrics(&self) -> Result<PipelineMetrics, DatabaseError> {
        self.metrics_at(now()).await
    }

    pub(crate) async fn metrics_at(&self, now: DateTime<Utc>) -> Result<PipelineMetrics, DatabaseError> {
        let conn = self.db().conn();

        let mut requests_by_stage: BTreeMap<String, u64> = Stage::ALL
            .iter()
            .map(|stage| (stage.as_str().to_string(), 0))
            .collect();
        let mut rows = conn
            .query("SELECT stage, COUNT(*) FROM requests GROUP BY stage", ())
            .await?;
        while let Some(row) = rows.next().await? {
            requests_by_stage.insert(row.get::<String>(0)?, get_u64(&row, 1)?);
        }

        let total_requests: u64 = requests_by_stage.values().sum();
        let completed = requests_by_stage
            .get(Stage::Completed.as_str())
            .copied()
            .unwrap_or_default();
        #[allow(clippy::cast_precision_loss)]
        let success_rate = if total_requests == 0 {
            0.0
        } else {
            completed as f64 / total_requests as f64
        };

        let mut rows = conn
            .query(
                "SELECT CAST(COALESCE(AVG(latency_ms), 0) AS INTEGER) FROM summaries",
                (),
            )
            .await?;
        let avg_latency_ms = match rows.next().await? {
            Some(row) => get_u64(&row, 0)?,
            None => 0,
        };

        let since = now - TimeDelta::hours(24);
        let mut rows = conn
            .query(
                "SELECT strftime('%Y-%m-%dT%H:00:00.000Z', created_at) AS hour, COUNT(*)
                 FROM requests
                 WHERE created_at >= ?1
                 GROUP BY hour
                 ORDER BY hour",
                [format_timestamp(since)],
            )
            .await?;
        let mut requests_by_hour = Vec::new();
        while let Some(row) = rows.next().await? {
            requests_by_hour.push(HourlyCount {
                hour: parse_datetime(&row.get::<String>(0)?)?,
                count: get_u64(&row, 1)?,
            });
        }

        Ok(PipelineMetrics {
            total_requests,
            success_rate,
            avg_latency_ms,
            requests_by_stage,
            requests_by_hour,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{request_at_stage, test_store};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn empty_store_metrics() {
        let store = test_store().await;
        let metrics = store.metrics().await.unwrap();

        assert_eq!(metrics.total_requests, 0);
        assert!(metrics.success_rate.abs() < f64::EPSILON);
        assert_eq!(metrics.avg_latency_ms, 0);
        assert_eq!(metrics.requests_by_stage.len(), Stage::ALL.len());
        assert!(metrics.requests_by_stage.values().all(|&n| n == 0));
        assert!(metrics.requests_by_hour.is_empty());
    }

    #[tokio::test]
    async fn counts_rate_and_latency() {
        let store = test_store().await;
        let done_a = request_at_stage(&store, "a", Stage::AnalysisInProgress).await;
        let done_b = request_at_stage(&store, "b", Stage::AnalysisInProgress).await;
        store.complete_analysis(&done_a.id, "sa", 100, 1000).await.unwrap();
        store.complete_analysis(&done_b.id, "sb", 100, 3000).await.unwrap();
        let failed = request_at_stage(&store, "c", Stage::Searching).await;
        store.fail_request(&failed.id, "boom").await.unwrap();
        store.create_request("d").await.unwrap();

        let metrics = store.metrics().await.unwrap();
        assert_eq!(metrics.total_requests, 4);
        assert!((metrics.success_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(metrics.avg_latency_ms, 2000);
        assert_eq!(metrics.requests_by_stage["completed"], 2);
        assert_eq!(metrics.requests_by_stage["failed"], 1);
        assert_eq!(metrics.requests_by_stage["pending"], 1);
        assert_eq!(metrics.requests_by_stage["searching"], 0);

        let hourly: u64 = metrics.requests_by_hour.iter().map(|h| h.count).sum();
        assert_eq!(hourly, 4);
    }

    #[tokio::test]
    async fn hourly_histogram_excludes_older_than_a_day() {
        let store = test_store().await;
        let old = store.create_request("old").await.unwrap();
        store
            .db()
            .conn()
            .execute(
                "UPDATE requests SET created_at = '2020-01-01T00:00:00.000Z' WHERE id = ?1",
                [old.id.to_string()],
            )
            .await
            .unwrap();
        store.create_request("recent").await.unwrap();

        let at = parse_datetime("2026-03-01T12:30:00.000Z").unwrap();
        store
            .db()
            .conn()
            .execute(
                "UPDATE requests SET created_at = '2026-03-01T11:45:10.500Z' WHERE topic = 'recent'",
                (),
            )
            .await
            .unwrap();

        let metrics = store.metrics_at(at).await.unwrap();
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(
            metrics.requests_by_hour,
            vec![HourlyCount {
                hour: parse_datetime("2026-03-01T11:00:00Z").unwrap(),
                count: 1,
            }]
        );
    }
}
