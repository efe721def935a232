//! Read-only projections over the data model.
//!
//! These are the shapes returned to the dashboard and the CLI for request
//! detail, listing, and aggregate metrics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{GatheredDocument, Request, SummaryResult};

/// A request together with everything it produced.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RequestDetail {
    pub request: Request,
    pub documents: Vec<GatheredDocument>,
    pub summary: Option<SummaryResult>,
}

/// One row of a request listing.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RequestListItem {
    pub request: Request,
    pub document_count: u64,
}

/// A page of requests plus the total matching the filter.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RequestPage {
    pub total: u64,
    pub items: Vec<RequestListItem>,
}

/// Requests created within one UTC hour.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct HourlyCount {
    pub hour: DateTime<Utc>,
    pub count: u64,
}

/// Aggregate pipeline metrics.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PipelineMetrics {
    pub total_requests: u64,
    /// Completed over total; 0 when there are no requests.
    pub success_rate: f64,
    pub avg_latency_ms: u64,
    /// Keyed by stage string (`"completed"`, `"failed"`, ...).
    pub requests_by_stage: BTreeMap<String, u64>,
    pub requests_by_hour: Vec<HourlyCount>,
}
