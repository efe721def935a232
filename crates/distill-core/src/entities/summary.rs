use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::RequestId;

/// The synthesized answer for a request. Written once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct SummaryResult {
    pub id: i64,
    pub request_id: RequestId,
    pub summary: String,
    /// Tokens generated across every inference call (map and reduce).
    pub tokens_used: u64,
    /// Wall time spent in inference calls, in milliseconds.
    pub latency_ms: u64,
    pub created_at: DateTime<Utc>,
}
