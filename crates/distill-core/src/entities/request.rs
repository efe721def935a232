use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::Stage;
use crate::ids::RequestId;

/// One topic submitted for search and synthesis.
///
/// `completed_at` is set only on `completed`; `error_detail` only on `failed`.
/// `updated_at` never decreases.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Request {
    pub id: RequestId,
    pub topic: String,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_detail: Option<String>,
}
