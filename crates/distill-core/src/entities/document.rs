use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::RequestId;

/// A document persisted by the search stage.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct GatheredDocument {
    pub id: i64,
    pub request_id: RequestId,
    pub locator: String,
    pub title: Option<String>,
    /// Extracted text. `None` when extraction failed.
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A document as returned by the content fetcher, before it is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct FetchedDocument {
    pub locator: String,
    pub title: Option<String>,
    pub content: Option<String>,
}

impl FetchedDocument {
    #[must_use]
    pub fn new(locator: impl Into<String>, title: Option<String>, content: Option<String>) -> Self {
        Self {
            locator: locator.into(),
            title,
            content,
        }
    }
}

impl From<GatheredDocument> for FetchedDocument {
    fn from(doc: GatheredDocument) -> Self {
        Self {
            locator: doc.locator,
            title: doc.title,
            content: doc.content,
        }
    }
}
