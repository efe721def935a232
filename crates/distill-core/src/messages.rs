//! Queue task envelope.
//!
//! Both stage queues carry the same JSON payload:
//!
//! ```json
//! {"request_id": "550e8400-e29b-41d4-a716-446655440000", "topic": "rust async runtimes"}
//! ```
//!
//! The message says which request to look at; which stage it is in is decided by
//! the store, never by the message.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::ids::RequestId;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StageTask {
    pub request_id: RequestId,
    pub topic: String,
}

impl StageTask {
    #[must_use]
    pub fn new(request_id: RequestId, topic: impl Into<String>) -> Self {
        Self {
            request_id,
            topic: topic.into(),
        }
    }

    /// Encode to the JSON wire format.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Other` if serialization fails.
    pub fn to_payload(&self) -> Result<String, CoreError> {
        serde_json::to_string(self).map_err(|e| CoreError::Other(e.into()))
    }

    /// Decode from the JSON wire format.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if the payload is not a valid task.
    pub fn from_payload(payload: &str) -> Result<Self, CoreError> {
        serde_json::from_str(payload)
            .map_err(|e| CoreError::Validation(format!("malformed stage task: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_wire_format() {
        let task = StageTask::from_payload(
            r#"{"request_id":"550e8400-e29b-41d4-a716-446655440000","topic":"rust"}"#,
        )
        .unwrap();
        assert_eq!(
            task.request_id.to_string(),
            "550e8400-e29b-41d4-a716-446655440000"
        );
        assert_eq!(task.topic, "rust");
    }

    #[test]
    fn rejects_missing_request_id() {
        let err = StageTask::from_payload(r#"{"topic":"rust"}"#).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn rejects_non_json() {
        assert!(StageTask::from_payload("not json").is_err());
    }
}
