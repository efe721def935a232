//! Stage queue configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_search_queue() -> String {
    "search-queue".to_string()
}

fn default_analysis_queue() -> String {
    "analysis-queue".to_string()
}

const fn default_poll_interval_ms() -> u64 {
    500
}

const fn default_visibility_timeout_secs() -> u64 {
    300
}

const fn default_acked_retention_secs() -> u64 {
    86_400
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    #[serde(default = "default_search_queue")]
    pub search_queue: String,

    #[serde(default = "default_analysis_queue")]
    pub analysis_queue: String,

    /// Sleep between empty polls of the store-backed queue.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long a received message stays invisible before it is redelivered.
    #[serde(default = "default_visibility_timeout_secs")]
    pub visibility_timeout_secs: u64,

    /// Acknowledged messages older than this are deleted by the sweep.
    #[serde(default = "default_acked_retention_secs")]
    pub acked_retention_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            search_queue: default_search_queue(),
            analysis_queue: default_analysis_queue(),
            poll_interval_ms: default_poll_interval_ms(),
            visibility_timeout_secs: default_visibility_timeout_secs(),
            acked_retention_secs: default_acked_retention_secs(),
        }
    }
}

impl QueueConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub const fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    #[must_use]
    pub const fn acked_retention(&self) -> Duration {
        Duration::from_secs(self.acked_retention_secs)
    }
}
