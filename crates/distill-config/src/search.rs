//! Content-fetcher (SearXNG) configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_searxng_url() -> String {
    "http://localhost:8080".to_string()
}

const fn default_max_results() -> usize {
    5
}

const fn default_max_content_chars() -> usize {
    10_000
}

const fn default_crawl_delay_ms() -> u64 {
    1000
}

const fn default_request_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    "distill-search-worker/0.1".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Base URL of the SearXNG instance (JSON output must be enabled).
    #[serde(default = "default_searxng_url")]
    pub searxng_url: String,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Extracted page text is cut to this many characters.
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,

    /// Pause between page fetches.
    #[serde(default = "default_crawl_delay_ms")]
    pub crawl_delay_ms: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            searxng_url: default_searxng_url(),
            max_results: default_max_results(),
            max_content_chars: default_max_content_chars(),
            crawl_delay_ms: default_crawl_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl SearchConfig {
    #[must_use]
    pub const fn crawl_delay(&self) -> Duration {
        Duration::from_millis(self.crawl_delay_ms)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
