//! Inference engine configuration.
//!
//! `model` empty means the tier is picked from detected accelerator memory.
//! A non-empty `model` is an explicit override: `model`, `quantization` and
//! `max_model_len` are then used as-is and detection is skipped.

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_quantization() -> String {
    "awq".to_string()
}

const fn default_max_model_len() -> u32 {
    4096
}

/// System prompt + user template + output allowance.
const fn default_reserved_tokens() -> u32 {
    1800
}

const fn default_map_chunk_tokens() -> u32 {
    3000
}

const fn default_request_timeout_secs() -> u64 {
    300
}

fn default_language() -> String {
    "English".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InferenceConfig {
    /// Base URL of the OpenAI-compatible vLLM server.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub model: String,

    #[serde(default = "default_quantization")]
    pub quantization: String,

    #[serde(default = "default_max_model_len")]
    pub max_model_len: u32,

    #[serde(default = "default_reserved_tokens")]
    pub reserved_tokens: u32,

    #[serde(default = "default_map_chunk_tokens")]
    pub map_chunk_tokens: u32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Language the summaries are written in.
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: String::new(),
            quantization: default_quantization(),
            max_model_len: default_max_model_len(),
            reserved_tokens: default_reserved_tokens(),
            map_chunk_tokens: default_map_chunk_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            language: default_language(),
        }
    }
}

impl InferenceConfig {
    /// Whether an explicit model override is configured.
    #[must_use]
    pub fn has_model_override(&self) -> bool {
        !self.model.trim().is_empty()
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
