//! The inference engine collaborator.
//!
//! Anything that can complete a prompt and count tokens with the same
//! tokenizer. [`crate::vllm::VllmEngine`] is the production implementation;
//! tests substitute fakes that record their calls.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::InferenceError;

/// Sampling parameters for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplingConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
}

impl SamplingConfig {
    /// Partial summaries of one chunk each.
    #[must_use]
    pub const fn map_phase() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.7,
            top_p: None,
            repetition_penalty: None,
            frequency_penalty: None,
        }
    }

    /// The final synthesis call.
    #[must_use]
    pub const fn synthesis() -> Self {
        Self {
            max_tokens: 1536,
            temperature: 0.7,
            top_p: Some(0.9),
            repetition_penalty: Some(1.1),
            frequency_penalty: Some(0.2),
        }
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Output of one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub latency: Duration,
}

impl Generation {
    #[must_use]
    pub const fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Complete one prompt.
    async fn generate(&self, prompt: &str, sampling: &SamplingConfig) -> Result<Generation, InferenceError>;

    /// Complete several prompts concurrently. Output order matches `prompts`.
    ///
    /// Fails as a whole if any single prompt fails.
    async fn generate_batch(
        &self,
        prompts: &[String],
        sampling: &SamplingConfig,
    ) -> Result<Vec<Generation>, InferenceError> {
        futures::future::try_join_all(prompts.iter().map(|p| self.generate(p, sampling))).await
    }

    /// Number of tokens `text` occupies in the model's context.
    async fn count_tokens(&self, text: &str) -> Result<u64, InferenceError>;

    /// Model identity, for logs.
    fn model(&self) -> &str;
}
