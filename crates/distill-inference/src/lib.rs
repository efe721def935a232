//! # distill-inference
//!
//! Everything between gathered documents and a finished summary:
//! - [`InferenceEngine`]: the engine collaborator, with a vLLM implementation
//! - [`tier`]: accelerator memory to model/context-length selection
//! - [`ContextReducer`]: direct or map-reduce summarization under a token budget

pub mod budget;
pub mod detect;
pub mod engine;
mod error;
mod http;
pub mod prompts;
pub mod reduce;
pub mod tier;
pub mod vllm;

pub use budget::TokenBudget;
pub use engine::{Generation, InferenceEngine, SamplingConfig};
pub use error::InferenceError;
pub use reduce::{ContextReducer, Reduction, Strategy};
pub use tier::InferenceTier;
pub use vllm::VllmEngine;

use distill_config::InferenceConfig;

/// Pick the tier for this process: the configured override if present,
/// otherwise whatever the detected GPU memory supports.
pub async fn resolve_tier(config: &InferenceConfig) -> InferenceTier {
    if let Some(tier) = tier::config_override(config) {
        tracing::info!(model = %tier.model, max_model_len = tier.max_model_len, "using configured model");
        return tier;
    }
    let memory = detect::detect_gpu_memory_gib().await;
    let tier = tier::select_tier(memory, None);
    tracing::info!(
        memory_gib = ?memory,
        model = %tier.model,
        max_model_len = tier.max_model_len,
        "selected inference tier"
    );
    tier
}
