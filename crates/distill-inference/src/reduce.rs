//! Context reduction: fit any number of documents into one synthesis call.
//!
//! If the rendered documents fit the context budget they go to the synthesis
//! prompt as-is (one inference call). Otherwise they are packed into chunks
//! of at most `budget.chunk` tokens, each chunk is summarized in one batched
//! map call, and the labelled partial summaries become the synthesis context
//! (`chunks + 1` inference calls). Any failed call fails the whole reduction.
//!
//! Each map call may produce at most an equal share of the context budget.
//! If the partial summaries still exceed the budget they are truncated, so
//! the synthesis context never does.
//!
//! Documents are never split across chunks. A document larger than a chunk on
//! its own is truncated to fit and forms its own chunk.

use std::sync::Arc;
use std::time::Duration;

use distill_core::entities::FetchedDocument;

use crate::budget::TokenBudget;
use crate::engine::{Generation, InferenceEngine, SamplingConfig};
use crate::error::InferenceError;
use crate::prompts::{
    DOCUMENT_SEPARATOR, join_partial_summaries, map_prompt, render_documents, synthesis_prompt,
};

/// Appended to a document cut down to fit one chunk.
pub const TRUNCATION_MARKER: &str = "...(truncated)";

/// Room left per partial summary for its `Summary Part N:` label and separator.
const PART_LABEL_TOKENS: u64 = 8;

/// Guards the truncation loop against a tokenizer that never converges.
const MAX_TRUNCATION_ROUNDS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Direct,
    MapReduce { chunks: usize },
}

impl Strategy {
    /// Number of inference calls the strategy makes.
    #[must_use]
    pub const fn inference_calls(self) -> usize {
        match self {
            Self::Direct => 1,
            Self::MapReduce { chunks } => chunks + 1,
        }
    }
}

/// Result of one reduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    pub summary: String,
    pub strategy: Strategy,
    /// Tokens of the rendered documents before any reduction.
    pub input_tokens: u64,
    /// Prompt plus completion tokens, summed over every inference call.
    pub tokens_used: u64,
    /// Latency summed over every inference call.
    pub latency: Duration,
}

#[derive(Default)]
struct Usage {
    tokens: u64,
    latency: Duration,
}

impl Usage {
    fn add(&mut self, generation: &Generation) {
        self.tokens += generation.total_tokens();
        self.latency += generation.latency;
    }
}

pub struct ContextReducer {
    engine: Arc<dyn InferenceEngine>,
    budget: TokenBudget,
    language: String,
}

impl ContextReducer {
    #[must_use]
    pub fn new(engine: Arc<dyn InferenceEngine>, budget: TokenBudget, language: impl Into<String>) -> Self {
        Self {
            engine,
            budget,
            language: language.into(),
        }
    }

    #[must_use]
    pub const fn budget(&self) -> TokenBudget {
        self.budget
    }

    /// Summarize `documents` with respect to `topic`.
    ///
    /// # Errors
    ///
    /// Returns the first [`InferenceError`] from any token count or generation
    /// call; no partial summary is produced.
    pub async fn summarize(&self, topic: &str, documents: &[FetchedDocument]) -> Result<Reduction, InferenceError> {
        let items = render_documents(documents);
        let full = items.join(DOCUMENT_SEPARATOR);
        let input_tokens = if full.is_empty() {
            0
        } else {
            self.engine.count_tokens(&full).await?
        };

        let mut usage = Usage::default();
        let (context, strategy) = if input_tokens <= self.budget.context {
            tracing::debug!(tokens = input_tokens, budget = self.budget.context, "direct strategy");
            (full, Strategy::Direct)
        } else {
            let chunks = self.partition(items).await?;
            tracing::info!(
                tokens = input_tokens,
                budget = self.budget.context,
                chunks = chunks.len(),
                "context over budget, map-reduce"
            );
            let reduced = self.map(topic, &chunks, &mut usage).await?;
            (reduced, Strategy::MapReduce { chunks: chunks.len() })
        };

        let prompt = synthesis_prompt(topic, &context, &self.language);
        let generation = self.engine.generate(&prompt, &SamplingConfig::synthesis()).await?;
        usage.add(&generation);

        Ok(Reduction {
            summary: generation.text.trim().to_string(),
            strategy,
            input_tokens,
            tokens_used: usage.tokens,
            latency: usage.latency,
        })
    }

    /// Summarize every chunk in one batch and join the partial summaries.
    async fn map(&self, topic: &str, chunks: &[String], usage: &mut Usage) -> Result<String, InferenceError> {
        let total = chunks.len();
        let prompts: Vec<String> = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| map_prompt(topic, i + 1, total, chunk, &self.language))
            .collect();

        let sampling = self.map_sampling(total);
        let outputs = self.engine.generate_batch(&prompts, &sampling).await?;
        if outputs.len() != prompts.len() {
            return Err(InferenceError::Parse(format!(
                "batch of {} prompts returned {} completions",
                prompts.len(),
                outputs.len()
            )));
        }
        for output in &outputs {
            usage.add(output);
        }

        let partials: Vec<&str> = outputs.iter().map(|g| g.text.as_str()).collect();
        let reduced = join_partial_summaries(&partials);

        let reduced_tokens = self.engine.count_tokens(&reduced).await?;
        if reduced_tokens <= self.budget.context {
            return Ok(reduced);
        }
        tracing::warn!(
            tokens = reduced_tokens,
            budget = self.budget.context,
            "partial summaries over budget, truncating"
        );
        let (fitted, _) = self
            .truncate_to_fit(&reduced, reduced_tokens, self.budget.context)
            .await?;
        Ok(fitted)
    }

    /// Map-phase sampling with `max_tokens` capped to this chunk's share of
    /// the context budget.
    fn map_sampling(&self, chunks: usize) -> SamplingConfig {
        let base = SamplingConfig::map_phase();
        let chunks = u64::try_from(chunks).unwrap_or(u64::MAX).max(1);
        let share = (self.budget.context / chunks).saturating_sub(PART_LABEL_TOKENS).max(1);
        let cap = u32::try_from(share).unwrap_or(u32::MAX).min(base.max_tokens);
        base.with_max_tokens(cap)
    }

    /// Pack rendered documents into chunks of at most `budget.chunk` tokens.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError`] if token counting fails.
    pub async fn partition(&self, items: Vec<String>) -> Result<Vec<String>, InferenceError> {
        let limit = self.budget.chunk;
        let mut sized = Vec::with_capacity(items.len());
        for item in items {
            let tokens = self.engine.count_tokens(&item).await?;
            if tokens > limit {
                sized.push(self.truncate_to_fit(&item, tokens, limit).await?);
            } else {
                sized.push((item, tokens));
            }
        }
        Ok(pack_chunks(sized, limit))
    }

    /// Cut `item` proportionally until it counts at most `limit` tokens,
    /// including [`TRUNCATION_MARKER`].
    async fn truncate_to_fit(&self, item: &str, tokens: u64, limit: u64) -> Result<(String, u64), InferenceError> {
        let original = tokens;
        let mut chars = item.chars().count();
        let mut tokens = tokens;
        let mut candidate = TRUNCATION_MARKER.to_string();
        let mut candidate_tokens = tokens;

        for _ in 0..MAX_TRUNCATION_ROUNDS {
            let keep = proportional_len(chars, limit, tokens).min(chars.saturating_sub(1));
            candidate = format!("{}{TRUNCATION_MARKER}", take_chars(item, keep));
            candidate_tokens = self.engine.count_tokens(&candidate).await?;
            if candidate_tokens <= limit || keep == 0 {
                break;
            }
            chars = keep;
            tokens = candidate_tokens;
        }

        tracing::debug!(from = original, to = candidate_tokens, limit, "truncated oversized document");
        Ok((candidate, candidate_tokens))
    }
}

/// Greedy, order-preserving packing. A chunk closes when the next item would
/// push it past `limit`; an item is never split.
#[must_use]
pub fn pack_chunks(items: Vec<(String, u64)>, limit: u64) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_tokens = 0_u64;

    for (item, tokens) in items {
        if !current.is_empty() && current_tokens + tokens > limit {
            chunks.push(current.join(DOCUMENT_SEPARATOR));
            current.clear();
            current_tokens = 0;
        }
        current.push(item);
        current_tokens += tokens;
    }
    if !current.is_empty() {
        chunks.push(current.join(DOCUMENT_SEPARATOR));
    }
    chunks
}

fn proportional_len(chars: usize, limit: u64, tokens: u64) -> usize {
    if tokens == 0 {
        return chars;
    }
    let keep = u128::from(limit) * chars as u128 / u128::from(tokens);
    usize::try_from(keep).unwrap_or(chars)
}

fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((cut, _)) => &s[..cut],
        None => s,
    }
}
