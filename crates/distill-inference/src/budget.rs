//! Token budget for one inference tier.

use distill_config::InferenceConfig;

use crate::tier::InferenceTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    /// Tokens available to context in a single call.
    pub context: u64,
    /// Upper bound on one map-phase chunk. Always below `context` when
    /// `context > 1`.
    pub chunk: u64,
}

impl TokenBudget {
    /// `context = max_model_len - reserved`, `chunk = min(map_chunk, 3/4 context)`,
    /// both at least 1.
    #[must_use]
    pub fn new(max_model_len: u32, reserved_tokens: u32, map_chunk_tokens: u32) -> Self {
        let context = u64::from(max_model_len.saturating_sub(reserved_tokens)).max(1);
        let chunk = u64::from(map_chunk_tokens).min(context * 3 / 4).max(1);
        Self { context, chunk }
    }

    #[must_use]
    pub fn for_tier(tier: &InferenceTier, config: &InferenceConfig) -> Self {
        Self::new(tier.max_model_len, config.reserved_tokens, config.map_chunk_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::large_tier(8192, 1800, 3000, 6392, 3000)]
    #[case::mid_tier(4096, 1800, 3000, 2296, 1722)]
    #[case::small_tier(2048, 1800, 3000, 248, 186)]
    #[case::reserved_exceeds_length(1024, 1800, 3000, 1, 1)]
    fn budget_table(
        #[case] max_len: u32,
        #[case] reserved: u32,
        #[case] map_chunk: u32,
        #[case] context: u64,
        #[case] chunk: u64,
    ) {
        let budget = TokenBudget::new(max_len, reserved, map_chunk);
        assert_eq!(budget, TokenBudget { context, chunk });
    }

    #[test]
    fn chunk_strictly_below_context() {
        for max_len in [2000_u32, 2048, 4096, 8192, 32_768] {
            let budget = TokenBudget::new(max_len, 1800, 100_000);
            assert!(budget.chunk < budget.context);
        }
    }
}
