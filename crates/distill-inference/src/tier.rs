//! Resource-aware tier selection.
//!
//! Maps detected accelerator memory to a model, quantization and maximum
//! context length. Pure: no detection happens here (see [`crate::detect`]).

use distill_config::InferenceConfig;
use serde::Serialize;

pub const LLAMA_70B_AWQ: &str = "hugging-quants/Meta-Llama-3.1-70B-Instruct-AWQ-INT4";
pub const LLAMA_8B_AWQ: &str = "hugging-quants/Meta-Llama-3.1-8B-Instruct-AWQ-INT4";

/// One inference configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InferenceTier {
    pub model: String,
    pub quantization: String,
    pub max_model_len: u32,
}

struct TierRow {
    min_memory_gib: f64,
    model: &'static str,
    quantization: &'static str,
    max_model_len: u32,
}

impl TierRow {
    fn to_tier(&self) -> InferenceTier {
        InferenceTier {
            model: self.model.to_string(),
            quantization: self.quantization.to_string(),
            max_model_len: self.max_model_len,
        }
    }
}

/// Descending by threshold; the first row the memory meets wins.
const TIERS: [TierRow; 4] = [
    TierRow { min_memory_gib: 20.0, model: LLAMA_70B_AWQ, quantization: "awq", max_model_len: 8192 },
    TierRow { min_memory_gib: 10.0, model: LLAMA_8B_AWQ, quantization: "awq", max_model_len: 8192 },
    TierRow { min_memory_gib: 6.0, model: LLAMA_8B_AWQ, quantization: "awq", max_model_len: 4096 },
    TierRow { min_memory_gib: 0.0, model: LLAMA_8B_AWQ, quantization: "awq", max_model_len: 2048 },
];

/// Used when detection fails: smallest model, smallest context.
#[must_use]
pub fn safe_default() -> InferenceTier {
    InferenceTier {
        model: LLAMA_8B_AWQ.to_string(),
        quantization: "awq".to_string(),
        max_model_len: 2048,
    }
}

/// Select a tier.
///
/// `override_tier` wins unconditionally. Otherwise `memory_gib` is matched
/// against the table; `None` (or a value below every threshold, such as a
/// negative or NaN reading) yields [`safe_default`].
#[must_use]
pub fn select_tier(memory_gib: Option<f64>, override_tier: Option<&InferenceTier>) -> InferenceTier {
    if let Some(tier) = override_tier {
        return tier.clone();
    }
    memory_gib
        .and_then(|gib| TIERS.iter().find(|row| gib >= row.min_memory_gib))
        .map_or_else(safe_default, TierRow::to_tier)
}

/// The explicit override carried by the config, if `inference.model` is set.
#[must_use]
pub fn config_override(config: &InferenceConfig) -> Option<InferenceTier> {
    config.has_model_override().then(|| InferenceTier {
        model: config.model.trim().to_string(),
        quantization: config.quantization.clone(),
        max_model_len: config.max_model_len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::large(24.0, LLAMA_70B_AWQ, 8192)]
    #[case::exactly_twenty(20.0, LLAMA_70B_AWQ, 8192)]
    #[case::just_below_twenty(19.99, LLAMA_8B_AWQ, 8192)]
    #[case::twelve(12.0, LLAMA_8B_AWQ, 8192)]
    #[case::exactly_ten(10.0, LLAMA_8B_AWQ, 8192)]
    #[case::eight(8.0, LLAMA_8B_AWQ, 4096)]
    #[case::exactly_six(6.0, LLAMA_8B_AWQ, 4096)]
    #[case::four(4.0, LLAMA_8B_AWQ, 2048)]
    #[case::zero(0.0, LLAMA_8B_AWQ, 2048)]
    fn largest_threshold_not_above_memory(#[case] gib: f64, #[case] model: &str, #[case] max_len: u32) {
        let tier = select_tier(Some(gib), None);
        assert_eq!(tier.model, model);
        assert_eq!(tier.max_model_len, max_len);
        assert_eq!(tier.quantization, "awq");
    }

    #[test]
    fn absent_memory_is_safe_default() {
        assert_eq!(select_tier(None, None), safe_default());
    }

    #[test]
    fn nonsense_reading_is_safe_default() {
        assert_eq!(select_tier(Some(f64::NAN), None), safe_default());
        assert_eq!(select_tier(Some(-1.0), None), safe_default());
    }

    #[rstest]
    #[case(None)]
    #[case(Some(2.0))]
    #[case(Some(80.0))]
    fn override_always_wins(#[case] gib: Option<f64>) {
        let custom = InferenceTier {
            model: "mistralai/Mistral-7B-Instruct-v0.3".into(),
            quantization: "gptq".into(),
            max_model_len: 16_384,
        };
        assert_eq!(select_tier(gib, Some(&custom)), custom);
    }

    #[test]
    fn override_from_config() {
        let mut config = InferenceConfig::default();
        assert_eq!(config_override(&config), None);

        config.model = " some/model ".into();
        config.max_model_len = 6000;
        let tier = config_override(&config).unwrap();
        assert_eq!(tier.model, "some/model");
        assert_eq!(tier.max_model_len, 6000);
    }
}
