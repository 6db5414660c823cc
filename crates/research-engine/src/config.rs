//! Engine configuration: models, timeouts, and pricing

use research_core::Verbosity;
use std::collections::HashMap;
use std::time::Duration;

/// Per-model token pricing, in currency units per 1K tokens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl ModelPricing {
    /// Price a token count pair
    pub fn cost(&self, input_tokens: usize, output_tokens: usize) -> f64 {
        input_tokens as f64 / 1000.0 * self.input_per_1k
            + output_tokens as f64 / 1000.0 * self.output_per_1k
    }
}

/// Configuration for the query-execution engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Default (deep-capable) model
    pub model: String,

    /// Model pinned by `fast` mode
    pub fast_model: String,

    /// Model used by the fallback provider in `auto` mode
    pub fallback_model: String,

    /// System prompt handed to the capability
    pub system_prompt: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Wall-clock bound on one capability attempt
    pub agent_timeout: Duration,

    /// Input-token estimate used for admission
    pub estimated_input_tokens: usize,

    /// Flat data cost charged per obtained enrichment fragment
    pub data_cost_per_fragment: f64,

    /// Upper bound on accepted question length, in characters
    pub max_question_chars: usize,

    /// Per-model pricing table
    pub pricing: HashMap<String, ModelPricing>,

    /// Pricing applied to models missing from the table
    pub default_pricing: ModelPricing,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut pricing = HashMap::new();
        pricing.insert(
            "claude-sonnet-4-5-20250929".to_string(),
            ModelPricing {
                input_per_1k: 0.003,
                output_per_1k: 0.015,
            },
        );
        pricing.insert(
            "claude-3-5-haiku-20241022".to_string(),
            ModelPricing {
                input_per_1k: 0.0008,
                output_per_1k: 0.004,
            },
        );
        pricing.insert(
            "gpt-4.1".to_string(),
            ModelPricing {
                input_per_1k: 0.002,
                output_per_1k: 0.008,
            },
        );

        Self {
            model: "claude-sonnet-4-5-20250929".to_string(),
            fast_model: "claude-3-5-haiku-20241022".to_string(),
            fallback_model: "gpt-4.1".to_string(),
            system_prompt: "You are an equity research analyst. Answer the user's question \
                            directly, cite the figures you rely on, and flag uncertainty."
                .to_string(),
            temperature: 0.3,
            agent_timeout: Duration::from_secs(120),
            estimated_input_tokens: 2400,
            data_cost_per_fragment: 0.002,
            max_question_chars: 4000,
            pricing,
            default_pricing: ModelPricing {
                input_per_1k: 0.003,
                output_per_1k: 0.015,
            },
        }
    }
}

impl EngineConfig {
    /// Pricing for a model, falling back to the default entry
    pub fn pricing_for(&self, model: &str) -> ModelPricing {
        self.pricing
            .get(model)
            .copied()
            .unwrap_or(self.default_pricing)
    }

    /// Output-token budget for a verbosity level
    pub fn max_tokens_for(&self, verbosity: Verbosity) -> usize {
        match verbosity {
            Verbosity::Brief => 1024,
            Verbosity::Standard => 4096,
            Verbosity::Detailed => 8192,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pricing_cost() {
        let pricing = ModelPricing {
            input_per_1k: 0.003,
            output_per_1k: 0.015,
        };
        let cost = pricing.cost(1000, 1000);
        assert!((cost - 0.018).abs() < 1e-12);
    }

    #[test]
    fn test_pricing_lookup_falls_back() {
        let config = EngineConfig::default();
        let known = config.pricing_for("gpt-4.1");
        assert!((known.input_per_1k - 0.002).abs() < 1e-12);

        let unknown = config.pricing_for("some-new-model");
        assert_eq!(unknown, config.default_pricing);
    }

    #[test]
    fn test_verbosity_token_budgets_increase() {
        let config = EngineConfig::default();
        assert!(
            config.max_tokens_for(Verbosity::Brief) < config.max_tokens_for(Verbosity::Standard)
        );
        assert!(
            config.max_tokens_for(Verbosity::Standard)
                < config.max_tokens_for(Verbosity::Detailed)
        );
    }
}
