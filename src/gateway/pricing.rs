//! Model pricing registry.
//!
//! Centralized pricing data for the vision-capable chat models this crate
//! targets. Costs are in nanodollars (1e-9 USD) per token.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Pricing information for a model.
#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    /// Provider name.
    pub provider: &'static str,
    /// Cost per input token in nanodollars.
    pub input_nanos_per_token: i64,
    /// Cost per output token in nanodollars.
    pub output_nanos_per_token: i64,
}

impl ModelPricing {
    const fn new(provider: &'static str, input: i64, output: i64) -> Self {
        Self {
            provider,
            input_nanos_per_token: input,
            output_nanos_per_token: output,
        }
    }

    /// Calculate cost for a request.
    pub fn calculate_cost(&self, input_tokens: u32, output_tokens: u32) -> i64 {
        (input_tokens as i64) * self.input_nanos_per_token
            + (output_tokens as i64) * self.output_nanos_per_token
    }
}

// =============================================================================
// PRICING DATA
// =============================================================================

// OpenRouter pricing (verify periodically against OpenRouter model pages)
// Gemini 2.5 Flash Lite: $0.10/1M input, $0.40/1M output
// Gemini 2.5 Flash: $0.30/1M input, $2.50/1M output
// Gemini 2.5 Pro: $1.25/1M input, $10.00/1M output
// GPT-4o-mini: $0.15/1M input, $0.60/1M output
// Claude 3.5 Sonnet: $3.00/1M input, $15.00/1M output

const GEMINI_25_FLASH_LITE: ModelPricing = ModelPricing::new("openrouter", 100, 400);
const GEMINI_25_FLASH: ModelPricing = ModelPricing::new("openrouter", 300, 2_500);
const GEMINI_25_PRO: ModelPricing = ModelPricing::new("openrouter", 1_250, 10_000);
const GPT_4O_MINI: ModelPricing = ModelPricing::new("openrouter", 150, 600);
const CLAUDE_35_SONNET: ModelPricing = ModelPricing::new("openrouter", 3_000, 15_000);

static PRICING_MAP: OnceLock<HashMap<&'static str, ModelPricing>> = OnceLock::new();

fn init_pricing() -> HashMap<&'static str, ModelPricing> {
    let mut map = HashMap::new();

    map.insert("google/gemini-2.5-flash-lite", GEMINI_25_FLASH_LITE);
    map.insert(
        "google/gemini-2.5-flash-lite-preview-06-17",
        GEMINI_25_FLASH_LITE,
    );
    map.insert("google/gemini-2.5-flash", GEMINI_25_FLASH);
    map.insert("google/gemini-2.5-pro", GEMINI_25_PRO);
    map.insert("openai/gpt-4o-mini", GPT_4O_MINI);
    map.insert("openai/gpt-4o-mini-2024-07-18", GPT_4O_MINI);
    map.insert("anthropic/claude-3-5-sonnet", CLAUDE_35_SONNET);
    map.insert("anthropic/claude-3-5-sonnet-20241022", CLAUDE_35_SONNET);

    map
}

/// Get pricing for a model.
pub fn get_pricing(model_id: &str) -> Option<ModelPricing> {
    let map = PRICING_MAP.get_or_init(init_pricing);
    map.get(model_id).copied()
}

/// Calculate chat cost.
pub fn chat_cost(model: &str, input_tokens: u32, output_tokens: u32) -> i64 {
    // Default to a mid-range model if unknown
    let default = ModelPricing::new("unknown", 1_000, 5_000);
    let pricing = get_pricing(model).unwrap_or(default);
    pricing.calculate_cost(input_tokens, output_tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_cost() {
        // 1K input + 1K output for Gemini 2.5 Flash Lite
        // Input: 1000 * 100 = 100,000 nanos
        // Output: 1000 * 400 = 400,000 nanos
        // Total: 500,000 nanos = $0.0005
        let cost = chat_cost("google/gemini-2.5-flash-lite", 1_000, 1_000);
        assert_eq!(cost, 500_000);
    }

    #[test]
    fn test_chat_cost_unknown_model_uses_default() {
        let cost = chat_cost("vendor/never-heard-of-it", 1_000, 0);
        assert_eq!(cost, 1_000_000);
    }
}
