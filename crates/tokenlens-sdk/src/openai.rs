//! OpenAI-style provider adapter
//!
//! Handles any response exposing the OpenAI completion shape: token
//! counts under `usage.prompt_tokens` / `usage.completion_tokens` and
//! the model name at top level. Most OpenAI-compatible gateways reuse
//! this shape verbatim.

use serde_json::Value;

use crate::adapter::{has_usage_shape, model_name, token_count, ProviderAdapter};
use crate::pricing::{PriceEntry, PriceTable};
use crate::usage::{CostBreakdown, UsageRecord};

/// Price table for OpenAI models (USD per 1M tokens).
///
/// More specific prefixes come before the prefixes they extend, so
/// `gpt-4o-mini-2024-07-18` resolves to the mini entry rather than
/// the `gpt-4o` one.
#[must_use]
pub fn openai_price_table() -> PriceTable {
    PriceTable::new(vec![
        PriceEntry::new("gpt-4o-mini", 0.15, 0.60),
        PriceEntry::new("gpt-4o", 2.50, 10.00),
        PriceEntry::new("gpt-4-turbo", 10.00, 30.00),
        PriceEntry::new("gpt-4", 30.00, 60.00),
        PriceEntry::new("gpt-3.5-turbo", 0.50, 1.50),
        PriceEntry::new("o1-preview", 15.00, 60.00),
        PriceEntry::new("o1-mini", 3.00, 12.00),
    ])
}

/// Adapter for OpenAI-style responses
pub struct OpenAiAdapter {
    prices: PriceTable,
}

impl OpenAiAdapter {
    /// Create the adapter with the built-in price table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            prices: openai_price_table(),
        }
    }

    /// Create the adapter with a custom price table.
    #[must_use]
    pub fn with_prices(prices: PriceTable) -> Self {
        Self { prices }
    }
}

impl Default for OpenAiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &str {
        "openai"
    }

    fn detect(&self, response: &Value) -> bool {
        has_usage_shape(response)
    }

    fn extract_usage(&self, response: &Value) -> UsageRecord {
        let empty = Value::Null;
        let usage = response.get("usage").unwrap_or(&empty);
        let prompt_tokens = token_count(usage, "prompt_tokens");
        let completion_tokens = token_count(usage, "completion_tokens");
        // OpenAI reports its own total; trust it when present.
        match usage.get("total_tokens").and_then(Value::as_u64) {
            Some(total) => {
                UsageRecord::with_total(model_name(response), prompt_tokens, completion_tokens, total)
            }
            None => UsageRecord::new(model_name(response), prompt_tokens, completion_tokens),
        }
    }

    fn price_usage(&self, usage: &UsageRecord) -> CostBreakdown {
        self.prices.price_usage(usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response() -> Value {
        json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini-2024-07-18",
            "usage": {
                "prompt_tokens": 1000,
                "completion_tokens": 500,
                "total_tokens": 1500
            }
        })
    }

    #[test]
    fn test_detects_usage_and_model_shape() {
        let adapter = OpenAiAdapter::new();
        assert!(adapter.detect(&response()));
        assert!(!adapter.detect(&json!({"model": "gpt-4o"})));
        assert!(!adapter.detect(&json!({"usage": {"prompt_tokens": 1}})));
        assert!(!adapter.detect(&json!("not an object")));
    }

    #[test]
    fn test_extracts_usage() {
        let usage = OpenAiAdapter::new().extract_usage(&response());
        assert_eq!(usage.model, "gpt-4o-mini-2024-07-18");
        assert_eq!(usage.prompt_tokens, 1000);
        assert_eq!(usage.completion_tokens, 500);
        assert_eq!(usage.total_tokens, 1500);
    }

    #[test]
    fn test_extraction_tolerates_missing_counts() {
        let usage = OpenAiAdapter::new().extract_usage(&json!({
            "model": "gpt-4o",
            "usage": {}
        }));
        assert_eq!(usage.prompt_tokens, 0);
        assert_eq!(usage.completion_tokens, 0);
        assert_eq!(usage.total_tokens, 0);
    }

    #[test]
    fn test_prices_versioned_model_via_prefix() {
        let adapter = OpenAiAdapter::new();
        let usage = adapter.extract_usage(&response());
        let cost = adapter.price_usage(&usage);
        // gpt-4o-mini: 0.15 / 0.60 per 1M
        assert_eq!(cost.input_cost, 0.00015);
        assert_eq!(cost.output_cost, 0.0003);
        assert_eq!(cost.total_cost, 0.00045);
        assert_eq!(cost.currency, "USD");
    }

    #[test]
    fn test_mini_not_shadowed_by_gpt4o_entry() {
        let entry = openai_price_table().price_for("gpt-4o-mini-2024-07-18");
        assert_eq!(entry.model_prefix, "gpt-4o-mini");
    }

    #[test]
    fn test_unknown_model_prices_to_zero() {
        let adapter = OpenAiAdapter::new();
        let cost = adapter.price_usage(&UsageRecord::new("some-new-model", 10_000, 10_000));
        assert_eq!(cost.total_cost, 0.0);
    }
}
