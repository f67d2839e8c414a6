//! Anthropic-style provider adapter
//!
//! Anthropic responses expose `usage.input_tokens` / `usage.output_tokens`
//! and no reported total. The shape is otherwise the generic `usage` +
//! `model` one, so detection additionally requires "claude" in the model
//! identifier to disambiguate from OpenAI-compatible providers.

use serde_json::Value;

use crate::adapter::{has_usage_shape, model_name, token_count, ProviderAdapter};
use crate::pricing::{PriceEntry, PriceTable};
use crate::usage::{CostBreakdown, UsageRecord};

/// Price table for Anthropic models (USD per 1M tokens).
#[must_use]
pub fn anthropic_price_table() -> PriceTable {
    PriceTable::new(vec![
        PriceEntry::new("claude-3-5-sonnet", 3.00, 15.00),
        PriceEntry::new("claude-3-opus", 15.00, 75.00),
        PriceEntry::new("claude-3-sonnet", 3.00, 15.00),
        PriceEntry::new("claude-3-haiku", 0.25, 1.25),
        PriceEntry::new("claude-2.1", 8.00, 24.00),
        PriceEntry::new("claude-2", 8.00, 24.00),
    ])
}

/// Adapter for Anthropic-style responses
pub struct AnthropicAdapter {
    prices: PriceTable,
}

impl AnthropicAdapter {
    /// Create the adapter with the built-in price table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            prices: anthropic_price_table(),
        }
    }

    /// Create the adapter with a custom price table.
    #[must_use]
    pub fn with_prices(prices: PriceTable) -> Self {
        Self { prices }
    }
}

impl Default for AnthropicAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn detect(&self, response: &Value) -> bool {
        has_usage_shape(response)
            && response
                .get("model")
                .and_then(Value::as_str)
                .is_some_and(|model| model.to_lowercase().contains("claude"))
    }

    fn extract_usage(&self, response: &Value) -> UsageRecord {
        let empty = Value::Null;
        let usage = response.get("usage").unwrap_or(&empty);
        UsageRecord::new(
            model_name(response),
            token_count(usage, "input_tokens"),
            token_count(usage, "output_tokens"),
        )
    }

    fn price_usage(&self, usage: &UsageRecord) -> CostBreakdown {
        self.prices.price_usage(usage)
    }
}
