//! Price tables and prefix-based price resolution
//!
//! Provider model names carry version suffixes (`gpt-4o-2024-08-06`,
//! `claude-3-opus-20240229`); resolution therefore matches on name
//! prefixes rather than exact names, so a table stays small without
//! chasing every dated release. Each provider adapter owns one table.

use crate::usage::{round6, CostBreakdown, UsageRecord};

/// Price for one model-name prefix (USD per 1M tokens)
#[derive(Debug, Clone, PartialEq)]
pub struct PriceEntry {
    /// Model name prefix this entry applies to
    pub model_prefix: String,
    /// Cost per 1M prompt tokens
    pub input_per_million: f64,
    /// Cost per 1M completion tokens
    pub output_per_million: f64,
}

impl PriceEntry {
    /// Create a price entry.
    #[must_use]
    pub fn new(model_prefix: impl Into<String>, input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            model_prefix: model_prefix.into(),
            input_per_million,
            output_per_million,
        }
    }

    /// Zero-price entry returned when no prefix matches.
    #[must_use]
    pub fn zero() -> Self {
        Self::new("", 0.0, 0.0)
    }
}

/// Ordered, immutable price table for one provider family.
///
/// Entries are consulted in declaration order and the first matching
/// prefix wins, so more specific prefixes (`gpt-4-turbo`) must be
/// declared before the prefixes they extend (`gpt-4`).
#[derive(Debug, Clone)]
pub struct PriceTable {
    entries: Vec<PriceEntry>,
}

impl PriceTable {
    /// Create a table from entries in resolution order.
    #[must_use]
    pub fn new(entries: Vec<PriceEntry>) -> Self {
        Self { entries }
    }

    /// Resolve the price entry for a model name.
    ///
    /// Returns the first entry whose prefix matches, or a zero-price
    /// entry when nothing matches; an unpriced model degrades to zero
    /// cost rather than failing the caller.
    #[must_use]
    pub fn price_for(&self, model: &str) -> PriceEntry {
        self.entries
            .iter()
            .find(|entry| model.starts_with(entry.model_prefix.as_str()))
            .cloned()
            .unwrap_or_else(PriceEntry::zero)
    }

    /// Price a usage record against this table.
    #[must_use]
    pub fn price_usage(&self, usage: &UsageRecord) -> CostBreakdown {
        let entry = self.price_for(&usage.model);
        let input_cost = round6(usage.prompt_tokens as f64 / 1_000_000.0 * entry.input_per_million);
        let output_cost =
            round6(usage.completion_tokens as f64 / 1_000_000.0 * entry.output_per_million);
        CostBreakdown {
            total_cost: round6(input_cost + output_cost),
            input_cost,
            output_cost,
            currency: crate::usage::CURRENCY_USD.to_string(),
        }
    }
}
