//! Usage and cost value types
//!
//! This module defines the normalized token-usage record produced by
//! provider adapters and the cost breakdown derived from it.

use serde::{Deserialize, Serialize};

/// Model name used when no adapter recognizes a response.
pub const UNKNOWN_MODEL: &str = "unknown";

/// Currency code applied to all computed costs.
pub const CURRENCY_USD: &str = "USD";

/// Round a monetary value to six decimal digits.
///
/// Costs are tracked per-token at micro-dollar granularity; every cost
/// field is rounded independently before it is stored or summed.
#[must_use]
pub fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Normalized token usage extracted from a provider response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Model name as reported by the provider
    pub model: String,
    /// Prompt (input) tokens
    pub prompt_tokens: u64,
    /// Completion (output) tokens
    pub completion_tokens: u64,
    /// Total tokens
    pub total_tokens: u64,
}

impl UsageRecord {
    /// Create a usage record, deriving the total from the two counts.
    #[must_use]
    pub fn new(model: impl Into<String>, prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            model: model.into(),
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Create a usage record with an externally supplied total.
    ///
    /// Some providers report a total that differs from the sum (for
    /// example when cached tokens are counted); the reported value wins.
    #[must_use]
    pub fn with_total(
        model: impl Into<String>,
        prompt_tokens: u64,
        completion_tokens: u64,
        total_tokens: u64,
    ) -> Self {
        Self {
            model: model.into(),
            prompt_tokens,
            completion_tokens,
            total_tokens,
        }
    }

    /// Zero-usage record for responses no adapter recognized.
    #[must_use]
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_MODEL, 0, 0)
    }
}

/// Cost derived from a usage record via a price table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Cost attributed to prompt tokens (USD, 6 decimal digits)
    pub input_cost: f64,
    /// Cost attributed to completion tokens (USD, 6 decimal digits)
    pub output_cost: f64,
    /// Total cost (USD, 6 decimal digits)
    pub total_cost: f64,
    /// Currency code
    pub currency: String,
}

impl CostBreakdown {
    /// Build a breakdown from the two unrounded component costs.
    ///
    /// Each component is rounded to six digits independently, then the
    /// total is computed from the rounded components and rounded again.
    /// The total may therefore differ from the rounded unrounded sum by
    /// up to 1e-6; historical totals were produced this way and the
    /// behavior is kept for compatibility.
    #[must_use]
    pub fn from_components(input_cost: f64, output_cost: f64) -> Self {
        let input_cost = round6(input_cost);
        let output_cost = round6(output_cost);
        Self {
            input_cost,
            output_cost,
            total_cost: round6(input_cost + output_cost),
            currency: CURRENCY_USD.to_string(),
        }
    }

    /// Zero-cost breakdown (unknown model or unmatched price prefix).
    #[must_use]
    pub fn zero() -> Self {
        Self {
            input_cost: 0.0,
            output_cost: 0.0,
            total_cost: 0.0,
            currency: CURRENCY_USD.to_string(),
        }
    }
}
