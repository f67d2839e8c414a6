//! Provider adapter trait
//!
//! A provider adapter normalizes one provider family's response shape
//! into a [`UsageRecord`] and prices it against that family's table.
//! Adapters are consulted through the [`crate::registry::AdapterRegistry`];
//! new providers are added by implementing this trait and registering,
//! never by touching the dispatch logic.

use serde_json::Value;

use crate::usage::{CostBreakdown, UsageRecord};

/// Capability set implemented once per provider family
pub trait ProviderAdapter: Send + Sync {
    /// Short provider name (e.g. "openai", "anthropic")
    fn name(&self) -> &str;

    /// Whether this adapter recognizes the raw response.
    ///
    /// Must be side-effect-free and tolerant of arbitrary values:
    /// missing or oddly typed fields mean `false`, never a panic.
    fn detect(&self, response: &Value) -> bool;

    /// Extract token usage and model name from a recognized response.
    ///
    /// Tolerant of partially present data: missing counts degrade to 0
    /// and a missing model name degrades to "unknown".
    fn extract_usage(&self, response: &Value) -> UsageRecord;

    /// Price a usage record against this provider's table.
    fn price_usage(&self, usage: &UsageRecord) -> CostBreakdown;
}

/// Read an unsigned token count from a `usage` sub-object, 0 if absent.
pub(crate) fn token_count(usage: &Value, key: &str) -> u64 {
    usage.get(key).and_then(Value::as_u64).unwrap_or(0)
}

/// Read the top-level model name, "unknown" if absent.
pub(crate) fn model_name(response: &Value) -> String {
    response
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or(crate::usage::UNKNOWN_MODEL)
        .to_string()
}

/// `true` when the response has the generic `usage` + `model` shape.
pub(crate) fn has_usage_shape(response: &Value) -> bool {
    response.get("usage").is_some_and(Value::is_object)
        && response.get("model").is_some_and(Value::is_string)
}
