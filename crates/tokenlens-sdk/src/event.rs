//! Observation events and the collector wire format
//!
//! An [`Event`] is the unit handed to the event store: one record per
//! traced LLM call (or retrieval). The struct mirrors the collector
//! wire payload field-for-field, so serializing with `serde_json` IS
//! the wire format and a stored payload parses back losslessly.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::usage::{CostBreakdown, UsageRecord};

/// Kind of event carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A traced LLM completion call
    LlmCall,
    /// A RAG retrieval step
    Retrieval,
}

/// A single observation event.
///
/// Usage and cost fields are present on `llm_call` events and absent on
/// `retrieval` events; chunk fields are the reverse. Metadata fields are
/// always serialized (as `null` when unset) to keep payloads uniform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier
    pub event_id: Uuid,
    /// Creation time (UTC); never later than now
    pub timestamp: DateTime<Utc>,
    /// Event kind
    pub event_type: EventType,

    /// Model name (`llm_call` only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Prompt tokens (`llm_call` only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    /// Completion tokens (`llm_call` only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    /// Total tokens (`llm_call` only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,

    /// Wall-clock latency of the traced call in milliseconds
    #[serde(default)]
    pub latency_ms: u64,

    /// Prompt-token cost (`llm_call` only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_cost: Option<f64>,
    /// Completion-token cost (`llm_call` only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_cost: Option<f64>,
    /// Total cost (`llm_call` only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
    /// Currency code (`llm_call` only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// Chunks retrieved (`retrieval` only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<u64>,
    /// Context tokens retrieved (`retrieval` only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_tokens: Option<u64>,
    /// Retrieval source name (`retrieval` only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Project the call belongs to
    pub project: Option<String>,
    /// Agent that made the call
    pub agent: Option<String>,
    /// Pipeline step within the agent
    pub step: Option<String>,
    /// End-user identifier
    pub user_id: Option<String>,
    /// Free-form tags
    #[serde(default)]
    pub tags: HashMap<String, serde_json::Value>,
}

impl Event {
    fn base(event_type: EventType) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type,
            model: None,
            prompt_tokens: None,
            completion_tokens: None,
            total_tokens: None,
            latency_ms: 0,
            input_cost: None,
            output_cost: None,
            total_cost: None,
            currency: None,
            chunks: None,
            context_tokens: None,
            source: None,
            project: None,
            agent: None,
            step: None,
            user_id: None,
            tags: HashMap::new(),
        }
    }

    /// Build an `llm_call` event from a priced usage record.
    #[must_use]
    pub fn llm_call(usage: &UsageRecord, cost: &CostBreakdown, latency_ms: u64) -> Self {
        Self {
            model: Some(usage.model.clone()),
            prompt_tokens: Some(usage.prompt_tokens),
            completion_tokens: Some(usage.completion_tokens),
            total_tokens: Some(usage.total_tokens),
            latency_ms,
            input_cost: Some(cost.input_cost),
            output_cost: Some(cost.output_cost),
            total_cost: Some(cost.total_cost),
            currency: Some(cost.currency.clone()),
            ..Self::base(EventType::LlmCall)
        }
    }

    /// Build a `retrieval` event.
    #[must_use]
    pub fn retrieval(chunks: u64, context_tokens: u64, source: Option<String>) -> Self {
        Self {
            chunks: Some(chunks),
            context_tokens: Some(context_tokens),
            source,
            ..Self::base(EventType::Retrieval)
        }
    }

    /// Replace the generated event id (used by observation contexts,
    /// which allocate their id before the call completes).
    #[must_use]
    pub fn with_id(mut self, event_id: Uuid) -> Self {
        self.event_id = event_id;
        self
    }

    /// Override the creation timestamp (test fixtures and backfills).
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Reassemble the usage record, if this event carries one.
    #[must_use]
    pub fn usage(&self) -> Option<UsageRecord> {
        Some(UsageRecord {
            model: self.model.clone()?,
            prompt_tokens: self.prompt_tokens?,
            completion_tokens: self.completion_tokens?,
            total_tokens: self.total_tokens?,
        })
    }

    /// Reassemble the cost breakdown, if this event carries one.
    #[must_use]
    pub fn cost(&self) -> Option<CostBreakdown> {
        Some(CostBreakdown {
            input_cost: self.input_cost?,
            output_cost: self.output_cost?,
            total_cost: self.total_cost?,
            currency: self.currency.clone()?,
        })
    }

    /// Total cost, zero when the event carries none.
    #[must_use]
    pub fn billed_cost(&self) -> f64 {
        self.total_cost.unwrap_or(0.0)
    }

    /// Total tokens, zero when the event carries none.
    #[must_use]
    pub fn billed_tokens(&self) -> u64 {
        self.total_tokens.unwrap_or(0)
    }
}
