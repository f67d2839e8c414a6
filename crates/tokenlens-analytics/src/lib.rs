//! Tokenlens Analytics - cost statistics, forecasting and optimization
//!
//! This crate is the read path of Tokenlens:
//! - Store: the event-store contract plus an in-memory implementation
//! - Analytics: window totals, model/agent rankings, gap-filled daily series
//! - Forecast: trend classification and a 30-day cost projection
//! - Optimize: heuristic savings suggestions with estimated amounts
//!
//! Engines operate on point-in-time snapshots queried from the store.
//! Empty windows produce zeroed results; store failures are the one
//! error category that surfaces to the caller.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod analytics;
pub mod error;
pub mod forecast;
pub mod optimize;
pub mod store;

pub use analytics::{
    compute_agent_stats, compute_cost_stats, compute_daily_series, compute_model_stats,
    AgentUsage, AnalyticsEngine, CostStats, DailyBucket, ModelUsage, Overview,
    DEFAULT_WINDOW_DAYS,
};
pub use error::{Error, Result};
pub use forecast::{compute_forecast, Confidence, Forecast, ForecastEngine, Trend};
pub use optimize::{
    compute_suggestions, OptimizationEngine, Suggestion, SuggestionKind, SAVINGS_THRESHOLD,
};
pub use store::{EventFilter, EventStore, MemoryStore, SortOrder};
