//! Tokenlens SDK - LLM usage and cost instrumentation
//!
//! This crate provides the client side of Tokenlens:
//! - Adapters: provider response normalization (OpenAI-style, Anthropic-style)
//! - Pricing: prefix-resolved price tables per provider family
//! - Observer: per-call observation contexts with at-most-one-event emission
//! - Emitter: best-effort delivery to a collector endpoint
//!
//! Instrumentation never fails the instrumented application: unknown
//! providers degrade to zero-cost events, unpriced models cost zero and
//! delivery failures are absorbed into an outcome value.
//!
//! ```no_run
//! use tokenlens_sdk::{Observer, ObserverConfig, ObservationMeta};
//!
//! # async fn example(response: serde_json::Value) {
//! let observer = Observer::new(ObserverConfig::from_env());
//! let ctx = observer.begin(ObservationMeta::new("rag-app").with_agent("planner"));
//! // let response = client.chat().create(...).await;
//! ctx.track(&response).await;
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod anthropic;
pub mod config;
pub mod emitter;
pub mod event;
pub mod observer;
pub mod openai;
pub mod pricing;
pub mod registry;
pub mod usage;

pub use adapter::ProviderAdapter;
pub use anthropic::{anthropic_price_table, AnthropicAdapter};
pub use config::ObserverConfig;
pub use emitter::{DeliveryOutcome, EventEmitter};
pub use event::{Event, EventType};
pub use observer::{
    clear_default, default_observer, install_default, ObservationContext, ObservationMeta,
    Observer,
};
pub use openai::{openai_price_table, OpenAiAdapter};
pub use pricing::{PriceEntry, PriceTable};
pub use registry::{global_registry, AdapterRegistry};
pub use usage::{CostBreakdown, UsageRecord};
