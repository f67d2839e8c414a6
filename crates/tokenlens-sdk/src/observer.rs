//! Observer and observation contexts
//!
//! The [`Observer`] is the SDK entry point: it owns the configuration,
//! an adapter registry handle and the emitter. [`Observer::begin`]
//! opens an [`ObservationContext`] around one traced call; completing
//! the context with [`ObservationContext::track`] emits exactly one
//! event. A context dropped without tracking emits nothing - tracking
//! is caller-driven, since the caller may need to inspect the raw
//! response first or skip tracking on a failed call.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::config::ObserverConfig;
use crate::emitter::{DeliveryOutcome, EventEmitter};
use crate::event::Event;
use crate::registry::{global_registry, AdapterRegistry};
use crate::usage::{CostBreakdown, UsageRecord};

// ============================================================================
// Observation Metadata
// ============================================================================

/// Caller-supplied metadata attached to every event from one scope
#[derive(Debug, Clone, Default)]
pub struct ObservationMeta {
    /// Project the call belongs to
    pub project: Option<String>,
    /// Agent making the call
    pub agent: Option<String>,
    /// Pipeline step within the agent
    pub step: Option<String>,
    /// End-user identifier
    pub user_id: Option<String>,
    /// Free-form tags
    pub tags: std::collections::HashMap<String, Value>,
}

impl ObservationMeta {
    /// Create metadata for a project.
    #[must_use]
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            ..Self::default()
        }
    }

    /// Set the agent name.
    #[must_use]
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    /// Set the step name.
    #[must_use]
    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }

    /// Set the end-user identifier.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    fn apply_to(&self, event: &mut Event) {
        event.project = self.project.clone();
        event.agent = self.agent.clone();
        event.step = self.step.clone();
        event.user_id = self.user_id.clone();
        event.tags = self.tags.clone();
    }
}

// ============================================================================
// Observer
// ============================================================================

/// SDK entry point: configuration + adapter registry + emitter
#[derive(Clone)]
pub struct Observer {
    config: ObserverConfig,
    registry: Arc<AdapterRegistry>,
    emitter: EventEmitter,
}

impl Observer {
    /// Create an observer using the process-wide adapter registry.
    #[must_use]
    pub fn new(config: ObserverConfig) -> Self {
        Self::with_registry(config, global_registry())
    }

    /// Create an observer with its own adapter registry (isolated
    /// setups and tests).
    #[must_use]
    pub fn with_registry(config: ObserverConfig, registry: Arc<AdapterRegistry>) -> Self {
        let emitter = EventEmitter::new(config.clone());
        Self {
            config,
            registry,
            emitter,
        }
    }

    /// Create an observer configured from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(ObserverConfig::from_env())
    }

    /// The observer's configuration.
    #[must_use]
    pub fn config(&self) -> &ObserverConfig {
        &self.config
    }

    /// The observer's adapter registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    /// Open an observation context around one traced call.
    ///
    /// The context captures a monotonic start instant and a fresh event
    /// id. Many contexts may be active concurrently; they share nothing
    /// but the registry.
    #[must_use]
    pub fn begin(&self, meta: ObservationMeta) -> ObservationContext {
        ObservationContext {
            observer: self.clone(),
            meta,
            event_id: Uuid::new_v4(),
            started: Instant::now(),
        }
    }

    /// Manually log an LLM call without an observation context.
    ///
    /// When no cost is supplied the event carries a zero breakdown; the
    /// collector treats caller-supplied costs as authoritative.
    pub async fn log_event(
        &self,
        usage: UsageRecord,
        cost: Option<CostBreakdown>,
        latency_ms: u64,
        meta: ObservationMeta,
    ) -> DeliveryOutcome {
        let cost = cost.unwrap_or_else(CostBreakdown::zero);
        let mut event = Event::llm_call(&usage, &cost, latency_ms);
        meta.apply_to(&mut event);
        self.emitter.emit(&event).await
    }

    /// Log a RAG retrieval step.
    pub async fn track_retrieval(
        &self,
        chunks: u64,
        context_tokens: u64,
        source: Option<String>,
        meta: ObservationMeta,
    ) -> DeliveryOutcome {
        let mut event = Event::retrieval(chunks, context_tokens, source);
        meta.apply_to(&mut event);
        self.emitter.emit(&event).await
    }

    /// Trace a function call, tracking its result if it looks like an
    /// LLM response.
    ///
    /// Begins a context, awaits `f`, and completes the context only
    /// when the adapter registry recognizes the serialized result. The
    /// result is returned unchanged either way.
    pub async fn traced<F, Fut, T>(&self, meta: ObservationMeta, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
        T: Serialize,
    {
        let ctx = self.begin(meta);
        let result = f().await;

        if self.config.enabled {
            if let Ok(value) = serde_json::to_value(&result) {
                if self.registry.resolve(&value).is_some() {
                    ctx.track(&value).await;
                } else {
                    debug!("traced result not recognized as an LLM response");
                }
            }
        }

        result
    }
}

// ============================================================================
// Observation Context
// ============================================================================

/// One traced call: a start instant, an event id and the scope metadata.
///
/// `track` consumes the context, so at most one event can ever be
/// emitted per context.
pub struct ObservationContext {
    observer: Observer,
    meta: ObservationMeta,
    event_id: Uuid,
    started: Instant,
}

impl ObservationContext {
    /// The id the emitted event will carry.
    #[must_use]
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    /// Complete the context with the raw provider response.
    ///
    /// Resolves the response through the adapter registry and emits one
    /// event: a fully priced `llm_call` when an adapter matches, or a
    /// degraded event with model "unknown", zero usage and zero cost -
    /// but real latency and metadata - when none does. When tracking is
    /// disabled this is a no-op and nothing is resolved or sent.
    pub async fn track(self, response: &Value) -> DeliveryOutcome {
        if !self.observer.config.enabled {
            return DeliveryOutcome::Disabled;
        }

        let event = self.build_event(response);
        self.observer.emitter.emit(&event).await
    }

    fn build_event(&self, response: &Value) -> Event {
        let latency_ms = self.started.elapsed().as_millis() as u64;

        let (usage, cost) = match self.observer.registry.resolve(response) {
            Some(adapter) => {
                let usage = adapter.extract_usage(response);
                let cost = adapter.price_usage(&usage);
                (usage, cost)
            }
            None => (UsageRecord::unknown(), CostBreakdown::zero()),
        };

        let mut event = Event::llm_call(&usage, &cost, latency_ms).with_id(self.event_id);
        self.meta.apply_to(&mut event);
        event
    }
}

// ============================================================================
// Default Observer
// ============================================================================

lazy_static::lazy_static! {
    static ref DEFAULT_OBSERVER: std::sync::RwLock<Option<Observer>> =
        std::sync::RwLock::new(None);
}

/// Install a process-wide default observer.
///
/// The default is explicit, optional state: libraries that accept an
/// observer should still take it as a parameter and fall back to this
/// only at the outermost layer.
pub fn install_default(observer: Observer) {
    let mut slot = DEFAULT_OBSERVER
        .write()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    *slot = Some(observer);
}

/// Get the process-wide default observer, if one is installed.
#[must_use]
pub fn default_observer() -> Option<Observer> {
    DEFAULT_OBSERVER
        .read()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .clone()
}

/// Remove the process-wide default observer (tests).
pub fn clear_default() {
    let mut slot = DEFAULT_OBSERVER
        .write()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    *slot = None;
}
