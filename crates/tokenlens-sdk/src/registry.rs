//! Adapter registry - ordered provider dispatch
//!
//! Holds the adapters in evaluation order and resolves a raw response to
//! the first adapter whose detector matches. Registration inserts at the
//! front, so custom adapters take priority over built-ins. The list is
//! read-mostly: registration happens during setup, resolution on every
//! traced call.

use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::debug;

use crate::adapter::ProviderAdapter;
use crate::anthropic::AnthropicAdapter;
use crate::openai::OpenAiAdapter;

/// Ordered collection of provider adapters
pub struct AdapterRegistry {
    adapters: RwLock<Vec<Arc<dyn ProviderAdapter>>>,
}

impl AdapterRegistry {
    /// Create a registry with the built-in adapters.
    ///
    /// Built-ins are registered through the same front-insert path as
    /// custom adapters, OpenAI first and Anthropic second, so the more
    /// specific Anthropic detector is consulted before the generic
    /// OpenAI shape.
    #[must_use]
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.register(Arc::new(OpenAiAdapter::new()));
        registry.register(Arc::new(AnthropicAdapter::new()));
        registry
    }

    /// Create a registry with no adapters.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            adapters: RwLock::new(Vec::new()),
        }
    }

    /// Register an adapter at the front of the evaluation order.
    ///
    /// There is no removal: the registry only grows, and only during
    /// setup in normal operation.
    pub fn register(&self, adapter: Arc<dyn ProviderAdapter>) {
        let mut adapters = self
            .adapters
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        adapters.insert(0, adapter);
    }

    /// Resolve a response to the first adapter that recognizes it.
    pub fn resolve(&self, response: &Value) -> Option<Arc<dyn ProviderAdapter>> {
        let adapters = self
            .adapters
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let resolved = adapters.iter().find(|a| a.detect(response)).cloned();
        if resolved.is_none() {
            debug!("no adapter matched response");
        }
        resolved
    }

    /// Number of registered adapters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether the registry has no adapters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static::lazy_static! {
    /// Process-wide default registry with the built-in adapters.
    static ref GLOBAL_REGISTRY: Arc<AdapterRegistry> = Arc::new(AdapterRegistry::new());
}

/// Get the process-wide default adapter registry.
#[must_use]
pub fn global_registry() -> Arc<AdapterRegistry> {
    Arc::clone(&GLOBAL_REGISTRY)
}
