//! Event store contract and in-memory implementation
//!
//! The engines only require a read/write contract from the store:
//! `insert` accepts ownership of an event, `query` returns a consistent
//! snapshot matching a filter. Durable backends implement the same
//! trait; [`MemoryStore`] backs tests and embedded use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use tokenlens_sdk::Event;

use crate::error::Result;

/// Timestamp ordering for query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Newest first (display default)
    #[default]
    Descending,
    /// Oldest first (time-series derivation)
    Ascending,
}

/// Query filter over stored events
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Restrict to one project
    pub project: Option<String>,
    /// Restrict to one agent
    pub agent: Option<String>,
    /// Restrict to one exact model name
    pub model: Option<String>,
    /// Inclusive lower timestamp bound
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper timestamp bound
    pub end: Option<DateTime<Utc>>,
    /// Result ordering
    pub order: SortOrder,
}

impl EventFilter {
    /// Create an empty filter matching every event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a project.
    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Restrict to an agent.
    #[must_use]
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    /// Restrict to an exact model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the inclusive lower timestamp bound.
    #[must_use]
    pub fn since(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Set the inclusive upper timestamp bound.
    #[must_use]
    pub fn until(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    /// Return results oldest first.
    #[must_use]
    pub fn ascending(mut self) -> Self {
        self.order = SortOrder::Ascending;
        self
    }

    fn matches(&self, event: &Event) -> bool {
        if let Some(project) = &self.project {
            if event.project.as_deref() != Some(project.as_str()) {
                return false;
            }
        }
        if let Some(agent) = &self.agent {
            if event.agent.as_deref() != Some(agent.as_str()) {
                return false;
            }
        }
        if let Some(model) = &self.model {
            if event.model.as_deref() != Some(model.as_str()) {
                return false;
            }
        }
        if let Some(start) = self.start {
            if event.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if event.timestamp > end {
                return false;
            }
        }
        true
    }
}

/// Read/write contract the engines require from an event store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Accept ownership of an event. Once accepted the store owns the
    /// record; it is never mutated afterwards.
    async fn insert(&self, event: Event) -> Result<()>;

    /// Return a point-in-time snapshot of events matching the filter,
    /// ordered by timestamp per `filter.order`.
    async fn query(&self, filter: &EventFilter) -> Result<Vec<Event>>;
}

/// In-memory event store
#[derive(Default)]
pub struct MemoryStore {
    events: RwLock<Vec<Event>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored events.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    /// Whether the store holds no events.
    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert(&self, event: Event) -> Result<()> {
        self.events.write().await.push(event);
        Ok(())
    }

    async fn query(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let events = self.events.read().await;
        let mut matched: Vec<Event> = events.iter().filter(|e| filter.matches(e)).cloned().collect();
        match filter.order {
            SortOrder::Descending => matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
            SortOrder::Ascending => matched.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
        }
        Ok(matched)
    }
}
