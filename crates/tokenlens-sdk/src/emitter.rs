//! Event emitter - best-effort delivery to the collector
//!
//! Delivery is a single bounded-timeout POST per event. Every failure
//! mode is absorbed into a [`DeliveryOutcome`] the caller may log but is
//! never required to inspect: observability must never break the
//! observed system. No retry, no buffering, no ordering guarantee
//! across concurrent emissions.

use reqwest::Client;
use tracing::{debug, warn};

use crate::config::ObserverConfig;
use crate::event::Event;

/// Result of one delivery attempt.
///
/// This is an outcome value, not an error: `emit` never returns `Err`
/// and the observed application's code path is unaffected by any
/// variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The collector accepted the event (2xx)
    Delivered,
    /// The collector answered with a non-success status
    Rejected(u16),
    /// The request never completed (connect error, timeout, ...)
    Failed(String),
    /// Tracking is disabled; nothing was sent
    Disabled,
}

impl DeliveryOutcome {
    /// Whether the event reached the collector.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Best-effort event delivery client
#[derive(Clone)]
pub struct EventEmitter {
    client: Client,
    config: ObserverConfig,
}

impl EventEmitter {
    /// Create an emitter for the configured collector.
    #[must_use]
    pub fn new(config: ObserverConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// Deliver one event to the collector.
    ///
    /// Failures are logged and swallowed; each call is an independent
    /// send with no retry.
    pub async fn emit(&self, event: &Event) -> DeliveryOutcome {
        if !self.config.enabled {
            return DeliveryOutcome::Disabled;
        }

        let url = format!("{}/events", self.config.endpoint);
        let mut request = self.client.post(&url).json(event);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                debug!(event_id = %event.event_id, "event delivered");
                DeliveryOutcome::Delivered
            }
            Ok(response) => {
                let status = response.status().as_u16();
                warn!(event_id = %event.event_id, status, "collector rejected event");
                DeliveryOutcome::Rejected(status)
            }
            Err(e) => {
                warn!(event_id = %event.event_id, error = %e, "event delivery failed");
                DeliveryOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::{CostBreakdown, UsageRecord};
    use std::time::Duration;

    fn event() -> Event {
        Event::llm_call(
            &UsageRecord::new("gpt-4o", 10, 5),
            &CostBreakdown::zero(),
            42,
        )
    }

    #[tokio::test]
    async fn test_disabled_emitter_sends_nothing() {
        let emitter = EventEmitter::new(ObserverConfig::default().with_enabled(false));
        assert_eq!(emitter.emit(&event()).await, DeliveryOutcome::Disabled);
    }

    #[tokio::test]
    async fn test_unreachable_collector_is_absorbed() {
        // Port 9 is discard; nothing listens there in the test env.
        let config = ObserverConfig::new("http://127.0.0.1:9")
            .with_timeout(Duration::from_millis(200));
        let emitter = EventEmitter::new(config);
        let outcome = emitter.emit(&event()).await;
        assert!(matches!(outcome, DeliveryOutcome::Failed(_)));
    }

    #[test]
    fn test_outcome_helpers() {
        assert!(DeliveryOutcome::Delivered.is_delivered());
        assert!(!DeliveryOutcome::Rejected(500).is_delivered());
        assert!(!DeliveryOutcome::Disabled.is_delivered());
    }
}
