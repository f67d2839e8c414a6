//! Optimization engine - heuristic savings suggestions
//!
//! Scans the same trailing-30-day window as the forecaster and emits
//! suggestions from three independent heuristics: cheaper model
//! substitution, oversized-prompt compression and repeated-pattern
//! caching. Thresholds and percentages are fixed policy constants;
//! downstream tooling depends on their exact values.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use tokenlens_sdk::Event;

use crate::analytics::DEFAULT_WINDOW_DAYS;
use crate::error::Result;
use crate::store::{EventFilter, EventStore};

/// Minimum estimated savings (USD) before a suggestion is worth noise.
pub const SAVINGS_THRESHOLD: f64 = 1.0;

/// Prompt-token count above which a prompt counts as oversized.
const LARGE_PROMPT_TOKENS: u64 = 4000;

/// Assumed saving from prompt compression.
const PROMPT_SAVINGS_PERCENT: f64 = 30.0;

/// Request count above which a (project, agent) pair counts as a
/// repeated pattern.
const CACHING_MIN_REQUESTS: u64 = 100;

/// Assumed saving from response caching.
const CACHING_SAVINGS_PERCENT: f64 = 20.0;

/// Cheaper alternative per expensive model prefix. More specific
/// prefixes come before the prefixes they extend, mirroring price
/// table resolution.
const MODEL_ALTERNATIVES: &[(&str, &str)] = &[
    ("gpt-4o", "gpt-4o-mini"),
    ("gpt-4-turbo", "gpt-4o"),
    ("gpt-4", "gpt-4o-mini"),
    ("claude-3-5-sonnet", "claude-3-haiku"),
    ("claude-3-opus", "claude-3-sonnet"),
];

/// Approximate savings percent keyed by the same (current, suggested)
/// prefix pair as the alternatives table.
const COST_SAVINGS: &[(&str, &str, f64)] = &[
    ("gpt-4o", "gpt-4o-mini", 94.0),
    ("gpt-4-turbo", "gpt-4o", 75.0),
    ("gpt-4", "gpt-4o-mini", 95.0),
    ("claude-3-5-sonnet", "claude-3-haiku", 92.0),
    ("claude-3-opus", "claude-3-sonnet", 80.0),
];

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Which heuristic produced a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    /// Substitute a cheaper model
    Model,
    /// Compress oversized prompts
    Prompt,
    /// Cache repeated query patterns
    Caching,
}

/// One ranked savings suggestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    /// Heuristic that produced this suggestion
    pub kind: SuggestionKind,
    /// What is in use today
    pub current: String,
    /// What to switch to
    pub suggested: String,
    /// Estimated absolute savings over the window (USD, 4 digits)
    pub estimated_savings: f64,
    /// Estimated savings as a percentage of current cost
    pub estimated_savings_percent: f64,
    /// Human-readable rationale
    pub reason: String,
}

// ============================================================================
// Heuristics
// ============================================================================

/// Per-model cost accumulator in first-encountered order.
fn group_costs<'a, K, F>(events: &'a [Event], key: F) -> Vec<(K, u64, f64)>
where
    K: PartialEq,
    F: Fn(&'a Event) -> Option<K>,
{
    let mut groups: Vec<(K, u64, f64)> = Vec::new();
    for event in events {
        let Some(k) = key(event) else { continue };
        if let Some(i) = groups.iter().position(|(existing, _, _)| *existing == k) {
            groups[i].1 += 1;
            groups[i].2 += event.billed_cost();
        } else {
            groups.push((k, 1, event.billed_cost()));
        }
    }
    groups
}

fn model_suggestions(events: &[Event]) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    for (model, count, cost) in group_costs(events, |e| e.model.as_deref()) {
        let Some((_, alternative)) = MODEL_ALTERNATIVES
            .iter()
            .find(|(prefix, _)| model.starts_with(prefix))
        else {
            continue;
        };
        // A versioned mini model prefix-matches its expensive sibling;
        // never suggest a model the caller is already on.
        if model.starts_with(alternative) {
            continue;
        }
        if cost <= SAVINGS_THRESHOLD {
            continue;
        }

        let Some((_, _, percent)) = COST_SAVINGS
            .iter()
            .find(|(prefix, suggested, _)| model.starts_with(prefix) && suggested == alternative)
        else {
            continue;
        };

        let estimated_savings = cost * (percent / 100.0);
        if estimated_savings < SAVINGS_THRESHOLD {
            continue;
        }

        suggestions.push(Suggestion {
            kind: SuggestionKind::Model,
            current: model.to_string(),
            suggested: (*alternative).to_string(),
            estimated_savings: round4(estimated_savings),
            estimated_savings_percent: *percent,
            reason: format!(
                "Switching to {alternative} cuts cost by about {percent}%; \
                 {count} requests cost ${cost:.2} over the last {DEFAULT_WINDOW_DAYS} days"
            ),
        });
    }

    suggestions
}

fn prompt_suggestions(events: &[Event]) -> Vec<Suggestion> {
    let oversized: Vec<&Event> = events
        .iter()
        .filter(|e| e.prompt_tokens.unwrap_or(0) > LARGE_PROMPT_TOKENS)
        .collect();
    if oversized.is_empty() {
        return Vec::new();
    }

    let cost: f64 = oversized.iter().map(|e| e.billed_cost()).sum();
    let estimated_savings = cost * (PROMPT_SAVINGS_PERCENT / 100.0);
    if estimated_savings <= SAVINGS_THRESHOLD {
        return Vec::new();
    }

    vec![Suggestion {
        kind: SuggestionKind::Prompt,
        current: format!(
            "{} requests with >{LARGE_PROMPT_TOKENS} prompt tokens",
            oversized.len()
        ),
        suggested: "Reduce context or summarize prompts".to_string(),
        estimated_savings: round4(estimated_savings),
        estimated_savings_percent: PROMPT_SAVINGS_PERCENT,
        reason: format!(
            "{} requests carry oversized prompts costing ${cost:.2}; \
             compressing the context saves roughly {PROMPT_SAVINGS_PERCENT}%",
            oversized.len()
        ),
    }]
}

fn caching_suggestions(events: &[Event]) -> Vec<Suggestion> {
    let groups = group_costs(events, |e| match (&e.project, &e.agent) {
        (Some(project), Some(agent)) => Some((project.as_str(), agent.as_str())),
        _ => None,
    });

    let mut suggestions = Vec::new();
    for ((project, agent), count, cost) in groups {
        if count <= CACHING_MIN_REQUESTS {
            continue;
        }
        let estimated_savings = cost * (CACHING_SAVINGS_PERCENT / 100.0);
        if estimated_savings <= SAVINGS_THRESHOLD {
            continue;
        }

        suggestions.push(Suggestion {
            kind: SuggestionKind::Caching,
            current: format!("{project}/{agent}: {count} requests"),
            suggested: "Cache responses for repeated queries".to_string(),
            estimated_savings: round4(estimated_savings),
            estimated_savings_percent: CACHING_SAVINGS_PERCENT,
            reason: format!(
                "{count} requests from the same project/agent pair; \
                 caching repeated answers saves roughly {CACHING_SAVINGS_PERCENT}%"
            ),
        });
    }

    suggestions
}

/// Run all three heuristics over one event window.
#[must_use]
pub fn compute_suggestions(events: &[Event]) -> Vec<Suggestion> {
    if events.is_empty() {
        return Vec::new();
    }

    let mut suggestions = model_suggestions(events);
    suggestions.extend(prompt_suggestions(events));
    suggestions.extend(caching_suggestions(events));
    suggestions
}

// ============================================================================
// Engine
// ============================================================================

/// Optimization front-end over an event store
#[derive(Clone)]
pub struct OptimizationEngine {
    store: Arc<dyn EventStore>,
}

impl OptimizationEngine {
    /// Create an engine over a store.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Suggestions for the trailing 30-day window.
    pub async fn suggestions(&self, project: Option<&str>) -> Result<Vec<Suggestion>> {
        let start = Utc::now() - Duration::days(i64::from(DEFAULT_WINDOW_DAYS));
        let mut filter = EventFilter::new().since(start);
        if let Some(project) = project {
            filter = filter.with_project(project);
        }
        let events = self.store.query(&filter).await?;
        let suggestions = compute_suggestions(&events);
        debug!(
            events = events.len(),
            suggestions = suggestions.len(),
            "optimization scan complete"
        );
        Ok(suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokenlens_sdk::{CostBreakdown, UsageRecord};

    fn event(model: &str, cost: f64, prompt_tokens: u64) -> Event {
        Event::llm_call(
            &UsageRecord::new(model, prompt_tokens, 100),
            &CostBreakdown::from_components(cost / 2.0, cost / 2.0),
            10,
        )
    }

    fn pattern_event(model: &str, cost: f64, project: &str, agent: &str) -> Event {
        let mut e = event(model, cost, 100);
        e.project = Some(project.to_string());
        e.agent = Some(agent.to_string());
        e
    }

    #[test]
    fn test_gpt4_substitution_scenario() {
        // 200 USD on gpt-4 -> gpt-4o-mini at 95%: savings 190.
        let events: Vec<Event> = (0..100).map(|_| event("gpt-4", 2.0, 100)).collect();
        let suggestions = compute_suggestions(&events);

        let model = suggestions
            .iter()
            .find(|s| s.kind == SuggestionKind::Model)
            .unwrap();
        assert_eq!(model.current, "gpt-4");
        assert_eq!(model.suggested, "gpt-4o-mini");
        assert_eq!(model.estimated_savings, 190.0);
        assert_eq!(model.estimated_savings_percent, 95.0);
    }

    #[test]
    fn test_versioned_model_matches_its_own_prefix() {
        let events: Vec<Event> = (0..10).map(|_| event("gpt-4-turbo-2024-04-09", 2.0, 100)).collect();
        let suggestions = compute_suggestions(&events);
        let model = &suggestions[0];
        assert_eq!(model.suggested, "gpt-4o");
        assert_eq!(model.estimated_savings_percent, 75.0);
    }

    #[test]
    fn test_no_suggestion_below_threshold() {
        let events = vec![event("gpt-4", 0.5, 100)];
        assert!(compute_suggestions(&events).is_empty());
    }

    #[test]
    fn test_cheap_sibling_is_not_suggested_to_itself() {
        // gpt-4o-mini prefix-matches the gpt-4o entry whose suggested
        // alternative is gpt-4o-mini itself.
        let events: Vec<Event> = (0..100).map(|_| event("gpt-4o-mini", 2.0, 100)).collect();
        assert!(compute_suggestions(&events)
            .iter()
            .all(|s| s.kind != SuggestionKind::Model));
    }

    #[test]
    fn test_oversized_prompt_suggestion() {
        let events: Vec<Event> = (0..10).map(|_| event("gpt-3.5-turbo", 1.0, 5000)).collect();
        let suggestions = compute_suggestions(&events);

        let prompt = suggestions
            .iter()
            .find(|s| s.kind == SuggestionKind::Prompt)
            .unwrap();
        assert_eq!(prompt.estimated_savings, 3.0);
        assert_eq!(prompt.estimated_savings_percent, 30.0);
        assert!(prompt.current.contains("10 requests"));
    }

    #[test]
    fn test_small_prompts_do_not_trigger_prompt_heuristic() {
        let events: Vec<Event> = (0..10).map(|_| event("gpt-3.5-turbo", 1.0, 4000)).collect();
        assert!(compute_suggestions(&events)
            .iter()
            .all(|s| s.kind != SuggestionKind::Prompt));
    }

    #[test]
    fn test_prompt_savings_under_threshold_suppressed() {
        // 3 USD of oversized prompts -> 0.9 estimated savings.
        let events: Vec<Event> = (0..3).map(|_| event("gpt-3.5-turbo", 1.0, 5000)).collect();
        assert!(compute_suggestions(&events)
            .iter()
            .all(|s| s.kind != SuggestionKind::Prompt));
    }

    #[test]
    fn test_caching_suggestion_for_hot_pattern() {
        let events: Vec<Event> = (0..101)
            .map(|_| pattern_event("gpt-3.5-turbo", 0.5, "support-bot", "faq"))
            .collect();
        let suggestions = compute_suggestions(&events);

        let caching = suggestions
            .iter()
            .find(|s| s.kind == SuggestionKind::Caching)
            .unwrap();
        assert_eq!(caching.estimated_savings, round4(101.0 * 0.5 * 0.2));
        assert_eq!(caching.estimated_savings_percent, 20.0);
        assert!(caching.current.contains("support-bot/faq"));
    }

    #[test]
    fn test_caching_needs_high_request_count() {
        let events: Vec<Event> = (0..100)
            .map(|_| pattern_event("gpt-3.5-turbo", 0.5, "support-bot", "faq"))
            .collect();
        assert!(compute_suggestions(&events)
            .iter()
            .all(|s| s.kind != SuggestionKind::Caching));
    }

    #[test]
    fn test_empty_window_yields_no_suggestions() {
        assert!(compute_suggestions(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_engine_scans_trailing_window() {
        use crate::store::MemoryStore;

        let store = Arc::new(MemoryStore::new());
        for _ in 0..100 {
            store.insert(event("gpt-4", 2.0, 100)).await.unwrap();
        }
        // An old expensive event outside the window must not count.
        store
            .insert(
                event("gpt-4", 500.0, 100)
                    .with_timestamp(Utc::now() - Duration::days(60)),
            )
            .await
            .unwrap();

        let engine = OptimizationEngine::new(store);
        let suggestions = engine.suggestions(None).await.unwrap();
        let model = suggestions
            .iter()
            .find(|s| s.kind == SuggestionKind::Model)
            .unwrap();
        assert_eq!(model.estimated_savings, 190.0);
    }
}
