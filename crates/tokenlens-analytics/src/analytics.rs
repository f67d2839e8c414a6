//! Analytics engine - aggregate statistics over stored events
//!
//! All aggregation is implemented as pure functions over event slices;
//! the [`AnalyticsEngine`] front-end queries the store and delegates.
//! Store failures surface to the caller, empty windows never do - they
//! produce zeroed results.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use tokenlens_sdk::Event;

use crate::error::Result;
use crate::store::{EventFilter, EventStore};

/// Trailing window, in days, shared by the overview time series, the
/// forecasting engine and the optimization engine.
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// How many top models/agents the overview carries.
const OVERVIEW_TOP_LIMIT: usize = 5;

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

// ============================================================================
// Aggregate Types
// ============================================================================

/// Totals over a queried window
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostStats {
    /// Total cost (4 decimal digits)
    pub total_cost: f64,
    /// Total tokens
    pub total_tokens: u64,
    /// Number of events in the window
    pub total_requests: u64,
    /// Average cost per request, 0 when the window is empty (6 digits)
    pub avg_cost_per_request: f64,
    /// Currency code
    pub currency: String,
}

/// Per-model aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelUsage {
    /// Exact model string (no prefix folding; versions stay distinct)
    pub model: String,
    /// Request count
    pub requests: u64,
    /// Total tokens
    pub tokens: u64,
    /// Total cost (4 decimal digits)
    pub cost: f64,
}

/// Per-agent aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentUsage {
    /// Agent name
    pub agent: String,
    /// Request count
    pub requests: u64,
    /// Total tokens
    pub tokens: u64,
    /// Total cost (4 decimal digits)
    pub cost: f64,
}

/// One calendar date of the gap-filled daily series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBucket {
    /// Calendar date (UTC)
    pub date: NaiveDate,
    /// Cost accrued on that date (4 decimal digits)
    pub total_cost: f64,
    /// Tokens consumed on that date
    pub total_tokens: u64,
    /// Events on that date
    pub request_count: u64,
}

/// Dashboard snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Overview {
    /// Cost accrued since midnight (UTC)
    pub today_cost: f64,
    /// Cost accrued since the first of the month
    pub month_cost: f64,
    /// Tokens consumed in the month window
    pub total_tokens: u64,
    /// Average cost per request in the month window
    pub avg_cost_per_request: f64,
    /// Distinct models seen in the month window
    pub active_models: u64,
    /// Gap-filled 30-day cost series
    pub cost_over_time: Vec<DailyBucket>,
    /// Top models by cost
    pub top_models: Vec<ModelUsage>,
    /// Top agents by cost
    pub top_agents: Vec<AgentUsage>,
}

// ============================================================================
// Pure Aggregation
// ============================================================================

/// Compute window totals. Retrieval events carry no cost or tokens but
/// still count as requests.
#[must_use]
pub fn compute_cost_stats(events: &[Event]) -> CostStats {
    let total_cost: f64 = events.iter().map(Event::billed_cost).sum();
    let total_tokens: u64 = events.iter().map(Event::billed_tokens).sum();
    let total_requests = events.len() as u64;
    let avg = if total_requests > 0 {
        total_cost / total_requests as f64
    } else {
        0.0
    };

    CostStats {
        total_cost: round4(total_cost),
        total_tokens,
        total_requests,
        avg_cost_per_request: round6(avg),
        currency: "USD".to_string(),
    }
}

/// Group accumulator preserving first-encountered order, so that the
/// stable cost sort breaks ties by first appearance.
struct Grouped {
    keys: Vec<String>,
    index: HashMap<String, usize>,
    requests: Vec<u64>,
    tokens: Vec<u64>,
    cost: Vec<f64>,
}

impl Grouped {
    fn new() -> Self {
        Self {
            keys: Vec::new(),
            index: HashMap::new(),
            requests: Vec::new(),
            tokens: Vec::new(),
            cost: Vec::new(),
        }
    }

    fn add(&mut self, key: &str, event: &Event) {
        let i = match self.index.get(key).copied() {
            Some(i) => i,
            None => {
                let i = self.keys.len();
                self.keys.push(key.to_string());
                self.index.insert(key.to_string(), i);
                self.requests.push(0);
                self.tokens.push(0);
                self.cost.push(0.0);
                i
            }
        };
        self.requests[i] += 1;
        self.tokens[i] += event.billed_tokens();
        self.cost[i] += event.billed_cost();
    }

    /// Indices sorted by cost descending, truncated to `limit`.
    fn ranked(&self, limit: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.keys.len()).collect();
        order.sort_by(|&a, &b| {
            self.cost[b]
                .partial_cmp(&self.cost[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        order.truncate(limit);
        order
    }
}

/// Rank models by total cost. Events carrying no model (retrievals)
/// are excluded from the grouping.
#[must_use]
pub fn compute_model_stats(events: &[Event], limit: usize) -> Vec<ModelUsage> {
    let mut grouped = Grouped::new();
    for event in events {
        if let Some(model) = &event.model {
            grouped.add(model, event);
        }
    }

    grouped
        .ranked(limit)
        .into_iter()
        .map(|i| ModelUsage {
            model: grouped.keys[i].clone(),
            requests: grouped.requests[i],
            tokens: grouped.tokens[i],
            cost: round4(grouped.cost[i]),
        })
        .collect()
}

/// Rank agents by total cost. Events with no agent are excluded.
#[must_use]
pub fn compute_agent_stats(events: &[Event], limit: usize) -> Vec<AgentUsage> {
    let mut grouped = Grouped::new();
    for event in events {
        if let Some(agent) = &event.agent {
            grouped.add(agent, event);
        }
    }

    grouped
        .ranked(limit)
        .into_iter()
        .map(|i| AgentUsage {
            agent: grouped.keys[i].clone(),
            requests: grouped.requests[i],
            tokens: grouped.tokens[i],
            cost: round4(grouped.cost[i]),
        })
        .collect()
}

/// Bucket events by calendar date (UTC) over exactly `window_days`
/// consecutive dates ending at `today`.
///
/// Dates without events produce a zero bucket: downstream charting and
/// forecasting assume a dense series.
#[must_use]
pub fn compute_daily_series(events: &[Event], window_days: u32, today: NaiveDate) -> Vec<DailyBucket> {
    if window_days == 0 {
        return Vec::new();
    }

    let mut by_date: HashMap<NaiveDate, (f64, u64, u64)> = HashMap::new();
    for event in events {
        let entry = by_date
            .entry(event.timestamp.date_naive())
            .or_insert((0.0, 0, 0));
        entry.0 += event.billed_cost();
        entry.1 += event.billed_tokens();
        entry.2 += 1;
    }

    let start = today - Days::new(u64::from(window_days) - 1);
    (0..window_days)
        .map(|offset| {
            let date = start + Days::new(u64::from(offset));
            let (cost, tokens, count) = by_date.get(&date).copied().unwrap_or((0.0, 0, 0));
            DailyBucket {
                date,
                total_cost: round4(cost),
                total_tokens: tokens,
                request_count: count,
            }
        })
        .collect()
}

// ============================================================================
// Engine
// ============================================================================

/// Analytics front-end over an event store
#[derive(Clone)]
pub struct AnalyticsEngine {
    store: Arc<dyn EventStore>,
}

impl AnalyticsEngine {
    /// Create an engine over a store.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    fn filter(
        project: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> EventFilter {
        let mut filter = EventFilter::new();
        if let Some(project) = project {
            filter = filter.with_project(project);
        }
        if let Some(start) = start {
            filter = filter.since(start);
        }
        if let Some(end) = end {
            filter = filter.until(end);
        }
        filter
    }

    /// Window totals.
    pub async fn cost_stats(
        &self,
        project: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<CostStats> {
        let events = self.store.query(&Self::filter(project, start, end)).await?;
        Ok(compute_cost_stats(&events))
    }

    /// Top models by cost in a window.
    pub async fn model_stats(
        &self,
        project: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<ModelUsage>> {
        let events = self.store.query(&Self::filter(project, start, end)).await?;
        Ok(compute_model_stats(&events, limit))
    }

    /// Top agents by cost in a window.
    pub async fn agent_stats(
        &self,
        project: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<AgentUsage>> {
        let events = self.store.query(&Self::filter(project, start, end)).await?;
        Ok(compute_agent_stats(&events, limit))
    }

    /// Gap-filled daily cost series over `window_days` ending today.
    pub async fn daily_series(
        &self,
        project: Option<&str>,
        window_days: u32,
    ) -> Result<Vec<DailyBucket>> {
        let today = Utc::now().date_naive();
        if window_days == 0 {
            return Ok(Vec::new());
        }

        let start = (today - Days::new(u64::from(window_days) - 1))
            .and_time(NaiveTime::MIN)
            .and_utc();
        let events = self
            .store
            .query(&Self::filter(project, Some(start), None).ascending())
            .await?;
        Ok(compute_daily_series(&events, window_days, today))
    }

    /// Dashboard snapshot: today / month-to-date totals, the 30-day
    /// series and the all-time top models and agents.
    pub async fn overview(&self, project: Option<&str>) -> Result<Overview> {
        let now = Utc::now();
        let today = now.date_naive();
        let today_start = today.and_time(NaiveTime::MIN).and_utc();
        let month_start = today
            .with_day(1)
            .expect("first of month is a valid date")
            .and_time(NaiveTime::MIN)
            .and_utc();

        let month_events = self
            .store
            .query(&Self::filter(project, Some(month_start), None))
            .await?;

        let month_cost: f64 = month_events.iter().map(Event::billed_cost).sum();
        let today_cost: f64 = month_events
            .iter()
            .filter(|e| e.timestamp >= today_start)
            .map(Event::billed_cost)
            .sum();
        let total_tokens: u64 = month_events.iter().map(Event::billed_tokens).sum();
        let avg = if month_events.is_empty() {
            0.0
        } else {
            month_cost / month_events.len() as f64
        };
        let active_models = month_events
            .iter()
            .filter_map(|e| e.model.as_deref())
            .collect::<HashSet<_>>()
            .len() as u64;

        let cost_over_time = self.daily_series(project, DEFAULT_WINDOW_DAYS).await?;
        let top_models = self
            .model_stats(project, None, None, OVERVIEW_TOP_LIMIT)
            .await?;
        let top_agents = self
            .agent_stats(project, None, None, OVERVIEW_TOP_LIMIT)
            .await?;

        Ok(Overview {
            today_cost: round4(today_cost),
            month_cost: round4(month_cost),
            total_tokens,
            avg_cost_per_request: round6(avg),
            active_models,
            cost_over_time,
            top_models,
            top_agents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, MockEventStore};
    use chrono::Duration;
    use tokenlens_sdk::{CostBreakdown, UsageRecord};

    fn event(model: &str, cost: f64, tokens: u64) -> Event {
        Event::llm_call(
            &UsageRecord::new(model, tokens / 2, tokens - tokens / 2),
            &CostBreakdown::from_components(cost / 2.0, cost / 2.0),
            10,
        )
    }

    fn agent_event(model: &str, agent: &str, cost: f64) -> Event {
        let mut e = event(model, cost, 100);
        e.agent = Some(agent.to_string());
        e
    }

    #[test]
    fn test_cost_stats_totals() {
        let events = vec![event("gpt-4o", 1.0, 100), event("gpt-4o", 2.0, 200)];
        let stats = compute_cost_stats(&events);
        assert_eq!(stats.total_cost, 3.0);
        assert_eq!(stats.total_tokens, 300);
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.avg_cost_per_request, 1.5);
        assert_eq!(stats.currency, "USD");
    }

    #[test]
    fn test_cost_stats_empty_window_is_zeroed() {
        let stats = compute_cost_stats(&[]);
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.avg_cost_per_request, 0.0);
    }

    #[test]
    fn test_retrieval_counts_as_request_with_zero_cost() {
        let events = vec![event("gpt-4o", 1.0, 100), Event::retrieval(6, 1800, None)];
        let stats = compute_cost_stats(&events);
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.total_cost, 1.0);
        assert_eq!(stats.avg_cost_per_request, 0.5);
    }

    #[test]
    fn test_model_stats_ranked_by_cost_desc() {
        let events = vec![
            event("gpt-4o-mini", 0.5, 100),
            event("gpt-4", 5.0, 100),
            event("gpt-4o-mini", 0.5, 100),
        ];
        let stats = compute_model_stats(&events, 10);
        assert_eq!(stats[0].model, "gpt-4");
        assert_eq!(stats[1].model, "gpt-4o-mini");
        assert_eq!(stats[1].requests, 2);
        assert_eq!(stats[1].cost, 1.0);
    }

    #[test]
    fn test_model_stats_ties_keep_first_encountered_order() {
        let events = vec![
            event("model-b", 1.0, 100),
            event("model-a", 1.0, 100),
            event("model-c", 1.0, 100),
        ];
        let stats = compute_model_stats(&events, 10);
        let names: Vec<&str> = stats.iter().map(|s| s.model.as_str()).collect();
        assert_eq!(names, ["model-b", "model-a", "model-c"]);
    }

    #[test]
    fn test_model_stats_truncates_to_limit() {
        let events = vec![
            event("m1", 3.0, 1),
            event("m2", 2.0, 1),
            event("m3", 1.0, 1),
        ];
        let stats = compute_model_stats(&events, 2);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].model, "m1");
    }

    #[test]
    fn test_agent_stats_excludes_agentless_events() {
        let events = vec![
            agent_event("gpt-4o", "planner", 2.0),
            event("gpt-4o", 9.0, 100),
            agent_event("gpt-4o", "executor", 3.0),
        ];
        let stats = compute_agent_stats(&events, 10);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].agent, "executor");
        assert_eq!(stats[1].agent, "planner");
    }

    #[test]
    fn test_daily_series_is_dense_and_gap_filled() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let two_days_ago = today - Days::new(2);
        let events = vec![event("gpt-4o", 2.0, 100).with_timestamp(
            two_days_ago
                .and_time(NaiveTime::MIN)
                .and_utc()
                + Duration::hours(12),
        )];

        let series = compute_daily_series(&events, 7, today);
        assert_eq!(series.len(), 7);
        // Strictly consecutive dates.
        for pair in series.windows(2) {
            assert_eq!(pair[1].date, pair[0].date + Days::new(1));
        }
        assert_eq!(series[6].date, today);
        assert_eq!(series[4].total_cost, 2.0);
        assert_eq!(series[4].request_count, 1);
        // Every other day is an explicit zero bucket.
        assert_eq!(series.iter().filter(|b| b.request_count == 0).count(), 6);
    }

    #[test]
    fn test_daily_series_ignores_events_outside_window() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
        let old = today - Days::new(40);
        let events = vec![event("gpt-4o", 2.0, 100)
            .with_timestamp(old.and_time(NaiveTime::MIN).and_utc())];
        let series = compute_daily_series(&events, 30, today);
        assert_eq!(series.len(), 30);
        assert!(series.iter().all(|b| b.total_cost == 0.0));
    }

    #[tokio::test]
    async fn test_engine_overview_over_memory_store() {
        let store = Arc::new(MemoryStore::new());
        store.insert(agent_event("gpt-4o", "planner", 2.0)).await.unwrap();
        store.insert(agent_event("gpt-4", "executor", 5.0)).await.unwrap();

        let engine = AnalyticsEngine::new(store);
        let overview = engine.overview(None).await.unwrap();

        assert_eq!(overview.month_cost, 7.0);
        assert_eq!(overview.today_cost, 7.0);
        assert_eq!(overview.active_models, 2);
        assert_eq!(overview.cost_over_time.len(), 30);
        assert_eq!(overview.top_models[0].model, "gpt-4");
        assert_eq!(overview.top_agents[0].agent, "executor");
    }

    #[tokio::test]
    async fn test_engine_applies_project_filter() {
        let store = Arc::new(MemoryStore::new());
        let mut a = event("gpt-4o", 1.0, 100);
        a.project = Some("alpha".to_string());
        let mut b = event("gpt-4o", 2.0, 100);
        b.project = Some("beta".to_string());
        store.insert(a).await.unwrap();
        store.insert(b).await.unwrap();

        let engine = AnalyticsEngine::new(store);
        let stats = engine.cost_stats(Some("alpha"), None, None).await.unwrap();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.total_cost, 1.0);
    }

    #[tokio::test]
    async fn test_store_errors_surface_to_caller() {
        let mut mock = MockEventStore::new();
        mock.expect_query()
            .returning(|_| Err(crate::error::Error::Store("connection refused".to_string())));

        let engine = AnalyticsEngine::new(Arc::new(mock));
        let result = engine.cost_stats(None, None, None).await;
        assert!(result.is_err());
    }
}
