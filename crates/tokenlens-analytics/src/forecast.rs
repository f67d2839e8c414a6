//! Forecasting engine - trend and 30-day cost projection
//!
//! Works entirely off the gap-filled daily series: a simple moving
//! comparison of the earliest and most recent weeks classifies the
//! trend, the coefficient of variation grades confidence, and the
//! projection is the daily mean scaled to a month with a flat ±10%
//! trend buffer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analytics::{AnalyticsEngine, DailyBucket, DEFAULT_WINDOW_DAYS};
use crate::error::Result;
use crate::store::EventStore;

/// Days compared at each end of the series for trend classification.
const TREND_SPAN_DAYS: usize = 7;

/// Recent week must exceed the earliest week by this factor to count
/// as increasing (and fall below its inverse margin for decreasing).
const TREND_UP_FACTOR: f64 = 1.10;
const TREND_DOWN_FACTOR: f64 = 0.90;

/// Coefficient-of-variation cutoffs for confidence grading.
const CV_HIGH: f64 = 0.2;
const CV_MEDIUM: f64 = 0.5;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Direction of the cost trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Recent week runs more than 10% above the earliest week
    Increasing,
    /// Recent week runs more than 10% below the earliest week
    Decreasing,
    /// Neither, or not enough history
    Stable,
}

/// How much the projection can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// cv < 0.2
    High,
    /// cv < 0.5
    Medium,
    /// Anything noisier, or not enough history
    Low,
}

/// Cost forecast derived from the trailing daily series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// Projected cost for the next 30 days (2 decimal digits)
    pub monthly_projection: f64,
    /// Mean daily cost over the window, zero-days included (4 digits)
    pub daily_average: f64,
    /// Trend direction
    pub trend: Trend,
    /// Confidence grade
    pub confidence: Confidence,
}

impl Forecast {
    fn empty() -> Self {
        Self {
            monthly_projection: 0.0,
            daily_average: 0.0,
            trend: Trend::Stable,
            confidence: Confidence::Low,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; 0 for fewer than two values.
fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Derive a forecast from a dense daily series.
///
/// Trend and confidence need at least seven days bearing data; with
/// less history the trend is forced to stable and confidence to low.
/// An entirely empty window yields the zero forecast.
#[must_use]
pub fn compute_forecast(series: &[DailyBucket]) -> Forecast {
    let data_days = series.iter().filter(|b| b.request_count > 0).count();
    if data_days == 0 {
        return Forecast::empty();
    }

    let values: Vec<f64> = series.iter().map(|b| b.total_cost).collect();
    let daily_average = mean(&values);

    let (trend, confidence) = if data_days >= TREND_SPAN_DAYS && values.len() >= TREND_SPAN_DAYS {
        let recent = mean(&values[values.len() - TREND_SPAN_DAYS..]);
        let older = mean(&values[..TREND_SPAN_DAYS]);

        let trend = if recent > older * TREND_UP_FACTOR {
            Trend::Increasing
        } else if recent < older * TREND_DOWN_FACTOR {
            Trend::Decreasing
        } else {
            Trend::Stable
        };

        let cv = if daily_average > 0.0 {
            sample_stdev(&values) / daily_average
        } else {
            0.0
        };
        let confidence = if cv < CV_HIGH {
            Confidence::High
        } else if cv < CV_MEDIUM {
            Confidence::Medium
        } else {
            Confidence::Low
        };

        (trend, confidence)
    } else {
        (Trend::Stable, Confidence::Low)
    };

    let buffer = match trend {
        Trend::Increasing => TREND_UP_FACTOR,
        Trend::Decreasing => TREND_DOWN_FACTOR,
        Trend::Stable => 1.0,
    };

    Forecast {
        monthly_projection: round2(daily_average * 30.0 * buffer),
        daily_average: round4(daily_average),
        trend,
        confidence,
    }
}

/// Forecast front-end over an event store
#[derive(Clone)]
pub struct ForecastEngine {
    analytics: AnalyticsEngine,
}

impl ForecastEngine {
    /// Create an engine over a store.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            analytics: AnalyticsEngine::new(store),
        }
    }

    /// Forecast from the trailing 30-day window.
    pub async fn forecast(&self, project: Option<&str>) -> Result<Forecast> {
        let series = self
            .analytics
            .daily_series(project, DEFAULT_WINDOW_DAYS)
            .await?;
        Ok(compute_forecast(&series))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};

    fn series(costs: &[f64]) -> Vec<DailyBucket> {
        let start = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        costs
            .iter()
            .enumerate()
            .map(|(i, &cost)| DailyBucket {
                date: start + Days::new(i as u64),
                total_cost: cost,
                total_tokens: if cost > 0.0 { 1000 } else { 0 },
                request_count: u64::from(cost > 0.0),
            })
            .collect()
    }

    #[test]
    fn test_empty_window_yields_zero_forecast() {
        assert_eq!(compute_forecast(&[]), Forecast::empty());
        assert_eq!(compute_forecast(&series(&[0.0; 30])), Forecast::empty());
    }

    #[test]
    fn test_increasing_trend_scenario() {
        // 23 days at 10 followed by 7 days at 15: recent mean 15 vs
        // older mean 10 -> increasing, projection = mean * 30 * 1.1.
        let mut costs = vec![10.0; 23];
        costs.extend(vec![15.0; 7]);
        let forecast = compute_forecast(&series(&costs));

        assert_eq!(forecast.trend, Trend::Increasing);
        let mean_all = (23.0 * 10.0 + 7.0 * 15.0) / 30.0;
        assert_eq!(forecast.monthly_projection, round2(mean_all * 30.0 * 1.1));
        assert_eq!(forecast.daily_average, round4(mean_all));
        assert_eq!(forecast.confidence, Confidence::High);
    }

    #[test]
    fn test_decreasing_trend_gets_discount_buffer() {
        let mut costs = vec![20.0; 7];
        costs.extend(vec![10.0; 23]);
        let forecast = compute_forecast(&series(&costs));

        assert_eq!(forecast.trend, Trend::Decreasing);
        let mean_all = (7.0 * 20.0 + 23.0 * 10.0) / 30.0;
        assert_eq!(forecast.monthly_projection, round2(mean_all * 30.0 * 0.9));
    }

    #[test]
    fn test_flat_series_is_stable_and_high_confidence() {
        let forecast = compute_forecast(&series(&[5.0; 30]));
        assert_eq!(forecast.trend, Trend::Stable);
        assert_eq!(forecast.confidence, Confidence::High);
        assert_eq!(forecast.monthly_projection, 150.0);
        assert_eq!(forecast.daily_average, 5.0);
    }

    #[test]
    fn test_sparse_history_forces_stable_low() {
        // Only 5 of 30 days bear data.
        let mut costs = vec![0.0; 25];
        costs.extend(vec![100.0, 200.0, 50.0, 300.0, 80.0]);
        let forecast = compute_forecast(&series(&costs));

        assert_eq!(forecast.trend, Trend::Stable);
        assert_eq!(forecast.confidence, Confidence::Low);
        assert!(forecast.daily_average > 0.0);
    }

    #[test]
    fn test_noisy_series_grades_low_confidence() {
        let mut costs = Vec::new();
        for i in 0..30 {
            costs.push(if i % 2 == 0 { 1.0 } else { 40.0 });
        }
        let forecast = compute_forecast(&series(&costs));
        assert_eq!(forecast.confidence, Confidence::Low);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_value(Trend::Increasing).unwrap(),
            serde_json::json!("increasing")
        );
        assert_eq!(
            serde_json::to_value(Confidence::Medium).unwrap(),
            serde_json::json!("medium")
        );
    }
}
