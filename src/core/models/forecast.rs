use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::models::analysis::{Direction, HistoricalAnalysis};
use crate::core::models::serialize_month;

/// One forecast period with its point estimate. Periods are emitted as
/// `YYYY-MM` strings, one per calendar month after the history ends.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastPoint {
    #[serde(serialize_with = "serialize_month")]
    pub period: NaiveDate,
    pub forecast: f64,
}

/// Lower/upper bound of a confidence band for one period.
#[derive(Debug, Clone, Serialize)]
pub struct IntervalPoint {
    #[serde(serialize_with = "serialize_month")]
    pub period: NaiveDate,
    pub lower: f64,
    pub upper: f64,
}

/// Uncertainty summary for one confidence level.
#[derive(Debug, Clone, Serialize)]
pub struct UncertaintyMetrics {
    pub average_range: f64,
    pub range_trend: Direction,
    pub relative_uncertainty: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastMetrics {
    pub total_forecast: f64,
    pub average_monthly_forecast: f64,
    pub forecast_trend: Direction,
    pub forecast_growth: f64,
    /// Keyed by confidence level rendered as a string ("0.95").
    pub uncertainty: BTreeMap<String, UncertaintyMetrics>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
    Low,
}

/// A qualitative finding derived from the analysis and forecast.
#[derive(Debug, Clone, Serialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    pub severity: Severity,
    pub description: String,
    pub details: serde_json::Value,
}

/// An actionable suggestion paired with concrete follow-up steps.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: String,
    pub priority: Severity,
    pub title: String,
    pub description: String,
    pub actions: Vec<String>,
}

/// Complete output of one forecast run.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub historical_analysis: HistoricalAnalysis,
    pub forecasts: Vec<ForecastPoint>,
    /// Keyed by confidence level rendered as a string ("0.95"), each
    /// band aligned 1:1 with `forecasts`.
    pub confidence_intervals: BTreeMap<String, Vec<IntervalPoint>>,
    pub metrics: ForecastMetrics,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
}

/// Condensed view of a report, used as the text renderer's header block.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastSummary {
    pub historical_total: f64,
    pub historical_average: f64,
    pub historical_trend: Direction,
    pub cost_variability: f64,
    pub total_forecast: f64,
    pub average_monthly_forecast: f64,
    pub forecast_trend: Direction,
    pub forecast_growth: f64,
    pub high_severity_insights: usize,
    pub high_priority_recommendations: usize,
    pub uncertainty_assessment: UncertaintyAssessment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UncertaintyAssessment {
    High,
    Medium,
    Low,
}
