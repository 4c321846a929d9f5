use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::models::serialize_month_opt;

/// Direction of a trend or growth sequence. `Stable` is the sentinel for
/// sequences too short or too degenerate to classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Increasing,
    Decreasing,
    Stable,
}

/// Label for how predictable month-over-month growth has been.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilityLabel {
    High,
    Medium,
    Low,
    Unknown,
}

/// Month-over-month growth statistics.
#[derive(Debug, Clone, Serialize)]
pub struct GrowthAnalysis {
    pub average: f64,
    pub std_dev: f64,
    pub last: f64,
    pub direction: Direction,
}

/// Seasonal pattern over a repeating calendar cycle (months 1–12 or
/// quarters 1–4). `index` holds each period's relative deviation from
/// the overall mean and drives multiplicative forecast adjustment.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodPattern {
    pub highest_period: u32,
    pub lowest_period: u32,
    pub variation: f64,
    pub index: BTreeMap<u32, f64>,
}

/// Weekday versus weekend spending, computed from the raw daily
/// observation stream rather than the monthly series.
#[derive(Debug, Clone, Serialize)]
pub struct WeekdayPattern {
    pub weekday_avg: f64,
    pub weekend_avg: f64,
    pub variation: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeasonalityAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly: Option<PeriodPattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarterly: Option<PeriodPattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekday: Option<WeekdayPattern>,
}

/// One resource type's share of total spend, in percent of the grand
/// total. Ordered by share, largest first.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceShare {
    pub resource_type: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostDrivers {
    pub top_resources: Vec<ResourceShare>,
    /// Herfindahl index over all resource types: sum of squared
    /// fractional shares, in [0, 1].
    pub concentration_index: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendStability {
    Stable,
    Volatile,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendAnalysis {
    pub slope: f64,
    pub direction: Direction,
    /// |slope| relative to the mean monthly cost.
    pub strength: f64,
    /// Coefficient of variation of the monthly series.
    pub volatility: f64,
    /// Number of months deviating more than two rolling standard
    /// deviations from the prior three-month rolling mean.
    pub change_points: usize,
    #[serde(serialize_with = "serialize_month_opt")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_change: Option<NaiveDate>,
    pub stability: TrendStability,
    pub growth_stability: StabilityLabel,
}

/// Full descriptive picture of the historical window.
#[derive(Debug, Clone, Serialize)]
pub struct HistoricalAnalysis {
    pub total_cost: f64,
    pub average_monthly_cost: f64,
    pub cost_std_dev: f64,
    pub min_monthly_cost: f64,
    pub max_monthly_cost: f64,
    pub growth: GrowthAnalysis,
    pub seasonality: SeasonalityAnalysis,
    pub cost_drivers: CostDrivers,
    pub trend: TrendAnalysis,
}
