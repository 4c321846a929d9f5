use chrono::Datelike;
use std::collections::BTreeMap;

use crate::core::diag::Diagnostics;
use crate::core::models::analysis::{
    CostDrivers, Direction, GrowthAnalysis, HistoricalAnalysis, PeriodPattern, ResourceShare,
    SeasonalityAnalysis, StabilityLabel, TrendAnalysis, TrendStability, WeekdayPattern,
};
use crate::core::models::observation::Observation;
use crate::core::series::CostSeries;
use crate::core::stats::{mean, ols_line, quarter_of, sample_std};

/// How many top cost drivers to report.
const TOP_DRIVERS: usize = 5;

/// Rolling window width for change-point detection.
const CHANGE_WINDOW: usize = 3;

/// Compute the full descriptive picture of a historical window.
///
/// Pure over its inputs: the monthly series drives every statistic except
/// weekday seasonality and cost drivers, which need the pre-aggregation
/// observation stream. Degenerate statistics resolve to sentinels and a
/// diagnostics note, never an error.
pub fn analyze(
    series: &CostSeries,
    observations: &[Observation],
    diag: &mut Diagnostics,
) -> HistoricalAnalysis {
    let costs = series.costs();

    // Restrict raw observations to the months the series covers.
    let in_window: Vec<&Observation> = match series.date_window() {
        Some((start, end)) => observations
            .iter()
            .filter(|o| o.date >= start && o.date < end)
            .collect(),
        None => Vec::new(),
    };

    let growth = analyze_growth(&costs, diag);
    let growth_std = growth.std_dev;
    let has_growth = costs.len() >= 2;

    let min_cost = if costs.is_empty() {
        0.0
    } else {
        costs.iter().copied().fold(f64::INFINITY, f64::min)
    };

    HistoricalAnalysis {
        total_cost: costs.iter().sum(),
        average_monthly_cost: mean(&costs),
        cost_std_dev: sample_std(&costs),
        min_monthly_cost: min_cost,
        max_monthly_cost: costs.iter().copied().fold(0.0, f64::max),
        growth,
        seasonality: SeasonalityAnalysis {
            monthly: monthly_pattern(series, diag),
            quarterly: quarterly_pattern(series, diag),
            weekday: weekday_pattern(&in_window, diag),
        },
        cost_drivers: analyze_cost_drivers(&in_window, diag),
        trend: analyze_trend(series, growth_std, has_growth, diag),
    }
}

// ── Growth ────────────────────────────────────────────────────────────

/// Month-over-month growth rates. A zero previous month yields a 0.0
/// rate rather than a division error.
fn growth_rates(costs: &[f64], diag: &mut Diagnostics) -> Vec<f64> {
    let mut rates = Vec::new();
    for pair in costs.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        if prev == 0.0 {
            diag.note("growth rate defaulted to 0 (previous month total is 0)");
            rates.push(0.0);
        } else {
            rates.push((cur - prev) / prev);
        }
    }
    rates
}

fn analyze_growth(costs: &[f64], diag: &mut Diagnostics) -> GrowthAnalysis {
    let rates = growth_rates(costs, diag);
    if rates.is_empty() {
        diag.note("growth statistics unavailable (fewer than two months)");
        return GrowthAnalysis {
            average: 0.0,
            std_dev: 0.0,
            last: 0.0,
            direction: Direction::Stable,
        };
    }
    let average = mean(&rates);
    GrowthAnalysis {
        average,
        std_dev: sample_std(&rates),
        last: *rates.last().unwrap_or(&0.0),
        direction: if average > 0.0 {
            Direction::Increasing
        } else {
            Direction::Decreasing
        },
    }
}

// ── Seasonality ───────────────────────────────────────────────────────

/// Build a seasonal pattern from (period index, value) pairs: per-index
/// average, argmax/argmin, variation, and the relative index map used
/// for forecast adjustment.
fn cycle_pattern(
    groups: &BTreeMap<u32, Vec<f64>>,
    label: &str,
    diag: &mut Diagnostics,
) -> Option<PeriodPattern> {
    if groups.is_empty() {
        return None;
    }

    let averages: BTreeMap<u32, f64> = groups
        .iter()
        .map(|(period, values)| (*period, mean(values)))
        .collect();

    // First occurrence wins on ties, scanning periods in ascending order.
    let mut highest_period = 0;
    let mut lowest_period = 0;
    let mut highest = f64::NEG_INFINITY;
    let mut lowest = f64::INFINITY;
    for (period, avg) in &averages {
        if *avg > highest {
            highest = *avg;
            highest_period = *period;
        }
        if *avg < lowest {
            lowest = *avg;
            lowest_period = *period;
        }
    }

    let values: Vec<f64> = averages.values().copied().collect();
    let overall = mean(&values);

    let (variation, index) = if overall == 0.0 {
        diag.note(format!(
            "{label} seasonality variation defaulted to 0 (mean cost is 0)"
        ));
        (0.0, BTreeMap::new())
    } else {
        let index: BTreeMap<u32, f64> = averages
            .iter()
            .map(|(p, avg)| (*p, (avg - overall) / overall))
            .collect();
        (sample_std(&values) / overall, index)
    };

    Some(PeriodPattern {
        highest_period,
        lowest_period,
        variation,
        index,
    })
}

fn monthly_pattern(series: &CostSeries, diag: &mut Diagnostics) -> Option<PeriodPattern> {
    let mut groups: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for point in series.points() {
        groups
            .entry(point.period.month())
            .or_default()
            .push(point.total_cost);
    }
    cycle_pattern(&groups, "monthly", diag)
}

fn quarterly_pattern(series: &CostSeries, diag: &mut Diagnostics) -> Option<PeriodPattern> {
    // Resample to calendar-quarter sums first, then group by quarter index.
    let mut quarter_sums: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for point in series.points() {
        let key = (point.period.year(), quarter_of(point.period.month()));
        *quarter_sums.entry(key).or_insert(0.0) += point.total_cost;
    }
    let mut groups: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for ((_, quarter), total) in quarter_sums {
        groups.entry(quarter).or_default().push(total);
    }
    cycle_pattern(&groups, "quarterly", diag)
}

fn weekday_pattern(observations: &[&Observation], diag: &mut Diagnostics) -> Option<WeekdayPattern> {
    if observations.is_empty() {
        diag.note("weekday seasonality unavailable (no daily observations in window)");
        return None;
    }

    // Mean observation cost per weekday, Monday = 0.
    let mut sums = [0.0f64; 7];
    let mut counts = [0usize; 7];
    for obs in observations {
        let day = obs.date.weekday().num_days_from_monday() as usize;
        sums[day] += obs.cost;
        counts[day] += 1;
    }

    let day_means: Vec<(usize, f64)> = (0..7)
        .filter(|&d| counts[d] > 0)
        .map(|d| (d, sums[d] / counts[d] as f64))
        .collect();

    let weekday: Vec<f64> = day_means
        .iter()
        .filter(|(d, _)| *d < 5)
        .map(|(_, m)| *m)
        .collect();
    let weekend: Vec<f64> = day_means
        .iter()
        .filter(|(d, _)| *d >= 5)
        .map(|(_, m)| *m)
        .collect();

    let all_means: Vec<f64> = day_means.iter().map(|(_, m)| *m).collect();
    let overall = mean(&all_means);
    let variation = if overall == 0.0 {
        diag.note("weekday seasonality variation defaulted to 0 (mean cost is 0)");
        0.0
    } else {
        sample_std(&all_means) / overall
    };

    Some(WeekdayPattern {
        weekday_avg: mean(&weekday),
        weekend_avg: mean(&weekend),
        variation,
    })
}

// ── Cost drivers ──────────────────────────────────────────────────────

fn analyze_cost_drivers(observations: &[&Observation], diag: &mut Diagnostics) -> CostDrivers {
    let mut by_type: BTreeMap<&str, f64> = BTreeMap::new();
    for obs in observations {
        *by_type.entry(obs.resource_type.as_str()).or_insert(0.0) += obs.cost;
    }

    let grand_total: f64 = by_type.values().sum();
    if grand_total == 0.0 {
        diag.note("cost drivers unavailable (total cost in window is 0)");
        return CostDrivers {
            top_resources: Vec::new(),
            concentration_index: 0.0,
        };
    }

    // Herfindahl index over ALL types, not just the reported top slice.
    let concentration_index = by_type
        .values()
        .map(|cost| (cost / grand_total).powi(2))
        .sum();

    let mut shares: Vec<ResourceShare> = by_type
        .into_iter()
        .map(|(resource_type, cost)| ResourceShare {
            resource_type: resource_type.to_string(),
            percentage: cost / grand_total * 100.0,
        })
        .collect();
    shares.sort_by(|a, b| {
        b.percentage
            .partial_cmp(&a.percentage)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.resource_type.cmp(&b.resource_type))
    });
    shares.truncate(TOP_DRIVERS);

    CostDrivers {
        top_resources: shares,
        concentration_index,
    }
}

// ── Trend ─────────────────────────────────────────────────────────────

fn analyze_trend(
    series: &CostSeries,
    growth_std: f64,
    has_growth: bool,
    diag: &mut Diagnostics,
) -> TrendAnalysis {
    let costs = series.costs();
    let (slope, _) = ols_line(&costs);
    let mean_cost = mean(&costs);

    let (strength, volatility) = if mean_cost == 0.0 {
        diag.note("trend strength and volatility defaulted to 0 (mean cost is 0)");
        (0.0, 0.0)
    } else {
        (slope.abs() / mean_cost, sample_std(&costs) / mean_cost)
    };

    let direction = if slope > 0.0 {
        Direction::Increasing
    } else if slope < 0.0 {
        Direction::Decreasing
    } else {
        Direction::Stable
    };

    // A month is a change point when it deviates from the prior rolling
    // mean by more than two rolling standard deviations.
    let mut change_indices = Vec::new();
    for i in CHANGE_WINDOW..costs.len() {
        let window = &costs[i - CHANGE_WINDOW..i];
        let rolling_mean = mean(window);
        let rolling_std = sample_std(window);
        if (costs[i] - rolling_mean).abs() > 2.0 * rolling_std {
            change_indices.push(i);
        }
    }
    let last_change = change_indices
        .last()
        .map(|&i| series.points()[i].period);

    let growth_stability = if !has_growth {
        StabilityLabel::Unknown
    } else if growth_std < 0.1 {
        StabilityLabel::High
    } else if growth_std < 0.2 {
        StabilityLabel::Medium
    } else {
        StabilityLabel::Low
    };

    TrendAnalysis {
        slope,
        direction,
        strength,
        volatility,
        change_points: change_indices.len(),
        last_change,
        stability: if change_indices.len() <= 2 {
            TrendStability::Stable
        } else {
            TrendStability::Volatile
        },
        growth_stability,
    }
}
