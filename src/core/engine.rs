use chrono::Datelike;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::analysis::analyze;
use crate::core::diag::Diagnostics;
use crate::core::error::ForecastError;
use crate::core::features::{build_examples, feature_vector, WINDOW};
use crate::core::insights::{generate_insights, generate_recommendations};
use crate::core::model::{BaggedTreeModel, Regressor};
use crate::core::models::analysis::{Direction, HistoricalAnalysis};
use crate::core::models::forecast::{
    ForecastMetrics, ForecastPoint, ForecastReport, ForecastSummary, IntervalPoint,
    UncertaintyAssessment, UncertaintyMetrics,
};
use crate::core::models::observation::Observation;
use crate::core::series::{build_series, next_month, CostSeries};
use crate::core::stats::{mean, percentile, quarter_of};

pub const DEFAULT_LOOKBACK_MONTHS: usize = 12;
pub const DEFAULT_HORIZON: usize = 12;
pub const DEFAULT_SAMPLE_COUNT: usize = 100;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_CONFIDENCE_LEVELS: [f64; 3] = [0.95, 0.80, 0.50];

/// Cooperative cancellation handle checked before the model fit and at
/// every period of the forecast loop.
pub type CancelFlag = Arc<AtomicBool>;

#[derive(Debug, Clone)]
pub struct ForecastOptions {
    pub lookback_months: usize,
    pub horizon: usize,
    pub confidence_levels: Vec<f64>,
    pub sample_count: usize,
    pub seed: u64,
    pub cancel: Option<CancelFlag>,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            lookback_months: DEFAULT_LOOKBACK_MONTHS,
            horizon: DEFAULT_HORIZON,
            confidence_levels: DEFAULT_CONFIDENCE_LEVELS.to_vec(),
            sample_count: DEFAULT_SAMPLE_COUNT,
            seed: DEFAULT_SEED,
            cancel: None,
        }
    }
}

impl ForecastOptions {
    pub fn validate(&self) -> Result<(), ForecastError> {
        if self.horizon == 0 {
            return Err(ForecastError::InvalidInput(
                "forecast horizon must be at least 1 month".to_string(),
            ));
        }
        if self.sample_count == 0 {
            return Err(ForecastError::InvalidInput(
                "sample count must be at least 1".to_string(),
            ));
        }
        if self.confidence_levels.is_empty() {
            return Err(ForecastError::InvalidInput(
                "at least one confidence level is required".to_string(),
            ));
        }
        for level in &self.confidence_levels {
            if !(*level > 0.0 && *level <= 1.0) {
                return Err(ForecastError::InvalidInput(format!(
                    "confidence level {level} is outside (0, 1]"
                )));
            }
        }
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), ForecastError> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(ForecastError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Render a confidence level as the report's map key ("0.95").
pub fn level_key(level: f64) -> String {
    level.to_string()
}

/// Run the complete pipeline: aggregate, analyze, fit, forecast,
/// derive insights. Either a full report is returned or the run fails —
/// no partial results.
pub fn generate_forecast(
    observations: &[Observation],
    opts: &ForecastOptions,
    diag: &mut Diagnostics,
) -> Result<ForecastReport, ForecastError> {
    opts.validate()?;
    opts.check_cancelled()?;

    let series = build_series(observations, opts.lookback_months)?;
    let analysis = analyze(&series, observations, diag);
    let examples = build_examples(&series)?;

    let mut model = BaggedTreeModel::new(opts.seed);
    opts.check_cancelled()?;
    model.fit(&examples)?;

    let (mut points, mut bands, levels) = run_forecast_loop(&series, &model, opts)?;
    apply_seasonal_adjustment(&mut points, &mut bands, &analysis, diag);
    let metrics = compute_metrics(&points, &levels, &bands, diag);

    let insights = generate_insights(&analysis, &metrics);
    let recommendations = generate_recommendations(&analysis, &metrics);

    let confidence_intervals = levels
        .iter()
        .zip(bands)
        .map(|(level, band)| (level_key(*level), band))
        .collect();

    Ok(ForecastReport {
        historical_analysis: analysis,
        forecasts: points,
        confidence_intervals,
        metrics,
        insights,
        recommendations,
    })
}

/// Iterative autoregressive loop: each period's point estimate is fed
/// back as the newest window slot for the next period, so early error
/// propagates forward by construction. The window is a fixed three-slot
/// array, never a growing buffer.
fn run_forecast_loop(
    series: &CostSeries,
    model: &impl Regressor,
    opts: &ForecastOptions,
) -> Result<(Vec<ForecastPoint>, Vec<Vec<IntervalPoint>>, Vec<f64>), ForecastError> {
    let costs = series.costs();
    let n = costs.len();
    let mut window = [costs[n - 3], costs[n - 2], costs[n - 1]];
    let mut period = series.last_period().ok_or_else(|| {
        ForecastError::InsufficientHistory {
            needed: WINDOW + 1,
            got: 0,
        }
    })?;

    // Highest level first so renderers can take the widest band.
    let mut levels = opts.confidence_levels.clone();
    levels.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    levels.dedup();

    let mut points: Vec<ForecastPoint> = Vec::with_capacity(opts.horizon);
    let mut bands: Vec<Vec<IntervalPoint>> = vec![Vec::with_capacity(opts.horizon); levels.len()];

    for _ in 0..opts.horizon {
        opts.check_cancelled()?;
        period = next_month(period);

        let features = feature_vector(&window, period);
        let samples = model.predict_ensemble(&features, opts.sample_count);
        if samples.is_empty() {
            return Err(ForecastError::ModelFit(
                "model produced no ensemble predictions".to_string(),
            ));
        }

        let point = mean(&samples);
        points.push(ForecastPoint {
            period,
            forecast: point,
        });

        for (band, level) in bands.iter_mut().zip(&levels) {
            let tail = (1.0 - level) / 2.0 * 100.0;
            // A skewed ensemble can put the sample mean outside a narrow
            // percentile band; widen to keep lower <= point <= upper.
            band.push(IntervalPoint {
                period,
                lower: percentile(&samples, tail).min(point),
                upper: percentile(&samples, 100.0 - tail).max(point),
            });
        }

        window = [window[1], window[2], point];
    }

    Ok((points, bands, levels))
}

/// Multiplicative seasonal correction: monthly first, then quarterly,
/// each scaling the point estimate and both band bounds by the same
/// factor so the band ordering survives. Skipped when the analysis
/// found no usable pattern.
fn apply_seasonal_adjustment(
    points: &mut [ForecastPoint],
    bands: &mut [Vec<IntervalPoint>],
    analysis: &HistoricalAnalysis,
    diag: &mut Diagnostics,
) {
    let monthly = analysis
        .seasonality
        .monthly
        .as_ref()
        .filter(|p| !p.index.is_empty());
    let quarterly = analysis
        .seasonality
        .quarterly
        .as_ref()
        .filter(|p| !p.index.is_empty());

    if monthly.is_none() && quarterly.is_none() {
        diag.note("seasonal adjustment skipped (no usable seasonal pattern)");
        return;
    }

    for (i, point) in points.iter_mut().enumerate() {
        let month = point.period.month();
        let mut factor = 1.0;
        if let Some(pattern) = monthly {
            if let Some(index) = pattern.index.get(&month) {
                factor *= 1.0 + index;
            }
        }
        if let Some(pattern) = quarterly {
            if let Some(index) = pattern.index.get(&quarter_of(month)) {
                factor *= 1.0 + index;
            }
        }

        point.forecast = (point.forecast * factor).max(0.0);
        for band in bands.iter_mut() {
            band[i].lower = (band[i].lower * factor).max(0.0);
            band[i].upper = (band[i].upper * factor).max(0.0);
        }
    }
}

fn compute_metrics(
    points: &[ForecastPoint],
    levels: &[f64],
    bands: &[Vec<IntervalPoint>],
    diag: &mut Diagnostics,
) -> ForecastMetrics {
    let values: Vec<f64> = points.iter().map(|p| p.forecast).collect();
    let first = values.first().copied().unwrap_or(0.0);
    let last = values.last().copied().unwrap_or(0.0);
    let average = mean(&values);

    let forecast_growth = if first == 0.0 {
        diag.note("forecast growth defaulted to 0 (first forecast period is 0)");
        0.0
    } else {
        (last - first) / first
    };

    let mut uncertainty = BTreeMap::new();
    for (level, band) in levels.iter().zip(bands) {
        let ranges: Vec<f64> = band.iter().map(|p| p.upper - p.lower).collect();
        let average_range = mean(&ranges);
        let relative_uncertainty = if average == 0.0 {
            diag.note(format!(
                "relative uncertainty at level {level} defaulted to 0 (average forecast is 0)"
            ));
            0.0
        } else {
            average_range / average
        };
        let (range_first, range_last) = (
            ranges.first().copied().unwrap_or(0.0),
            ranges.last().copied().unwrap_or(0.0),
        );
        uncertainty.insert(
            level_key(*level),
            UncertaintyMetrics {
                average_range,
                range_trend: if range_last > range_first {
                    Direction::Increasing
                } else {
                    Direction::Decreasing
                },
                relative_uncertainty,
            },
        );
    }

    ForecastMetrics {
        total_forecast: values.iter().sum(),
        average_monthly_forecast: average,
        forecast_trend: if last > first {
            Direction::Increasing
        } else {
            Direction::Decreasing
        },
        forecast_growth,
        uncertainty,
    }
}

/// Condense a report for the renderer's header block.
pub fn summarize(report: &ForecastReport) -> ForecastSummary {
    let analysis = &report.historical_analysis;
    let metrics = &report.metrics;

    let cost_variability = if analysis.average_monthly_cost == 0.0 {
        0.0
    } else {
        analysis.cost_std_dev / analysis.average_monthly_cost
    };

    let worst = metrics
        .uncertainty
        .values()
        .map(|u| u.relative_uncertainty)
        .fold(0.0, f64::max);
    let uncertainty_assessment = if worst > 0.2 {
        UncertaintyAssessment::High
    } else if worst > 0.1 {
        UncertaintyAssessment::Medium
    } else {
        UncertaintyAssessment::Low
    };

    ForecastSummary {
        historical_total: analysis.total_cost,
        historical_average: analysis.average_monthly_cost,
        historical_trend: analysis.trend.direction,
        cost_variability,
        total_forecast: metrics.total_forecast,
        average_monthly_forecast: metrics.average_monthly_forecast,
        forecast_trend: metrics.forecast_trend,
        forecast_growth: metrics.forecast_growth,
        high_severity_insights: report
            .insights
            .iter()
            .filter(|i| i.severity == crate::core::models::forecast::Severity::High)
            .count(),
        high_priority_recommendations: report
            .recommendations
            .iter()
            .filter(|r| r.priority == crate::core::models::forecast::Severity::High)
            .count(),
        uncertainty_assessment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap as Tags;

    fn obs(y: i32, m: u32, d: u32, cost: f64, rtype: &str) -> Observation {
        Observation {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            cost,
            resource_type: rtype.to_string(),
            resource_group: String::new(),
            tags: Tags::new(),
        }
    }

    fn monthly_obs(costs: &[f64]) -> Vec<Observation> {
        costs
            .iter()
            .enumerate()
            .map(|(i, &c)| obs(2025, i as u32 + 1, 10, c, "VM"))
            .collect()
    }

    fn run(costs: &[f64], opts: &ForecastOptions) -> ForecastReport {
        let observations = monthly_obs(costs);
        let mut diag = Diagnostics::new();
        generate_forecast(&observations, opts, &mut diag).unwrap()
    }

    #[test]
    fn forecast_length_and_contiguous_periods() {
        let opts = ForecastOptions::default();
        let report = run(&[100.0, 120.0, 110.0, 130.0, 125.0, 140.0, 135.0, 150.0, 145.0, 160.0, 155.0, 170.0], &opts);
        assert_eq!(report.forecasts.len(), opts.horizon);
        // Starts the month after the last historical period (2025-12).
        assert_eq!(
            report.forecasts[0].period,
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
        );
        for pair in report.forecasts.windows(2) {
            assert_eq!(pair[1].period, next_month(pair[0].period));
        }
        for band in report.confidence_intervals.values() {
            assert_eq!(band.len(), opts.horizon);
        }
    }

    #[test]
    fn bands_bracket_points_and_nest_by_level() {
        let opts = ForecastOptions::default();
        let report = run(&[100.0, 140.0, 90.0, 160.0, 120.0, 180.0, 110.0, 170.0, 130.0, 190.0, 105.0, 175.0], &opts);

        let wide = &report.confidence_intervals[&level_key(0.95)];
        let mid = &report.confidence_intervals[&level_key(0.80)];
        let narrow = &report.confidence_intervals[&level_key(0.50)];

        for (i, point) in report.forecasts.iter().enumerate() {
            // The point estimate is the sample mean; with seasonal
            // scaling applied uniformly it stays inside every band up
            // to floating tolerance.
            assert!(wide[i].lower <= point.forecast + 1e-9);
            assert!(point.forecast <= wide[i].upper + 1e-9);
            // Wider level ⊇ narrower level at every period.
            assert!(wide[i].lower <= mid[i].lower + 1e-9);
            assert!(mid[i].lower <= narrow[i].lower + 1e-9);
            assert!(narrow[i].upper <= mid[i].upper + 1e-9);
            assert!(mid[i].upper <= wide[i].upper + 1e-9);
        }
    }

    #[test]
    fn constant_series_forecasts_the_constant() {
        let opts = ForecastOptions {
            horizon: 3,
            confidence_levels: vec![0.95],
            ..ForecastOptions::default()
        };
        let report = run(&[1000.0; 12], &opts);
        assert_eq!(report.forecasts.len(), 3);
        for point in &report.forecasts {
            assert!((point.forecast - 1000.0).abs() < 1.0);
        }
        let uncertainty = &report.metrics.uncertainty[&level_key(0.95)];
        assert!(uncertainty.relative_uncertainty < 0.01);
        // Single resource type at 100% share.
        assert_eq!(
            report.historical_analysis.cost_drivers.concentration_index,
            1.0
        );
    }

    #[test]
    fn linear_series_forecasts_increasing() {
        let costs: Vec<f64> = (0..12).map(|i| 100.0 + 10.0 * i as f64).collect();
        let report = run(&costs, &ForecastOptions::default());
        assert_eq!(
            report.historical_analysis.trend.direction,
            Direction::Increasing
        );
        assert_eq!(report.metrics.forecast_trend, Direction::Increasing);
        assert!(report.metrics.forecast_growth > 0.0);
    }

    #[test]
    fn fixed_seed_is_idempotent() {
        let costs = [100.0, 140.0, 90.0, 160.0, 120.0, 180.0, 110.0, 170.0, 130.0, 190.0, 105.0, 175.0];
        let opts = ForecastOptions::default();
        let a = serde_json::to_string(&run(&costs, &opts)).unwrap();
        let b = serde_json::to_string(&run(&costs, &opts)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn six_observed_months_succeed_five_fail() {
        let six: Vec<Observation> = (7..=12u32).map(|m| obs(2025, m, 15, 100.0, "VM")).collect();
        let mut diag = Diagnostics::new();
        assert!(generate_forecast(&six, &ForecastOptions::default(), &mut diag).is_ok());

        let five: Vec<Observation> = (8..=12u32).map(|m| obs(2025, m, 15, 100.0, "VM")).collect();
        let err = generate_forecast(&five, &ForecastOptions::default(), &mut diag).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientHistory { .. }));
    }

    #[test]
    fn forecasts_are_non_negative() {
        // Sharply decreasing spend.
        let costs: Vec<f64> = (0..12).map(|i| (1200.0 - 100.0 * i as f64).max(0.0)).collect();
        let report = run(&costs, &ForecastOptions::default());
        for point in &report.forecasts {
            assert!(point.forecast >= 0.0);
        }
        for band in report.confidence_intervals.values() {
            for interval in band {
                assert!(interval.lower >= 0.0);
                assert!(interval.lower <= interval.upper);
            }
        }
    }

    #[test]
    fn cancellation_aborts_the_run() {
        let flag: CancelFlag = Arc::new(AtomicBool::new(true));
        let opts = ForecastOptions {
            cancel: Some(flag),
            ..ForecastOptions::default()
        };
        let observations = monthly_obs(&[100.0; 12]);
        let mut diag = Diagnostics::new();
        let err = generate_forecast(&observations, &opts, &mut diag).unwrap_err();
        assert!(matches!(err, ForecastError::Cancelled));
    }

    #[test]
    fn invalid_options_are_rejected() {
        let observations = monthly_obs(&[100.0; 12]);
        let mut diag = Diagnostics::new();

        let zero_horizon = ForecastOptions {
            horizon: 0,
            ..ForecastOptions::default()
        };
        assert!(matches!(
            generate_forecast(&observations, &zero_horizon, &mut diag).unwrap_err(),
            ForecastError::InvalidInput(_)
        ));

        let bad_level = ForecastOptions {
            confidence_levels: vec![1.5],
            ..ForecastOptions::default()
        };
        assert!(matches!(
            generate_forecast(&observations, &bad_level, &mut diag).unwrap_err(),
            ForecastError::InvalidInput(_)
        ));
    }

    #[test]
    fn report_serializes_to_the_documented_shape() {
        let costs: Vec<f64> = (0..12).map(|i| 100.0 + 10.0 * i as f64).collect();
        let report = run(&costs, &ForecastOptions::default());
        let value: serde_json::Value = serde_json::to_value(&report).unwrap();

        assert!(value["historical_analysis"]["average_monthly_cost"].is_number());
        assert!(value["historical_analysis"]["cost_drivers"]["concentration_index"].is_number());
        assert_eq!(value["forecasts"][0]["period"], "2026-01");
        assert!(value["forecasts"][0]["forecast"].is_number());
        assert!(value["confidence_intervals"]["0.95"][0]["lower"].is_number());
        assert!(value["metrics"]["total_forecast"].is_number());
        assert!(value["metrics"]["uncertainty"]["0.95"]["relative_uncertainty"].is_number());
        assert_eq!(value["metrics"]["forecast_trend"], "increasing");
    }

    #[test]
    fn summary_reflects_report() {
        let costs: Vec<f64> = (0..12).map(|i| 100.0 + 10.0 * i as f64).collect();
        let report = run(&costs, &ForecastOptions::default());
        let summary = summarize(&report);
        assert_eq!(summary.historical_total, report.historical_analysis.total_cost);
        assert_eq!(summary.forecast_trend, Direction::Increasing);
        assert_eq!(
            summary.high_severity_insights,
            report
                .insights
                .iter()
                .filter(|i| i.severity == crate::core::models::forecast::Severity::High)
                .count()
        );
    }
}
