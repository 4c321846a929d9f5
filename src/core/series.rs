use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

use crate::core::error::ForecastError;
use crate::core::models::observation::Observation;

/// Minimum number of distinct observed months required for analysis.
pub const MIN_HISTORICAL_MONTHS: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    /// First day of the month the total covers.
    pub period: NaiveDate,
    pub total_cost: f64,
}

/// Monthly-aggregated, gap-filled cost sequence. Ordered by period,
/// strictly increasing, read-only after construction.
#[derive(Debug, Clone)]
pub struct CostSeries {
    points: Vec<SeriesPoint>,
}

impl CostSeries {
    #[cfg(test)]
    pub(crate) fn from_points(points: Vec<SeriesPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn costs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.total_cost).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last_period(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.period)
    }

    /// Half-open date range `[start, end)` covered by the series.
    pub fn date_window(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.points.first()?.period;
        let last = self.points.last()?.period;
        Some((first, next_month(last)))
    }
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    shift_month(date, 0)
}

pub fn next_month(period: NaiveDate) -> NaiveDate {
    shift_month(period, 1)
}

/// First day of the month `delta` months away from `date`'s month.
pub fn shift_month(date: NaiveDate, delta: i32) -> NaiveDate {
    let total = date.year() * 12 + date.month() as i32 - 1 + delta;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

/// Aggregate raw observations into a monthly series covering exactly
/// `months` calendar months, anchored at the latest observed month.
/// Months with no observations inside the window get a 0.0 total.
pub fn build_series(
    observations: &[Observation],
    months: usize,
) -> Result<CostSeries, ForecastError> {
    if months < MIN_HISTORICAL_MONTHS {
        return Err(ForecastError::InvalidInput(format!(
            "lookback window must be at least {} months, got {}",
            MIN_HISTORICAL_MONTHS, months
        )));
    }

    let mut by_month: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for obs in observations {
        *by_month.entry(month_start(obs.date)).or_insert(0.0) += obs.cost;
    }

    let last = match by_month.keys().next_back() {
        Some(last) => *last,
        None => {
            return Err(ForecastError::InsufficientHistory {
                needed: MIN_HISTORICAL_MONTHS,
                got: 0,
            })
        }
    };

    let start = shift_month(last, -(months as i32 - 1));
    let observed = by_month.keys().filter(|m| **m >= start).count();
    if observed < MIN_HISTORICAL_MONTHS {
        return Err(ForecastError::InsufficientHistory {
            needed: MIN_HISTORICAL_MONTHS,
            got: observed,
        });
    }

    let points = (0..months as i32)
        .map(|i| {
            let period = shift_month(start, i);
            SeriesPoint {
                period,
                total_cost: by_month.get(&period).copied().unwrap_or(0.0),
            }
        })
        .collect();

    Ok(CostSeries { points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Tags;

    fn obs(y: i32, m: u32, d: u32, cost: f64) -> Observation {
        Observation {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            cost,
            resource_type: "VM".to_string(),
            resource_group: String::new(),
            tags: Tags::new(),
        }
    }

    #[test]
    fn shift_month_crosses_year_boundaries() {
        let jan = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(shift_month(jan, -1), NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(shift_month(jan, 12), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(shift_month(jan, 0), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn sums_observations_per_month() {
        let mut observations = Vec::new();
        for m in 1..=6u32 {
            observations.push(obs(2025, m, 3, 100.0));
            observations.push(obs(2025, m, 20, 50.0));
        }
        let series = build_series(&observations, 6).unwrap();
        assert_eq!(series.len(), 6);
        for point in series.points() {
            assert_eq!(point.total_cost, 150.0);
        }
    }

    #[test]
    fn gap_months_are_zero_not_omitted() {
        // Observations in months 1-3 and 5-7; month 4 has none.
        let observations: Vec<Observation> = [1u32, 2, 3, 5, 6, 7]
            .iter()
            .map(|&m| obs(2025, m, 10, 200.0))
            .collect();
        let series = build_series(&observations, 7).unwrap();
        assert_eq!(series.len(), 7);
        assert_eq!(series.points()[3].period, NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());
        assert_eq!(series.points()[3].total_cost, 0.0);
    }

    #[test]
    fn periods_are_strictly_increasing_by_month() {
        let observations: Vec<Observation> =
            (1..=8u32).map(|m| obs(2025, m, 1, 10.0)).collect();
        let series = build_series(&observations, 8).unwrap();
        for pair in series.points().windows(2) {
            assert_eq!(pair[1].period, next_month(pair[0].period));
        }
    }

    #[test]
    fn window_wider_than_data_pads_leading_zeros() {
        // 6 observed months, 12 requested: boundary equality must succeed.
        let observations: Vec<Observation> =
            (7..=12u32).map(|m| obs(2025, m, 15, 100.0)).collect();
        let series = build_series(&observations, 12).unwrap();
        assert_eq!(series.len(), 12);
        assert_eq!(series.points()[0].period, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(series.points()[0].total_cost, 0.0);
        assert_eq!(series.points()[11].total_cost, 100.0);
    }

    #[test]
    fn five_observed_months_is_insufficient() {
        let observations: Vec<Observation> =
            (8..=12u32).map(|m| obs(2025, m, 15, 100.0)).collect();
        let err = build_series(&observations, 12).unwrap_err();
        match err {
            ForecastError::InsufficientHistory { needed, got } => {
                assert_eq!(needed, MIN_HISTORICAL_MONTHS);
                assert_eq!(got, 5);
            }
            other => panic!("expected InsufficientHistory, got {other:?}"),
        }
    }

    #[test]
    fn no_observations_is_insufficient() {
        let err = build_series(&[], 12).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientHistory { got: 0, .. }));
    }

    #[test]
    fn observations_before_window_are_ignored() {
        let mut observations: Vec<Observation> =
            (1..=12u32).map(|m| obs(2025, m, 10, 100.0)).collect();
        // Old record outside the 12-month window ending 2025-12.
        observations.push(obs(2023, 6, 1, 9999.0));
        let series = build_series(&observations, 12).unwrap();
        assert_eq!(series.len(), 12);
        let total: f64 = series.costs().iter().sum();
        assert_eq!(total, 1200.0);
    }

    #[test]
    fn date_window_is_half_open() {
        let observations: Vec<Observation> =
            (1..=6u32).map(|m| obs(2025, m, 10, 1.0)).collect();
        let series = build_series(&observations, 6).unwrap();
        let (start, end) = series.date_window().unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
    }
}
