use chrono::{Datelike, NaiveDate};

use crate::core::error::ForecastError;
use crate::core::series::CostSeries;
use crate::core::stats::quarter_of;

/// Width of the sliding cost window fed to the model.
pub const WINDOW: usize = 3;

/// Window costs plus calendar month and quarter.
pub const FEATURE_LEN: usize = WINDOW + 2;

/// One supervised example: a three-month window with calendar features,
/// targeting the following month's cost.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    pub features: [f64; FEATURE_LEN],
    pub target: f64,
}

/// Assemble a feature vector from a cost window and the calendar period
/// that stamps it. Training stamps with the window-start month; the
/// forecast loop stamps with the month being predicted.
pub fn feature_vector(window: &[f64; WINDOW], period: NaiveDate) -> [f64; FEATURE_LEN] {
    [
        window[0],
        window[1],
        window[2],
        period.month() as f64,
        quarter_of(period.month()) as f64,
    ]
}

/// Slide a window of width 3 over the series with stride 1, producing
/// `len − 3` examples. Fails when the series cannot form even one.
pub fn build_examples(series: &CostSeries) -> Result<Vec<TrainingExample>, ForecastError> {
    if series.len() < WINDOW + 1 {
        return Err(ForecastError::InsufficientHistory {
            needed: WINDOW + 1,
            got: series.len(),
        });
    }

    let points = series.points();
    let examples = (0..points.len() - WINDOW)
        .map(|i| {
            let window = [
                points[i].total_cost,
                points[i + 1].total_cost,
                points[i + 2].total_cost,
            ];
            TrainingExample {
                features: feature_vector(&window, points[i].period),
                target: points[i + WINDOW].total_cost,
            }
        })
        .collect();
    Ok(examples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::observation::Observation;
    use crate::core::series::build_series;
    use std::collections::BTreeMap;

    fn series_of(costs: &[f64]) -> CostSeries {
        let observations: Vec<Observation> = costs
            .iter()
            .enumerate()
            .map(|(i, &cost)| Observation {
                date: NaiveDate::from_ymd_opt(2025, i as u32 + 1, 15).unwrap(),
                cost,
                resource_type: "VM".to_string(),
                resource_group: String::new(),
                tags: BTreeMap::new(),
            })
            .collect();
        build_series(&observations, costs.len()).unwrap()
    }

    #[test]
    fn example_count_is_len_minus_window() {
        let series = series_of(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
        let examples = build_examples(&series).unwrap();
        assert_eq!(examples.len(), 3);
    }

    #[test]
    fn features_hold_window_and_calendar_of_window_start() {
        let series = series_of(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
        let examples = build_examples(&series).unwrap();
        // First example: window Jan-Mar 2025, stamped with January.
        assert_eq!(examples[0].features, [10.0, 20.0, 30.0, 1.0, 1.0]);
        assert_eq!(examples[0].target, 40.0);
        // Third example: window Mar-May, stamped with March (Q1).
        assert_eq!(examples[2].features, [30.0, 40.0, 50.0, 3.0, 1.0]);
        assert_eq!(examples[2].target, 60.0);
    }

    #[test]
    fn quarter_feature_advances_with_window_start() {
        let series = series_of(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let examples = build_examples(&series).unwrap();
        // Fifth example starts in May: month 5, quarter 2.
        assert_eq!(examples[4].features[3], 5.0);
        assert_eq!(examples[4].features[4], 2.0);
    }

    #[test]
    fn feature_vector_stamps_given_period() {
        let november = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let v = feature_vector(&[1.0, 2.0, 3.0], november);
        assert_eq!(v, [1.0, 2.0, 3.0, 11.0, 4.0]);
    }

    #[test]
    fn too_short_series_is_rejected() {
        use crate::core::series::SeriesPoint;
        let points: Vec<SeriesPoint> = (1..=3u32)
            .map(|m| SeriesPoint {
                period: NaiveDate::from_ymd_opt(2025, m, 1).unwrap(),
                total_cost: 100.0,
            })
            .collect();
        let series = CostSeries::from_points(points);
        let err = build_examples(&series).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InsufficientHistory { needed: 4, got: 3 }
        ));
    }
}
