use colored::{control, Colorize};

use crate::core::engine::{level_key, summarize};
use crate::core::models::analysis::{Direction, HistoricalAnalysis, StabilityLabel};
use crate::core::models::forecast::{ForecastReport, Severity, UncertaintyAssessment};

fn direction_label(direction: Direction) -> &'static str {
    match direction {
        Direction::Increasing => "increasing",
        Direction::Decreasing => "decreasing",
        Direction::Stable => "stable",
    }
}

fn stability_label(label: StabilityLabel) -> &'static str {
    match label {
        StabilityLabel::High => "high",
        StabilityLabel::Medium => "medium",
        StabilityLabel::Low => "low",
        StabilityLabel::Unknown => "unknown",
    }
}

fn severity_tag(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::High => "[high]".red(),
        Severity::Medium => "[medium]".yellow(),
        Severity::Low => "[low]".green(),
    }
}

fn money(value: f64) -> String {
    format!("${:.2}", value)
}

/// Render a full forecast report as a colored (or plain) string.
///
/// Layout:
/// ```text
///  Cost Forecast
///   History     $16900.00 total, $1408.33/mo (increasing)
///   Forecast    $18234.10 total, $1519.51/mo (increasing, +4.2%)
///   Uncertainty low
///
///   Period    Forecast      95% interval
///   2026-01   $1234.56      $1100.00 - $1400.00
/// ```
pub fn render_report(report: &ForecastReport, use_color: bool) -> String {
    control::set_override(use_color);

    let summary = summarize(report);
    let mut lines: Vec<String> = Vec::new();

    lines.push(" Cost Forecast".bold().to_string());
    lines.push(format!(
        "  {}     {} total, {}/mo ({})",
        "History".cyan(),
        money(summary.historical_total),
        money(summary.historical_average),
        direction_label(summary.historical_trend),
    ));
    lines.push(format!(
        "  {}    {} total, {}/mo ({}, {:+.1}%)",
        "Forecast".cyan(),
        money(summary.total_forecast),
        money(summary.average_monthly_forecast),
        direction_label(summary.forecast_trend),
        summary.forecast_growth * 100.0,
    ));
    let assessment = match summary.uncertainty_assessment {
        UncertaintyAssessment::High => "high".red().to_string(),
        UncertaintyAssessment::Medium => "medium".yellow().to_string(),
        UncertaintyAssessment::Low => "low".green().to_string(),
    };
    lines.push(format!("  {} {}", "Uncertainty".cyan(), assessment));
    lines.push(String::new());

    // Forecast table against the widest configured band.
    let widest = report
        .metrics
        .uncertainty
        .keys()
        .filter_map(|k| k.parse::<f64>().ok())
        .fold(0.0, f64::max);
    let band = report.confidence_intervals.get(&level_key(widest));

    let header = match band {
        Some(_) => format!(
            "  {:<9} {:<13} {:.0}% interval",
            "Period",
            "Forecast",
            widest * 100.0
        ),
        None => format!("  {:<9} Forecast", "Period"),
    };
    lines.push(header.bold().to_string());

    for (i, point) in report.forecasts.iter().enumerate() {
        let period = point.period.format("%Y-%m");
        match band.and_then(|b| b.get(i)) {
            Some(interval) => lines.push(format!(
                "  {:<9} {:<13} {} - {}",
                period,
                money(point.forecast),
                money(interval.lower),
                money(interval.upper),
            )),
            None => lines.push(format!("  {:<9} {}", period, money(point.forecast))),
        }
    }

    if !report.insights.is_empty() {
        lines.push(String::new());
        lines.push(format!("  {}:", "Insights".cyan()));
        for insight in &report.insights {
            lines.push(format!(
                "   {:<9} {}: {}",
                severity_tag(insight.severity),
                insight.kind,
                insight.description
            ));
        }
    }

    if !report.recommendations.is_empty() {
        lines.push(String::new());
        lines.push(format!("  {}:", "Recommendations".cyan()));
        for rec in &report.recommendations {
            lines.push(format!(
                "   {:<9} {}",
                severity_tag(rec.priority),
                rec.title
            ));
            for action in &rec.actions {
                lines.push(format!("             - {}", action));
            }
        }
    }

    lines.join("\n")
}

/// Render a historical analysis on its own (the `analyze` command).
pub fn render_analysis(analysis: &HistoricalAnalysis, use_color: bool) -> String {
    control::set_override(use_color);

    let mut lines: Vec<String> = Vec::new();
    lines.push(" Historical Analysis".bold().to_string());
    lines.push(format!(
        "  {}       {} total, {}/mo (min {}, max {})",
        "Costs".cyan(),
        money(analysis.total_cost),
        money(analysis.average_monthly_cost),
        money(analysis.min_monthly_cost),
        money(analysis.max_monthly_cost),
    ));
    lines.push(format!(
        "  {}      {:+.1}%/mo avg ({}), stability {}",
        "Growth".cyan(),
        analysis.growth.average * 100.0,
        direction_label(analysis.growth.direction),
        stability_label(analysis.trend.growth_stability),
    ));
    lines.push(format!(
        "  {}       {} (strength {:.3}, volatility {:.3}, {} change points)",
        "Trend".cyan(),
        direction_label(analysis.trend.direction),
        analysis.trend.strength,
        analysis.trend.volatility,
        analysis.trend.change_points,
    ));

    if let Some(monthly) = &analysis.seasonality.monthly {
        lines.push(format!(
            "  {} peak month {}, low month {}, variation {:.3}",
            "Seasonality".cyan(),
            monthly.highest_period,
            monthly.lowest_period,
            monthly.variation,
        ));
    }
    if let Some(weekday) = &analysis.seasonality.weekday {
        lines.push(format!(
            "  {}     {}/day weekdays, {}/day weekends",
            "Weekday".cyan(),
            money(weekday.weekday_avg),
            money(weekday.weekend_avg),
        ));
    }

    if !analysis.cost_drivers.top_resources.is_empty() {
        lines.push(format!(
            "  {} (HHI {:.2}):",
            "Top Drivers".cyan(),
            analysis.cost_drivers.concentration_index
        ));
        for share in &analysis.cost_drivers.top_resources {
            lines.push(format!(
                "    {:<24} {:>5.1}%",
                share.resource_type, share.percentage
            ));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diag::Diagnostics;
    use crate::core::engine::{generate_forecast, ForecastOptions};
    use crate::core::models::observation::Observation;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn sample_report() -> ForecastReport {
        let observations: Vec<Observation> = (0..12u32)
            .map(|i| Observation {
                date: NaiveDate::from_ymd_opt(2025, i + 1, 10).unwrap(),
                cost: 100.0 + 10.0 * i as f64,
                resource_type: "VM".to_string(),
                resource_group: String::new(),
                tags: BTreeMap::new(),
            })
            .collect();
        let mut diag = Diagnostics::new();
        generate_forecast(&observations, &ForecastOptions::default(), &mut diag).unwrap()
    }

    #[test]
    fn report_text_lists_every_forecast_period() {
        let report = sample_report();
        let text = render_report(&report, false);
        assert!(text.contains("Cost Forecast"));
        for point in &report.forecasts {
            assert!(text.contains(&point.period.format("%Y-%m").to_string()));
        }
    }

    #[test]
    fn report_text_shows_widest_band() {
        let text = render_report(&sample_report(), false);
        assert!(text.contains("95% interval"));
    }

    #[test]
    fn plain_output_has_no_ansi_escapes() {
        let text = render_report(&sample_report(), false);
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn analysis_text_shows_drivers_and_trend() {
        let report = sample_report();
        let text = render_analysis(&report.historical_analysis, false);
        assert!(text.contains("Historical Analysis"));
        assert!(text.contains("VM"));
        assert!(text.contains("increasing"));
    }
}
