use serde_json::json;

use crate::core::models::analysis::{Direction, HistoricalAnalysis};
use crate::core::models::forecast::{ForecastMetrics, Insight, Recommendation, Severity};

/// Trend strength above which a rising trend is flagged high severity.
const STRONG_TREND: f64 = 0.1;
/// Herfindahl index above which spend counts as concentrated.
const HIGH_CONCENTRATION: f64 = 0.5;
/// Relative uncertainty above which forecast quality is flagged.
const HIGH_UNCERTAINTY: f64 = 0.2;
/// Absolute forecast growth treated as significant.
const SIGNIFICANT_GROWTH: f64 = 0.2;

fn monthly_pattern_present(analysis: &HistoricalAnalysis) -> bool {
    analysis
        .seasonality
        .monthly
        .as_ref()
        .is_some_and(|p| p.variation > 0.0)
}

fn high_uncertainty(metrics: &ForecastMetrics) -> bool {
    metrics
        .uncertainty
        .values()
        .any(|u| u.relative_uncertainty > HIGH_UNCERTAINTY)
}

/// Derive qualitative findings from the analysis and forecast. Each
/// insight stands on its own; emission order is fixed: trend,
/// seasonality, concentration, uncertainty, growth.
pub fn generate_insights(
    analysis: &HistoricalAnalysis,
    metrics: &ForecastMetrics,
) -> Vec<Insight> {
    let mut insights = Vec::new();

    if analysis.trend.direction == Direction::Increasing {
        insights.push(Insight {
            kind: "trend".to_string(),
            category: "cost_trend".to_string(),
            severity: if analysis.trend.strength > STRONG_TREND {
                Severity::High
            } else {
                Severity::Medium
            },
            description: "Costs show an increasing trend".to_string(),
            details: json!({
                "trend_strength": analysis.trend.strength,
                "monthly_growth": analysis.growth.average,
            }),
        });
    }

    if monthly_pattern_present(analysis) {
        let pattern = analysis.seasonality.monthly.as_ref().map(|p| {
            json!({
                "highest_period": p.highest_period,
                "lowest_period": p.lowest_period,
                "variation": p.variation,
            })
        });
        insights.push(Insight {
            kind: "pattern".to_string(),
            category: "seasonality".to_string(),
            severity: Severity::Medium,
            description: "Clear monthly cost patterns detected".to_string(),
            details: pattern.unwrap_or_default(),
        });
    }

    if analysis.cost_drivers.concentration_index > HIGH_CONCENTRATION {
        insights.push(Insight {
            kind: "concentration".to_string(),
            category: "cost_distribution".to_string(),
            severity: Severity::High,
            description: "High concentration of costs in few resources".to_string(),
            details: json!({
                "concentration_index": analysis.cost_drivers.concentration_index,
                "top_resources": serde_json::to_value(&analysis.cost_drivers.top_resources)
                    .unwrap_or_default(),
            }),
        });
    }

    if high_uncertainty(metrics) {
        insights.push(Insight {
            kind: "uncertainty".to_string(),
            category: "forecast_quality".to_string(),
            severity: Severity::Medium,
            description: "High uncertainty in cost forecasts".to_string(),
            details: serde_json::to_value(&metrics.uncertainty).unwrap_or_default(),
        });
    }

    if metrics.forecast_growth.abs() > SIGNIFICANT_GROWTH {
        let movement = if metrics.forecast_growth > 0.0 {
            "increase"
        } else {
            "decrease"
        };
        insights.push(Insight {
            kind: "growth".to_string(),
            category: "future_trend".to_string(),
            severity: Severity::High,
            description: format!("Significant {movement} in costs expected"),
            details: json!({
                "growth_rate": metrics.forecast_growth,
                "trend": metrics.forecast_trend,
            }),
        });
    }

    insights
}

/// Actionable suggestions paired with the same conditions the insights
/// fire on, in the same fixed order.
pub fn generate_recommendations(
    analysis: &HistoricalAnalysis,
    metrics: &ForecastMetrics,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if analysis.trend.direction == Direction::Increasing {
        recommendations.push(Recommendation {
            kind: "cost_optimization".to_string(),
            priority: Severity::High,
            title: "Implement Cost Controls".to_string(),
            description: "Rising cost trend detected. Consider implementing:".to_string(),
            actions: vec![
                "Set up budget alerts".to_string(),
                "Review and optimize resource usage".to_string(),
                "Implement auto-scaling policies".to_string(),
                "Consider reserved capacity for stable workloads".to_string(),
            ],
        });
    }

    if monthly_pattern_present(analysis) {
        recommendations.push(Recommendation {
            kind: "resource_management".to_string(),
            priority: Severity::Medium,
            title: "Optimize for Seasonal Patterns".to_string(),
            description: "Clear seasonal patterns detected. Consider:".to_string(),
            actions: vec![
                "Implement auto-scaling based on seasonal patterns".to_string(),
                "Schedule resources based on usage patterns".to_string(),
                "Review capacity planning for peak periods".to_string(),
            ],
        });
    }

    if analysis.cost_drivers.concentration_index > HIGH_CONCENTRATION {
        recommendations.push(Recommendation {
            kind: "cost_distribution".to_string(),
            priority: Severity::High,
            title: "Diversify Resource Usage".to_string(),
            description: "High concentration of costs. Consider:".to_string(),
            actions: vec![
                "Review and optimize top cost-driving resources".to_string(),
                "Evaluate alternative service options".to_string(),
                "Implement multi-service architecture where applicable".to_string(),
            ],
        });
    }

    if high_uncertainty(metrics) {
        recommendations.push(Recommendation {
            kind: "risk_management".to_string(),
            priority: Severity::Medium,
            title: "Manage Cost Uncertainty".to_string(),
            description: "High forecast uncertainty detected. Consider:".to_string(),
            actions: vec![
                "Set up buffer in cost budgets".to_string(),
                "Implement more granular monitoring".to_string(),
                "Review and stabilize variable cost components".to_string(),
            ],
        });
    }

    if metrics.forecast_growth > SIGNIFICANT_GROWTH {
        recommendations.push(Recommendation {
            kind: "future_planning".to_string(),
            priority: Severity::High,
            title: "Prepare for Cost Increases".to_string(),
            description: "Significant cost increase expected. Actions needed:".to_string(),
            actions: vec![
                "Review and adjust budgets".to_string(),
                "Implement stricter cost controls".to_string(),
                "Evaluate cost-saving opportunities".to_string(),
                "Consider long-term resource commitments".to_string(),
            ],
        });
    }

    recommendations
}
