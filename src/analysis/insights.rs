use super::outliers::detect_outliers;
use super::trend::{TrendAnalysis, TrendDirection, analyze_trend};
use crate::config::ReportConfig;
use crate::core::data::Observation;
use crate::utils::format::format_bcb_date;

pub const INSUFFICIENT_DATA: &str = "Insufficient data for analysis.";

/// Plain-language observations about one indicator, at most
/// `max_insights_per_indicator` of them. The trend is only mentioned when
/// its r² exceeds `confidence_threshold`.
pub fn generate_insights(key: &str, name: &str, observations: &[Observation], config: &ReportConfig) -> Vec<String> {
    if observations.is_empty() {
        return vec![INSUFFICIENT_DATA.to_string()];
    }

    let trend = analyze_trend(observations);
    let mut insights = Vec::new();

    if trend.confidence > config.confidence_threshold {
        insights.push(match trend.trend {
            TrendDirection::Ascending => format!(
                "{} shows an upward trend with a change of {:.2}% over the period.",
                name, trend.recent_change_pct
            ),
            TrendDirection::Descending => format!(
                "{} shows a downward trend with a change of {:.2}% over the period.",
                name, trend.recent_change_pct
            ),
            _ => format!("{} remained relatively stable over the period.", name),
        });
    }

    if trend.volatility > 10.0 {
        insights.push(format!(
            "High volatility ({:.1}%) points to unstable values.",
            trend.volatility
        ));
    } else if trend.volatility < 2.0 {
        insights.push(format!(
            "Low volatility ({:.1}%) suggests steady behaviour.",
            trend.volatility
        ));
    }

    let outliers = detect_outliers(observations);
    if !outliers.is_empty() {
        if outliers.len() as f64 > observations.len() as f64 * 0.1 {
            insights.push(format!(
                "{} atypical values detected, suggesting extraordinary events in the period.",
                outliers.len()
            ));
        } else if let Some(latest) = outliers.iter().max_by_key(|o| o.date) {
            insights.push(format!(
                "Latest atypical value on {}: {:.2} ({} extreme).",
                format_bcb_date(&latest.date),
                latest.value,
                latest.kind
            ));
        }
    }

    insights.extend(indicator_insights(key, &trend));
    insights.truncate(config.max_insights_per_indicator);
    insights
}

fn indicator_insights(key: &str, trend: &TrendAnalysis) -> Vec<String> {
    let mut insights = Vec::new();
    let last = trend.last_value;

    match key {
        "ipca" => {
            if let Some(v) = last {
                insights.push(
                    if v > 6.0 {
                        "Inflation is above the upper target (6%), indicating inflationary pressure."
                    } else if v < 3.0 {
                        "Inflation is below the lower target (3%), which may indicate an economic slowdown."
                    } else {
                        "Inflation is within the target band (3-6%), signalling price stability."
                    }
                    .to_string(),
                );
            }
        }
        "selic" => match trend.trend {
            TrendDirection::Ascending => insights.push(
                "Rising Selic rates indicate contractionary monetary policy to fight inflation.".to_string(),
            ),
            TrendDirection::Descending => insights.push(
                "Falling Selic rates suggest economic stimulus and expectations of controlled inflation."
                    .to_string(),
            ),
            _ => {}
        },
        "pib" => match trend.trend {
            TrendDirection::Ascending => {
                insights.push("GDP growth indicates expanding economic activity.".to_string())
            }
            TrendDirection::Descending => insights
                .push("A GDP contraction may signal an economic slowdown or recession.".to_string()),
            _ => {}
        },
        "cambio_usd" => {
            let change = trend.recent_change_pct;
            if last.is_some() && change.abs() > 10.0 {
                insights.push(
                    if change > 0.0 {
                        "A sharp depreciation of the real may push inflation up and raise import costs."
                    } else {
                        "An appreciation of the real may benefit importers and ease inflationary pressure."
                    }
                    .to_string(),
                );
            }
        }
        "divida_pib" => {
            if let Some(v) = last {
                if v > 80.0 {
                    insights.push("A high debt-to-GDP ratio (>80%) may limit the government's fiscal space.".to_string());
                } else if trend.trend == TrendDirection::Ascending {
                    insights.push("Growing public debt calls for attention to fiscal sustainability.".to_string());
                }
            }
        }
        _ => {}
    }

    insights
}
