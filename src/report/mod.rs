//! Economic overview reports
//!
//! Combines stored history, the analysis functions and any trained models
//! into one report, exported as JSON and as a self-contained HTML page.

mod html;

pub use html::{open_in_browser, render_html};

use crate::analysis::{Correlation, Strength, TrendAnalysis, TrendDirection, analyze_correlation, analyze_trend, generate_insights};
use crate::config::ReportConfig;
use crate::core::catalog::Catalog;
use crate::core::data::{Observation, days_before};
use crate::core::traits::SeriesStore;
use crate::forecast::{ForecastPoint, Predictor};
use crate::utils::error::{AppError, AppResult};
use crate::utils::format::FILE_STAMP_FORMAT;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub const MAIN_INDICATORS: [&str; 5] = ["ipca", "selic", "pib", "cambio_usd", "divida_pib"];
pub const FORECAST_INDICATORS: [&str; 3] = ["ipca", "selic", "pib"];
pub const CHART_INDICATORS: [&str; 4] = ["ipca", "selic", "pib", "cambio_usd"];

const FORECAST_STEPS: usize = 6;
const CHART_DAYS: u64 = 730;
const REPORT_PREFIX: &str = "economic_report_";

#[derive(Debug, Clone, Serialize)]
pub struct IndicatorSection {
    pub key: String,
    pub name: String,
    pub trend: TrendAnalysis,
    pub insights: Vec<String>,
    pub last_value: Option<f64>,
    pub last_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionSection {
    pub indicator: String,
    pub forecast: Vec<ForecastPoint>,
    pub trend_forecast: TrendDirection,
}

#[derive(Debug, Clone, Serialize)]
pub struct EconomicReport {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub period_months: u32,
    pub indicators: Vec<IndicatorSection>,
    pub correlations: Vec<Correlation>,
    pub predictions: Vec<PredictionSection>,
    pub executive_summary: Vec<String>,
}

impl EconomicReport {
    pub fn indicator(&self, key: &str) -> Option<&IndicatorSection> {
        self.indicators.iter().find(|s| s.key == key)
    }
}

/// Files written for one report
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub report: EconomicReport,
    pub json_path: PathBuf,
    pub html_path: Option<PathBuf>,
}

/// A report file found in the output directory
#[derive(Debug, Clone, Serialize)]
pub struct ReportFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

pub struct ReportGenerator {
    store: Arc<dyn SeriesStore>,
    predictor: Predictor,
    catalog: Catalog,
    config: ReportConfig,
}

impl ReportGenerator {
    pub fn new(store: Arc<dyn SeriesStore>, predictor: Predictor, catalog: Catalog, config: ReportConfig) -> Self {
        Self {
            store,
            predictor,
            catalog,
            config,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Overview of the main indicators over the last `30 × months_back` days
    pub async fn economic_overview(&self, months_back: u32, today: NaiveDate) -> AppResult<EconomicReport> {
        let cutoff = days_before(today, 30 * months_back as u64)?;

        let mut indicators = Vec::new();
        let mut recent: Vec<(String, Vec<Observation>)> = Vec::new();
        for key in MAIN_INDICATORS {
            let observations = self.store.load_series(key, Some(cutoff), None).await?;
            if observations.is_empty() {
                continue;
            }

            let name = self.catalog.display_name(key);
            let last = observations.last().copied();
            indicators.push(IndicatorSection {
                key: key.to_string(),
                trend: analyze_trend(&observations),
                insights: generate_insights(key, &name, &observations, &self.config),
                name,
                last_value: last.map(|o| o.value),
                last_date: last.map(|o| o.date),
            });
            recent.push((key.to_string(), observations));
        }

        let correlations = analyze_correlation(&recent, self.config.correlation_threshold);
        let predictions = self.predictions().await;

        let mut report = EconomicReport {
            title: "Brazilian Economic Overview".to_string(),
            generated_at: Utc::now(),
            period_months: months_back,
            indicators,
            correlations,
            predictions,
            executive_summary: Vec::new(),
        };
        report.executive_summary = executive_summary(&report);

        info!(
            indicators = report.indicators.len(),
            correlations = report.correlations.len(),
            predictions = report.predictions.len(),
            "economic overview ready"
        );
        Ok(report)
    }

    /// Forecasts for the indicators that have a trained model; failures are skipped
    async fn predictions(&self) -> Vec<PredictionSection> {
        let mut sections = Vec::new();
        for key in FORECAST_INDICATORS {
            if !self.predictor.model_status(key).exists {
                continue;
            }
            match self.predictor.predict_future(key, FORECAST_STEPS).await {
                Ok(forecast) => {
                    let trend_forecast = match (forecast.points.first(), forecast.points.last()) {
                        (Some(first), Some(last)) if last.value > first.value => TrendDirection::Ascending,
                        _ => TrendDirection::Descending,
                    };
                    sections.push(PredictionSection {
                        indicator: key.to_string(),
                        forecast: forecast.points,
                        trend_forecast,
                    });
                }
                Err(e) => warn!(indicator = key, error = %e, "skipping forecast in report"),
            }
        }
        sections
    }

    /// Last 24 months of the charted indicators
    pub async fn chart_history(&self, today: NaiveDate) -> AppResult<BTreeMap<String, Vec<Observation>>> {
        let cutoff = days_before(today, CHART_DAYS)?;
        let mut history = BTreeMap::new();
        for key in CHART_INDICATORS {
            let observations = self.store.load_series(key, Some(cutoff), None).await?;
            if !observations.is_empty() {
                history.insert(key.to_string(), observations);
            }
        }
        Ok(history)
    }

    pub fn export_json(&self, report: &EconomicReport) -> AppResult<PathBuf> {
        let path = self.report_path(report, "json")?;
        let content = serde_json::to_string_pretty(report)
            .map_err(|e| AppError::System(format!("Failed to serialize report: {}", e)))?;
        std::fs::write(&path, content)?;
        info!(path = %path.display(), "JSON report written");
        Ok(path)
    }

    pub fn export_html(&self, report: &EconomicReport, history: &BTreeMap<String, Vec<Observation>>) -> AppResult<PathBuf> {
        let path = self.report_path(report, "html")?;
        std::fs::write(&path, render_html(report, history, &self.catalog))?;
        info!(path = %path.display(), "HTML report written");
        Ok(path)
    }

    /// Build the overview and write the JSON export, plus the HTML page when asked
    pub async fn generate(&self, months_back: u32, today: NaiveDate, with_html: bool) -> AppResult<GeneratedReport> {
        let report = self.economic_overview(months_back, today).await?;
        let html_path = if with_html {
            let history = self.chart_history(today).await?;
            Some(self.export_html(&report, &history)?)
        } else {
            None
        };
        let json_path = self.export_json(&report)?;
        Ok(GeneratedReport {
            report,
            json_path,
            html_path,
        })
    }

    /// Previously generated reports, newest first
    pub fn list_reports(&self) -> AppResult<Vec<ReportFile>> {
        let dir = &self.config.output_dir;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let is_report = name.starts_with(REPORT_PREFIX) && (name.ends_with(".json") || name.ends_with(".html"));
            if !is_report {
                continue;
            }
            let metadata = entry.metadata()?;
            files.push(ReportFile {
                name,
                path: entry.path(),
                size: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        // The timestamp in the name orders reports even when mtimes collide.
        files.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(files)
    }

    fn report_path(&self, report: &EconomicReport, extension: &str) -> AppResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;
        Ok(self.config.output_dir.join(format!(
            "{}{}.{}",
            REPORT_PREFIX,
            report.generated_at.format(FILE_STAMP_FORMAT),
            extension
        )))
    }
}

/// Headline points derived from the indicator sections and correlations
pub fn executive_summary(report: &EconomicReport) -> Vec<String> {
    let mut summary = Vec::new();

    if let Some(ipca) = report.indicator("ipca") {
        let last = ipca.last_value.unwrap_or(0.0);
        summary.push(
            match ipca.trend.trend {
                TrendDirection::Ascending if last > 5.0 => {
                    "INFLATION: Rising inflationary pressure calls for monetary policy attention."
                }
                TrendDirection::Descending if last > 0.0 && last < 4.0 => {
                    "INFLATION: Slowing trend shows anti-inflation policy is working."
                }
                _ => "INFLATION: Holding at controlled levels within the target regime.",
            }
            .to_string(),
        );
    }

    if let Some(selic) = report.indicator("selic") {
        match selic.trend.trend {
            TrendDirection::Ascending => summary
                .push("MONETARY POLICY: A Selic hiking cycle signals a restrictive central bank stance.".to_string()),
            TrendDirection::Descending => summary
                .push("MONETARY POLICY: Selic cuts signal stimulus to economic activity.".to_string()),
            _ => {}
        }
    }

    if let Some(pib) = report.indicator("pib") {
        match pib.trend.trend {
            TrendDirection::Ascending => summary
                .push("ECONOMIC ACTIVITY: GDP on a growth path points to recovery.".to_string()),
            TrendDirection::Descending => summary.push(
                "ECONOMIC ACTIVITY: A GDP slowdown calls for attention to stimulus policy.".to_string(),
            ),
            _ => {}
        }
    }

    if let Some(cambio) = report.indicator("cambio_usd") {
        let change = cambio.trend.recent_change_pct;
        if change > 15.0 {
            summary.push("EXCHANGE RATE: A sharp depreciation of the real may feed imported inflation.".to_string());
        } else if change < -10.0 {
            summary.push("EXCHANGE RATE: An appreciating real helps inflation control.".to_string());
        }
    }

    if report
        .indicator("divida_pib")
        .is_some_and(|d| d.trend.trend == TrendDirection::Ascending)
    {
        summary.push("FISCAL: Growing public debt calls for attention to fiscal sustainability.".to_string());
    }

    let strong = report
        .correlations
        .iter()
        .filter(|c| matches!(c.strength, Strength::Strong | Strength::VeryStrong))
        .count();
    if strong > 0 {
        summary.push(format!(
            "CORRELATIONS: {} strong correlations found between indicators.",
            strong
        ));
    }

    if summary.is_empty() {
        summary.push("OUTLOOK: Economic indicators are behaving within historical norms.".to_string());
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Direction;

    fn section(key: &str, trend: TrendDirection, last: f64, change: f64) -> IndicatorSection {
        IndicatorSection {
            key: key.to_string(),
            name: key.to_string(),
            trend: TrendAnalysis {
                trend,
                slope: 0.0,
                confidence: 0.9,
                recent_change_pct: change,
                volatility: 1.0,
                observations: 12,
                last_value: Some(last),
            },
            insights: Vec::new(),
            last_value: Some(last),
            last_date: None,
        }
    }

    fn report(indicators: Vec<IndicatorSection>, correlations: Vec<Correlation>) -> EconomicReport {
        EconomicReport {
            title: "test".to_string(),
            generated_at: Utc::now(),
            period_months: 12,
            indicators,
            correlations,
            predictions: Vec::new(),
            executive_summary: Vec::new(),
        }
    }

    #[test]
    fn test_empty_report_falls_back() {
        let summary = executive_summary(&report(Vec::new(), Vec::new()));
        assert_eq!(summary.len(), 1);
        assert!(summary[0].starts_with("OUTLOOK"));
    }

    #[test]
    fn test_summary_rules() {
        let r = report(
            vec![
                section("ipca", TrendDirection::Ascending, 5.5, 10.0),
                section("selic", TrendDirection::Descending, 10.5, -5.0),
                section("pib", TrendDirection::Stable, 1.0, 0.0),
                section("cambio_usd", TrendDirection::Ascending, 5.8, 16.0),
                section("divida_pib", TrendDirection::Ascending, 75.0, 3.0),
            ],
            vec![Correlation {
                first: "ipca".to_string(),
                second: "selic".to_string(),
                correlation: 0.7,
                strength: Strength::Strong,
                direction: Direction::Positive,
            }],
        );
        let summary = executive_summary(&r);

        assert_eq!(summary.len(), 5);
        assert!(summary[0].contains("Rising inflationary pressure"));
        assert!(summary[1].contains("Selic cuts"));
        assert!(summary[2].starts_with("EXCHANGE RATE"));
        assert!(summary[3].starts_with("FISCAL"));
        assert_eq!(summary[4], "CORRELATIONS: 1 strong correlations found between indicators.");
    }

    #[test]
    fn test_falling_inflation_needs_a_positive_reading() {
        let slowing = report(vec![section("ipca", TrendDirection::Descending, 3.2, -8.0)], Vec::new());
        assert!(executive_summary(&slowing)[0].contains("Slowing trend"));

        let zero = report(vec![section("ipca", TrendDirection::Descending, 0.0, -100.0)], Vec::new());
        assert!(executive_summary(&zero)[0].contains("controlled levels"));
    }

    #[test]
    fn test_moderate_exchange_move_is_silent() {
        let r = report(vec![section("cambio_usd", TrendDirection::Descending, 5.0, -8.0)], Vec::new());
        assert!(executive_summary(&r)[0].starts_with("OUTLOOK"));
    }
}
