use super::{CHART_INDICATORS, EconomicReport};
use crate::core::catalog::Catalog;
use crate::core::data::Observation;
use crate::utils::error::{AppError, AppResult};
use crate::utils::format::{format_bcb_date, format_datetime, format_pct, format_value};
use std::collections::BTreeMap;
use std::fmt::Write;

const CHART_WIDTH: f64 = 520.0;
const CHART_HEIGHT: f64 = 260.0;
const CHART_PAD: f64 = 36.0;

const STYLESHEET: &str = r#"
:root { --ink: #1f2933; --accent: #00695c; --accent-soft: #e0f2f1; --rule: #d9e2ec; --paper: #fbfcfd; }
html { font-size: 15px; }
body { margin: 0; font-family: "Inter", system-ui, sans-serif; color: var(--ink); background: var(--paper); }
.container { width: min(1120px, 94vw); margin: 0 auto 3rem; }
.header { border-left: 6px solid var(--accent); padding: 1.5rem 1.25rem; margin: 1.5rem 0; background: #fff; }
.header h1 { margin: 0 0 0.25rem; font-size: 1.9rem; letter-spacing: -0.01em; }
.header p { margin: 0; color: #52606d; }
.panel, .chart-card { background: #fff; border: 1px solid var(--rule); border-radius: 4px; padding: 1.25rem; }
.panel { margin-bottom: 1.5rem; }
.panel h2 { margin: 0 0 0.75rem; font-size: 1.2rem; text-transform: uppercase; color: var(--accent); }
.panel h3 { margin: 1rem 0 0.25rem; font-size: 1.05rem; }
.panel ul { margin: 0.25rem 0 0; padding-left: 1.1rem; }
.chart-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(420px, 1fr)); gap: 1rem; margin-bottom: 1.5rem; }
.chart-card h3 { margin: 0 0 0.5rem; font-size: 1rem; }
.chart-card svg { display: block; width: 100%; }
table { width: 100%; border-collapse: collapse; font-variant-numeric: tabular-nums; }
th { text-align: left; font-weight: 600; border-bottom: 2px solid var(--rule); padding: 0.4rem 0.6rem; }
td { padding: 0.4rem 0.6rem; border-bottom: 1px solid var(--rule); }
.tag { display: inline-block; background: var(--accent-soft); color: var(--accent); font-size: 0.75rem; padding: 0 0.45rem; border-radius: 3px; vertical-align: middle; }
.muted { color: #7b8794; }
"#;

/// Self-contained page: summary, chart grid, indicator sections, forecasts
pub fn render_html(report: &EconomicReport, history: &BTreeMap<String, Vec<Observation>>, catalog: &Catalog) -> String {
    let charts: String = CHART_INDICATORS
        .iter()
        .map(|key| {
            let name = catalog.display_name(key);
            match history.get(*key) {
                Some(obs) if obs.len() >= 2 => chart_card(&name, obs),
                _ => format!(
                    r#"<div class="chart-card"><h3>{}</h3><p class="muted">No data in the last 24 months</p></div>"#,
                    escape_html(&name)
                ),
            }
        })
        .collect();

    let summary: String = report
        .executive_summary
        .iter()
        .map(|line| format!("<li>{}</li>", escape_html(line)))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{stylesheet}</style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>{title}</h1>
            <p>Generated {generated} &middot; last {months} months</p>
        </div>

        <div class="panel">
            <h2>Executive Summary</h2>
            <ul>{summary}</ul>
        </div>

        <div class="chart-grid">{charts}</div>

        <div class="panel">
            <h2>Indicators</h2>
            {indicators}
        </div>

        <div class="panel">
            <h2>Correlations</h2>
            {correlations}
        </div>

        <div class="panel">
            <h2>Forecasts</h2>
            {predictions}
        </div>
    </div>
</body>
</html>
"#,
        stylesheet = STYLESHEET,
        title = escape_html(&report.title),
        generated = format_datetime(&report.generated_at),
        months = report.period_months,
        summary = summary,
        charts = charts,
        indicators = indicator_sections(report),
        correlations = correlation_table(report),
        predictions = prediction_tables(report, catalog),
    )
}

fn indicator_sections(report: &EconomicReport) -> String {
    if report.indicators.is_empty() {
        return r#"<p class="muted">No stored data for the main indicators.</p>"#.to_string();
    }

    let mut html = String::new();
    for section in &report.indicators {
        let last = match (section.last_value, section.last_date) {
            (Some(v), Some(d)) => format!("{} on {}", format_value(v), format_bcb_date(&d)),
            _ => "n/a".to_string(),
        };
        let insights: String = section
            .insights
            .iter()
            .map(|i| format!("<li>{}</li>", escape_html(i)))
            .collect();
        let _ = write!(
            html,
            r#"<h3>{name} <span class="tag">{trend}</span></h3>
            <p class="muted">Last value {last} &middot; change {change} &middot; r² {confidence:.2}</p>
            <ul>{insights}</ul>"#,
            name = escape_html(&section.name),
            trend = section.trend.trend,
            last = last,
            change = format_pct(section.trend.recent_change_pct),
            confidence = section.trend.confidence,
            insights = insights,
        );
    }
    html
}

fn correlation_table(report: &EconomicReport) -> String {
    if report.correlations.is_empty() {
        return r#"<p class="muted">No significant correlations in the period.</p>"#.to_string();
    }

    let rows: String = report
        .correlations
        .iter()
        .map(|c| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{:.3}</td><td>{}</td></tr>",
                escape_html(&c.first),
                escape_html(&c.second),
                c.correlation,
                c.strength.as_str()
            )
        })
        .collect();
    format!("<table><tr><th>Indicator</th><th>Indicator</th><th>r</th><th>Strength</th></tr>{}</table>", rows)
}

fn prediction_tables(report: &EconomicReport, catalog: &Catalog) -> String {
    if report.predictions.is_empty() {
        return r#"<p class="muted">No trained models. Run <code>bcbcast train</code> first.</p>"#.to_string();
    }

    let mut html = String::new();
    for prediction in &report.predictions {
        let rows: String = prediction
            .forecast
            .iter()
            .map(|p| format!("<tr><td>{}</td><td>{}</td></tr>", format_bcb_date(&p.date), format_value(p.value)))
            .collect();
        let _ = write!(
            html,
            r#"<h3>{} <span class="tag">{}</span></h3><table><tr><th>Date</th><th>Forecast</th></tr>{}</table>"#,
            escape_html(&catalog.display_name(&prediction.indicator)),
            prediction.trend_forecast,
            rows
        );
    }
    html
}

/// Inline SVG line chart scaled to the series range
fn chart_card(name: &str, observations: &[Observation]) -> String {
    let min = observations.iter().map(|o| o.value).fold(f64::INFINITY, f64::min);
    let max = observations.iter().map(|o| o.value).fold(f64::NEG_INFINITY, f64::max);
    let span = if max > min { max - min } else { 1.0 };
    let last_idx = (observations.len() - 1).max(1) as f64;

    let plot_w = CHART_WIDTH - 2.0 * CHART_PAD;
    let plot_h = CHART_HEIGHT - 2.0 * CHART_PAD;
    let points: Vec<String> = observations
        .iter()
        .enumerate()
        .map(|(i, o)| {
            let x = CHART_PAD + plot_w * i as f64 / last_idx;
            let y = CHART_PAD + plot_h * (1.0 - (o.value - min) / span);
            format!("{:.1},{:.1}", x, y)
        })
        .collect();

    let first_date = format_bcb_date(&observations[0].date);
    let last_date = format_bcb_date(&observations[observations.len() - 1].date);

    format!(
        r##"<div class="chart-card"><h3>{name}</h3>
<svg viewBox="0 0 {w} {h}" xmlns="http://www.w3.org/2000/svg" role="img" aria-label="{name}">
<line x1="{pad}" y1="{bottom}" x2="{right}" y2="{bottom}" stroke="#d9e2ec"/>
<line x1="{pad}" y1="{pad}" x2="{pad}" y2="{bottom}" stroke="#d9e2ec"/>
<polyline fill="none" stroke="#00695c" stroke-width="2" points="{points}"/>
<text x="{pad}" y="{pad_text}" font-size="11" fill="#666">{max}</text>
<text x="{pad}" y="{bottom_text}" font-size="11" fill="#666">{min}</text>
<text x="{pad}" y="{h_text}" font-size="11" fill="#666">{first_date}</text>
<text x="{right}" y="{h_text}" font-size="11" fill="#666" text-anchor="end">{last_date}</text>
</svg></div>"##,
        name = escape_html(name),
        w = CHART_WIDTH,
        h = CHART_HEIGHT,
        pad = CHART_PAD,
        right = CHART_WIDTH - CHART_PAD,
        bottom = CHART_HEIGHT - CHART_PAD,
        pad_text = CHART_PAD - 6.0,
        bottom_text = CHART_HEIGHT - CHART_PAD + 14.0,
        h_text = CHART_HEIGHT - 4.0,
        points = points.join(" "),
        max = format_value(max),
        min = format_value(min),
        first_date = first_date,
        last_date = last_date,
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Program and leading arguments that hand a file to the desktop's default
/// handler
fn opener() -> (&'static str, &'static [&'static str]) {
    if cfg!(target_os = "windows") {
        ("cmd", &["/C", "start", ""])
    } else if cfg!(target_os = "macos") {
        ("open", &[])
    } else {
        ("xdg-open", &[])
    }
}

pub fn open_in_browser(path: &str) -> AppResult<()> {
    let (program, args) = opener();
    std::process::Command::new(program)
        .args(args)
        .arg(path)
        .spawn()
        .map(|_| ())
        .map_err(|e| AppError::System(format!("Could not launch {} for {}: {}", program, path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{TrendAnalysis, TrendDirection};
    use crate::report::IndicatorSection;
    use chrono::{NaiveDate, Utc};

    fn obs(month: u32, value: f64) -> Observation {
        Observation::new(NaiveDate::from_ymd_opt(2024, month, 1).unwrap(), value)
    }

    #[test]
    fn test_page_contains_charts_and_escaped_text() {
        let report = EconomicReport {
            title: "Overview <test>".to_string(),
            generated_at: Utc::now(),
            period_months: 12,
            indicators: vec![IndicatorSection {
                key: "ipca".to_string(),
                name: "Inflation (IPCA)".to_string(),
                trend: TrendAnalysis {
                    trend: TrendDirection::Ascending,
                    slope: 0.1,
                    confidence: 0.8,
                    recent_change_pct: 12.5,
                    volatility: 4.0,
                    observations: 3,
                    last_value: Some(0.5),
                },
                insights: vec!["Rising & persistent".to_string()],
                last_value: Some(0.5),
                last_date: Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            }],
            correlations: Vec::new(),
            predictions: Vec::new(),
            executive_summary: vec!["OUTLOOK: fine".to_string()],
        };
        let mut history = BTreeMap::new();
        history.insert("ipca".to_string(), vec![obs(1, 0.4), obs(2, 0.8), obs(3, 0.5)]);

        let html = render_html(&report, &history, &Catalog::default());

        assert!(html.contains("Overview &lt;test&gt;"));
        assert!(html.contains("Rising &amp; persistent"));
        assert_eq!(html.matches("<polyline").count(), 1);
        assert_eq!(html.matches("No data in the last 24 months").count(), 3);
        assert!(html.contains("No trained models"));
    }

    #[test]
    fn test_opener_matches_platform() {
        let (program, args) = opener();
        if cfg!(target_os = "windows") {
            assert_eq!((program, args.len()), ("cmd", 3));
        } else if cfg!(target_os = "macos") {
            assert_eq!(program, "open");
        } else {
            assert_eq!(program, "xdg-open");
            assert!(args.is_empty());
        }
    }

    #[test]
    fn test_stylesheet_is_embedded_once() {
        let report = EconomicReport {
            title: "t".to_string(),
            generated_at: Utc::now(),
            period_months: 6,
            indicators: Vec::new(),
            correlations: Vec::new(),
            predictions: Vec::new(),
            executive_summary: Vec::new(),
        };
        let html = render_html(&report, &BTreeMap::new(), &Catalog::default());
        assert_eq!(html.matches("<style>").count(), 1);
        assert!(html.contains("--accent: #00695c"));
        assert!(html.contains("No stored data for the main indicators."));
    }

    #[test]
    fn test_flat_series_chart_does_not_divide_by_zero() {
        let svg = chart_card("Flat", &[obs(1, 2.0), obs(2, 2.0)]);
        assert!(!svg.contains("NaN"));
        assert!(!svg.contains("inf"));
    }
}
