use super::open_store;
use crate::cli::{CollectArgs, IndicatorsArgs, OutputFormat, PeriodArgs};
use crate::collector::{BatchOutcome, Collector, SgsClient};
use crate::config::{Config, MAX_YEARS};
use crate::core::catalog::Indicator;
use crate::core::data::{CollectionRun, DateWindow};
use crate::core::traits::SeriesStore;
use crate::utils::format::{format_bcb_date, parse_user_date};
use crate::utils::{Align, OutputStyle, Table, print_info, print_json, print_success, print_warning};
use anyhow::{Context, Result, anyhow, bail};
use chrono::{Local, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

fn build_collector(config: &Config) -> Result<Collector> {
    let client = SgsClient::new(&config.collection)?;
    Ok(Collector::new(Arc::new(client), config.catalog())
        .with_concurrency(config.collection.concurrency)
        .with_delay(config.collection.delay()))
}

fn parse_window(start: &str, end: &str) -> Result<DateWindow> {
    let start = parse_user_date(start).ok_or_else(|| anyhow!("Invalid start date '{}', expected dd/mm/YYYY", start))?;
    let end = parse_user_date(end).ok_or_else(|| anyhow!("Invalid end date '{}', expected dd/mm/YYYY", end))?;
    if start > end {
        bail!("Start date {} is after end date {}", format_bcb_date(&start), format_bcb_date(&end));
    }
    Ok(DateWindow::new(start, end))
}

pub async fn handle_collect_command(config: Config, args: &CollectArgs) -> Result<()> {
    let collector = build_collector(&config)?;
    // Fail on unknown keys before touching the network.
    collector.catalog().resolve(&args.indicators)?;

    if !args.skip_api_check {
        print_info("Checking BCB API status...");
        if !collector.check_api_status().await {
            bail!("BCB API is not responding. Try again later or pass --skip-api-check");
        }
    }

    let started_at = Utc::now();
    let outcome = match (&args.start, &args.end) {
        (Some(start), Some(end)) => {
            let window = parse_window(start, end)?;
            let keys = if args.indicators.is_empty() {
                collector.catalog().keys()
            } else {
                args.indicators.clone()
            };
            collector.collect_batch(&keys, Some(window)).await?
        }
        _ => {
            let years = args.years.unwrap_or(config.collection.default_years);
            if years == 0 || years > MAX_YEARS {
                bail!("years of history must be between 1 and {}", MAX_YEARS);
            }
            collector
                .collect_all(years, &args.indicators, Local::now().date_naive())
                .await?
        }
    };

    let store = open_store(&config).await?;
    let mut saved: HashMap<String, usize> = HashMap::new();
    for (key, series) in &outcome.series {
        let rows = store
            .save_series(series)
            .await
            .with_context(|| format!("Failed to save {}", key))?;
        saved.insert(key.clone(), rows);
    }

    let run = CollectionRun {
        id: uuid::Uuid::new_v4().to_string(),
        started_at,
        finished_at: Utc::now(),
        indicators: outcome.series.keys().chain(outcome.failures.keys()).cloned().collect(),
        records: saved.values().sum(),
        successful: outcome.series.len(),
        failed: outcome.failures.len(),
    };
    store.record_run(&run).await?;

    print_outcome(&outcome, &saved)?;

    if outcome.series.is_empty() {
        bail!("No indicator could be collected");
    }
    Ok(())
}

fn print_outcome(outcome: &BatchOutcome, saved: &HashMap<String, usize>) -> Result<()> {
    println!();
    OutputStyle::print_header("📥 Collection Result");

    let mut table = Table::new(&["Indicator", "Records", "Period", "Saved"])
        .align(1, Align::Right)
        .align(3, Align::Right);
    for (key, series) in &outcome.series {
        let period = match (series.first_date(), series.last_date()) {
            (Some(first), Some(last)) => format!("{} - {}", format_bcb_date(&first), format_bcb_date(&last)),
            _ => "-".to_string(),
        };
        table.add_row(vec![
            key.clone(),
            series.len().to_string(),
            period,
            saved.get(key).copied().unwrap_or(0).to_string(),
        ]);
    }
    for (key, error) in &outcome.failures {
        table.add_row(vec![key.clone(), "0".to_string(), format!("failed: {}", error), "0".to_string()]);
    }
    table.print()?;

    let stats = &outcome.stats;
    println!();
    OutputStyle::print_field_colored("Requests", &stats.total_requests.to_string(), OutputStyle::number);
    OutputStyle::print_field_colored(
        "Success rate",
        &format!("{:.1}%", stats.success_rate()),
        OutputStyle::number,
    );
    OutputStyle::print_field_colored("Records", &stats.total_records.to_string(), OutputStyle::number);
    OutputStyle::print_field_colored(
        "Elapsed",
        &format!("{:.1}s", outcome.elapsed.as_secs_f64()),
        OutputStyle::muted,
    );
    if let Some(window) = &outcome.window {
        OutputStyle::print_field_colored(
            "Window",
            &format!("{} - {}", window.start_param(), window.end_param()),
            OutputStyle::date,
        );
    }
    println!();

    if outcome.failures.is_empty() {
        print_success(&format!("Collected {} indicator(s)", outcome.series.len()));
    } else {
        print_warning(&format!(
            "Collected {} of {} indicator(s)",
            outcome.series.len(),
            outcome.requested()
        ));
    }
    Ok(())
}

#[derive(Serialize)]
struct IndicatorListing<'a> {
    #[serde(flatten)]
    indicator: &'a Indicator,
    stored: usize,
}

pub async fn handle_indicators_command(config: Config, args: &IndicatorsArgs) -> Result<()> {
    let catalog = config.catalog();
    let store = open_store(&config).await?;
    let counts: HashMap<String, usize> = store
        .summaries()
        .await?
        .into_iter()
        .map(|s| (s.indicator, s.count))
        .collect();

    if args.format == OutputFormat::Json {
        let listing: Vec<IndicatorListing> = catalog
            .iter()
            .map(|indicator| IndicatorListing {
                indicator,
                stored: counts.get(&indicator.key).copied().unwrap_or(0),
            })
            .collect();
        print_json(&listing)?;
        return Ok(());
    }

    let mut table = Table::new(&["Key", "Series", "Name", "Frequency", "Unit", "Stored"])
        .align(1, Align::Right)
        .align(5, Align::Right);
    for indicator in catalog.iter() {
        table.add_row(vec![
            indicator.key.clone(),
            indicator.series_id.to_string(),
            indicator.name.clone(),
            indicator.frequency.to_string(),
            indicator.unit.clone(),
            counts.get(&indicator.key).copied().unwrap_or(0).to_string(),
        ]);
    }
    OutputStyle::print_header(&format!("📊 Indicators ({})", catalog.len()));
    table.print()?;
    Ok(())
}

pub async fn handle_period_command(config: Config, args: &PeriodArgs) -> Result<()> {
    let collector = build_collector(&config)?;
    let name = collector.catalog().display_name(&args.indicator);

    print_info(&format!("Querying full history of {}...", name));
    let period = collector.available_period(&args.indicator).await?;

    OutputStyle::print_header(&format!("🗓️  {}", name));
    OutputStyle::print_field_colored("First date", &format_bcb_date(&period.first), OutputStyle::date);
    OutputStyle::print_field_colored("Last date", &format_bcb_date(&period.last), OutputStyle::date);
    OutputStyle::print_field_colored("Observations", &period.count.to_string(), OutputStyle::number);
    OutputStyle::print_field_colored("Span", &format!("{:.1} years", period.years()), OutputStyle::number);
    Ok(())
}
