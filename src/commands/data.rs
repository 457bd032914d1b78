use super::open_store;
use crate::analysis::stats::{median, population_std, quantile};
use crate::cli::{DataCommands, DataFormat, DataKeyArgs, DataShowArgs, HistoryArgs, PurgeArgs};
use crate::config::Config;
use crate::core::data::Observation;
use crate::core::traits::SeriesStore;
use crate::utils::format::{format_bcb_date, format_datetime, format_value, parse_user_date};
use crate::utils::error::{FlowResult, handle_flow};
use crate::utils::{Align, OutputStyle, Table, print_json, print_warning, prompt_yes_no};
use anyhow::{Result, anyhow, bail};
use chrono::NaiveDate;
use serde::Serialize;

pub async fn handle_data_command(config: Config, command: DataCommands) -> Result<()> {
    match command {
        DataCommands::List => handle_list(&config).await,
        DataCommands::Show(args) => handle_show(&config, &args).await,
        DataCommands::Stats(args) => handle_stats(&config, &args).await,
        DataCommands::History(args) => handle_history(&config, &args).await,
        DataCommands::Purge(args) => handle_purge(&config, &args).await,
    }
}

async fn handle_list(config: &Config) -> Result<()> {
    let catalog = config.catalog();
    let store = open_store(config).await?;
    let summaries = store.summaries().await?;

    if summaries.is_empty() {
        handle_flow(FlowResult::EmptyList {
            item_type: "stored series".to_string(),
        });
        return Ok(());
    }

    let mut table = Table::new(&["Indicator", "Name", "Records", "First", "Last", "Last value"])
        .align(2, Align::Right)
        .align(5, Align::Right);
    for s in &summaries {
        table.add_row(vec![
            s.indicator.clone(),
            catalog.display_name(&s.indicator),
            s.count.to_string(),
            s.first_date.map(|d| format_bcb_date(&d)).unwrap_or_default(),
            s.last_date.map(|d| format_bcb_date(&d)).unwrap_or_default(),
            s.last_value.map(format_value).unwrap_or_default(),
        ]);
    }

    OutputStyle::print_header("🗄️  Stored Series");
    table.print()?;
    println!(
        "{} indicator(s), {} records in {}",
        summaries.len(),
        summaries.iter().map(|s| s.count).sum::<usize>(),
        OutputStyle::muted(&store.path().display().to_string())
    );
    Ok(())
}

fn parse_bound(value: Option<&str>, label: &str) -> Result<Option<NaiveDate>> {
    value
        .map(|v| parse_user_date(v).ok_or_else(|| anyhow!("Invalid {} date '{}'", label, v)))
        .transpose()
}

async fn load_known(config: &Config, key: &str, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Vec<Observation>> {
    config.catalog().require(key)?;
    let store = open_store(config).await?;
    let observations = store.load_series(key, from, to).await?;
    if observations.is_empty() {
        bail!("No stored data for '{}'. Run `bcbcast collect -i {}` first", key, key);
    }
    Ok(observations)
}

async fn handle_show(config: &Config, args: &DataShowArgs) -> Result<()> {
    let from = parse_bound(args.from.as_deref(), "from")?;
    let to = parse_bound(args.to.as_deref(), "to")?;
    let observations = load_known(config, &args.indicator, from, to).await?;

    match args.format {
        DataFormat::Json => print_json(&observations)?,
        DataFormat::Csv => print!("{}", to_csv(&observations)),
        DataFormat::Table => {
            let mut table = Table::new(&["Date", "Value"]).align(1, Align::Right);
            for obs in &observations {
                table.add_row(vec![format_bcb_date(&obs.date), format_value(obs.value)]);
            }
            OutputStyle::print_header(&format!(
                "{} ({} records)",
                config.catalog().display_name(&args.indicator),
                observations.len()
            ));
            table.print()?;
        }
    }
    Ok(())
}

fn to_csv(observations: &[Observation]) -> String {
    let mut out = String::from("date,value\n");
    for obs in observations {
        out.push_str(&format!("{},{}\n", obs.date.format("%Y-%m-%d"), obs.value));
    }
    out
}

#[derive(Debug, Serialize, PartialEq)]
struct SeriesStats {
    count: usize,
    mean: f64,
    std: f64,
    min: f64,
    q1: f64,
    median: f64,
    q3: f64,
    max: f64,
}

fn describe(observations: &[Observation]) -> Option<SeriesStats> {
    let values: Vec<f64> = observations.iter().map(|o| o.value).collect();
    if values.is_empty() {
        return None;
    }
    Some(SeriesStats {
        count: values.len(),
        mean: values.iter().sum::<f64>() / values.len() as f64,
        std: population_std(&values),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        q1: quantile(&values, 0.25)?,
        median: median(&values)?,
        q3: quantile(&values, 0.75)?,
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}

async fn handle_stats(config: &Config, args: &DataKeyArgs) -> Result<()> {
    let observations = load_known(config, &args.indicator, None, None).await?;
    let stats = describe(&observations).ok_or_else(|| anyhow!("No values to describe"))?;

    OutputStyle::print_header(&format!("📈 {}", config.catalog().display_name(&args.indicator)));
    if let (Some(first), Some(last)) = (observations.first(), observations.last()) {
        OutputStyle::print_field_colored(
            "Period",
            &format!("{} - {}", format_bcb_date(&first.date), format_bcb_date(&last.date)),
            OutputStyle::date,
        );
    }
    let fields = [
        ("Mean", stats.mean),
        ("Std dev", stats.std),
        ("Min", stats.min),
        ("Q1", stats.q1),
        ("Median", stats.median),
        ("Q3", stats.q3),
        ("Max", stats.max),
    ];
    OutputStyle::print_field_colored("Count", &stats.count.to_string(), OutputStyle::number);
    for (label, value) in fields {
        OutputStyle::print_field_colored(label, &format_value(value), OutputStyle::number);
    }
    Ok(())
}

async fn handle_history(config: &Config, args: &HistoryArgs) -> Result<()> {
    let store = open_store(config).await?;
    let runs = store.recent_runs(args.limit).await?;

    if runs.is_empty() {
        handle_flow(FlowResult::EmptyList {
            item_type: "collection runs".to_string(),
        });
        return Ok(());
    }

    let mut table = Table::new(&["Started", "Duration", "Indicators", "Records", "OK", "Failed"])
        .align(1, Align::Right)
        .align(3, Align::Right)
        .align(4, Align::Right)
        .align(5, Align::Right);
    for run in &runs {
        let secs = (run.finished_at - run.started_at).num_milliseconds() as f64 / 1000.0;
        table.add_row(vec![
            format_datetime(&run.started_at),
            format!("{:.1}s", secs),
            run.indicators.join(", "),
            run.records.to_string(),
            run.successful.to_string(),
            run.failed.to_string(),
        ]);
    }
    OutputStyle::print_header("🕘 Collection History");
    table.print()?;
    Ok(())
}

async fn handle_purge(config: &Config, args: &PurgeArgs) -> Result<()> {
    if let Some(key) = &args.indicator {
        config.catalog().require(key)?;
    }

    let target = match &args.indicator {
        Some(key) => format!("all stored data for '{}'", key),
        None => "ALL stored data and collection history".to_string(),
    };
    if !args.force && !prompt_yes_no(&format!("Delete {}?", target))? {
        handle_flow(FlowResult::Cancelled("Purge cancelled".to_string()));
        return Ok(());
    }

    let store = open_store(config).await?;
    let removed = match &args.indicator {
        Some(key) => store.delete_indicator(key).await?,
        None => store.purge().await?,
    };

    if removed == 0 {
        print_warning("Nothing to delete");
    } else {
        handle_flow(FlowResult::Success(format!("Deleted {} record(s)", removed)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(day: u32, value: f64) -> Observation {
        Observation::new(NaiveDate::from_ymd_opt(2024, 1, day).unwrap(), value)
    }

    #[test]
    fn test_csv_export() {
        let csv = to_csv(&[obs(1, 0.42), obs(2, 0.5)]);
        assert_eq!(csv, "date,value\n2024-01-01,0.42\n2024-01-02,0.5\n");
    }

    #[test]
    fn test_describe() {
        let stats = describe(&[obs(1, 1.0), obs(2, 2.0), obs(3, 3.0), obs(4, 4.0)]).unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert!(describe(&[]).is_none());
    }
}
