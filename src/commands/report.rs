use super::open_store;
use crate::cli::{ReportArgs, ReportCommands};
use crate::config::Config;
use crate::core::traits::SeriesStore;
use crate::forecast::Predictor;
use crate::report::{ReportGenerator, open_in_browser};
use crate::utils::error::{FlowResult, handle_flow};
use crate::utils::format::format_datetime;
use crate::utils::{Align, OutputStyle, Table, print_info, print_success, print_warning};
use anyhow::{Result, bail};
use chrono::Local;
use std::sync::Arc;

async fn build_generator(config: &Config) -> Result<ReportGenerator> {
    let store: Arc<dyn SeriesStore> = open_store(config).await?;
    let predictor = Predictor::new(store.clone(), config.ml.clone());
    Ok(ReportGenerator::new(
        store,
        predictor,
        config.catalog(),
        config.reports.clone(),
    ))
}

pub async fn handle_report_command(config: Config, args: &ReportArgs) -> Result<()> {
    let generator = build_generator(&config).await?;
    match args.command {
        Some(ReportCommands::List) => handle_list(&generator),
        None => handle_generate(&generator, args).await,
    }
}

async fn handle_generate(generator: &ReportGenerator, args: &ReportArgs) -> Result<()> {
    if args.open && args.no_html {
        bail!("--open needs the HTML page; drop --no-html");
    }

    print_info(&format!("Generating economic report for the last {} months...", args.months));
    let generated = generator
        .generate(args.months, Local::now().date_naive(), !args.no_html)
        .await?;
    let report = &generated.report;

    if report.indicators.is_empty() {
        print_warning("No stored data for the main indicators. Run `bcbcast collect` first.");
    }

    OutputStyle::print_header(&format!("📑 {}", report.title));
    for line in &report.executive_summary {
        println!("  • {}", OutputStyle::content(line));
    }
    println!();
    OutputStyle::print_field_colored("Indicators", &report.indicators.len().to_string(), OutputStyle::number);
    OutputStyle::print_field_colored("Correlations", &report.correlations.len().to_string(), OutputStyle::number);
    OutputStyle::print_field_colored("Forecasts", &report.predictions.len().to_string(), OutputStyle::number);
    println!();

    print_success(&format!("JSON report: {}", generated.json_path.display()));
    if let Some(html) = &generated.html_path {
        print_success(&format!("HTML report: {}", html.display()));
        if args.open {
            open_in_browser(&html.to_string_lossy())?;
        }
    }
    Ok(())
}

fn handle_list(generator: &ReportGenerator) -> Result<()> {
    let files = generator.list_reports()?;
    if files.is_empty() {
        handle_flow(FlowResult::EmptyList {
            item_type: "reports".to_string(),
        });
        return Ok(());
    }

    let mut table = Table::new(&["File", "Size", "Modified"]).align(1, Align::Right);
    for file in &files {
        table.add_row(vec![
            file.name.clone(),
            format!("{:.1} KB", file.size as f64 / 1024.0),
            file.modified.map(|m| format_datetime(&m)).unwrap_or_default(),
        ]);
    }
    OutputStyle::print_header(&format!("🗂️  Reports ({})", files.len()));
    table.print()?;
    println!("{}", OutputStyle::muted(&generator.output_dir().display().to_string()));
    Ok(())
}
