use super::open_store;
use crate::analysis::{TrendDirection, analyze_trend, detect_outliers, generate_insights};
use crate::cli::AnalyzeArgs;
use crate::config::Config;
use crate::core::data::days_before;
use crate::core::traits::SeriesStore;
use crate::utils::format::{format_bcb_date, format_pct, format_value};
use crate::utils::{Align, OutputStyle, Table, print_info};
use anyhow::Result;
use chrono::Local;

pub async fn handle_analyze_command(config: Config, args: &AnalyzeArgs) -> Result<()> {
    let catalog = config.catalog();
    catalog.require(&args.indicator)?;

    let cutoff = days_before(Local::now().date_naive(), 30 * args.months as u64)?;
    let store = open_store(&config).await?;
    let observations = store.load_series(&args.indicator, Some(cutoff), None).await?;
    let name = catalog.display_name(&args.indicator);

    if observations.is_empty() {
        print_info(&format!(
            "No data for {} in the last {} months. Run `bcbcast collect -i {}` first.",
            name, args.months, args.indicator
        ));
        return Ok(());
    }

    let trend = analyze_trend(&observations);
    OutputStyle::print_header(&format!("🔍 {} ({} months)", name, args.months));

    let trend_text = trend.trend.to_string();
    let trend_color = match trend.trend {
        TrendDirection::Ascending => OutputStyle::success,
        TrendDirection::Descending => OutputStyle::error,
        _ => OutputStyle::muted,
    };
    OutputStyle::print_field_colored("Trend", &trend_text, trend_color);
    OutputStyle::print_field_colored("Confidence (r²)", &format!("{:.3}", trend.confidence), OutputStyle::number);
    OutputStyle::print_field_colored("Slope / day", &format!("{:.6}", trend.slope), OutputStyle::number);
    let change = format_pct(trend.recent_change_pct);
    println!(
        "{:>18}: {}",
        OutputStyle::label("Change"),
        OutputStyle::signed(trend.recent_change_pct, &change)
    );
    OutputStyle::print_field_colored("Volatility", &format!("{:.2}%", trend.volatility), OutputStyle::number);
    OutputStyle::print_field_colored("Observations", &trend.observations.to_string(), OutputStyle::muted);
    if let Some(last) = trend.last_value {
        OutputStyle::print_field_colored("Last value", &format_value(last), OutputStyle::number);
    }

    let outliers = detect_outliers(&observations);
    println!();
    if outliers.is_empty() {
        println!("{}", OutputStyle::muted("No outliers detected"));
    } else {
        println!("{}", OutputStyle::title(&format!("Outliers ({})", outliers.len())));
        let mut table = Table::new(&["Date", "Value", "Kind", "Deviation (σ)"])
            .align(1, Align::Right)
            .align(3, Align::Right);
        for outlier in &outliers {
            table.add_row(vec![
                format_bcb_date(&outlier.date),
                format_value(outlier.value),
                outlier.kind.to_string(),
                format!("{:.2}", outlier.deviation),
            ]);
        }
        table.print()?;
    }

    let insights = generate_insights(&args.indicator, &name, &observations, &config.reports);
    println!();
    println!("{}", OutputStyle::title("💡 Insights"));
    for insight in &insights {
        println!("  • {}", OutputStyle::content(insight));
    }
    Ok(())
}
