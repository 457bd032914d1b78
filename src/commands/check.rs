use crate::cli::CheckArgs;
use crate::config::Config;
use crate::health::{CheckStatus, run_checks};
use crate::utils::OutputStyle;
use anyhow::{Result, bail};

pub async fn handle_check_command(config: Config, args: &CheckArgs) -> Result<()> {
    let report = run_checks(&config, args.module, args.online).await;

    OutputStyle::print_header("🩺 System Check");
    for result in &report.results {
        let mark = match result.status {
            CheckStatus::Pass => OutputStyle::success("✓"),
            CheckStatus::Warn => OutputStyle::warning("!"),
            CheckStatus::Fail => OutputStyle::error("✗"),
        };
        println!("  {} {:<12} {}", mark, OutputStyle::label(&result.name), result.message);
        if args.verbose {
            for detail in &result.details {
                println!("      {}", OutputStyle::muted(detail));
            }
        }
    }

    println!();
    println!(
        "{} passed, {} warnings, {} failed",
        OutputStyle::success(&report.count(CheckStatus::Pass).to_string()),
        OutputStyle::warning(&report.count(CheckStatus::Warn).to_string()),
        OutputStyle::error(&report.count(CheckStatus::Fail).to_string()),
    );

    if report.has_failures() {
        bail!("{} check(s) failed", report.count(CheckStatus::Fail));
    }
    Ok(())
}
