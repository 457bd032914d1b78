use anyhow::Result;
use bcbcast::cli::Cli;
use bcbcast::config::Config;
use bcbcast::utils::error::{AppError, report_error};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bcbcast={}", default_level)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(config_path) => Config::load_custom(config_path)?,
        None => Config::load()?,
    };

    if cli.no_color || !config.general.color {
        colored::control::set_override(false);
    }

    cli.command.execute(config).await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(err) = run(cli).await {
        match err.downcast_ref::<AppError>() {
            Some(app_err) => report_error(app_err),
            None => eprintln!("❌ {:#}", err),
        }
        std::process::exit(1);
    }
}
