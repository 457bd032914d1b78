use crate::cli::ConfigCommands;
use crate::config::{Config, set_config_value};
use crate::utils::error::{FlowResult, handle_flow};
use crate::utils::{self, OutputStyle, print_success};
use anyhow::{Context, Result, bail};
use std::path::PathBuf;

pub fn handle_config_command(mut config: Config, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) => handle_show_command(&config),
        Some(ConfigCommands::Path) => {
            println!("{}", config_path(&config).display());
            Ok(())
        }
        Some(ConfigCommands::Reset { force }) => handle_reset_command(&mut config, force),
        Some(ConfigCommands::Validate) => handle_validate_command(&config),
        Some(ConfigCommands::Set { key, value }) => handle_set_command(&config, &key, &value),
        None => handle_config_help(&config),
    }
}

fn config_path(config: &Config) -> PathBuf {
    config.source.clone().unwrap_or_else(Config::config_file_path)
}

fn handle_show_command(config: &Config) -> Result<()> {
    OutputStyle::print_header("⚙️  bcbcast Configuration");
    println!("{}", OutputStyle::muted(&config_path(config).display().to_string()));
    println!();

    println!("General:");
    println!("  Color: {}", config.general.color);

    println!("Database:");
    println!("  Path: {}", config.database.path.display());

    let c = &config.collection;
    println!("Collection:");
    println!("  Base URL: {}", c.base_url);
    println!("  Default years: {}", c.default_years);
    println!("  Max retries: {}", c.max_retries);
    println!("  Request timeout: {}s", c.request_timeout_secs);
    println!("  Delay between requests: {}ms", c.delay_between_requests_ms);
    println!("  Concurrency: {}", c.concurrency);
    if !c.indicators.is_empty() {
        let keys: Vec<&str> = c.indicators.iter().map(|i| i.key.as_str()).collect();
        println!("  Custom indicators: {}", keys.join(", "));
    }

    let ml = &config.ml;
    println!("ML:");
    println!("  Models dir: {}", ml.models_dir.display());
    println!("  Test size: {}", ml.default_test_size);
    println!("  Window size: {}", ml.window_size);
    println!("  Max lag periods: {}", ml.max_lag_periods);
    println!("  Min data points: {}", ml.min_data_points);
    println!("  Trees: {}", ml.n_estimators);
    match ml.max_depth {
        Some(depth) => println!("  Max depth: {}", depth),
        None => println!("  Max depth: unlimited"),
    }
    println!("  Min samples split: {}", ml.min_samples_split);
    println!("  Random state: {}", ml.random_state);

    let r = &config.reports;
    println!("Reports:");
    println!("  Output dir: {}", r.output_dir.display());
    println!("  Max insights per indicator: {}", r.max_insights_per_indicator);
    println!("  Confidence threshold: {}", r.confidence_threshold);
    println!("  Correlation threshold: {}", r.correlation_threshold);

    Ok(())
}

fn handle_config_help(config: &Config) -> Result<()> {
    println!("⚙️  Configuration Management");
    println!("==========================");
    println!("Available configuration commands:");
    println!("  bcbcast config show               - Show current configuration");
    println!("  bcbcast config path               - Print the configuration file location");
    println!("  bcbcast config validate           - Check the configuration for problems");
    println!("  bcbcast config set <key> <value>  - Change a single value");
    println!("  bcbcast config reset              - Reset configuration to defaults");
    println!();
    println!("Configuration file location: {}", config_path(config).display());
    Ok(())
}

fn handle_validate_command(config: &Config) -> Result<()> {
    let errors = config.validation_errors();
    if errors.is_empty() {
        print_success("Configuration is valid");
        return Ok(());
    }
    for error in &errors {
        println!("  {} {}", OutputStyle::error("✗"), error);
    }
    bail!("{} configuration problem(s) found", errors.len());
}

fn handle_set_command(config: &Config, key: &str, value: &str) -> Result<()> {
    let path = config_path(config);
    if !path.exists() {
        config.save_to(&path)?;
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let updated = set_config_value(&content, key, value)?;
    std::fs::write(&path, updated).with_context(|| format!("Failed to write {}", path.display()))?;
    print_success(&format!("{} = {}", key, value));
    Ok(())
}

fn handle_reset_command(config: &mut Config, force: bool) -> Result<()> {
    if force
        || utils::prompt_yes_no(
            "Are you sure you want to reset configuration to defaults? This will overwrite your current settings.",
        )?
    {
        let source = config.source.take();
        *config = Config::default();
        config.source = source;
        config.save()?;
        print_success("Configuration reset to defaults!");
    } else {
        handle_flow(FlowResult::Cancelled("Reset cancelled".to_string()));
    }
    Ok(())
}
