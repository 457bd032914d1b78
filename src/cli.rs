use crate::commands::{analyze, check, collect, configure, data, model, report};
use crate::config::{Config, MAX_MONTHS, MAX_YEARS};
use crate::health::CheckModule;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bcbcast")]
#[command(about = "Collect, analyze and forecast Brazilian Central Bank economic series")]
#[command(version)]
pub struct Cli {
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable debug logging")]
    pub debug: bool,

    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Commands {
    pub async fn execute(self, config: Config) -> Result<()> {
        match self {
            Commands::Collect(args) => collect::handle_collect_command(config, &args).await?,
            Commands::Indicators(args) => collect::handle_indicators_command(config, &args).await?,
            Commands::Period(args) => collect::handle_period_command(config, &args).await?,
            Commands::Data(args) => data::handle_data_command(config, args.command).await?,
            Commands::Train(args) => model::handle_train_command(config, &args).await?,
            Commands::Predict(args) => model::handle_predict_command(config, &args).await?,
            Commands::Importance(args) => model::handle_importance_command(config, &args).await?,
            Commands::Analyze(args) => analyze::handle_analyze_command(config, &args).await?,
            Commands::Report(args) => report::handle_report_command(config, &args).await?,
            Commands::Check(args) => check::handle_check_command(config, &args).await?,
            Commands::Config(args) => configure::handle_config_command(config, args.command)?,
        }
        Ok(())
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect series from the BCB SGS API into the local database
    Collect(CollectArgs),

    /// List the indicator catalog with stored record counts
    Indicators(IndicatorsArgs),

    /// Show the full history span available at the source
    Period(PeriodArgs),

    /// Inspect and manage stored data
    Data(DataArgs),

    /// Train a forecasting model for an indicator
    Train(TrainArgs),

    /// Forecast future values with a trained model
    Predict(PredictArgs),

    /// Show feature importance of a trained model
    Importance(ImportanceArgs),

    /// Trend, outlier and insight analysis of an indicator
    Analyze(AnalyzeArgs),

    /// Generate or list economic overview reports
    Report(ReportArgs),

    /// Run installation self-checks
    Check(CheckArgs),

    /// Configuration management
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct CollectArgs {
    #[arg(short, long = "indicator", value_name = "KEY", help = "Indicator to collect (repeatable, default all)")]
    pub indicators: Vec<String>,

    #[arg(
        short,
        long,
        value_parser = clap::value_parser!(u32).range(1..=MAX_YEARS as i64),
        help = "Years of history to collect (default from config)"
    )]
    pub years: Option<u32>,

    #[arg(long, value_name = "DATE", requires = "end", help = "Start date (dd/mm/YYYY)")]
    pub start: Option<String>,

    #[arg(long, value_name = "DATE", requires = "start", help = "End date (dd/mm/YYYY)")]
    pub end: Option<String>,

    #[arg(long, help = "Do not ping the API before collecting")]
    pub skip_api_check: bool,
}

#[derive(Args)]
pub struct IndicatorsArgs {
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct PeriodArgs {
    #[arg(help = "Indicator key")]
    pub indicator: String,
}

#[derive(Args)]
pub struct DataArgs {
    #[command(subcommand)]
    pub command: DataCommands,
}

#[derive(Subcommand)]
pub enum DataCommands {
    /// Summary of every stored indicator
    List,

    /// Print stored observations
    Show(DataShowArgs),

    /// Descriptive statistics of a stored indicator
    Stats(DataKeyArgs),

    /// Recent collection runs
    History(HistoryArgs),

    /// Delete stored observations
    Purge(PurgeArgs),
}

#[derive(Args)]
pub struct DataShowArgs {
    #[arg(help = "Indicator key")]
    pub indicator: String,

    #[arg(long, value_name = "DATE", help = "First date (dd/mm/YYYY or YYYY-mm-dd)")]
    pub from: Option<String>,

    #[arg(long, value_name = "DATE", help = "Last date (dd/mm/YYYY or YYYY-mm-dd)")]
    pub to: Option<String>,

    #[arg(short, long, value_enum, default_value_t = DataFormat::Table)]
    pub format: DataFormat,
}

#[derive(Args)]
pub struct DataKeyArgs {
    #[arg(help = "Indicator key")]
    pub indicator: String,
}

#[derive(Args)]
pub struct HistoryArgs {
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,
}

#[derive(Args)]
pub struct PurgeArgs {
    #[arg(help = "Indicator key (all data when omitted)")]
    pub indicator: Option<String>,

    #[arg(short, long, help = "Skip the confirmation prompt")]
    pub force: bool,
}

#[derive(Args)]
pub struct TrainArgs {
    #[arg(help = "Indicator key")]
    pub indicator: String,

    #[arg(long, help = "Hold-out fraction (default from config)")]
    pub test_size: Option<f64>,

    #[arg(short, long, help = "Number of lag features (default from config)")]
    pub window: Option<usize>,

    #[arg(long, help = "Number of trees (default from config)")]
    pub trees: Option<usize>,
}

#[derive(Args)]
pub struct PredictArgs {
    #[arg(help = "Indicator key")]
    pub indicator: String,

    #[arg(short, long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(1..=24))]
    pub steps: u32,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct ImportanceArgs {
    #[arg(help = "Indicator key")]
    pub indicator: String,

    #[arg(short, long, help = "Show only the N most important features")]
    pub top: Option<usize>,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    #[arg(help = "Indicator key")]
    pub indicator: String,

    #[arg(
        short,
        long,
        default_value_t = 12,
        value_parser = clap::value_parser!(u32).range(1..=MAX_MONTHS as i64),
        help = "Months of history to analyze"
    )]
    pub months: u32,
}

#[derive(Args)]
pub struct ReportArgs {
    #[command(subcommand)]
    pub command: Option<ReportCommands>,

    #[arg(
        short,
        long,
        default_value_t = 12,
        value_parser = clap::value_parser!(u32).range(1..=MAX_MONTHS as i64),
        help = "Months of history covered by the report"
    )]
    pub months: u32,

    #[arg(long, help = "Skip the HTML page")]
    pub no_html: bool,

    #[arg(long, help = "Open the HTML page in a browser")]
    pub open: bool,
}

#[derive(Subcommand, Clone)]
pub enum ReportCommands {
    /// List previously generated reports
    List,
}

#[derive(Args)]
pub struct CheckArgs {
    #[arg(short, long, value_enum, help = "Run a single group of checks")]
    pub module: Option<CheckModule>,

    #[arg(long, help = "Include the BCB API check")]
    pub online: bool,

    #[arg(short, long, help = "Print check details")]
    pub verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum DataFormat {
    Table,
    Json,
    Csv,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommands>,
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Print the configuration file location
    Path,

    /// Reset configuration to defaults
    Reset {
        #[arg(short, long, help = "Skip the confirmation prompt")]
        force: bool,
    },

    /// Check the configuration for problems
    Validate,

    /// Set a value, e.g. `config set ml.n_estimators 200`
    Set { key: String, value: String },
}
