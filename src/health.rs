//! Installation self-checks
//!
//! Each check inspects one part of the setup and reports pass, warn or fail.
//! Checks are grouped into modules so a single area can be checked alone.

use crate::collector::{Collector, SgsClient};
use crate::config::Config;
use crate::core::traits::SeriesStore;
use crate::forecast::Predictor;
use crate::storage::SqliteStore;
use crate::utils::error::AppResult;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub details: Vec<String>,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            details: Vec::new(),
        }
    }

    fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CheckModule {
    /// Configuration and directories
    Health,
    Database,
    Api,
    Ml,
    Reports,
    /// Every check, including the API
    Integration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Check {
    Config,
    Directories,
    Database,
    Api,
    Ml,
    Reports,
}

impl CheckModule {
    fn checks(self) -> Vec<Check> {
        match self {
            CheckModule::Health => vec![Check::Config, Check::Directories],
            CheckModule::Database => vec![Check::Database],
            CheckModule::Api => vec![Check::Api],
            CheckModule::Ml => vec![Check::Ml],
            CheckModule::Reports => vec![Check::Reports],
            CheckModule::Integration => all_checks(true),
        }
    }
}

fn all_checks(online: bool) -> Vec<Check> {
    let mut checks = vec![Check::Config, Check::Directories, Check::Database];
    if online {
        checks.push(Check::Api);
    }
    checks.extend([Check::Ml, Check::Reports]);
    checks
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HealthReport {
    pub results: Vec<CheckResult>,
}

impl HealthReport {
    pub fn count(&self, status: CheckStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(CheckStatus::Fail) > 0
    }
}

/// Run the checks of `module`, or every offline check (plus the API when
/// `online`) when no module is given.
pub async fn run_checks(config: &Config, module: Option<CheckModule>, online: bool) -> HealthReport {
    let checks = match module {
        Some(m) => m.checks(),
        None => all_checks(online),
    };

    let mut report = HealthReport::default();
    for check in checks {
        let result = match check {
            Check::Config => check_config(config),
            Check::Directories => check_directories(config),
            Check::Database => check_database(config).await,
            Check::Api => check_api(config).await,
            Check::Ml => check_ml(config).await,
            Check::Reports => check_reports(&config.reports.output_dir),
        };
        debug!(check = %result.name, status = ?result.status, "check finished");
        report.results.push(result);
    }
    report
}

fn check_config(config: &Config) -> CheckResult {
    let errors = config.validation_errors();
    if errors.is_empty() {
        let source = config
            .source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in defaults".to_string());
        CheckResult::new("config", CheckStatus::Pass, "Configuration is valid")
            .with_details(vec![format!("source: {}", source)])
    } else {
        CheckResult::new(
            "config",
            CheckStatus::Fail,
            format!("{} configuration problem(s)", errors.len()),
        )
        .with_details(errors)
    }
}

fn check_directories(config: &Config) -> CheckResult {
    let mut details = Vec::new();
    let mut failed = 0;
    for (dir, result) in config.ensure_directories() {
        match result {
            Ok(()) => details.push(format!("ok: {}", dir.display())),
            Err(e) => {
                failed += 1;
                details.push(format!("cannot create {}: {}", dir.display(), e));
            }
        }
    }

    if failed == 0 {
        CheckResult::new("directories", CheckStatus::Pass, "Data directories are available").with_details(details)
    } else {
        CheckResult::new(
            "directories",
            CheckStatus::Fail,
            format!("{} directory(ies) unavailable", failed),
        )
        .with_details(details)
    }
}

async fn check_database(config: &Config) -> CheckResult {
    match inspect_database(&config.database.path).await {
        Ok(details) if details.is_empty() => CheckResult::new(
            "database",
            CheckStatus::Warn,
            "Database is reachable but holds no data; run `bcbcast collect`",
        ),
        Ok(details) => CheckResult::new(
            "database",
            CheckStatus::Pass,
            format!("Database holds {} indicator(s)", details.len()),
        )
        .with_details(details),
        Err(e) => CheckResult::new("database", CheckStatus::Fail, e.to_string()),
    }
}

async fn inspect_database(path: &Path) -> AppResult<Vec<String>> {
    let store = SqliteStore::open(path).await?;
    store.ping().await?;
    let details = store
        .summaries()
        .await?
        .into_iter()
        .map(|s| format!("{}: {} records", s.indicator, s.count))
        .collect();
    store.close().await;
    Ok(details)
}

async fn check_api(config: &Config) -> CheckResult {
    let client = match SgsClient::new(&config.collection) {
        Ok(client) => client,
        Err(e) => return CheckResult::new("api", CheckStatus::Fail, e.to_string()),
    };
    let collector = Collector::new(Arc::new(client), config.catalog());

    if collector.check_api_status().await {
        CheckResult::new("api", CheckStatus::Pass, "BCB SGS API is responding")
            .with_details(vec![format!("base url: {}", config.collection.base_url)])
    } else {
        CheckResult::new("api", CheckStatus::Fail, "BCB SGS API is not responding")
    }
}

async fn check_ml(config: &Config) -> CheckResult {
    let store: Arc<dyn SeriesStore> = match SqliteStore::open(&config.database.path).await {
        Ok(store) => Arc::new(store),
        Err(e) => return CheckResult::new("ml", CheckStatus::Fail, e.to_string()),
    };
    let predictor = Predictor::new(store, config.ml.clone());

    let trainable = match predictor.trainable_indicators().await {
        Ok(keys) => keys,
        Err(e) => return CheckResult::new("ml", CheckStatus::Fail, e.to_string()),
    };
    let models = match predictor.saved_models() {
        Ok(keys) => keys,
        Err(e) => return CheckResult::new("ml", CheckStatus::Fail, e.to_string()),
    };

    let mut details = vec![format!("trainable: {}", join_or_none(&trainable))];
    let mut broken = 0;
    for key in &models {
        match predictor.load_artifact(key) {
            Ok(artifact) => details.push(format!(
                "model {}: r2 {:.3}, {} trees",
                key,
                artifact.metrics.r2,
                artifact.forest.n_trees()
            )),
            Err(e) => {
                broken += 1;
                details.push(format!("model {}: {}", key, e));
            }
        }
    }

    if broken > 0 {
        CheckResult::new("ml", CheckStatus::Fail, format!("{} model artifact(s) unreadable", broken))
            .with_details(details)
    } else if trainable.is_empty() {
        CheckResult::new(
            "ml",
            CheckStatus::Warn,
            format!(
                "No indicator has the {} observations needed for training",
                config.ml.min_data_points
            ),
        )
        .with_details(details)
    } else {
        CheckResult::new(
            "ml",
            CheckStatus::Pass,
            format!("{} trainable indicator(s), {} saved model(s)", trainable.len(), models.len()),
        )
        .with_details(details)
    }
}

fn check_reports(dir: &Path) -> CheckResult {
    let marker = dir.join(".bcbcast_write_test");
    let result = std::fs::create_dir_all(dir)
        .and_then(|_| std::fs::write(&marker, b"ok"))
        .and_then(|_| std::fs::remove_file(&marker));

    match result {
        Ok(()) => CheckResult::new("reports", CheckStatus::Pass, "Report directory is writable")
            .with_details(vec![dir.display().to_string()]),
        Err(e) => CheckResult::new(
            "reports",
            CheckStatus::Fail,
            format!("Cannot write to {}: {}", dir.display(), e),
        ),
    }
}

fn join_or_none(keys: &[String]) -> String {
    if keys.is_empty() {
        "none".to_string()
    } else {
        keys.join(", ")
    }
}
