use crate::core::catalog::{Catalog, Indicator};
use crate::utils::error::{AppError, AppResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest history `collect` accepts, in years
pub const MAX_YEARS: u32 = 100;
/// Longest lookback `analyze` and `report` accept, in months
pub const MAX_MONTHS: u32 = 1200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
    #[serde(default)]
    pub ml: MlConfig,
    #[serde(default)]
    pub reports: ReportConfig,
    /// File this configuration was loaded from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub color: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub base_url: String,
    pub default_years: u32,
    pub max_retries: u32,
    pub request_timeout_secs: u64,
    pub delay_between_requests_ms: u64,
    pub concurrency: usize,
    /// Extra or overriding indicators on top of the built-in catalog
    #[serde(default)]
    pub indicators: Vec<Indicator>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MlConfig {
    pub models_dir: PathBuf,
    pub default_test_size: f64,
    pub window_size: usize,
    pub max_lag_periods: usize,
    pub min_data_points: usize,
    pub n_estimators: usize,
    #[serde(default)]
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub random_state: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    pub max_insights_per_indicator: usize,
    pub confidence_threshold: f64,
    pub correlation_threshold: f64,
}

fn data_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bcbcast")
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: data_root().join("economic_data.db"),
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.bcb.gov.br/dados/serie/bcdata.sgs".to_string(),
            default_years: 10,
            max_retries: 3,
            request_timeout_secs: 30,
            delay_between_requests_ms: 500,
            concurrency: 3,
            indicators: Vec::new(),
        }
    }
}

impl Default for MlConfig {
    fn default() -> Self {
        Self {
            models_dir: data_root().join("models"),
            default_test_size: 0.2,
            window_size: 6,
            max_lag_periods: 12,
            min_data_points: 36,
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            random_state: 42,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: data_root().join("reports"),
            max_insights_per_indicator: 5,
            confidence_threshold: 0.5,
            correlation_threshold: 0.3,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            database: DatabaseConfig::default(),
            collection: CollectionConfig::default(),
            ml: MlConfig::default(),
            reports: ReportConfig::default(),
            source: None,
        }
    }
}

impl CollectionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_between_requests_ms)
    }
}

impl Config {
    pub fn load() -> AppResult<Self> {
        Self::ensure_config_exists()?;
        Self::load_custom(&Self::config_file_path())
    }

    pub fn ensure_config_exists() -> AppResult<()> {
        let config_path = Self::config_file_path();
        if !config_path.exists() {
            let default_config = Config::default();
            default_config.save_to(&config_path)?;
        }
        Ok(())
    }

    pub fn load_custom(config_path: &Path) -> AppResult<Self> {
        if !config_path.exists() {
            return Err(AppError::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config = Self::from_toml(&content)?;
        config.source = Some(config_path.to_path_buf());

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Every problem found, empty when the configuration is usable
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.collection.default_years == 0 || self.collection.default_years > MAX_YEARS {
            errors.push(format!("collection.default_years must be between 1 and {}", MAX_YEARS));
        }
        if !self.collection.base_url.starts_with("http") {
            errors.push("collection.base_url must be a valid http(s) URL".to_string());
        }
        if self.collection.concurrency == 0 {
            errors.push("collection.concurrency must be greater than 0".to_string());
        }
        if self.ml.min_data_points == 0 {
            errors.push("ml.min_data_points must be greater than 0".to_string());
        }
        if !(self.ml.default_test_size > 0.0 && self.ml.default_test_size < 1.0) {
            errors.push("ml.default_test_size must be between 0 and 1".to_string());
        }
        if self.ml.window_size == 0 || self.ml.window_size > self.ml.max_lag_periods {
            errors.push(format!(
                "ml.window_size must be between 1 and {}",
                self.ml.max_lag_periods
            ));
        }
        if self.ml.n_estimators == 0 {
            errors.push("ml.n_estimators must be greater than 0".to_string());
        }
        if self.ml.min_samples_split < 2 {
            errors.push("ml.min_samples_split must be at least 2".to_string());
        }
        if !(0.0..=1.0).contains(&self.reports.confidence_threshold) {
            errors.push("reports.confidence_threshold must be between 0 and 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.reports.correlation_threshold) {
            errors.push("reports.correlation_threshold must be between 0 and 1".to_string());
        }

        let key_pattern = Regex::new(r"^[a-z][a-z0-9_]*$").expect("static regex");
        for indicator in &self.collection.indicators {
            if !key_pattern.is_match(&indicator.key) {
                errors.push(format!(
                    "indicator key '{}' must be lowercase letters, digits or underscores",
                    indicator.key
                ));
            }
            if indicator.series_id == 0 {
                errors.push(format!("indicator '{}' needs a series_id", indicator.key));
            }
        }

        errors
    }

    pub fn validate(&self) -> AppResult<()> {
        match self.validation_errors().into_iter().next() {
            Some(first) => Err(AppError::Config(first)),
            None => Ok(()),
        }
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::with_extra(&self.collection.indicators)
    }

    /// Create the database, model and report directories
    /// Database parent, models and report directories
    pub fn data_directories(&self) -> Vec<PathBuf> {
        [
            self.database.path.parent().map(Path::to_path_buf),
            Some(self.ml.models_dir.clone()),
            Some(self.reports.output_dir.clone()),
        ]
        .into_iter()
        .flatten()
        .filter(|dir| !dir.as_os_str().is_empty())
        .collect()
    }

    /// Create every data directory, reporting the outcome per directory
    pub fn ensure_directories(&self) -> Vec<(PathBuf, AppResult<()>)> {
        self.data_directories()
            .into_iter()
            .map(|dir| {
                let result = std::fs::create_dir_all(&dir).map_err(AppError::from);
                (dir, result)
            })
            .collect()
    }

    pub fn save(&self) -> AppResult<()> {
        let path = self
            .source
            .clone()
            .unwrap_or_else(Self::config_file_path);
        self.save_to(&path)
    }

    pub fn save_to(&self, config_path: &Path) -> AppResult<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::System(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(config_path, content)?;

        Ok(())
    }

    pub fn config_file_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bcbcast")
            .join("config.toml")
    }
}

/// Set a dotted key (`ml.n_estimators`) in a TOML document, keeping the
/// rest of the file's formatting and comments untouched.
pub fn set_config_value(content: &str, key: &str, raw_value: &str) -> AppResult<String> {
    let mut doc = content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| AppError::Config(format!("Failed to parse config file: {}", e)))?;

    let parts: Vec<&str> = key.split('.').collect();
    let (field, sections) = parts
        .split_last()
        .ok_or_else(|| AppError::Config("Empty configuration key".to_string()))?;

    let mut table = doc.as_table_mut();
    for section in sections {
        table = table
            .get_mut(section)
            .and_then(|item| item.as_table_mut())
            .ok_or_else(|| AppError::Config(format!("Unknown configuration section '{}'", section)))?;
    }

    if !table.contains_key(field) {
        return Err(AppError::Config(format!("Unknown configuration key '{}'", key)));
    }
    table[*field] = toml_edit::value(parse_scalar(raw_value));

    let updated = doc.to_string();
    // Reject edits that would leave an unusable file behind.
    Config::from_toml(&updated)?.validate()?;
    Ok(updated)
}

fn parse_scalar(raw: &str) -> toml_edit::Value {
    if let Ok(b) = raw.parse::<bool>() {
        return b.into();
    }
    if let Ok(i) = raw.parse::<i64>() {
        return i.into();
    }
    if let Ok(f) = raw.parse::<f64>() {
        return f.into();
    }
    raw.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validation_errors().is_empty());
        assert_eq!(config.collection.default_years, 10);
        assert_eq!(config.ml.n_estimators, 100);
        assert_eq!(config.ml.random_state, 42);
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let config = Config::default();
        let content = toml::to_string_pretty(&config).unwrap();
        let parsed = Config::from_toml(&content).unwrap();
        assert_eq!(parsed.collection.base_url, config.collection.base_url);
        assert_eq!(parsed.ml.window_size, 6);
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let parsed = Config::from_toml("[general]\ncolor = false\n").unwrap();
        assert!(!parsed.general.color);
        assert_eq!(parsed.ml.min_data_points, 36);
    }

    #[test]
    fn test_validation_reports_bad_values() {
        let mut config = Config::default();
        config.ml.default_test_size = 1.5;
        config.collection.base_url = "ftp://example".to_string();
        config.ml.window_size = 13;
        let errors = config.validation_errors();
        assert_eq!(errors.len(), 3);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_bounds_default_years() {
        let mut config = Config::default();
        config.collection.default_years = MAX_YEARS;
        assert!(config.validate().is_ok());

        config.collection.default_years = 1_000_000;
        let errors = config.validation_errors();
        assert_eq!(errors, vec![format!("collection.default_years must be between 1 and {}", MAX_YEARS)]);
    }

    #[test]
    fn test_validation_rejects_bad_indicator_key() {
        let mut config = Config::default();
        config.collection.indicators.push(Indicator {
            key: "Bad-Key".to_string(),
            series_id: 1,
            name: "x".to_string(),
            unit: "%".to_string(),
            frequency: crate::core::catalog::Frequency::Monthly,
            description: String::new(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ensure_directories_creates_data_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.database.path = dir.path().join("db").join("economic_data.db");
        config.ml.models_dir = dir.path().join("models");
        config.reports.output_dir = dir.path().join("reports");

        let outcomes = config.ensure_directories();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|(_, result)| result.is_ok()));
        assert!(dir.path().join("db").is_dir());
        assert!(dir.path().join("models").is_dir());
        assert!(dir.path().join("reports").is_dir());
    }

    #[test]
    fn test_load_custom_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_custom(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_set_config_value_preserves_comments() {
        let content = "# my settings\n[ml]\nn_estimators = 100 # trees\nwindow_size = 6\n";
        let updated = set_config_value(content, "ml.n_estimators", "250").unwrap();
        assert!(updated.contains("# my settings"));
        assert!(updated.contains("n_estimators = 250"));
        assert!(updated.contains("window_size = 6"));
    }

    #[test]
    fn test_set_config_value_rejects_unknown_and_invalid() {
        let content = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(set_config_value(&content, "ml.unknown", "1").is_err());
        assert!(set_config_value(&content, "nope.key", "1").is_err());
        assert!(set_config_value(&content, "ml.default_test_size", "2.0").is_err());
    }
}
