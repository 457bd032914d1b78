use super::features::{FeatureFrame, build_features, next_row};
use super::forest::{ForestParams, RandomForest};
use super::metrics::Metrics;
use super::scaler::StandardScaler;
use super::tree::TreeParams;
use crate::config::MlConfig;
use crate::core::data::Observation;
use crate::core::traits::SeriesStore;
use crate::utils::error::{AppError, AppResult};
use crate::utils::format;
use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

pub const MODEL_TYPE: &str = "random_forest";
pub const MAX_FORECAST_STEPS: usize = 24;

#[derive(Debug, Clone, Copy)]
pub struct TrainOptions {
    pub test_size: f64,
    pub window: usize,
}

impl From<&MlConfig> for TrainOptions {
    fn from(config: &MlConfig) -> Self {
        Self {
            test_size: config.default_test_size,
            window: config.window_size,
        }
    }
}

/// Everything needed to forecast again without retraining
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub indicator: String,
    pub model_type: String,
    pub window: usize,
    pub feature_columns: Vec<String>,
    pub scaler: StandardScaler,
    pub forest: RandomForest,
    pub metrics: Metrics,
    #[serde(with = "format")]
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub indicator: String,
    pub last_observed: NaiveDate,
    pub points: Vec<ForecastPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub indicator: String,
    pub exists: bool,
    pub path: PathBuf,
    pub trained_at: Option<DateTime<Utc>>,
    pub metrics: Option<Metrics>,
}

/// Trains, stores and applies per-indicator forecasting models
pub struct Predictor {
    store: Arc<dyn SeriesStore>,
    config: MlConfig,
}

impl Predictor {
    pub fn new(store: Arc<dyn SeriesStore>, config: MlConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &MlConfig {
        &self.config
    }

    pub fn model_path(&self, key: &str) -> PathBuf {
        self.config
            .models_dir
            .join(format!("{}_{}_model.json", key, MODEL_TYPE))
    }

    async fn history(&self, key: &str) -> AppResult<Vec<Observation>> {
        let observations = self.store.load_series(key, None, None).await?;
        if observations.is_empty() {
            return Err(AppError::NotFound(format!("Stored data for '{}'", key)));
        }
        Ok(observations)
    }

    /// Load an indicator from the store and build its lag feature frame
    pub async fn prepare_data(&self, key: &str, window: usize) -> AppResult<FeatureFrame> {
        if window == 0 || window > self.config.max_lag_periods {
            return Err(AppError::Config(format!(
                "Lag window must be between 1 and {}",
                self.config.max_lag_periods
            )));
        }
        let observations = self.history(key).await?;
        let frame = build_features(&observations, window)?;
        debug!(indicator = key, rows = frame.len(), features = frame.columns.len(), "feature frame ready");
        Ok(frame)
    }

    pub async fn train(&self, key: &str, options: TrainOptions) -> AppResult<Metrics> {
        if !(options.test_size > 0.0 && options.test_size < 1.0) {
            return Err(AppError::Config(format!(
                "test_size must be between 0 and 1, got {}",
                options.test_size
            )));
        }

        let frame = self.prepare_data(key, options.window).await?;
        let n = frame.len();
        let split = (n as f64 * (1.0 - options.test_size)).floor() as usize;
        if split == 0 || split >= n {
            return Err(AppError::InsufficientData {
                required: n + 1,
                actual: n,
            });
        }

        let (x_train, x_test) = frame.rows.split_at(split);
        let (y_train, y_test) = frame.targets.split_at(split);

        let scaler = StandardScaler::fit(x_train)?;
        let forest = RandomForest::fit(&scaler.transform(x_train), y_train, self.forest_params())?;
        let predicted = forest.predict(&scaler.transform(x_test));
        let metrics = Metrics::evaluate(y_test, &predicted, y_train.len());

        let artifact = ModelArtifact {
            indicator: key.to_string(),
            model_type: MODEL_TYPE.to_string(),
            window: options.window,
            feature_columns: frame.columns,
            scaler,
            forest,
            metrics,
            trained_at: Utc::now(),
        };
        self.save_artifact(&artifact)?;

        info!(
            indicator = key,
            r2 = metrics.r2,
            rmse = metrics.rmse,
            samples_train = metrics.samples_train,
            samples_test = metrics.samples_test,
            "model trained"
        );
        Ok(metrics)
    }

    /// Recursive multi-step forecast: each prediction becomes the newest
    /// value the next step is built from.
    pub async fn predict_future(&self, key: &str, steps: usize) -> AppResult<Forecast> {
        if steps == 0 || steps > MAX_FORECAST_STEPS {
            return Err(AppError::Config(format!(
                "Forecast steps must be between 1 and {}",
                MAX_FORECAST_STEPS
            )));
        }

        let artifact = self.load_artifact(key)?;
        let observations = self.history(key).await?;
        let last = observations[observations.len() - 1];
        let mut history: Vec<f64> = observations.iter().map(|o| o.value).collect();

        let mut points = Vec::with_capacity(steps);
        for step in 1..=steps {
            let date = last
                .date
                .checked_add_months(Months::new(step as u32))
                .ok_or_else(|| AppError::Model(format!("Forecast date out of range at step {}", step)))?;
            let row = next_row(&history, date, artifact.window)?;
            let value = artifact.forest.predict_row(&artifact.scaler.transform_row(&row));
            history.push(value);
            points.push(ForecastPoint { date, value });
        }

        info!(indicator = key, steps, "forecast generated");
        Ok(Forecast {
            indicator: key.to_string(),
            last_observed: last.date,
            points,
        })
    }

    /// `(feature, importance)` sorted by importance, highest first
    pub fn feature_importance(&self, key: &str) -> AppResult<Vec<(String, f64)>> {
        let artifact = self.load_artifact(key)?;
        let mut pairs: Vec<(String, f64)> = artifact
            .feature_columns
            .into_iter()
            .zip(artifact.forest.feature_importances())
            .collect();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(pairs)
    }

    pub fn model_status(&self, key: &str) -> ModelStatus {
        let path = self.model_path(key);
        match self.load_artifact(key) {
            Ok(artifact) => ModelStatus {
                indicator: key.to_string(),
                exists: true,
                path,
                trained_at: Some(artifact.trained_at),
                metrics: Some(artifact.metrics),
            },
            Err(_) => ModelStatus {
                indicator: key.to_string(),
                exists: false,
                path,
                trained_at: None,
                metrics: None,
            },
        }
    }

    /// Indicators with enough stored history to train on
    pub async fn trainable_indicators(&self) -> AppResult<Vec<String>> {
        Ok(self
            .store
            .summaries()
            .await?
            .into_iter()
            .filter(|s| s.count >= self.config.min_data_points)
            .map(|s| s.indicator)
            .collect())
    }

    /// Indicator keys with a saved artifact in the models directory
    pub fn saved_models(&self) -> AppResult<Vec<String>> {
        let dir = &self.config.models_dir;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let suffix = format!("_{}_model.json", MODEL_TYPE);
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let name = entry?.file_name().to_string_lossy().to_string();
            if let Some(key) = name.strip_suffix(&suffix) {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    pub fn load_artifact(&self, key: &str) -> AppResult<ModelArtifact> {
        let path = self.model_path(key);
        if !path.exists() {
            return Err(AppError::NotFound(format!("Model for '{}'", key)));
        }
        let content = std::fs::read(&path)?;
        serde_json::from_slice(&content)
            .map_err(|e| AppError::Model(format!("Failed to read model {}: {}", path.display(), e)))
    }

    fn save_artifact(&self, artifact: &ModelArtifact) -> AppResult<()> {
        std::fs::create_dir_all(&self.config.models_dir)?;
        let path = self.model_path(&artifact.indicator);
        let content = serde_json::to_vec(artifact)
            .map_err(|e| AppError::Model(format!("Failed to serialize model: {}", e)))?;
        std::fs::write(&path, content)?;
        debug!(path = %path.display(), "model saved");
        Ok(())
    }

    fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_estimators: self.config.n_estimators,
            tree: TreeParams {
                max_depth: self.config.max_depth,
                min_samples_split: self.config.min_samples_split,
                ..TreeParams::default()
            },
            random_state: self.config.random_state,
        }
    }
}
