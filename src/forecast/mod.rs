//! Random forest forecasting
//!
//! Lag features are built from the stored history, standardised and fed to
//! a bagged ensemble of CART trees. Fitted models are persisted as JSON
//! artifacts next to each other in the models directory.

pub mod features;
pub mod forest;
pub mod metrics;
pub mod predictor;
pub mod scaler;
pub mod tree;

pub use features::{FeatureFrame, build_features, feature_columns};
pub use forest::{ForestParams, RandomForest};
pub use metrics::Metrics;
pub use predictor::{
    Forecast, ForecastPoint, MAX_FORECAST_STEPS, ModelArtifact, ModelStatus, Predictor, TrainOptions,
};
pub use scaler::StandardScaler;
pub use tree::{RegressionTree, TreeParams};
