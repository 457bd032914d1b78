//! Subcommand handlers
//!
//! Handlers wire the configuration into the library types and format
//! results for the terminal.

pub mod analyze;
pub mod check;
pub mod collect;
pub mod configure;
pub mod data;
pub mod model;
pub mod report;

use crate::config::Config;
use crate::core::traits::SeriesStore;
use crate::forecast::Predictor;
use crate::storage::SqliteStore;
use anyhow::{Context, Result};
use std::sync::Arc;

pub(crate) async fn open_store(config: &Config) -> Result<Arc<SqliteStore>> {
    let store = SqliteStore::open(&config.database.path)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.path.display()))?;
    Ok(Arc::new(store))
}

pub(crate) async fn open_predictor(config: &Config) -> Result<Predictor> {
    let store: Arc<dyn SeriesStore> = open_store(config).await?;
    Ok(Predictor::new(store, config.ml.clone()))
}
