//! bcbcast - collect, analyze and forecast Banco Central do Brasil series
//!
//! The library pulls series from the BCB SGS API into a local SQLite
//! store, trains random forest models on lagged features and renders
//! economic reports as JSON and HTML.

pub mod analysis;
pub mod cli;
pub mod collector;
pub mod commands;
pub mod config;
pub mod core;
pub mod forecast;
pub mod health;
pub mod report;
pub mod storage;
pub mod utils;

// Re-export core types and traits for easier use
pub use crate::core::{
    catalog::{Catalog, Indicator},
    data::{Observation, Series},
    traits::{SeriesSource, SeriesStore},
};
pub use forecast::Predictor;
pub use report::ReportGenerator;
pub use storage::SqliteStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
