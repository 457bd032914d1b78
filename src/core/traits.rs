//! Core trait definitions
//!
//! These traits separate where series come from and where they are kept
//! from the collection, forecasting and reporting logic built on top.

use crate::core::data::{CollectionRun, DateWindow, Observation, Series, SeriesSummary};
use crate::utils::error::AppResult;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Remote provider of raw series observations
#[async_trait]
pub trait SeriesSource: Send + Sync {
    /// Fetch observations for a series, optionally restricted to a window.
    ///
    /// An empty `Vec` means the source answered but had no data.
    async fn fetch(&self, series_id: u32, window: Option<DateWindow>) -> AppResult<Vec<Observation>>;

    /// Check that the source answers at all
    async fn ping(&self) -> AppResult<()> {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
        self.fetch(433, Some(DateWindow::new(day, day))).await.map(|_| ())
    }
}

/// Persistent storage for collected series
#[async_trait]
pub trait SeriesStore: Send + Sync {
    /// Insert or replace every observation of the series; returns rows written
    async fn save_series(&self, series: &Series) -> AppResult<usize>;

    /// Observations sorted ascending by date, with optional inclusive bounds
    async fn load_series(
        &self,
        indicator: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AppResult<Vec<Observation>>;

    async fn count(&self, indicator: &str) -> AppResult<usize>;

    async fn summaries(&self) -> AppResult<Vec<SeriesSummary>>;

    /// Returns the number of rows removed
    async fn delete_indicator(&self, indicator: &str) -> AppResult<usize>;

    async fn purge(&self) -> AppResult<usize>;

    async fn record_run(&self, run: &CollectionRun) -> AppResult<()>;

    async fn recent_runs(&self, limit: usize) -> AppResult<Vec<CollectionRun>>;
}
