//! Series collection
//!
//! Wraps a [`SeriesSource`] with the catalog, bounded-concurrency batch
//! collection and request accounting.

pub mod sgs;

use crate::core::catalog::{Catalog, Frequency, Indicator};
use crate::core::data::{CollectionStats, DateWindow, Observation, Series};
use crate::core::traits::SeriesSource;
use crate::utils::error::{AppError, AppResult};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

pub use sgs::SgsClient;

/// SGS refuses windows longer than ten years for daily series
const DAILY_WINDOW_DAYS: i64 = 3650;

/// Result of collecting several indicators at once
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub series: BTreeMap<String, Series>,
    pub failures: BTreeMap<String, String>,
    pub stats: CollectionStats,
    pub window: Option<DateWindow>,
    pub elapsed: Duration,
}

impl BatchOutcome {
    pub fn requested(&self) -> usize {
        self.series.len() + self.failures.len()
    }
}

/// Full history span available at the source
#[derive(Debug, Clone, Serialize)]
pub struct AvailablePeriod {
    pub indicator: String,
    pub first: NaiveDate,
    pub last: NaiveDate,
    pub count: usize,
}

impl AvailablePeriod {
    pub fn years(&self) -> f64 {
        (self.last - self.first).num_days() as f64 / 365.0
    }
}

#[derive(Clone)]
pub struct Collector {
    source: Arc<dyn SeriesSource>,
    catalog: Catalog,
    concurrency: usize,
    delay: Duration,
}

impl Collector {
    pub fn new(source: Arc<dyn SeriesSource>, catalog: Catalog) -> Self {
        Self {
            source,
            catalog,
            concurrency: 3,
            delay: Duration::ZERO,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Pause kept by each worker after a request before releasing its slot
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub async fn check_api_status(&self) -> bool {
        match self.source.ping().await {
            Ok(()) => {
                info!("BCB API is responding");
                true
            }
            Err(e) => {
                warn!(error = %e, "BCB API is not responding");
                false
            }
        }
    }

    /// Collect one indicator
    pub async fn collect(&self, key: &str, window: Option<DateWindow>) -> AppResult<Series> {
        let indicator = self.catalog.require(key)?.clone();
        let (result, _) = fetch_indicator(self.source.as_ref(), &indicator, window).await;
        result
    }

    /// Collect several indicators with at most `concurrency` requests in flight.
    /// A failing indicator is recorded and never aborts the others.
    pub async fn collect_batch(&self, keys: &[String], window: Option<DateWindow>) -> AppResult<BatchOutcome> {
        let indicators = self.catalog.resolve(keys)?;
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for indicator in indicators {
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&semaphore);
            let delay = self.delay;
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let (result, stats) = fetch_indicator(source.as_ref(), &indicator, window).await;
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                (indicator.key, result, stats)
            });
        }

        let mut outcome = BatchOutcome {
            window,
            ..BatchOutcome::default()
        };

        while let Some(joined) = tasks.join_next().await {
            let (key, result, stats) =
                joined.map_err(|e| AppError::System(format!("Collection task failed: {}", e)))?;
            outcome.stats.merge(&stats);
            match result {
                Ok(series) => {
                    info!(indicator = %key, records = series.len(), "collected");
                    outcome.series.insert(key, series);
                }
                Err(e) => {
                    warn!(indicator = %key, error = %e, "collection failed");
                    outcome.failures.insert(key, e.to_string());
                }
            }
        }

        outcome.elapsed = started.elapsed();
        Ok(outcome)
    }

    /// Collect the last `years` years for the given indicators (all when empty)
    pub async fn collect_all(&self, years: u32, keys: &[String], today: NaiveDate) -> AppResult<BatchOutcome> {
        let keys = if keys.is_empty() {
            self.catalog.keys()
        } else {
            keys.to_vec()
        };
        let window = DateWindow::last_years(years, today)?;

        info!(
            indicators = keys.len(),
            years,
            start = %window.start_param(),
            end = %window.end_param(),
            "starting collection"
        );

        let outcome = self.collect_batch(&keys, Some(window)).await?;

        info!(
            elapsed_secs = outcome.elapsed.as_secs_f64(),
            collected = outcome.series.len(),
            requested = keys.len(),
            success_rate = outcome.stats.success_rate(),
            records = outcome.stats.total_records,
            "collection finished"
        );

        Ok(outcome)
    }

    /// First and last date the source holds for an indicator
    pub async fn available_period(&self, key: &str) -> AppResult<AvailablePeriod> {
        let indicator = self.catalog.require(key)?;
        let observations = self.source.fetch(indicator.series_id, None).await?;
        let series = Series::new(key, indicator.series_id, observations);

        match (series.first_date(), series.last_date()) {
            (Some(first), Some(last)) => Ok(AvailablePeriod {
                indicator: key.to_string(),
                first,
                last,
                count: series.len(),
            }),
            _ => Err(AppError::NotFound(format!("Data for indicator '{}'", key))),
        }
    }
}

/// Windows actually requested for an indicator
fn request_windows(indicator: &Indicator, window: Option<DateWindow>) -> Vec<Option<DateWindow>> {
    match window {
        Some(w) if indicator.frequency == Frequency::Daily => {
            w.chunks(DAILY_WINDOW_DAYS).into_iter().map(Some).collect()
        }
        other => vec![other],
    }
}

async fn fetch_indicator(
    source: &dyn SeriesSource,
    indicator: &Indicator,
    window: Option<DateWindow>,
) -> (AppResult<Series>, CollectionStats) {
    let mut stats = CollectionStats::default();
    let mut observations: Vec<Observation> = Vec::new();

    for chunk in request_windows(indicator, window) {
        stats.total_requests += 1;
        match source.fetch(indicator.series_id, chunk).await {
            Ok(mut batch) => {
                stats.successful_requests += 1;
                observations.append(&mut batch);
            }
            Err(e) => {
                stats.failed_requests += 1;
                return (Err(e), stats);
            }
        }
    }

    let series = Series::new(indicator.key.clone(), indicator.series_id, observations);
    if series.is_empty() {
        warn!(indicator = %indicator.key, "no valid observations returned");
        return (
            Err(AppError::InsufficientData {
                required: 1,
                actual: 0,
            }),
            stats,
        );
    }

    stats.total_records = series.len();
    (Ok(series), stats)
}
