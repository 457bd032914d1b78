use crate::core::data::{CollectionRun, Observation, Series, SeriesSummary};
use crate::core::traits::SeriesStore;
use crate::utils::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const ISO_DATE: &str = "%Y-%m-%d";

const SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS observations (
        indicator TEXT NOT NULL,
        series_id INTEGER NOT NULL,
        date TEXT NOT NULL,
        value REAL NOT NULL,
        collected_at TEXT NOT NULL,
        PRIMARY KEY (indicator, date)
    )",
    "CREATE TABLE IF NOT EXISTS collection_runs (
        id TEXT PRIMARY KEY,
        started_at TEXT NOT NULL,
        finished_at TEXT NOT NULL,
        indicators TEXT NOT NULL,
        records INTEGER NOT NULL,
        successful INTEGER NOT NULL,
        failed INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_collection_runs_started ON collection_runs(started_at)",
];

/// SQLite-backed series store
pub struct SqliteStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteStore {
    pub async fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = db_path_to_url(path)?;
        let options = SqliteConnectOptions::from_str(&db_url)
            .map_err(|e| AppError::Database(format!("Failed to parse database URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database {}: {e}", path.display())))?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| AppError::Database(format!("Failed to apply schema: {e}")))?;
        }

        debug!(path = %path.display(), "database ready");
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Database did not answer: {e}")))?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SeriesStore for SqliteStore {
    async fn save_series(&self, series: &Series) -> AppResult<usize> {
        let collected_at = series.collected_at.to_rfc3339();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to start transaction: {e}")))?;

        for obs in &series.observations {
            sqlx::query(
                "INSERT INTO observations (indicator, series_id, date, value, collected_at) \
                 VALUES (?, ?, ?, ?, ?) \
                 ON CONFLICT(indicator, date) DO UPDATE SET \
                 series_id = excluded.series_id, value = excluded.value, collected_at = excluded.collected_at",
            )
            .bind(&series.indicator)
            .bind(series.series_id as i64)
            .bind(obs.date.format(ISO_DATE).to_string())
            .bind(obs.value)
            .bind(&collected_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Database(format!("Failed to save {}: {e}", series.indicator)))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::Database(format!("Failed to commit {}: {e}", series.indicator)))?;

        debug!(indicator = %series.indicator, rows = series.len(), "series saved");
        Ok(series.len())
    }

    async fn load_series(
        &self,
        indicator: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AppResult<Vec<Observation>> {
        let rows = sqlx::query_as::<_, ObservationEntity>(
            "SELECT date, value FROM observations \
             WHERE indicator = ? \
             AND date >= COALESCE(?, '0000-01-01') \
             AND date <= COALESCE(?, '9999-12-31') \
             ORDER BY date ASC",
        )
        .bind(indicator)
        .bind(from.map(|d| d.format(ISO_DATE).to_string()))
        .bind(to.map(|d| d.format(ISO_DATE).to_string()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to load {indicator}: {e}")))?;

        rows.into_iter().map(Observation::try_from).collect()
    }

    async fn count(&self, indicator: &str) -> AppResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM observations WHERE indicator = ?")
            .bind(indicator)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to count {indicator}: {e}")))?;
        Ok(count as usize)
    }

    async fn summaries(&self) -> AppResult<Vec<SeriesSummary>> {
        let rows = sqlx::query_as::<_, SummaryEntity>(
            "SELECT o.indicator AS indicator, COUNT(*) AS count, \
             MIN(o.date) AS first_date, MAX(o.date) AS last_date, AVG(o.value) AS mean, \
             (SELECT l.value FROM observations l WHERE l.indicator = o.indicator \
              ORDER BY l.date DESC LIMIT 1) AS last_value \
             FROM observations o GROUP BY o.indicator ORDER BY o.indicator",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to summarize series: {e}")))?;

        rows.into_iter().map(SeriesSummary::try_from).collect()
    }

    async fn delete_indicator(&self, indicator: &str) -> AppResult<usize> {
        let result = sqlx::query("DELETE FROM observations WHERE indicator = ?")
            .bind(indicator)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete {indicator}: {e}")))?;
        Ok(result.rows_affected() as usize)
    }

    async fn purge(&self) -> AppResult<usize> {
        let result = sqlx::query("DELETE FROM observations")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to purge observations: {e}")))?;
        sqlx::query("DELETE FROM collection_runs")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to purge collection history: {e}")))?;
        Ok(result.rows_affected() as usize)
    }

    async fn record_run(&self, run: &CollectionRun) -> AppResult<()> {
        let indicators = serde_json::to_string(&run.indicators)
            .map_err(|e| AppError::Database(format!("Failed to encode indicators: {e}")))?;

        sqlx::query(
            "INSERT OR REPLACE INTO collection_runs \
             (id, started_at, finished_at, indicators, records, successful, failed) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&run.id)
        .bind(run.started_at.to_rfc3339())
        .bind(run.finished_at.to_rfc3339())
        .bind(indicators)
        .bind(run.records as i64)
        .bind(run.successful as i64)
        .bind(run.failed as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to record collection run: {e}")))?;

        Ok(())
    }

    async fn recent_runs(&self, limit: usize) -> AppResult<Vec<CollectionRun>> {
        let rows = sqlx::query_as::<_, RunEntity>(
            "SELECT id, started_at, finished_at, indicators, records, successful, failed \
             FROM collection_runs ORDER BY started_at DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to list collection runs: {e}")))?;

        rows.into_iter().map(CollectionRun::try_from).collect()
    }
}

#[derive(sqlx::FromRow)]
struct ObservationEntity {
    date: String,
    value: f64,
}

impl TryFrom<ObservationEntity> for Observation {
    type Error = AppError;

    fn try_from(entity: ObservationEntity) -> AppResult<Self> {
        Ok(Observation::new(parse_iso_date(&entity.date)?, entity.value))
    }
}

#[derive(sqlx::FromRow)]
struct SummaryEntity {
    indicator: String,
    count: i64,
    first_date: Option<String>,
    last_date: Option<String>,
    mean: Option<f64>,
    last_value: Option<f64>,
}

impl TryFrom<SummaryEntity> for SeriesSummary {
    type Error = AppError;

    fn try_from(entity: SummaryEntity) -> AppResult<Self> {
        Ok(SeriesSummary {
            indicator: entity.indicator,
            count: entity.count as usize,
            first_date: entity.first_date.as_deref().map(parse_iso_date).transpose()?,
            last_date: entity.last_date.as_deref().map(parse_iso_date).transpose()?,
            last_value: entity.last_value,
            mean: entity.mean,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RunEntity {
    id: String,
    started_at: String,
    finished_at: String,
    indicators: String,
    records: i64,
    successful: i64,
    failed: i64,
}

impl TryFrom<RunEntity> for CollectionRun {
    type Error = AppError;

    fn try_from(entity: RunEntity) -> AppResult<Self> {
        let indicators: Vec<String> = serde_json::from_str(&entity.indicators)
            .map_err(|e| AppError::Database(format!("Corrupt indicator list in run {}: {e}", entity.id)))?;
        Ok(CollectionRun {
            started_at: parse_timestamp(&entity.started_at)?,
            finished_at: parse_timestamp(&entity.finished_at)?,
            id: entity.id,
            indicators,
            records: entity.records as usize,
            successful: entity.successful as usize,
            failed: entity.failed as usize,
        })
    }
}

fn parse_iso_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, ISO_DATE)
        .map_err(|e| AppError::Database(format!("Invalid stored date '{value}': {e}")))
}

fn parse_timestamp(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Database(format!("Invalid stored timestamp '{value}': {e}")))
}

fn db_path_to_url(db_path: &Path) -> AppResult<String> {
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| AppError::Database("Database path is not valid UTF-8".to_string()))?;
    Ok(format!("sqlite://{}", db_path_str.replace('\\', "/")))
}
