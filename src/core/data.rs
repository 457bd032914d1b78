//! Core data structures for economic series
//!
//! This module contains the fundamental data structures used throughout
//! bcbcast: observations, collected series and collection bookkeeping.

use crate::utils::error::{AppError, AppResult};
use crate::utils::format::{self, format_bcb_date};
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// `date - days`, or a config error when that falls outside the calendar
pub fn days_before(date: NaiveDate, days: u64) -> AppResult<NaiveDate> {
    date.checked_sub_days(Days::new(days)).ok_or_else(|| {
        AppError::Config(format!(
            "Going back {} days from {} leaves the supported date range",
            days,
            format_bcb_date(&date)
        ))
    })
}

/// A single dated value of an indicator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn quarter(&self) -> u32 {
        (self.date.month() - 1) / 3 + 1
    }
}

/// Sort ascending by date and keep the last observation seen for each date
pub fn normalize_observations(mut observations: Vec<Observation>) -> Vec<Observation> {
    // Stable sort keeps input order among equal dates, so the last one wins below.
    observations.sort_by_key(|o| o.date);
    let mut out: Vec<Observation> = Vec::with_capacity(observations.len());
    for obs in observations {
        match out.last_mut() {
            Some(last) if last.date == obs.date => *last = obs,
            _ => out.push(obs),
        }
    }
    out
}

/// A collected indicator series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub indicator: String,
    pub series_id: u32,
    pub observations: Vec<Observation>,
    #[serde(with = "format")]
    pub collected_at: DateTime<Utc>,
}

impl Series {
    pub fn new(indicator: impl Into<String>, series_id: u32, observations: Vec<Observation>) -> Self {
        Self {
            indicator: indicator.into(),
            series_id,
            observations: normalize_observations(observations),
            collected_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    pub fn last_value(&self) -> Option<f64> {
        self.observations.last().map(|o| o.value)
    }

    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.value).collect()
    }
}

/// Request counters for one collection run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionStats {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub total_records: usize,
}

impl CollectionStats {
    pub fn success_rate(&self) -> f64 {
        self.successful_requests as f64 / self.total_requests.max(1) as f64 * 100.0
    }

    pub fn merge(&mut self, other: &CollectionStats) {
        self.total_requests += other.total_requests;
        self.successful_requests += other.successful_requests;
        self.failed_requests += other.failed_requests;
        self.total_records += other.total_records;
    }
}

/// Inclusive date interval used to filter SGS requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// `[today - 365 * years days, today]`
    pub fn last_years(years: u32, today: NaiveDate) -> AppResult<Self> {
        Ok(Self {
            start: days_before(today, 365 * years as u64)?,
            end: today,
        })
    }

    pub fn start_param(&self) -> String {
        format_bcb_date(&self.start)
    }

    pub fn end_param(&self) -> String {
        format_bcb_date(&self.end)
    }

    /// Split into consecutive windows no longer than `max_days` each
    pub fn chunks(&self, max_days: i64) -> Vec<DateWindow> {
        let mut windows = Vec::new();
        let mut start = self.start;
        while start <= self.end {
            let end = (start + Duration::days(max_days - 1)).min(self.end);
            windows.push(DateWindow { start, end });
            start = end + Duration::days(1);
        }
        windows
    }
}

/// Per-indicator overview of what is stored locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub indicator: String,
    pub count: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub last_value: Option<f64>,
    pub mean: Option<f64>,
}

/// One entry of the collection history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionRun {
    pub id: String,
    #[serde(with = "format")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "format")]
    pub finished_at: DateTime<Utc>,
    pub indicators: Vec<String>,
    pub records: usize,
    pub successful: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_normalize_sorts_and_keeps_last_duplicate() {
        let obs = vec![
            Observation::new(d(2024, 3, 1), 3.0),
            Observation::new(d(2024, 1, 1), 1.0),
            Observation::new(d(2024, 3, 1), 3.5),
            Observation::new(d(2024, 2, 1), 2.0),
        ];
        let normalized = normalize_observations(obs);
        let values: Vec<f64> = normalized.iter().map(|o| o.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.5]);
    }

    #[test]
    fn test_quarter_from_month() {
        assert_eq!(Observation::new(d(2024, 1, 1), 0.0).quarter(), 1);
        assert_eq!(Observation::new(d(2024, 6, 30), 0.0).quarter(), 2);
        assert_eq!(Observation::new(d(2024, 12, 1), 0.0).quarter(), 4);
    }

    #[test]
    fn test_success_rate_never_divides_by_zero() {
        let stats = CollectionStats::default();
        assert_eq!(stats.success_rate(), 0.0);

        let stats = CollectionStats {
            total_requests: 4,
            successful_requests: 3,
            failed_requests: 1,
            total_records: 100,
        };
        assert!((stats.success_rate() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_last_years_window() {
        let window = DateWindow::last_years(2, d(2024, 6, 15)).unwrap();
        assert_eq!(window.end, d(2024, 6, 15));
        assert_eq!(window.start, d(2022, 6, 16));
        assert_eq!(window.start_param(), "16/06/2022");
    }

    #[test]
    fn test_huge_lookback_is_an_error_not_a_panic() {
        let err = DateWindow::last_years(1_000_000, d(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(days_before(d(2024, 1, 1), 30 * 100_000_000).is_err());
        assert_eq!(days_before(d(2024, 3, 1), 1).unwrap(), d(2024, 2, 29));
    }

    #[test]
    fn test_chunks_cover_window_without_overlap() {
        let window = DateWindow::new(d(2000, 1, 1), d(2024, 12, 31));
        let chunks = window.chunks(3650);
        assert_eq!(chunks.first().unwrap().start, window.start);
        assert_eq!(chunks.last().unwrap().end, window.end);
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end + Duration::days(1), pair[1].start);
        }
        assert!(chunks.iter().all(|c| (c.end - c.start).num_days() < 3650));
    }
}
