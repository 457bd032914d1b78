//! Lag feature engineering
//!
//! Every row describes one observation `t` by the `W` previous values, the
//! 3 and 6 point rolling means ending at `t` and the calendar position of `t`.

use crate::core::data::{Observation, normalize_observations};
use crate::utils::error::{AppError, AppResult};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Minimum number of usable rows after dropping incomplete lags
pub const MIN_FEATURE_ROWS: usize = 20;

const MOVING_AVERAGES: [usize; 2] = [3, 6];

#[derive(Debug, Clone, Serialize)]
pub struct FeatureFrame {
    pub columns: Vec<String>,
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

impl FeatureFrame {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// `lag_1 … lag_W, ma_3, ma_6, month, quarter`
pub fn feature_columns(window: usize) -> Vec<String> {
    let mut columns: Vec<String> = (1..=window).map(|i| format!("lag_{}", i)).collect();
    columns.extend(MOVING_AVERAGES.iter().map(|w| format!("ma_{}", w)));
    columns.push("month".to_string());
    columns.push("quarter".to_string());
    columns
}

pub fn build_features(observations: &[Observation], window: usize) -> AppResult<FeatureFrame> {
    if window == 0 {
        return Err(AppError::Model("Lag window must be at least 1".to_string()));
    }

    let observations = normalize_observations(observations.to_vec());
    let values: Vec<f64> = observations.iter().map(|o| o.value).collect();

    let mut frame = FeatureFrame {
        columns: feature_columns(window),
        dates: Vec::new(),
        rows: Vec::new(),
        targets: Vec::new(),
    };

    for t in window..values.len() {
        let mut row: Vec<f64> = (1..=window).map(|i| values[t - i]).collect();
        for w in MOVING_AVERAGES {
            row.push(trailing_mean(&values[..=t], w));
        }
        push_calendar(&mut row, observations[t].date);

        frame.dates.push(observations[t].date);
        frame.rows.push(row);
        frame.targets.push(values[t]);
    }

    if frame.len() < MIN_FEATURE_ROWS {
        return Err(AppError::InsufficientData {
            required: MIN_FEATURE_ROWS,
            actual: frame.len(),
        });
    }

    Ok(frame)
}

/// Features for the point that follows `history` on `date`.
///
/// The value at `date` is unknown, so the rolling means end at the newest
/// known value.
pub fn next_row(history: &[f64], date: NaiveDate, window: usize) -> AppResult<Vec<f64>> {
    if history.len() < window {
        return Err(AppError::InsufficientData {
            required: window,
            actual: history.len(),
        });
    }

    let n = history.len();
    let mut row: Vec<f64> = (1..=window).map(|i| history[n - i]).collect();
    for w in MOVING_AVERAGES {
        row.push(trailing_mean(history, w));
    }
    push_calendar(&mut row, date);
    Ok(row)
}

/// Mean of the last `w` values, or of all of them when there are fewer
fn trailing_mean(values: &[f64], w: usize) -> f64 {
    let tail = &values[values.len().saturating_sub(w)..];
    if tail.is_empty() {
        return 0.0;
    }
    tail.iter().sum::<f64>() / tail.len() as f64
}

fn push_calendar(row: &mut Vec<f64>, date: NaiveDate) {
    row.push(date.month() as f64);
    row.push(((date.month() - 1) / 3 + 1) as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Months;

    fn monthly(n: usize) -> Vec<Observation> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        (0..n)
            .map(|i| Observation::new(start + Months::new(i as u32), i as f64))
            .collect()
    }

    #[test]
    fn test_columns_layout() {
        assert_eq!(
            feature_columns(2),
            vec!["lag_1", "lag_2", "ma_3", "ma_6", "month", "quarter"]
        );
    }

    #[test]
    fn test_first_window_rows_are_dropped() {
        let frame = build_features(&monthly(30), 6).unwrap();
        assert_eq!(frame.len(), 24);
        assert_eq!(frame.targets[0], 6.0);

        let first = &frame.rows[0];
        assert_eq!(&first[..6], &[5.0, 4.0, 3.0, 2.0, 1.0, 0.0]);
        // ma_3 includes the current value: (4 + 5 + 6) / 3
        assert_eq!(first[6], 5.0);
        // 2020-07 is month 7 of quarter 3
        assert_eq!(first[8], 7.0);
        assert_eq!(first[9], 3.0);
    }

    #[test]
    fn test_too_few_rows() {
        match build_features(&monthly(25), 6) {
            Err(AppError::InsufficientData { required, actual }) => {
                assert_eq!(required, 20);
                assert_eq!(actual, 19);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_next_row_uses_known_values_only() {
        let history = vec![1.0, 2.0, 3.0, 4.0];
        let date = NaiveDate::from_ymd_opt(2024, 11, 1).unwrap();
        let row = next_row(&history, date, 2).unwrap();
        assert_eq!(row, vec![4.0, 3.0, 3.0, 2.5, 11.0, 4.0]);
        assert!(next_row(&history, date, 5).is_err());
    }
}
