use super::stats::{median, quantile, sample_std};
use crate::core::data::Observation;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierKind {
    High,
    Low,
}

impl fmt::Display for OutlierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierKind::High => write!(f, "high"),
            OutlierKind::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outlier {
    pub date: NaiveDate,
    pub value: f64,
    pub kind: OutlierKind,
    /// Distance from the median in sample standard deviations
    pub deviation: f64,
}

/// Values outside `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`, in input order
pub fn detect_outliers(observations: &[Observation]) -> Vec<Outlier> {
    if observations.len() < 4 {
        return Vec::new();
    }

    let values: Vec<f64> = observations.iter().map(|o| o.value).collect();
    let (Some(q1), Some(q3), Some(med)) = (quantile(&values, 0.25), quantile(&values, 0.75), median(&values))
    else {
        return Vec::new();
    };
    let iqr = q3 - q1;
    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;
    let std = sample_std(&values);

    observations
        .iter()
        .filter(|o| o.value < lower || o.value > upper)
        .map(|o| Outlier {
            date: o.date,
            value: o.value,
            kind: if o.value > upper { OutlierKind::High } else { OutlierKind::Low },
            deviation: if std > 0.0 { (o.value - med).abs() / std } else { 0.0 },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Vec<Observation> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Observation::new(NaiveDate::from_ymd_opt(2024, 1 + i as u32, 1).unwrap(), *v))
            .collect()
    }

    #[test]
    fn test_detects_spike() {
        let outliers = detect_outliers(&series(&[1.0, 1.1, 0.9, 1.0, 1.05, 9.0]));
        assert_eq!(outliers.len(), 1);
        assert_eq!(outliers[0].kind, OutlierKind::High);
        assert_eq!(outliers[0].value, 9.0);
        assert!(outliers[0].deviation > 1.0);
    }

    #[test]
    fn test_detects_low_values() {
        let outliers = detect_outliers(&series(&[10.0, 10.2, 9.9, 10.1, -5.0]));
        assert_eq!(outliers.len(), 1);
        assert_eq!(outliers[0].kind, OutlierKind::Low);
    }

    #[test]
    fn test_needs_four_points() {
        assert!(detect_outliers(&series(&[1.0, 100.0, 1.0])).is_empty());
    }
}
