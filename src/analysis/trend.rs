use super::stats::{mean, pearson, population_std};
use crate::core::data::{Observation, normalize_observations};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Ascending,
    Descending,
    Stable,
    InsufficientData,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrendDirection::Ascending => "ascending",
            TrendDirection::Descending => "descending",
            TrendDirection::Stable => "stable",
            TrendDirection::InsufficientData => "insufficient_data",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub trend: TrendDirection,
    /// Change per day
    pub slope: f64,
    /// r² of the linear fit
    pub confidence: f64,
    pub recent_change_pct: f64,
    pub volatility: f64,
    pub observations: usize,
    pub last_value: Option<f64>,
}

impl TrendAnalysis {
    fn insufficient(observations: usize, last_value: Option<f64>) -> Self {
        Self {
            trend: TrendDirection::InsufficientData,
            slope: 0.0,
            confidence: 0.0,
            recent_change_pct: 0.0,
            volatility: 0.0,
            observations,
            last_value,
        }
    }
}

/// Least-squares trend of the values against days elapsed since the first date
pub fn analyze_trend(observations: &[Observation]) -> TrendAnalysis {
    let observations = normalize_observations(observations.to_vec());
    let last_value = observations.last().map(|o| o.value);
    if observations.len() < 3 {
        return TrendAnalysis::insufficient(observations.len(), last_value);
    }

    let origin = observations[0].date;
    let x: Vec<f64> = observations
        .iter()
        .map(|o| (o.date - origin).num_days() as f64)
        .collect();
    let y: Vec<f64> = observations.iter().map(|o| o.value).collect();

    let slope = least_squares_slope(&x, &y);
    let confidence = pearson(&x, &y).map(|r| r * r).unwrap_or(0.0);
    let std = population_std(&y);
    let threshold = std * 0.01;

    // A flat series has a zero threshold, which `<` alone would never match.
    let trend = if slope == 0.0 || slope.abs() < threshold {
        TrendDirection::Stable
    } else if slope > 0.0 {
        TrendDirection::Ascending
    } else {
        TrendDirection::Descending
    };

    let first = y[0];
    let last = y[y.len() - 1];
    let recent_change_pct = if first != 0.0 {
        (last - first) / first.abs() * 100.0
    } else {
        0.0
    };

    let volatility = match mean(&y) {
        Some(m) if m != 0.0 => std / m * 100.0,
        _ => 0.0,
    };

    TrendAnalysis {
        trend,
        slope,
        confidence,
        recent_change_pct,
        volatility,
        observations: y.len(),
        last_value,
    }
}

fn least_squares_slope(x: &[f64], y: &[f64]) -> f64 {
    let (Some(mx), Some(my)) = (mean(x), mean(y)) else {
        return 0.0;
    };
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
    }
    if sxx == 0.0 { 0.0 } else { sxy / sxx }
}
