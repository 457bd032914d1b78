use super::stats::pearson;
use crate::core::data::Observation;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    VeryStrong,
    Strong,
    Moderate,
    Weak,
}

impl Strength {
    pub fn classify(abs_r: f64) -> Self {
        if abs_r >= 0.8 {
            Strength::VeryStrong
        } else if abs_r >= 0.6 {
            Strength::Strong
        } else if abs_r >= 0.4 {
            Strength::Moderate
        } else {
            Strength::Weak
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strength::VeryStrong => "very_strong",
            Strength::Strong => "strong",
            Strength::Moderate => "moderate",
            Strength::Weak => "weak",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub first: String,
    pub second: String,
    pub correlation: f64,
    pub strength: Strength,
    pub direction: Direction,
}

impl Correlation {
    pub fn pair_key(&self) -> String {
        format!("{}_{}", self.first, self.second)
    }
}

/// Pairwise correlations above `threshold` in absolute value.
///
/// Series are aligned on the union of their dates; gaps are forward-filled,
/// then leading gaps are back-filled. Pairs keep input order.
pub fn analyze_correlation(series: &[(String, Vec<Observation>)], threshold: f64) -> Vec<Correlation> {
    let present: Vec<&(String, Vec<Observation>)> = series.iter().filter(|(_, obs)| !obs.is_empty()).collect();
    if present.len() < 2 {
        return Vec::new();
    }

    let dates: BTreeSet<NaiveDate> = present
        .iter()
        .flat_map(|(_, obs)| obs.iter().map(|o| o.date))
        .collect();
    let columns: Vec<Vec<f64>> = present.iter().map(|(_, obs)| align(obs, &dates)).collect();

    let mut correlations = Vec::new();
    for i in 0..present.len() {
        for j in (i + 1)..present.len() {
            let Some(r) = pearson(&columns[i], &columns[j]) else {
                continue;
            };
            if r.abs() > threshold {
                correlations.push(Correlation {
                    first: present[i].0.clone(),
                    second: present[j].0.clone(),
                    correlation: r,
                    strength: Strength::classify(r.abs()),
                    direction: if r > 0.0 { Direction::Positive } else { Direction::Negative },
                });
            }
        }
    }
    correlations
}

fn align(observations: &[Observation], dates: &BTreeSet<NaiveDate>) -> Vec<f64> {
    let by_date: BTreeMap<NaiveDate, f64> = observations.iter().map(|o| (o.date, o.value)).collect();

    let mut column: Vec<Option<f64>> = Vec::with_capacity(dates.len());
    let mut carry = None;
    for date in dates {
        if let Some(v) = by_date.get(date) {
            carry = Some(*v);
        }
        column.push(carry);
    }

    let first_known = column.iter().flatten().next().copied().unwrap_or(0.0);
    column.into_iter().map(|v| v.unwrap_or(first_known)).collect()
}
