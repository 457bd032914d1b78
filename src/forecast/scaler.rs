use crate::utils::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Column-wise standardisation fitted on training rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> AppResult<Self> {
        let first = rows
            .first()
            .ok_or_else(|| AppError::Model("Cannot fit a scaler on zero rows".to_string()))?;
        let width = first.len();
        let n = rows.len() as f64;

        let mut means = vec![0.0; width];
        for row in rows {
            if row.len() != width {
                return Err(AppError::Model(format!(
                    "Ragged feature rows: expected {} columns, got {}",
                    width,
                    row.len()
                )));
            }
            for (mean, x) in means.iter_mut().zip(row) {
                *mean += x / n;
            }
        }

        let mut scales = vec![0.0; width];
        for row in rows {
            for ((scale, mean), x) in scales.iter_mut().zip(&means).zip(row) {
                *scale += (x - mean).powi(2) / n;
            }
        }
        for scale in &mut scales {
            *scale = scale.sqrt();
            if *scale == 0.0 || !scale.is_finite() {
                *scale = 1.0;
            }
        }

        Ok(Self { means, scales })
    }

    pub fn width(&self) -> usize {
        self.means.len()
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(x, (mean, scale))| (x - mean) / scale)
            .collect()
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_std_and_constant_columns() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();

        assert_eq!(scaler.transform_row(&[1.0, 5.0]), vec![-1.0, 0.0]);
        assert_eq!(scaler.transform_row(&[3.0, 7.0]), vec![1.0, 2.0]);
    }

    #[test]
    fn test_rejects_empty_and_ragged() {
        assert!(StandardScaler::fit(&[]).is_err());
        assert!(StandardScaler::fit(&[vec![1.0], vec![1.0, 2.0]]).is_err());
    }
}
