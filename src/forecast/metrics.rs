use serde::{Deserialize, Serialize};

/// Hold-out evaluation of a trained model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub r2: f64,
    pub rmse: f64,
    pub mae: f64,
    pub samples_train: usize,
    pub samples_test: usize,
}

impl Metrics {
    pub fn evaluate(actual: &[f64], predicted: &[f64], samples_train: usize) -> Self {
        Self {
            r2: r2_score(actual, predicted),
            rmse: rmse(actual, predicted),
            mae: mae(actual, predicted),
            samples_train,
            samples_test: actual.len(),
        }
    }
}

/// Coefficient of determination. A constant target scores 1 when predicted
/// exactly and 0 otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let mse: f64 =
        actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum::<f64>() / actual.len() as f64;
    mse.sqrt()
}

pub fn mae(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()).sum::<f64>() / actual.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_prediction() {
        let y = [1.0, 2.0, 3.0];
        let m = Metrics::evaluate(&y, &y, 10);
        assert_eq!(m.r2, 1.0);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.samples_test, 3);
    }

    #[test]
    fn test_known_errors() {
        let actual = [1.0, 2.0, 3.0, 4.0];
        let predicted = [2.0, 2.0, 3.0, 2.0];
        assert_eq!(mae(&actual, &predicted), 0.75);
        assert!((rmse(&actual, &predicted) - (5.0f64 / 4.0).sqrt()).abs() < 1e-12);
        // ss_res = 5, ss_tot = 5
        assert_eq!(r2_score(&actual, &predicted), 0.0);
    }

    #[test]
    fn test_constant_target() {
        assert_eq!(r2_score(&[2.0, 2.0], &[2.0, 2.0]), 1.0);
        assert_eq!(r2_score(&[2.0, 2.0], &[2.0, 3.0]), 0.0);
    }
}
