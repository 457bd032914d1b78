use super::tree::{RegressionTree, TreeParams};
use crate::utils::error::{AppError, AppResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub tree: TreeParams,
    pub random_state: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            tree: TreeParams::default(),
            random_state: 42,
        }
    }
}

/// Bagged ensemble of regression trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// Trees are fitted in parallel; tree `i` draws its bootstrap sample from
    /// a generator seeded with `random_state + i`, so results do not depend
    /// on scheduling.
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: ForestParams) -> AppResult<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(AppError::Model(format!(
                "Cannot fit forest on {} rows and {} targets",
                x.len(),
                y.len()
            )));
        }
        if params.n_estimators == 0 {
            return Err(AppError::Model("n_estimators must be at least 1".to_string()));
        }

        let n = x.len();
        let trees: Vec<RegressionTree> = (0..params.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(params.random_state.wrapping_add(i as u64));
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, &sample, params.tree, &mut rng)
            })
            .collect();

        Ok(Self {
            params,
            n_features: x[0].len(),
            trees,
        })
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        total / self.trees.len().max(1) as f64
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }

    /// Mean of the per-tree normalised impurity decreases, summing to 1
    /// unless no tree ever split.
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut importances = vec![0.0; self.n_features];
        for tree in &self.trees {
            let total: f64 = tree.importances().iter().sum();
            if total <= 0.0 {
                continue;
            }
            for (acc, imp) in importances.iter_mut().zip(tree.importances()) {
                *acc += imp / total;
            }
        }

        let sum: f64 = importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut importances {
                *imp /= sum;
            }
        }
        importances
    }
}
