//! CART regression tree
//!
//! Splits minimise the summed squared error of the two children. Nodes are
//! kept in a flat arena so the fitted tree serializes without deep nesting.

use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` uses all of them
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    decrease: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

struct Builder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    params: TreeParams,
    n_features: usize,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl RegressionTree {
    /// Fit on the rows named by `sample` (duplicates allowed, as in a bootstrap)
    pub fn fit(x: &[Vec<f64>], y: &[f64], sample: &[usize], params: TreeParams, rng: &mut StdRng) -> Self {
        let n_features = x.first().map(|row| row.len()).unwrap_or(0);
        let mut builder = Builder {
            x,
            y,
            params,
            n_features,
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        };
        builder.grow(sample.to_vec(), 0, rng);

        Self {
            nodes: builder.nodes,
            importances: builder.importances,
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Total impurity decrease per feature, unnormalised
    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() { 0 } else { walk(&self.nodes, 0) }
    }
}

impl Builder<'_> {
    /// Appends the subtree for `sample` and returns the index of its root
    fn grow(&mut self, sample: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let idx = self.nodes.len();
        let (sum, sse) = sum_and_sse(self.y, &sample);
        self.nodes.push(Node::Leaf {
            value: if sample.is_empty() { 0.0 } else { sum / sample.len() as f64 },
        });

        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
        if depth_reached || sample.len() < self.params.min_samples_split.max(2) || sse <= f64::EPSILON {
            return idx;
        }

        let Some(split) = self.best_split(&sample, sse, rng) else {
            return idx;
        };

        self.importances[split.feature] += split.decrease;
        let left = self.grow(split.left, depth + 1, rng);
        let right = self.grow(split.right, depth + 1, rng);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }

    fn best_split(&self, sample: &[usize], node_sse: f64, rng: &mut StdRng) -> Option<BestSplit> {
        let k = self
            .params
            .max_features
            .map_or(self.n_features, |m| m.clamp(1, self.n_features));
        let features = if k == self.n_features {
            (0..self.n_features).collect::<Vec<_>>()
        } else {
            index::sample(rng, self.n_features, k).into_vec()
        };

        let min_leaf = self.params.min_samples_leaf.max(1);
        let n = sample.len();
        let total_sum: f64 = sample.iter().map(|&i| self.y[i]).sum();
        let total_sq: f64 = sample.iter().map(|&i| self.y[i] * self.y[i]).sum();

        let mut best: Option<(usize, f64, f64)> = None;
        let mut order = sample.to_vec();

        for feature in features {
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for pos in 0..n - 1 {
                let yi = self.y[order[pos]];
                left_sum += yi;
                left_sq += yi * yi;

                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let here = self.x[order[pos]][feature];
                let next = self.x[order[pos + 1]][feature];
                if here == next {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let children_sse = (left_sq - left_sum * left_sum / n_left as f64)
                    + (right_sq - right_sum * right_sum / n_right as f64);
                let decrease = node_sse - children_sse.max(0.0);

                if best.is_none_or(|(_, _, d)| decrease > d + 1e-12) {
                    best = Some((feature, (here + next) / 2.0, decrease));
                }
            }
        }

        let (feature, threshold, decrease) = best?;
        if decrease <= 0.0 {
            return None;
        }

        let (left, right): (Vec<usize>, Vec<usize>) =
            sample.iter().partition(|&&i| self.x[i][feature] <= threshold);

        Some(BestSplit {
            feature,
            threshold,
            decrease,
            left,
            right,
        })
    }
}

fn sum_and_sse(y: &[f64], sample: &[usize]) -> (f64, f64) {
    if sample.is_empty() {
        return (0.0, 0.0);
    }
    let n = sample.len() as f64;
    let sum: f64 = sample.iter().map(|&i| y[i]).sum();
    let mean = sum / n;
    let sse = sample.iter().map(|&i| (y[i] - mean).powi(2)).sum();
    (sum, sse)
}
