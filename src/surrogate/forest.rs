// Copyright 2026 PulseSynth Contributors
// SPDX-License-Identifier: Apache-2.0

//! Random-forest regressor used as the fidelity surrogate.
//!
//! Bagged CART trees with variance-reduction splits. Every feature is a
//! split candidate at every node; leaves hold the mean label. Each tree
//! gets its own generator seeded from (seed, tree index), so the fit is
//! deterministic with or without the `parallel` feature.

use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::validation::validate_count;

/// Forest hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub min_samples_leaf: usize,
    pub max_depth: Option<usize>,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 400,
            min_samples_leaf: 2,
            max_depth: None,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// One regression tree stored as a node arena; node 0 is the root.
#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn predict(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf(v) => return v,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if x[feature] <= threshold { left } else { right },
            }
        }
    }
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    min_leaf: usize,
    max_depth: usize,
    nodes: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn build(&mut self, rows: &mut [usize], depth: usize) -> usize {
        let id = self.nodes.len();
        let mean = rows.iter().map(|&r| self.y[r]).sum::<f64>() / rows.len() as f64;
        self.nodes.push(Node::Leaf(mean));

        if depth >= self.max_depth || rows.len() < 2 * self.min_leaf {
            return id;
        }
        let Some((feature, threshold)) = self.best_split(rows) else {
            return id;
        };

        let mut split_at = 0;
        for k in 0..rows.len() {
            if self.x[[rows[k], feature]] <= threshold {
                rows.swap(k, split_at);
                split_at += 1;
            }
        }
        let (left_rows, right_rows) = rows.split_at_mut(split_at);
        let left = self.build(left_rows, depth + 1);
        let right = self.build(right_rows, depth + 1);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    /// Split maximizing the reduction in summed squared error.
    fn best_split(&self, rows: &[usize]) -> Option<(usize, f64)> {
        let n = rows.len();
        let total: f64 = rows.iter().map(|&r| self.y[r]).sum();
        let total_sq: f64 = rows.iter().map(|&r| self.y[r] * self.y[r]).sum();
        let parent_sse = total_sq - total * total / n as f64;
        if parent_sse <= 1e-14 {
            return None;
        }

        let mut best: Option<(usize, f64, f64)> = None;
        let mut order = rows.to_vec();
        for feature in 0..self.x.ncols() {
            order.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));
            let (mut left_sum, mut left_sq) = (0.0, 0.0);
            for k in 0..n - 1 {
                let yk = self.y[order[k]];
                left_sum += yk;
                left_sq += yk * yk;
                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < self.min_leaf || n_right < self.min_leaf {
                    continue;
                }
                let here = self.x[[order[k], feature]];
                let next = self.x[[order[k + 1], feature]];
                if here == next {
                    continue;
                }
                let right_sum = total - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / n_left as f64)
                    + (right_sq - right_sum * right_sum / n_right as f64);
                if best.map_or(true, |(_, _, b)| sse < b) {
                    best = Some((feature, 0.5 * (here + next), sse));
                }
            }
        }
        best.filter(|&(_, _, sse)| sse < parent_sse)
            .map(|(f, t, _)| (f, t))
    }
}

fn fit_tree(x: &Array2<f64>, y: &Array1<f64>, config: &ForestConfig, tree_index: usize) -> Tree {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    rng.set_stream(tree_index as u64);
    let n = x.nrows();
    let mut rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
    let mut builder = TreeBuilder {
        x,
        y,
        min_leaf: config.min_samples_leaf.max(1),
        max_depth: config.max_depth.unwrap_or(usize::MAX),
        nodes: Vec::new(),
    };
    builder.build(&mut rows, 0);
    Tree {
        nodes: builder.nodes,
    }
}

/// Bagged regression trees.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<Tree>,
    n_features: usize,
}

impl RandomForest {
    /// Fit on rows of `x` against `y`.
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, config: &ForestConfig) -> Result<Self> {
        validate_count("n_trees", config.n_trees)?;
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(Error::Shape(format!(
                "forest needs a non-empty design matrix with one label per row ({} rows, {} labels)",
                x.nrows(),
                y.len()
            )));
        }

        #[cfg(feature = "parallel")]
        let trees: Vec<Tree> = {
            use rayon::prelude::*;
            (0..config.n_trees)
                .into_par_iter()
                .map(|t| fit_tree(x, y, config, t))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let trees: Vec<Tree> = (0..config.n_trees)
            .map(|t| fit_tree(x, y, config, t))
            .collect();

        debug!(
            n_trees = trees.len(),
            mean_nodes = trees.iter().map(|t| t.nodes.len()).sum::<usize>() as f64 / trees.len() as f64,
            "Fitted random forest"
        );
        Ok(Self {
            trees,
            n_features: x.ncols(),
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean tree prediction for one feature row.
    pub fn predict_row(&self, x: &[f64]) -> f64 {
        self.trees.iter().map(|t| t.predict(x)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.n_features {
            return Err(Error::Shape(format!(
                "forest was fitted on {} features, got {}",
                self.n_features,
                x.ncols()
            )));
        }
        Ok(x.outer_iter()
            .map(|row| self.predict_view(row))
            .collect())
    }

    fn predict_view(&self, row: ArrayView1<f64>) -> f64 {
        match row.as_slice() {
            Some(s) => self.predict_row(s),
            None => self.predict_row(&row.to_vec()),
        }
    }
}

/// Seeded shuffle split; returns (train, test) row indices.
///
/// The test partition has ceil(test_fraction · n) rows, at least one row
/// and leaving at least one for training.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if n < 2 {
        return Err(Error::Config(format!(
            "need at least 2 rows to split into train/test, got {}",
            n
        )));
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(Error::Config(format!(
            "test_fraction must lie in (0, 1), got {}",
            test_fraction
        )));
    }
    let n_test = ((test_fraction * n as f64).ceil() as usize).clamp(1, n - 1);
    let mut idx: Vec<usize> = (0..n).collect();
    idx.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
    let train = idx.split_off(n_test);
    Ok((train, idx))
}

/// Held-out generalization diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurrogateMetrics {
    pub mae: f64,
    pub r2: f64,
    pub y_test_mean: f64,
    pub n_train: usize,
    pub n_test: usize,
}

/// Mean absolute error and coefficient of determination.
///
/// A constant target gives R² = 1 for a perfect prediction and 0 otherwise.
pub fn regression_metrics(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (f64, f64) {
    let n = y_true.len() as f64;
    let mean = y_true.sum() / n;
    let mae = (y_true - y_pred).mapv(f64::abs).sum() / n;
    let ss_res = (y_true - y_pred).mapv(|e| e * e).sum();
    let ss_tot = y_true.mapv(|v| (v - mean) * (v - mean)).sum();
    let r2 = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    };
    (mae, r2)
}

/// Forest trained on the train split plus its held-out metrics.
#[derive(Debug, Clone)]
pub struct TrainedSurrogate {
    pub forest: RandomForest,
    pub metrics: SurrogateMetrics,
}

/// Split, fit on the train rows, score on the test rows.
pub fn train_surrogate(
    x: &Array2<f64>,
    y: &Array1<f64>,
    config: &ForestConfig,
    test_fraction: f64,
) -> Result<TrainedSurrogate> {
    let (train, test) = train_test_split(x.nrows(), test_fraction, config.seed)?;
    let x_train = x.select(ndarray::Axis(0), &train);
    let y_train = y.select(ndarray::Axis(0), &train);
    let x_test = x.select(ndarray::Axis(0), &test);
    let y_test = y.select(ndarray::Axis(0), &test);

    let forest = RandomForest::fit(&x_train, &y_train, config)?;
    let y_pred = forest.predict(&x_test)?;
    let (mae, r2) = regression_metrics(&y_test, &y_pred);
    let metrics = SurrogateMetrics {
        mae,
        r2,
        y_test_mean: y_test.sum() / y_test.len() as f64,
        n_train: train.len(),
        n_test: test.len(),
    };
    info!(
        mae = metrics.mae,
        r2 = metrics.r2,
        y_test_mean = metrics.y_test_mean,
        n_train = metrics.n_train,
        n_test = metrics.n_test,
        "Trained surrogate"
    );
    Ok(TrainedSurrogate { forest, metrics })
}
