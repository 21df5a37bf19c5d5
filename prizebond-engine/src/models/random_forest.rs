use ndarray::{ArrayView1, ArrayView2};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{EnsembleRegressor, FittedEnsemble};
use crate::config::ForestConfig;
use crate::error::{EngineError, Result};

/// Bagged regression trees with random feature subsets at each split.
pub struct RandomForestRegressor {
    config: ForestConfig,
}

impl RandomForestRegressor {
    pub fn new(config: ForestConfig) -> Self {
        Self { config }
    }

    /// Same forest settings, different random stream.
    pub fn with_seed(&self, seed: u64) -> Self {
        Self {
            config: ForestConfig { seed, ..self.config.clone() },
        }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }
}

pub struct RandomForest {
    trees: Vec<TreeNode>,
}

impl RandomForest {
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl EnsembleRegressor for RandomForestRegressor {
    type Model = RandomForest;

    fn name(&self) -> &str {
        "RandomForest"
    }

    fn fit(
        &self,
        features: ArrayView2<'_, f64>,
        target: ArrayView1<'_, f64>,
    ) -> Result<RandomForest> {
        let n_samples = features.nrows();
        if n_samples == 0 || target.len() != n_samples {
            return Err(EngineError::InsufficientData {
                required: 1,
                actual: n_samples.min(target.len()),
            });
        }

        let rows: Vec<Vec<f64>> = features.rows().into_iter().map(|r| r.to_vec()).collect();
        let labels: Vec<f64> = target.to_vec();

        let n_features = features.ncols();
        let features_per_split = self
            .config
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().ceil() as usize)
            .clamp(1, n_features.max(1));

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut trees = Vec::with_capacity(self.config.n_trees);

        for _ in 0..self.config.n_trees {
            // Bootstrap sampling
            let indices: Vec<usize> = (0..n_samples)
                .map(|_| rng.random_range(0..n_samples))
                .collect();
            let boot_rows: Vec<&Vec<f64>> = indices.iter().map(|&i| &rows[i]).collect();
            let boot_labels: Vec<f64> = indices.iter().map(|&i| labels[i]).collect();

            let params = TreeParams {
                max_depth: self.config.max_depth,
                min_samples_split: self.config.min_samples_split,
                features_per_split,
            };
            trees.push(build_tree(&boot_rows, &boot_labels, params.max_depth, &params, &mut rng));
        }

        Ok(RandomForest { trees })
    }
}

impl FittedEnsemble for RandomForest {
    fn member_votes(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        let row = row.to_vec();
        self.trees.iter().map(|tree| predict_tree(tree, &row)).collect()
    }
}

#[derive(Debug)]
enum TreeNode {
    Leaf { value: f64 },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

struct TreeParams {
    max_depth: usize,
    min_samples_split: usize,
    features_per_split: usize,
}

fn mean(labels: &[f64]) -> f64 {
    labels.iter().sum::<f64>() / labels.len().max(1) as f64
}

/// Sum of squared deviations from the mean.
fn sse(labels: &[f64]) -> f64 {
    let m = mean(labels);
    labels.iter().map(|l| (l - m).powi(2)).sum()
}

fn build_tree(
    features: &[&Vec<f64>],
    labels: &[f64],
    depth_left: usize,
    params: &TreeParams,
    rng: &mut StdRng,
) -> TreeNode {
    if depth_left == 0 || labels.len() < params.min_samples_split {
        return TreeNode::Leaf { value: mean(labels) };
    }

    let first = labels[0];
    if labels.iter().all(|&l| (l - first).abs() < 1e-10) {
        return TreeNode::Leaf { value: first };
    }

    let n_features = features[0].len();
    let mut feature_indices: Vec<usize> = (0..n_features).collect();
    feature_indices.shuffle(rng);
    feature_indices.truncate(params.features_per_split);

    let mut best_sse = f64::MAX;
    let mut best_feature = 0;
    let mut best_threshold = 0.0;

    for &feat_idx in &feature_indices {
        let mut values: Vec<f64> = features.iter().map(|f| f[feat_idx]).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();

        if values.len() < 2 {
            continue;
        }

        // candidate thresholds between consecutive values, subsampled on wide features
        let step = (values.len() / 10).max(1);
        for i in (0..values.len() - 1).step_by(step) {
            let threshold = (values[i] + values[i + 1]) / 2.0;
            let split = split_sse(features, labels, feat_idx, threshold);

            if split < best_sse {
                best_sse = split;
                best_feature = feat_idx;
                best_threshold = threshold;
            }
        }
    }

    if best_sse >= sse(labels) {
        return TreeNode::Leaf { value: mean(labels) };
    }

    let mut left_features = Vec::new();
    let mut left_labels = Vec::new();
    let mut right_features = Vec::new();
    let mut right_labels = Vec::new();

    for (i, feat) in features.iter().enumerate() {
        if feat[best_feature] <= best_threshold {
            left_features.push(*feat);
            left_labels.push(labels[i]);
        } else {
            right_features.push(*feat);
            right_labels.push(labels[i]);
        }
    }

    if left_features.is_empty() || right_features.is_empty() {
        return TreeNode::Leaf { value: mean(labels) };
    }

    TreeNode::Split {
        feature_idx: best_feature,
        threshold: best_threshold,
        left: Box::new(build_tree(&left_features, &left_labels, depth_left - 1, params, rng)),
        right: Box::new(build_tree(&right_features, &right_labels, depth_left - 1, params, rng)),
    }
}

/// Total within-child squared error of a split; `f64::MAX` when one side is empty.
fn split_sse(features: &[&Vec<f64>], labels: &[f64], feature_idx: usize, threshold: f64) -> f64 {
    let (mut n_l, mut sum_l, mut sq_l) = (0usize, 0.0f64, 0.0f64);
    let (mut n_r, mut sum_r, mut sq_r) = (0usize, 0.0f64, 0.0f64);

    for (feat, &y) in features.iter().zip(labels) {
        if feat[feature_idx] <= threshold {
            n_l += 1;
            sum_l += y;
            sq_l += y * y;
        } else {
            n_r += 1;
            sum_r += y;
            sq_r += y * y;
        }
    }

    if n_l == 0 || n_r == 0 {
        return f64::MAX;
    }

    (sq_l - sum_l * sum_l / n_l as f64) + (sq_r - sum_r * sum_r / n_r as f64)
}

fn predict_tree(node: &TreeNode, features: &[f64]) -> f64 {
    match node {
        TreeNode::Leaf { value } => *value,
        TreeNode::Split { feature_idx, threshold, left, right } => {
            if features[*feature_idx] <= *threshold {
                predict_tree(left, features)
            } else {
                predict_tree(right, features)
            }
        }
    }
}
