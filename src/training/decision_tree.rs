//! Decision tree implementation

use super::models::{check_training_data, Classifier};
use crate::error::{DiagnosisError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf {
        /// Majority class (classification) or mean target (regression)
        value: f64,
        /// Per-class sample counts; empty for regression
        class_counts: Vec<f64>,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Entropy (classification)
    Entropy,
    /// Mean squared error (regression)
    MSE,
}

/// Best split found for a node
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// CART decision tree.
///
/// Splits are found by sorting each candidate feature once per node and
/// sweeping the thresholds between distinct consecutive values. When
/// `max_features` is below the feature count a fresh random subset is drawn
/// at every node from a seeded RNG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Maximum features to consider per split
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for feature subsampling
    pub random_state: u64,
    /// Number of features
    n_features: usize,
    /// Number of class codes; fixed before fit for bootstrapped trees
    n_classes: Option<usize>,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
    /// Is classification task
    is_classification: bool,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new_classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: 42,
            n_features: 0,
            n_classes: None,
            feature_importances: None,
            is_classification: true,
        }
    }

    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self {
            criterion: Criterion::MSE,
            is_classification: false,
            ..Self::new_classifier()
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set number of features examined per split
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the feature-subsampling seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fix the number of class codes (a bootstrap sample may miss a class)
    pub fn with_n_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = Some(n_classes);
        self
    }

    /// Fit the tree to training data
    pub fn fit_tree(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_training_data(x, y)?;
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if self.min_samples_split < 2 || self.min_samples_leaf < 1 {
            return Err(DiagnosisError::InvalidParameter {
                name: "min_samples_split/min_samples_leaf".to_string(),
                value: format!("{}/{}", self.min_samples_split, self.min_samples_leaf),
                reason: "need min_samples_split >= 2 and min_samples_leaf >= 1".to_string(),
            });
        }

        if self.is_classification {
            if let Some(bad) = y.iter().find(|&&v| v < 0.0 || v.fract() != 0.0) {
                return Err(DiagnosisError::TrainingError(format!(
                    "classifier tree requires non-negative integer labels, found {}",
                    bad
                )));
            }
            let observed = y.iter().fold(0.0f64, |m, &v| m.max(v)) as usize + 1;
            self.n_classes = Some(self.n_classes.unwrap_or(0).max(observed).max(2));
        }

        self.n_features = n_features;
        let mut importances = vec![0.0; n_features];
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);

        let indices: Vec<usize> = (0..n_samples).collect();
        let root = self.build_tree(x, y, &indices, 0, &mut importances, &mut rng);
        self.root = Some(root);

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let stats = self.node_stats(y, indices);
        let parent_impurity = self.impurity(&stats, n_samples);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || parent_impurity <= 1e-12;

        if should_stop {
            return self.make_leaf(stats, n_samples);
        }

        let features = self.candidate_features(rng);
        let mut best = self.find_best_split(x, y, indices, &features, parent_impurity);
        if best.is_none() && features.len() < self.n_features {
            // Keep searching the unsampled features before giving up on the node
            let rest: Vec<usize> = (0..self.n_features)
                .filter(|f| !features.contains(f))
                .collect();
            best = self.find_best_split(x, y, indices, &rest, parent_impurity);
        }
        let Some(best) = best else {
            return self.make_leaf(stats, n_samples);
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, best.feature_idx]] <= best.threshold);

        importances[best.feature_idx] += n_samples as f64 * best.gain;

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples,
            impurity: parent_impurity,
        }
    }

    fn candidate_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        match self.max_features {
            Some(k) if k > 0 && k < self.n_features => {
                let mut picked = index::sample(rng, self.n_features, k).into_vec();
                picked.sort_unstable();
                picked
            }
            _ => (0..self.n_features).collect(),
        }
    }

    /// Class counts for classification, `[sum, sum_sq]` for regression
    fn node_stats(&self, y: &Array1<f64>, indices: &[usize]) -> Vec<f64> {
        if self.is_classification {
            let mut counts = vec![0.0; self.n_classes.unwrap_or(2)];
            for &i in indices {
                counts[y[i] as usize] += 1.0;
            }
            counts
        } else {
            let sum: f64 = indices.iter().map(|&i| y[i]).sum();
            let sum_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
            vec![sum, sum_sq]
        }
    }

    fn impurity(&self, stats: &[f64], count: usize) -> f64 {
        if count == 0 {
            return 0.0;
        }
        let n = count as f64;
        match self.criterion {
            Criterion::Gini => 1.0 - stats.iter().map(|&c| (c / n).powi(2)).sum::<f64>(),
            Criterion::Entropy => -stats
                .iter()
                .filter(|&&c| c > 0.0)
                .map(|&c| {
                    let p = c / n;
                    p * p.ln()
                })
                .sum::<f64>(),
            Criterion::MSE => (stats[1] / n - (stats[0] / n).powi(2)).max(0.0),
        }
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        features: &[usize],
        parent_impurity: f64,
    ) -> Option<SplitCandidate> {
        let per_feature: Vec<Option<SplitCandidate>> = features
            .par_iter()
            .map(|&feature_idx| {
                self.best_split_for_feature(x, y, indices, feature_idx, parent_impurity)
            })
            .collect();

        // First feature wins on equal gain, keeping fits deterministic
        per_feature
            .into_iter()
            .flatten()
            .fold(None, |best: Option<SplitCandidate>, cand| match best {
                Some(b) if b.gain >= cand.gain => Some(b),
                _ => Some(cand),
            })
    }

    fn best_split_for_feature(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        feature_idx: usize,
        parent_impurity: f64,
    ) -> Option<SplitCandidate> {
        let mut pairs: Vec<(f64, f64)> = indices
            .iter()
            .map(|&i| (x[[i, feature_idx]], y[i]))
            .collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let n = pairs.len();
        let total: Vec<f64> = self.node_stats_from_pairs(&pairs);
        let mut left = vec![0.0; total.len()];
        let mut best: Option<SplitCandidate> = None;

        for pos in 0..n - 1 {
            let yi = pairs[pos].1;
            if self.is_classification {
                left[yi as usize] += 1.0;
            } else {
                left[0] += yi;
                left[1] += yi * yi;
            }

            let n_left = pos + 1;
            let n_right = n - n_left;
            if pairs[pos].0 >= pairs[pos + 1].0
                || n_left < self.min_samples_leaf
                || n_right < self.min_samples_leaf
            {
                continue;
            }

            let right: Vec<f64> = total.iter().zip(&left).map(|(t, l)| t - l).collect();
            let weighted = (n_left as f64 * self.impurity(&left, n_left)
                + n_right as f64 * self.impurity(&right, n_right))
                / n as f64;
            let gain = parent_impurity - weighted;

            if gain > 1e-12 && best.map_or(true, |b| gain > b.gain) {
                let mut threshold = (pairs[pos].0 + pairs[pos + 1].0) / 2.0;
                if threshold >= pairs[pos + 1].0 {
                    threshold = pairs[pos].0;
                }
                best = Some(SplitCandidate {
                    feature_idx,
                    threshold,
                    gain,
                });
            }
        }

        best
    }

    fn node_stats_from_pairs(&self, pairs: &[(f64, f64)]) -> Vec<f64> {
        if self.is_classification {
            let mut counts = vec![0.0; self.n_classes.unwrap_or(2)];
            for &(_, yi) in pairs {
                counts[yi as usize] += 1.0;
            }
            counts
        } else {
            let sum: f64 = pairs.iter().map(|p| p.1).sum();
            let sum_sq: f64 = pairs.iter().map(|p| p.1 * p.1).sum();
            vec![sum, sum_sq]
        }
    }

    fn make_leaf(&self, stats: Vec<f64>, n_samples: usize) -> TreeNode {
        if self.is_classification {
            let mut majority = 0;
            for (k, &c) in stats.iter().enumerate().skip(1) {
                if c > stats[majority] {
                    majority = k;
                }
            }
            TreeNode::Leaf {
                value: majority as f64,
                class_counts: stats,
                n_samples,
            }
        } else {
            let value = if n_samples > 0 {
                stats[0] / n_samples as f64
            } else {
                0.0
            };
            TreeNode::Leaf {
                value,
                class_counts: Vec::new(),
                n_samples,
            }
        }
    }

    fn leaf_for<'a>(node: &'a TreeNode, sample: &ArrayView1<f64>) -> &'a TreeNode {
        let mut node = node;
        loop {
            match node {
                TreeNode::Leaf { .. } => return node,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if sample[*feature_idx] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    fn fitted_root(&self, x: &Array2<f64>) -> Result<&TreeNode> {
        let root = self.root.as_ref().ok_or(DiagnosisError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(DiagnosisError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(root)
    }

    /// Leaf values: majority class or regression mean
    pub fn predict_values(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.fitted_root(x)?;
        Ok(x.rows()
            .into_iter()
            .map(|row| match Self::leaf_for(root, &row) {
                TreeNode::Leaf { value, .. } => *value,
                TreeNode::Split { .. } => 0.0,
            })
            .collect())
    }

    /// Normalized leaf class distributions, one column per class code
    pub fn predict_distribution(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_classification {
            return Err(DiagnosisError::ValidationError(
                "class distributions are only defined for classifier trees".to_string(),
            ));
        }
        let root = self.fitted_root(x)?;
        let n_classes = self.n_classes.unwrap_or(2);
        let mut out = Array2::zeros((x.nrows(), n_classes));

        for (i, row) in x.rows().into_iter().enumerate() {
            if let TreeNode::Leaf {
                class_counts,
                n_samples,
                ..
            } = Self::leaf_for(root, &row)
            {
                let total = (*n_samples).max(1) as f64;
                for (k, &c) in class_counts.iter().enumerate() {
                    out[[i, k]] = c / total;
                }
            }
        }
        Ok(out)
    }

    /// Overwrite every leaf value with `f(rows reaching that leaf)`.
    ///
    /// Used by gradient boosting to replace mean residuals with a
    /// Newton step.
    pub fn update_leaves<F>(&mut self, x: &Array2<f64>, f: F) -> Result<()>
    where
        F: Fn(&[usize]) -> f64,
    {
        let root = self.root.as_mut().ok_or(DiagnosisError::ModelNotFitted)?;
        let indices: Vec<usize> = (0..x.nrows()).collect();
        Self::update_node(root, x, indices, &f);
        Ok(())
    }

    fn update_node<F>(node: &mut TreeNode, x: &Array2<f64>, indices: Vec<usize>, f: &F)
    where
        F: Fn(&[usize]) -> f64,
    {
        match node {
            TreeNode::Leaf { value, .. } => *value = f(&indices),
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                let (l, r): (Vec<usize>, Vec<usize>) = indices
                    .into_iter()
                    .partition(|&i| x[[i, *feature_idx]] <= *threshold);
                Self::update_node(left, x, l, f);
                Self::update_node(right, x, r, f);
            }
        }
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes.unwrap_or(2)
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        match &self.root {
            None => 0,
            Some(node) => Self::node_depth(node),
        }
    }

    fn node_depth(node: &TreeNode) -> usize {
        match node {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => {
                1 + Self::node_depth(left).max(Self::node_depth(right))
            }
        }
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        match &self.root {
            None => 0,
            Some(node) => Self::count_leaves(node),
        }
    }

    fn count_leaves(node: &TreeNode) -> usize {
        match node {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => {
                Self::count_leaves(left) + Self::count_leaves(right)
            }
        }
    }
}

impl Classifier for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if !self.is_classification {
            return Err(DiagnosisError::ValidationError(
                "regressor tree cannot be used as a classifier".to_string(),
            ));
        }
        self.fit_tree(x, y).map(|_| ())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.predict_distribution(x)
    }

    fn is_fitted(&self) -> bool {
        self.root.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_fits_training_data() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0], [0.2, 0.4], [0.9, 0.7]];
        let y = array![0.0, 0.0, 1.0, 1.0, 0.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_pure_leaves_give_hard_probabilities() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        let proba = tree.predict_proba(&array![[1.5], [3.5]]).unwrap();
        assert_eq!(proba.row(0).to_vec(), vec![1.0, 0.0]);
        assert_eq!(proba.row(1).to_vec(), vec![0.0, 1.0]);
        assert_eq!(tree.get_depth(), 1);
    }

    #[test]
    fn test_depth_limited_leaf_keeps_distribution() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![0.0, 1.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier().with_max_depth(Some(0));
        tree.fit(&x, &y).unwrap();

        let proba = tree.predict_proba(&array![[3.0]]).unwrap();
        assert!((proba[[0, 0]] - 0.4).abs() < 1e-12);
        assert!((proba[[0, 1]] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_regressor_simple() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];

        let mut tree = DecisionTree::new_regressor();
        tree.fit_tree(&x, &y).unwrap();

        let predictions = tree.predict_values(&x).unwrap();
        let mse: f64 = predictions
            .iter()
            .zip(y.iter())
            .map(|(p, a)| (p - a).powi(2))
            .sum::<f64>()
            / y.len() as f64;
        assert!(mse < 1e-12, "MSE too high: {}", mse);
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert_eq!(importances[0], 1.0);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_feature_subsampling_is_seeded() {
        let x = array![
            [0.1, 5.0, 2.0],
            [0.4, 3.0, 1.0],
            [0.9, 1.0, 0.5],
            [0.7, 4.0, 2.5],
            [0.2, 2.0, 3.0],
            [0.8, 0.5, 0.1]
        ];
        let y = array![0.0, 0.0, 1.0, 1.0, 0.0, 1.0];

        let fit = |seed| {
            let mut tree = DecisionTree::new_classifier()
                .with_max_features(Some(1))
                .with_random_state(seed);
            tree.fit(&x, &y).unwrap();
            tree.predict_proba(&x).unwrap()
        };
        assert_eq!(fit(3), fit(3));
    }

    #[test]
    fn test_update_leaves() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_regressor();
        tree.fit_tree(&x, &y).unwrap();
        tree.update_leaves(&x, |rows| rows.len() as f64 * 10.0).unwrap();

        let values = tree.predict_values(&x).unwrap();
        assert_eq!(values.to_vec(), vec![20.0, 20.0, 20.0, 20.0]);
    }

    #[test]
    fn test_width_mismatch() {
        let mut tree = DecisionTree::new_classifier();
        tree.fit(&array![[0.0, 1.0], [1.0, 0.0]], &array![0.0, 1.0]).unwrap();
        assert!(tree.predict(&array![[0.0]]).is_err());
    }
}
