//! Gradient boosting for binary classification
//!
//! Shallow regression trees are fitted to the log-loss gradient and their
//! leaves are reset to a single Newton step, the way classic gradient
//! boosting machines do it.

use super::decision_tree::DecisionTree;
use super::models::{binary_proba, check_binary_labels, check_training_data, sigmoid, Classifier};
use crate::error::{DiagnosisError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Gradient Boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Row subsample ratio for each tree
    pub subsample: f64,
    /// Column subsample ratio for each tree
    pub colsample_bytree: f64,
    /// Random seed
    pub random_state: u64,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
            subsample: 1.0,
            colsample_bytree: 1.0,
            random_state: 42,
        }
    }
}

impl GradientBoostingConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |name: &str, value: String, reason: &str| {
            Err(DiagnosisError::InvalidParameter {
                name: name.to_string(),
                value,
                reason: reason.to_string(),
            })
        };
        if self.n_estimators == 0 {
            return invalid("n_estimators", "0".into(), "need at least one stage");
        }
        if !(self.learning_rate > 0.0) {
            return invalid(
                "learning_rate",
                self.learning_rate.to_string(),
                "must be positive",
            );
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return invalid("subsample", self.subsample.to_string(), "must lie in (0, 1]");
        }
        if !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0) {
            return invalid(
                "colsample_bytree",
                self.colsample_bytree.to_string(),
                "must lie in (0, 1]",
            );
        }
        Ok(())
    }
}

/// Gradient Boosting Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTree>,
    col_indices_per_tree: Vec<Vec<usize>>,
    initial_log_odds: f64,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl Default for GradientBoostingClassifier {
    fn default() -> Self {
        Self::new(GradientBoostingConfig::default())
    }
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            col_indices_per_tree: Vec::new(),
            initial_log_odds: 0.0,
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    /// Raw additive scores (log-odds of the positive class)
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(DiagnosisError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(DiagnosisError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut log_odds = Array1::from_elem(x.nrows(), self.initial_log_odds);
        for (tree, col_indices) in self.trees.iter().zip(self.col_indices_per_tree.iter()) {
            let tree_pred = tree.predict_values(&x.select(Axis(1), col_indices))?;
            log_odds.scaled_add(self.config.learning_rate, &tree_pred);
        }
        Ok(log_odds)
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn n_estimators_fitted(&self) -> usize {
        self.trees.len()
    }

    fn subsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        if self.config.subsample >= 1.0 {
            return (0..n).collect();
        }
        let sample_size = ((n as f64) * self.config.subsample).ceil() as usize;
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        indices.truncate(sample_size.max(2));
        indices.sort_unstable();
        indices
    }

    fn colsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        if self.config.colsample_bytree >= 1.0 {
            return (0..n).collect();
        }
        let sample_size = ((n as f64) * self.config.colsample_bytree).ceil() as usize;
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        indices.truncate(sample_size.max(1));
        indices.sort_unstable();
        indices
    }
}

impl Classifier for GradientBoostingClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        check_binary_labels(y)?;
        self.config.validate()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();
        self.n_features = n_features;
        self.trees.clear();
        self.col_indices_per_tree.clear();

        // Both classes are present, so 0 < p < 1
        let p = y.mean().unwrap_or(0.5);
        self.initial_log_odds = (p / (1.0 - p)).ln();

        let mut log_odds = Array1::from_elem(n_samples, self.initial_log_odds);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let mut importances = vec![0.0; n_features];

        for stage in 0..self.config.n_estimators {
            let probs = log_odds.mapv(sigmoid);
            let residuals = y - &probs;

            let row_indices = self.subsample_indices(n_samples, &mut rng);
            let col_indices = self.colsample_indices(n_features, &mut rng);
            let x_sub = x.select(Axis(0), &row_indices).select(Axis(1), &col_indices);
            let r_sub = residuals.select(Axis(0), &row_indices);
            let p_sub = probs.select(Axis(0), &row_indices);

            let mut tree = DecisionTree::new_regressor()
                .with_max_depth(Some(self.config.max_depth))
                .with_min_samples_split(self.config.min_samples_split)
                .with_min_samples_leaf(self.config.min_samples_leaf)
                .with_random_state(self.config.random_state.wrapping_add(stage as u64));
            tree.fit_tree(&x_sub, &r_sub)?;

            // Newton step per leaf: sum(residual) / sum(p * (1 - p))
            tree.update_leaves(&x_sub, |rows| {
                let num: f64 = rows.iter().map(|&i| r_sub[i]).sum();
                let den: f64 = rows.iter().map(|&i| p_sub[i] * (1.0 - p_sub[i])).sum();
                if den.abs() < 1e-150 {
                    0.0
                } else {
                    num / den
                }
            })?;

            let update = tree.predict_values(&x.select(Axis(1), &col_indices))?;
            log_odds.scaled_add(self.config.learning_rate, &update);

            if let Some(tree_importance) = tree.feature_importances() {
                for (j, &col_idx) in col_indices.iter().enumerate() {
                    importances[col_idx] += tree_importance[j];
                }
            }

            self.trees.push(tree);
            self.col_indices_per_tree.push(col_indices);
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = importances;

        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let log_odds = self.decision_function(x)?;
        Ok(binary_proba(&log_odds.mapv(sigmoid)))
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}
