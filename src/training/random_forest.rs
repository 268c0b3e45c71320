//! Random Forest implementation

use super::decision_tree::{Criterion, DecisionTree};
use super::models::{check_training_data, Classifier};
use crate::error::{DiagnosisError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Strategy for max features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// All features
    All,
}

/// Random forest classifier.
///
/// Tree `i` draws its bootstrap sample and its per-node feature subsets
/// from seeds derived from `random_state + i`, so the forest is identical
/// whether the trees are grown in parallel or not. Probabilities are the
/// mean of the trees' leaf class distributions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    /// Individual trees
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features examined per split
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Random state
    pub random_state: u64,
    /// Number of features
    n_features: usize,
    /// Number of class codes
    n_classes: usize,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    /// Create a new forest with `n_estimators` trees
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            criterion: Criterion::Gini,
            random_state: 42,
            n_features: 0,
            n_classes: 2,
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

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    fn compute_max_features(&self, n_features: usize) -> usize {
        match self.max_features {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::All => n_features,
        }
        .clamp(1, n_features)
    }

    fn tree_seed(&self, tree_idx: usize) -> u64 {
        self.random_state.wrapping_add(tree_idx as u64)
    }

    fn bootstrap_indices(&self, tree_idx: usize, n_samples: usize) -> Vec<usize> {
        if !self.bootstrap {
            return (0..n_samples).collect();
        }
        let mut rng = ChaCha8Rng::seed_from_u64(self.tree_seed(tree_idx));
        (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
    }

    /// Get the fitted trees
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if self.n_estimators == 0 {
            return Err(DiagnosisError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "forest needs at least one tree".to_string(),
            });
        }

        let n_samples = x.nrows();
        self.n_features = x.ncols();
        self.n_classes = (y.iter().fold(0.0f64, |m, &v| m.max(v)) as usize + 1).max(2);
        let max_features = self.compute_max_features(self.n_features);

        let this = &*self;
        let trees: Vec<DecisionTree> = (0..this.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let sample_indices = this.bootstrap_indices(tree_idx, n_samples);
                let x_boot = x.select(Axis(0), &sample_indices);
                let y_boot = y.select(Axis(0), &sample_indices);

                let mut tree = DecisionTree::new_classifier()
                    .with_max_depth(this.max_depth)
                    .with_min_samples_split(this.min_samples_split)
                    .with_min_samples_leaf(this.min_samples_leaf)
                    .with_criterion(this.criterion)
                    .with_max_features(Some(max_features))
                    .with_random_state(this.tree_seed(tree_idx).wrapping_mul(0x9E37_79B9_7F4A_7C15))
                    .with_n_classes(this.n_classes);
                tree.fit(&x_boot, &y_boot)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(DiagnosisError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(DiagnosisError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let per_tree: Vec<Array2<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_proba(x))
            .collect::<Result<Vec<_>>>()?;

        let mut proba = Array2::<f64>::zeros((x.nrows(), self.n_classes));
        for p in &per_tree {
            proba += p;
        }
        proba /= self.trees.len() as f64;
        Ok(proba)
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}
