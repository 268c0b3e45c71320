//! Model bank configuration

use super::decision_tree::Criterion;
use super::gradient_boosting::GradientBoostingConfig;
use super::random_forest::MaxFeatures;
use super::svm::SVMConfig;
use crate::error::{DiagnosisError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The five base learners, in reporting order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelKind {
    LogisticRegression,
    DecisionTree,
    RandomForest,
    GradientBoosting,
    SVM,
}

impl ModelKind {
    pub const ALL: [ModelKind; 5] = [
        ModelKind::LogisticRegression,
        ModelKind::DecisionTree,
        ModelKind::RandomForest,
        ModelKind::GradientBoosting,
        ModelKind::SVM,
    ];

    /// Display name used in reports
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "Logistic Regression",
            ModelKind::DecisionTree => "Decision Tree",
            ModelKind::RandomForest => "Random Forest",
            ModelKind::GradientBoosting => "Gradient Boosting",
            ModelKind::SVM => "SVM",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decision tree hyper-parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    pub criterion: Criterion,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            criterion: Criterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

/// Hyper-parameters for every model in the bank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBankConfig {
    /// Seed shared by every model that uses randomness
    pub random_seed: u64,
    /// Logistic regression inverse regularization strength
    pub logistic_c: f64,
    /// Logistic regression iteration cap
    pub logistic_max_iter: usize,
    /// Standalone tree, also the template for forest trees
    pub tree: TreeConfig,
    /// Trees in the random forest
    pub forest_n_estimators: usize,
    /// Features examined per forest split
    pub forest_max_features: MaxFeatures,
    pub gradient_boosting: GradientBoostingConfig,
    pub svm: SVMConfig,
}

impl Default for ModelBankConfig {
    fn default() -> Self {
        Self {
            random_seed: 42,
            logistic_c: 1.0,
            logistic_max_iter: 1000,
            tree: TreeConfig::default(),
            forest_n_estimators: 100,
            forest_max_features: MaxFeatures::Sqrt,
            gradient_boosting: GradientBoostingConfig::default(),
            svm: SVMConfig::default(),
        }
    }
}

impl ModelBankConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to reseed every model
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self.gradient_boosting.random_state = seed;
        self.svm.random_state = seed;
        self
    }

    /// Builder method to set the forest size
    pub fn with_forest_n_estimators(mut self, n: usize) -> Self {
        self.forest_n_estimators = n;
        self
    }

    /// Builder method to set the number of boosting stages
    pub fn with_boosting_n_estimators(mut self, n: usize) -> Self {
        self.gradient_boosting.n_estimators = n;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: f64| {
            if value > 0.0 {
                Ok(())
            } else {
                Err(DiagnosisError::InvalidParameter {
                    name: name.to_string(),
                    value: value.to_string(),
                    reason: "must be positive".to_string(),
                })
            }
        };
        positive("logistic_c", self.logistic_c)?;
        positive("svm.c", self.svm.c)?;

        if self.forest_n_estimators == 0 {
            return Err(DiagnosisError::InvalidParameter {
                name: "forest_n_estimators".to_string(),
                value: "0".to_string(),
                reason: "forest needs at least one tree".to_string(),
            });
        }
        if self.logistic_max_iter == 0 {
            return Err(DiagnosisError::InvalidParameter {
                name: "logistic_max_iter".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        self.gradient_boosting.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_names() {
        let names: Vec<&str> = ModelKind::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(
            names,
            vec![
                "Logistic Regression",
                "Decision Tree",
                "Random Forest",
                "Gradient Boosting",
                "SVM"
            ]
        );
    }

    #[test]
    fn test_reseed_propagates() {
        let config = ModelBankConfig::new().with_random_seed(7);
        assert_eq!(config.gradient_boosting.random_state, 7);
        assert_eq!(config.svm.random_state, 7);
    }

    #[test]
    fn test_validate_rejects_zero_trees() {
        let config = ModelBankConfig::new().with_forest_n_estimators(0);
        assert!(matches!(
            config.validate(),
            Err(DiagnosisError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_non_positive_c() {
        let mut config = ModelBankConfig::new();
        config.svm.c = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_roundtrip_keeps_defaults() {
        let json = serde_json::to_string(&ModelBankConfig::default()).unwrap();
        let back: ModelBankConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.forest_n_estimators, 100);
        assert_eq!(back.gradient_boosting.max_depth, 3);
    }
}
