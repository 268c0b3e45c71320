//! Model bank: fits the five base learners on one training partition

use super::config::{ModelBankConfig, ModelKind};
use super::decision_tree::DecisionTree;
use super::gradient_boosting::GradientBoostingClassifier;
use super::linear_models::LogisticRegression;
use super::models::Classifier;
use super::random_forest::RandomForest;
use super::svm::SVMClassifier;
use crate::error::Result;
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Enum to hold trained model variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoostingClassifier),
    SVM(SVMClassifier),
}

impl TrainedModel {
    /// Unfitted model of the given kind, configured from the bank config
    pub fn build(kind: ModelKind, config: &ModelBankConfig) -> Self {
        match kind {
            ModelKind::LogisticRegression => TrainedModel::LogisticRegression(
                LogisticRegression::new()
                    .with_c(config.logistic_c)
                    .with_max_iter(config.logistic_max_iter),
            ),
            ModelKind::DecisionTree => TrainedModel::DecisionTree(
                DecisionTree::new_classifier()
                    .with_criterion(config.tree.criterion)
                    .with_max_depth(config.tree.max_depth)
                    .with_min_samples_split(config.tree.min_samples_split)
                    .with_min_samples_leaf(config.tree.min_samples_leaf)
                    .with_random_state(config.random_seed),
            ),
            ModelKind::RandomForest => TrainedModel::RandomForest(
                RandomForest::new(config.forest_n_estimators)
                    .with_max_depth(config.tree.max_depth)
                    .with_min_samples_split(config.tree.min_samples_split)
                    .with_min_samples_leaf(config.tree.min_samples_leaf)
                    .with_max_features(config.forest_max_features)
                    .with_random_state(config.random_seed),
            ),
            ModelKind::GradientBoosting => TrainedModel::GradientBoosting(
                GradientBoostingClassifier::new(config.gradient_boosting.clone()),
            ),
            ModelKind::SVM => TrainedModel::SVM(SVMClassifier::new(config.svm.clone())),
        }
    }

    fn as_classifier(&self) -> &dyn Classifier {
        match self {
            TrainedModel::LogisticRegression(m) => m,
            TrainedModel::DecisionTree(m) => m,
            TrainedModel::RandomForest(m) => m,
            TrainedModel::GradientBoosting(m) => m,
            TrainedModel::SVM(m) => m,
        }
    }

    fn as_classifier_mut(&mut self) -> &mut dyn Classifier {
        match self {
            TrainedModel::LogisticRegression(m) => m,
            TrainedModel::DecisionTree(m) => m,
            TrainedModel::RandomForest(m) => m,
            TrainedModel::GradientBoosting(m) => m,
            TrainedModel::SVM(m) => m,
        }
    }
}

impl Classifier for TrainedModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.as_classifier_mut().fit(x, y)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.as_classifier().predict_proba(x)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.as_classifier().predict(x)
    }

    fn is_fitted(&self) -> bool {
        self.as_classifier().is_fitted()
    }
}

/// One fitted member of the bank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedModel {
    pub kind: ModelKind,
    pub model: TrainedModel,
    pub training_time_secs: f64,
}

impl FittedModel {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

/// The five fitted base learners, in `ModelKind::ALL` order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBank {
    models: Vec<FittedModel>,
}

impl ModelBank {
    /// Fit every model on the same training data.
    ///
    /// With `parallel` the models train concurrently; each owns its seed,
    /// so the result is identical to sequential training. Either way the
    /// bank is returned only after all five finish.
    pub fn train(
        config: &ModelBankConfig,
        x: &Array2<f64>,
        y: &Array1<f64>,
        parallel: bool,
    ) -> Result<Self> {
        config.validate()?;

        let fit_one = |kind: ModelKind| -> Result<FittedModel> {
            let start = Instant::now();
            let mut model = TrainedModel::build(kind, config);
            model.fit(x, y)?;
            let training_time_secs = start.elapsed().as_secs_f64();
            info!(model = kind.name(), secs = training_time_secs, "Trained model");
            Ok(FittedModel {
                kind,
                model,
                training_time_secs,
            })
        };

        let models = if parallel {
            ModelKind::ALL
                .par_iter()
                .map(|&kind| fit_one(kind))
                .collect::<Result<Vec<_>>>()?
        } else {
            ModelKind::ALL
                .iter()
                .map(|&kind| fit_one(kind))
                .collect::<Result<Vec<_>>>()?
        };

        Ok(Self { models })
    }

    pub fn models(&self) -> &[FittedModel] {
        &self.models
    }

    pub fn get(&self, kind: ModelKind) -> Option<&FittedModel> {
        self.models.iter().find(|m| m.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FittedModel> {
        self.models.iter()
    }
}
