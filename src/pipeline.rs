//! End-to-end diagnosis pipeline
//!
//! `DiagnosisPipeline` holds configuration only. Fitting it yields a
//! `FittedPipeline` that owns every learned artifact: the label encoder,
//! the scaler, the split and the model bank. Evaluation and single-sample
//! prediction borrow from it.

use crate::ensemble::Ensemble;
use crate::error::{DiagnosisError, Result};
use crate::evaluation::{
    ClassMapping, ClassificationReport, EvaluationReport, ModelScore, SplitSummary,
};
use crate::inference::{check_finite, Diagnosis, FeatureSource};
use crate::preprocessing::{DataPreprocessor, PreparedData, PreprocessingConfig};
use crate::training::{argmax_rows, Classifier, ModelBank, ModelBankConfig};
use chrono::Utc;
use ndarray::ArrayView1;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(flatten)]
    pub preprocessing: PreprocessingConfig,
    /// Display names indexed by class code
    pub class_names: Vec<String>,
    /// Train the five base models concurrently
    pub parallel: bool,
    pub model_bank: ModelBankConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            preprocessing: PreprocessingConfig::default(),
            class_names: vec!["Benign".to_string(), "Malignant".to_string()],
            parallel: false,
            model_bank: ModelBankConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preprocessing(mut self, preprocessing: PreprocessingConfig) -> Self {
        self.preprocessing = preprocessing;
        self
    }

    pub fn with_model_bank(mut self, model_bank: ModelBankConfig) -> Self {
        self.model_bank = model_bank;
        self
    }

    pub fn with_class_names(mut self, names: Vec<String>) -> Self {
        self.class_names = names;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.preprocessing.test_size = test_size;
        self
    }

    /// Seed both the split and every model
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.preprocessing.random_seed = seed;
        self.model_bank = self.model_bank.with_random_seed(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.class_names.len() != 2 {
            return Err(DiagnosisError::InvalidParameter {
                name: "class_names".to_string(),
                value: format!("{:?}", self.class_names),
                reason: "exactly two display names are required".to_string(),
            });
        }
        self.preprocessing.validate()?;
        self.model_bank.validate()
    }
}

/// Unfitted pipeline
#[derive(Debug, Clone, Default)]
pub struct DiagnosisPipeline {
    config: PipelineConfig,
}

impl DiagnosisPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Preprocess `df` and train the model bank on its training partition
    pub fn fit(&self, df: &DataFrame) -> Result<FittedPipeline> {
        self.config.validate()?;
        let start = Instant::now();

        let prepared =
            DataPreprocessor::with_config(self.config.preprocessing.clone()).fit_transform(df)?;
        let bank = ModelBank::train(
            &self.config.model_bank,
            &prepared.x_train,
            &prepared.y_train,
            self.config.parallel,
        )?;

        info!(
            models = bank.len(),
            parallel = self.config.parallel,
            secs = start.elapsed().as_secs_f64(),
            "Pipeline fitted"
        );

        Ok(FittedPipeline {
            config: self.config.clone(),
            prepared,
            bank,
        })
    }
}

/// Fitted pipeline: every learned artifact of one run
#[derive(Debug, Clone)]
pub struct FittedPipeline {
    config: PipelineConfig,
    prepared: PreparedData,
    bank: ModelBank,
}

impl FittedPipeline {
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn prepared(&self) -> &PreparedData {
        &self.prepared
    }

    pub fn bank(&self) -> &ModelBank {
        &self.bank
    }

    /// Feature names in the order every input vector must follow
    pub fn feature_names(&self) -> &[String] {
        &self.prepared.feature_names
    }

    pub fn class_names(&self) -> &[String] {
        &self.config.class_names
    }

    /// Uniform soft-voting ensemble over the bank
    pub fn ensemble(&self) -> Result<Ensemble<'_>> {
        Ensemble::soft(&self.bank)
    }

    /// Score every base model and the ensemble on the test partition
    pub fn evaluate(&self) -> Result<EvaluationReport> {
        let x_test = &self.prepared.x_test;
        let y_test = &self.prepared.y_test;

        let models = self
            .bank
            .iter()
            .map(|fitted| -> Result<ModelScore> {
                let proba = fitted.model.predict_proba(x_test)?;
                let score = ModelScore::from_proba(
                    fitted.name(),
                    &proba,
                    y_test,
                    Some(fitted.training_time_secs),
                )?;
                debug!(
                    model = fitted.name(),
                    accuracy = score.accuracy,
                    roc_auc = score.roc_auc,
                    "Scored model"
                );
                Ok(score)
            })
            .collect::<Result<Vec<_>>>()?;

        let ensemble_proba = self.ensemble()?.predict_proba(x_test)?;
        let ensemble = ModelScore::from_proba("Ensemble", &ensemble_proba, y_test, None)?;
        info!(
            accuracy = ensemble.accuracy,
            roc_auc = ensemble.roc_auc,
            "Ensemble evaluated"
        );

        let classification_report = ClassificationReport::compute(
            y_test,
            &argmax_rows(&ensemble_proba),
            &self.config.class_names,
        )?;

        let class_mapping = self
            .prepared
            .encoder
            .classes()
            .iter()
            .enumerate()
            .map(|(code, label)| ClassMapping {
                label: label.clone(),
                code,
                display_name: self.config.class_names[code].clone(),
            })
            .collect();

        Ok(EvaluationReport {
            created_at: Utc::now(),
            random_seed: self.config.preprocessing.random_seed,
            class_mapping,
            split: SplitSummary::from_labels(&self.prepared.y_train, y_test, 2),
            feature_names: self.prepared.feature_names.clone(),
            models,
            ensemble,
            classification_report,
        })
    }

    /// Diagnose one raw (unscaled) feature vector in training order
    pub fn predict_one(&self, features: &[f64]) -> Result<Diagnosis> {
        if features.len() != self.prepared.n_features() {
            return Err(DiagnosisError::ShapeError {
                expected: format!("{} features", self.prepared.n_features()),
                actual: format!("{} values", features.len()),
            });
        }
        check_finite(features, self.feature_names())?;
        let scaled = self
            .prepared
            .scaler
            .transform_one(ArrayView1::from(features))?;
        let proba = self.ensemble()?.predict_proba(&scaled)?;
        Diagnosis::from_proba(proba.row(0), &self.config.class_names)
    }

    /// Collect a feature vector from `source` and diagnose it
    pub fn predict_from(&self, source: &mut dyn FeatureSource) -> Result<Diagnosis> {
        let features = source.read_features(self.feature_names())?;
        let diagnosis = self.predict_one(&features)?;
        info!(
            class = %diagnosis.class_name,
            probability = diagnosis.malignancy_probability,
            "Prediction made"
        );
        Ok(diagnosis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.class_names, vec!["Benign", "Malignant"]);
        assert_eq!(config.preprocessing.test_size, 0.2);
        assert_eq!(config.preprocessing.random_seed, 42);
        assert!(!config.parallel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reseed_reaches_split_and_models() {
        let config = PipelineConfig::new().with_random_seed(9);
        assert_eq!(config.preprocessing.random_seed, 9);
        assert_eq!(config.model_bank.random_seed, 9);
        assert_eq!(config.model_bank.svm.random_state, 9);
    }

    #[test]
    fn test_validate_class_names() {
        let config = PipelineConfig::new().with_class_names(vec!["only".to_string()]);
        assert!(matches!(
            config.validate(),
            Err(DiagnosisError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_validate_test_size() {
        assert!(PipelineConfig::new().with_test_size(1.0).validate().is_err());
    }

    #[test]
    fn test_config_json_is_flat() {
        let json = serde_json::to_value(PipelineConfig::default()).unwrap();
        assert_eq!(json["target_column"], "diagnosis");
        assert_eq!(json["test_size"], 0.2);
        assert!(json.get("preprocessing").is_none());
    }
}
