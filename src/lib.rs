//! Ensemble Diagnosis - soft-voting tumor classification
//!
//! This crate classifies tumor samples as malignant or benign from tabular
//! diagnostic measurements:
//! - Dataset loading and preprocessing (identifier drop, label encoding,
//!   stratified split, standardization)
//! - Five base classifiers trained on the same partition
//! - A refit-free soft-voting ensemble over them
//! - Accuracy, ROC-AUC and per-class reporting
//! - Single-sample interactive prediction
//!
//! # Modules
//!
//! - [`preprocessing`] - Encoding, splitting and scaling
//! - [`training`] - Logistic regression, trees, forests, boosting, SVM
//! - [`calibration`] - Platt scaling for SVM probabilities
//! - [`ensemble`] - Soft and hard voting
//! - [`evaluation`] - Metrics, report rendering and JSON export
//! - [`inference`] - Feature sources and prediction verdicts
//! - [`pipeline`] - The fitted end-to-end context
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use ensemble_diagnosis::prelude::*;
//!
//! let df = DataLoader::new().load_csv("breast-cancer.csv")?;
//! let fitted = DiagnosisPipeline::new(PipelineConfig::default()).fit(&df)?;
//! let report = fitted.evaluate()?;
//! print!("{}", report.performance_summary());
//! # Ok::<(), ensemble_diagnosis::DiagnosisError>(())
//! ```

pub mod error;
pub mod utils;

pub mod preprocessing;
pub mod training;
pub mod calibration;
pub mod ensemble;
pub mod evaluation;
pub mod inference;
pub mod pipeline;

pub mod cli;

pub use error::{DiagnosisError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{DiagnosisError, Result};

    // Data loading
    pub use crate::utils::DataLoader;

    // Preprocessing
    pub use crate::preprocessing::{
        DataPreprocessor, LabelEncoder, PreparedData, PreprocessingConfig, StandardScaler,
        StratifiedSplit,
    };

    // Training
    pub use crate::training::{Classifier, ModelBank, ModelBankConfig, ModelKind};

    // Ensemble
    pub use crate::ensemble::{Ensemble, VotingClassifier, VotingStrategy};

    // Evaluation
    pub use crate::evaluation::{ClassificationReport, EvaluationReport, ModelScore};

    // Inference
    pub use crate::inference::{Diagnosis, FeatureSource, PromptFeatureSource};

    // Pipeline
    pub use crate::pipeline::{DiagnosisPipeline, FittedPipeline, PipelineConfig};
}
