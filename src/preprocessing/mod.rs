//! Data preprocessing module
//!
//! Turns a raw labeled table into model-ready matrices:
//! - Identifier removal and feature selection
//! - Binary label encoding with an explicit class mapping
//! - Stratified train/test partitioning
//! - Standardization fitted on the training partition only

mod config;
mod encoder;
mod pipeline;
mod scaler;
pub mod split;

pub use config::PreprocessingConfig;
pub use encoder::LabelEncoder;
pub use pipeline::{DataPreprocessor, PreparedData};
pub use scaler::StandardScaler;
pub use split::{stratified_k_fold, Fold, StratifiedSplit, TrainTestSplit};
