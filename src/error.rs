//! Error types for the diagnosis pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, DiagnosisError>;

/// Main error type for the diagnosis pipeline
#[derive(Error, Debug)]
pub enum DiagnosisError {
    #[error("Load error: {0}")]
    LoadError(String),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Invalid value for feature '{feature}': '{input}' is not a finite number")]
    ParseError { feature: String, input: String },

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Input error: {0}")]
    InputError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<polars::error::PolarsError> for DiagnosisError {
    fn from(err: polars::error::PolarsError) -> Self {
        DiagnosisError::LoadError(err.to_string())
    }
}

impl From<serde_json::Error> for DiagnosisError {
    fn from(err: serde_json::Error) -> Self {
        DiagnosisError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for DiagnosisError {
    fn from(err: ndarray::ShapeError) -> Self {
        DiagnosisError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

impl From<dialoguer::Error> for DiagnosisError {
    fn from(err: dialoguer::Error) -> Self {
        DiagnosisError::InputError(err.to_string())
    }
}
