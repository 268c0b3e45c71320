//! Preprocessing configuration

use crate::error::{DiagnosisError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for turning a raw table into standardized train/test matrices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Identifier column to drop; `None` keeps every column
    pub id_column: Option<String>,

    /// Categorical target column
    pub target_column: String,

    /// Explicit feature order. When unset, every remaining column in
    /// header order is a feature.
    pub feature_columns: Option<Vec<String>>,

    /// Target label forced to code 1
    pub positive_label: Option<String>,

    /// Fraction of rows held out for testing
    pub test_size: f64,

    /// Random seed for the split
    pub random_seed: u64,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            id_column: Some("id".to_string()),
            target_column: "diagnosis".to_string(),
            feature_columns: None,
            positive_label: None,
            test_size: 0.2,
            random_seed: 42,
        }
    }
}

impl PreprocessingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the identifier column
    pub fn with_id_column(mut self, column: Option<String>) -> Self {
        self.id_column = column;
        self
    }

    /// Builder method to set the target column
    pub fn with_target_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = column.into();
        self
    }

    /// Builder method to pin the feature order
    pub fn with_feature_columns(mut self, columns: Vec<String>) -> Self {
        self.feature_columns = Some(columns);
        self
    }

    /// Builder method to set the positive label
    pub fn with_positive_label(mut self, label: impl Into<String>) -> Self {
        self.positive_label = Some(label.into());
        self
    }

    /// Builder method to set the held-out fraction
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Builder method to set the random seed
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(DiagnosisError::InvalidParameter {
                name: "test_size".to_string(),
                value: self.test_size.to_string(),
                reason: "must lie strictly between 0 and 1".to_string(),
            });
        }
        if self.target_column.is_empty() {
            return Err(DiagnosisError::InvalidParameter {
                name: "target_column".to_string(),
                value: String::new(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.id_column.as_deref() == Some(self.target_column.as_str()) {
            return Err(DiagnosisError::InvalidParameter {
                name: "id_column".to_string(),
                value: self.target_column.clone(),
                reason: "identifier and target must differ".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PreprocessingConfig::default();
        assert_eq!(config.id_column.as_deref(), Some("id"));
        assert_eq!(config.target_column, "diagnosis");
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.random_seed, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_test_size() {
        let config = PreprocessingConfig::new().with_test_size(0.0);
        assert!(matches!(
            config.validate(),
            Err(DiagnosisError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_id_equals_target_rejected() {
        let config = PreprocessingConfig::new().with_id_column(Some("diagnosis".to_string()));
        assert!(config.validate().is_err());
    }
}
