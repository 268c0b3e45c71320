//! Target label encoding

use crate::error::{DiagnosisError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Binary label encoder.
///
/// Distinct labels are sorted alphabetically and assigned codes `0..k`.
/// When a positive label is configured it always receives code 1, so the
/// mapping never depends on how the categories happen to be spelled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelEncoder {
    /// Label forced to code 1
    positive_label: Option<String>,
    /// Labels indexed by code
    classes: Vec<String>,
    is_fitted: bool,
}

impl LabelEncoder {
    /// Create a new encoder using alphabetical assignment
    pub fn new() -> Self {
        Self::default()
    }

    /// Force `label` to encode as 1
    pub fn with_positive_label(mut self, label: impl Into<String>) -> Self {
        self.positive_label = Some(label.into());
        self
    }

    /// Learn the class mapping. Exactly two distinct labels are required.
    pub fn fit<S: AsRef<str>>(&mut self, labels: &[S]) -> Result<&mut Self> {
        let distinct: BTreeSet<&str> = labels.iter().map(|s| s.as_ref()).collect();

        if distinct.len() < 2 {
            return Err(DiagnosisError::SchemaError(format!(
                "target needs 2 distinct classes, found {}: {:?}",
                distinct.len(),
                distinct
            )));
        }
        if distinct.len() > 2 {
            return Err(DiagnosisError::SchemaError(format!(
                "target must be binary, found {} classes: {:?}",
                distinct.len(),
                distinct
            )));
        }

        let mut classes: Vec<String> = distinct.into_iter().map(str::to_string).collect();

        if let Some(positive) = &self.positive_label {
            let pos = classes.iter().position(|c| c == positive).ok_or_else(|| {
                DiagnosisError::SchemaError(format!(
                    "positive label '{}' not present in target (classes: {:?})",
                    positive, classes
                ))
            })?;
            if pos == 0 {
                classes.swap(0, 1);
            }
        }

        self.classes = classes;
        self.is_fitted = true;
        Ok(self)
    }

    /// Encode labels to codes
    pub fn transform<S: AsRef<str>>(&self, labels: &[S]) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(DiagnosisError::ModelNotFitted);
        }

        labels
            .iter()
            .map(|label| {
                let label = label.as_ref();
                self.encode(label).map(|code| code as f64).ok_or_else(|| {
                    DiagnosisError::SchemaError(format!("unknown target label '{}'", label))
                })
            })
            .collect()
    }

    /// Fit and transform in one step
    pub fn fit_transform<S: AsRef<str>>(&mut self, labels: &[S]) -> Result<Array1<f64>> {
        self.fit(labels)?;
        self.transform(labels)
    }

    /// Code of a single label
    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == label)
    }

    /// Label of a single code
    pub fn decode(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    /// Labels indexed by code
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Label encoded as 1
    pub fn positive_class(&self) -> Option<&str> {
        self.decode(1)
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}
