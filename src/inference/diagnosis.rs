//! Prediction verdict for one sample

use crate::error::{DiagnosisError, Result};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::fmt;

const RULE: &str = "==============================";

/// Ensemble verdict for a single feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    /// Encoded class code, 1 is malignant
    pub code: usize,
    /// Display name of the predicted class
    pub class_name: String,
    /// Averaged probability of the malignant class
    pub malignancy_probability: f64,
}

impl Diagnosis {
    /// Build from one row of averaged class probabilities.
    ///
    /// The predicted class is the argmax; a tie goes to the lower code.
    pub fn from_proba(proba: ArrayView1<'_, f64>, class_names: &[String]) -> Result<Self> {
        if proba.len() != 2 || class_names.len() != 2 {
            return Err(DiagnosisError::ShapeError {
                expected: "2 classes".to_string(),
                actual: format!(
                    "{} probabilities, {} class names",
                    proba.len(),
                    class_names.len()
                ),
            });
        }
        let code = if proba[1] > proba[0] { 1 } else { 0 };
        Ok(Self {
            code,
            class_name: class_names[code].clone(),
            malignancy_probability: proba[1],
        })
    }

    pub fn is_malignant(&self) -> bool {
        self.code == 1
    }

    /// Verdict line text, e.g. `Malignant (Cancerous)`
    pub fn verdict(&self) -> String {
        let qualifier = if self.is_malignant() {
            "Cancerous"
        } else {
            "Non-Cancerous"
        };
        format!("{} ({})", self.class_name, qualifier)
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "      PREDICTION RESULT")?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "Predicted Diagnosis: {}", self.verdict())?;
        writeln!(
            f,
            "Confidence Score (Malignancy Probability): {:.4}",
            self.malignancy_probability
        )?;
        writeln!(f, "{RULE}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names() -> Vec<String> {
        vec!["Benign".to_string(), "Malignant".to_string()]
    }

    #[test]
    fn test_malignant_render() {
        let proba = array![0.0269, 0.9731];
        let d = Diagnosis::from_proba(proba.view(), &names()).unwrap();
        assert!(d.is_malignant());

        let text = d.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "      PREDICTION RESULT");
        assert_eq!(lines[3], "Predicted Diagnosis: Malignant (Cancerous)");
        assert_eq!(lines[4], "Confidence Score (Malignancy Probability): 0.9731");
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_benign_verdict() {
        let proba = array![0.9, 0.1];
        let d = Diagnosis::from_proba(proba.view(), &names()).unwrap();
        assert_eq!(d.verdict(), "Benign (Non-Cancerous)");
    }

    #[test]
    fn test_tie_is_benign() {
        let proba = array![0.5, 0.5];
        let d = Diagnosis::from_proba(proba.view(), &names()).unwrap();
        assert_eq!(d.code, 0);
        assert_eq!(d.malignancy_probability, 0.5);
    }

    #[test]
    fn test_rejects_wrong_width() {
        let proba = array![1.0];
        assert!(Diagnosis::from_proba(proba.view(), &names()).is_err());
    }
}
