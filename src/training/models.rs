//! Classifier trait and shared helpers

use crate::error::{DiagnosisError, Result};
use ndarray::{Array1, Array2};

/// Trait for probabilistic classifiers over encoded class codes `0..k`
pub trait Classifier: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Class-probability matrix, one column per class code
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Hard labels: argmax of `predict_proba`, lowest code on ties
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(argmax_rows(&self.predict_proba(x)?))
    }

    fn is_fitted(&self) -> bool;
}

/// Row-wise argmax; ties resolve to the lowest column index
pub fn argmax_rows(proba: &Array2<f64>) -> Array1<f64> {
    proba
        .rows()
        .into_iter()
        .map(|row| {
            let mut best = 0;
            for (k, &p) in row.iter().enumerate().skip(1) {
                if p > row[best] {
                    best = k;
                }
            }
            best as f64
        })
        .collect()
}

/// Stack a positive-class probability vector into an `n x 2` matrix
pub fn binary_proba(positive: &Array1<f64>) -> Array2<f64> {
    let mut out = Array2::zeros((positive.len(), 2));
    for (i, &p) in positive.iter().enumerate() {
        out[[i, 0]] = 1.0 - p;
        out[[i, 1]] = p;
    }
    out
}

/// Validate a training pair before fitting
pub(crate) fn check_training_data(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(DiagnosisError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(DiagnosisError::TrainingError(
            "cannot fit on an empty matrix".to_string(),
        ));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(DiagnosisError::TrainingError(
            "training matrix contains non-finite values".to_string(),
        ));
    }
    Ok(())
}

/// Labels must be the codes 0 and 1, with both present
pub(crate) fn check_binary_labels(y: &Array1<f64>) -> Result<()> {
    if let Some(bad) = y.iter().find(|&&v| v != 0.0 && v != 1.0) {
        return Err(DiagnosisError::TrainingError(format!(
            "binary classifier requires labels 0/1, found {}",
            bad
        )));
    }
    let positives = y.iter().filter(|&&v| v == 1.0).count();
    if positives == 0 || positives == y.len() {
        return Err(DiagnosisError::TrainingError(
            "training labels contain a single class".to_string(),
        ));
    }
    Ok(())
}

/// Numerically stable logistic function
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
