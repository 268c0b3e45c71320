//! Linear models

use super::models::{binary_proba, check_binary_labels, check_training_data, sigmoid, Classifier};
use crate::error::{DiagnosisError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// L2-regularized logistic regression fitted by batch gradient descent.
///
/// Minimizes `mean(log_loss) + ||w||^2 / (2 * C * n)`, the per-sample
/// form of the usual `C`-weighted objective. The intercept is not
/// penalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    /// Inverse regularization strength
    pub c: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    /// Step size; derived from a Lipschitz bound of the loss when unset
    pub learning_rate: Option<f64>,
    /// Number of iterations the last fit ran
    pub n_iter: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            c: 1.0,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: None,
            n_iter: 0,
        }
    }

    /// Set inverse regularization strength
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set a fixed learning rate
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = Some(lr);
        self
    }

    /// Raw linear scores `x . w + b`
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (w, b) = match (&self.coefficients, self.intercept) {
            (Some(w), Some(b)) => (w, b),
            _ => return Err(DiagnosisError::ModelNotFitted),
        };
        if x.ncols() != w.len() {
            return Err(DiagnosisError::ShapeError {
                expected: format!("{} features", w.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.dot(w) + b)
    }

    fn step_size(&self, x: &Array2<f64>, alpha: f64) -> f64 {
        if let Some(lr) = self.learning_rate {
            return lr;
        }
        // Hessian of the mean log-loss is bounded by ||[X 1]||_F^2 / (4n)
        let n = x.nrows() as f64;
        let frob = x.iter().map(|v| v * v).sum::<f64>() + n;
        1.0 / (frob / (4.0 * n) + alpha)
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        check_binary_labels(y)?;
        if self.c <= 0.0 {
            return Err(DiagnosisError::InvalidParameter {
                name: "c".to_string(),
                value: self.c.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let n_samples = x.nrows();
        let alpha = 1.0 / (self.c * n_samples as f64);
        let lr = self.step_size(x, alpha);

        let mut weights = Array1::<f64>::zeros(x.ncols());
        let mut bias = 0.0;
        self.n_iter = self.max_iter;

        for iter in 0..self.max_iter {
            let linear = x.dot(&weights) + bias;
            let errors = linear.mapv(sigmoid) - y;

            let dw = x.t().dot(&errors) / n_samples as f64 + alpha * &weights;
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                self.n_iter = iter;
                break;
            }

            weights.scaled_add(-lr, &dw);
            bias -= lr * db;
        }

        if weights.iter().any(|w| !w.is_finite()) || !bias.is_finite() {
            return Err(DiagnosisError::TrainingError(
                "logistic regression diverged".to_string(),
            ));
        }

        self.coefficients = Some(weights);
        self.intercept = Some(bias);
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let scores = self.decision_function(x)?;
        Ok(binary_proba(&scores.mapv(sigmoid)))
    }

    fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }
}
