//! Platt scaling (sigmoid calibration)

use crate::calibration::Calibrator;
use crate::error::{DiagnosisError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Platt scaling calibrator
///
/// Fits `P(y=1|f) = 1 / (1 + exp(A*f + B))` to raw decision values `f`
/// by Newton's method with a backtracking line search on the regularized
/// targets `(n+ + 1)/(n+ + 2)` and `1/(n- + 2)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlattScaling {
    /// Slope parameter A
    a: Option<f64>,
    /// Intercept parameter B
    b: Option<f64>,
    /// Maximum Newton iterations
    max_iter: usize,
    /// Convergence tolerance on the gradient
    tol: f64,
    /// Smallest line-search step before giving up
    min_step: f64,
    /// Hessian ridge
    sigma: f64,
}

impl PlattScaling {
    /// Create new Platt scaling calibrator
    pub fn new() -> Self {
        Self {
            a: None,
            b: None,
            max_iter: 100,
            tol: 1e-5,
            min_step: 1e-10,
            sigma: 1e-12,
        }
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Get fitted parameters `(A, B)`
    pub fn parameters(&self) -> Option<(f64, f64)> {
        match (self.a, self.b) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }

    /// `1 / (1 + exp(fapb))`, evaluated without overflow
    fn probability(fapb: f64) -> f64 {
        if fapb >= 0.0 {
            let e = (-fapb).exp();
            e / (1.0 + e)
        } else {
            1.0 / (1.0 + fapb.exp())
        }
    }

    /// Negative log-likelihood of the targets under `(a, b)`
    fn objective(scores: &Array1<f64>, targets: &[f64], a: f64, b: f64) -> f64 {
        scores
            .iter()
            .zip(targets)
            .map(|(&f, &t)| {
                let fapb = f * a + b;
                if fapb >= 0.0 {
                    t * fapb + (1.0 + (-fapb).exp()).ln()
                } else {
                    (t - 1.0) * fapb + (1.0 + fapb.exp()).ln()
                }
            })
            .sum()
    }
}

impl Default for PlattScaling {
    fn default() -> Self {
        Self::new()
    }
}

impl Calibrator for PlattScaling {
    fn fit(&mut self, scores: &Array1<f64>, labels: &Array1<f64>) -> Result<()> {
        let n = scores.len();
        if n != labels.len() {
            return Err(DiagnosisError::ValidationError(
                "scores and labels must have same length".to_string(),
            ));
        }
        if n == 0 {
            return Err(DiagnosisError::ValidationError("empty input".to_string()));
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(DiagnosisError::ComputationError(
                "non-finite decision value passed to calibrator".to_string(),
            ));
        }

        let n_pos = labels.iter().filter(|&&y| y > 0.5).count() as f64;
        let n_neg = n as f64 - n_pos;
        let target_pos = (n_pos + 1.0) / (n_pos + 2.0);
        let target_neg = 1.0 / (n_neg + 2.0);
        let targets: Vec<f64> = labels
            .iter()
            .map(|&y| if y > 0.5 { target_pos } else { target_neg })
            .collect();

        let mut a = 0.0;
        let mut b = ((n_neg + 1.0) / (n_pos + 1.0)).ln();
        let mut fval = Self::objective(scores, &targets, a, b);

        for _ in 0..self.max_iter {
            let mut h11 = self.sigma;
            let mut h22 = self.sigma;
            let mut h21 = 0.0;
            let mut g1 = 0.0;
            let mut g2 = 0.0;

            for (&f, &t) in scores.iter().zip(&targets) {
                let p = Self::probability(f * a + b);
                let q = 1.0 - p;
                let d2 = p * q;
                let d1 = t - p;
                h11 += f * f * d2;
                h22 += d2;
                h21 += f * d2;
                g1 += f * d1;
                g2 += d1;
            }

            if g1.abs() < self.tol && g2.abs() < self.tol {
                break;
            }

            // Solve the 2x2 Newton system by Cramer's rule
            let det = h11 * h22 - h21 * h21;
            if det.abs() < f64::MIN_POSITIVE {
                break;
            }
            let da = -(h22 * g1 - h21 * g2) / det;
            let db = -(-h21 * g1 + h11 * g2) / det;
            let gd = g1 * da + g2 * db;

            let mut step = 1.0;
            let mut accepted = false;
            while step >= self.min_step {
                let new_a = a + step * da;
                let new_b = b + step * db;
                let new_f = Self::objective(scores, &targets, new_a, new_b);
                if new_f < fval + 1e-4 * step * gd {
                    a = new_a;
                    b = new_b;
                    fval = new_f;
                    accepted = true;
                    break;
                }
                step /= 2.0;
            }
            if !accepted {
                break;
            }
        }

        self.a = Some(a);
        self.b = Some(b);
        Ok(())
    }

    fn calibrate(&self, scores: &Array1<f64>) -> Result<Array1<f64>> {
        let (a, b) = self.parameters().ok_or(DiagnosisError::ModelNotFitted)?;
        Ok(scores.mapv(|f| Self::probability(a * f + b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_platt_scaling_is_monotone_in_score() {
        let scores = array![-2.0, -1.2, -0.4, 0.3, -0.1, 0.9, 1.5, 2.2];
        let labels = array![0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0];

        let mut calibrator = PlattScaling::new();
        calibrator.fit(&scores, &labels).unwrap();

        let (a, _) = calibrator.parameters().unwrap();
        assert!(a < 0.0, "positive scores should raise P(y=1), got A = {}", a);

        let calibrated = calibrator.calibrate(&scores).unwrap();
        assert!(calibrated.iter().all(|&p| p > 0.0 && p < 1.0));
        assert!(calibrated[0] < calibrated[7]);
    }

    #[test]
    fn test_uninformative_scores_give_prior() {
        let scores = array![0.0, 0.0, 0.0, 0.0];
        let labels = array![0.0, 1.0, 0.0, 1.0];

        let mut calibrator = PlattScaling::new();
        calibrator.fit(&scores, &labels).unwrap();

        let p = calibrator.calibrate(&array![0.0]).unwrap();
        assert!((p[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_unfitted() {
        let calibrator = PlattScaling::new();
        assert!(calibrator.calibrate(&array![0.1]).is_err());
    }

    #[test]
    fn test_length_mismatch() {
        let mut calibrator = PlattScaling::new();
        assert!(calibrator.fit(&array![0.1, 0.2], &array![1.0]).is_err());
    }
}
