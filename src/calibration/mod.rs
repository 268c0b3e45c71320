//! Probability calibration
//!
//! Maps uncalibrated classifier scores to probabilities. Platt scaling is
//! the method the support-vector classifier uses.

mod platt;

pub use platt::PlattScaling;

use crate::error::Result;
use ndarray::Array1;

/// Trait for probability calibrators
pub trait Calibrator: Send + Sync {
    /// Fit the calibrator on scores and true labels
    fn fit(&mut self, scores: &Array1<f64>, labels: &Array1<f64>) -> Result<()>;

    /// Calibrate scores into positive-class probabilities
    fn calibrate(&self, scores: &Array1<f64>) -> Result<Array1<f64>>;

    /// Fit and calibrate in one step
    fn fit_calibrate(&mut self, scores: &Array1<f64>, labels: &Array1<f64>) -> Result<Array1<f64>> {
        self.fit(scores, labels)?;
        self.calibrate(scores)
    }
}
