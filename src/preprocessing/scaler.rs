//! Feature standardization

use crate::error::{DiagnosisError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Standard scaler: `(x - mean) / std`, statistics learned once.
///
/// Standard deviation uses the population estimator. A constant column
/// keeps a scale of 1 so it maps to zeros instead of NaN.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl StandardScaler {
    /// Create a new scaler
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn per-column mean and standard deviation
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(DiagnosisError::ValidationError(
                "cannot fit scaler on an empty matrix".to_string(),
            ));
        }

        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| DiagnosisError::ComputationError("column means".to_string()))?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s == 0.0 || !s.is_finite() { 1.0 } else { s });

        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(self)
    }

    /// Standardize a matrix with the learned statistics
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, scale) = self.params()?;
        self.check_width(x.ncols())?;

        let mut out = x.to_owned();
        for mut row in out.rows_mut() {
            row -= mean;
            row /= scale;
        }
        Ok(out)
    }

    /// Standardize a single sample, returned as a 1-row matrix
    pub fn transform_one(&self, sample: ArrayView1<f64>) -> Result<Array2<f64>> {
        let (mean, scale) = self.params()?;
        self.check_width(sample.len())?;

        let scaled = (&sample - mean) / scale;
        Ok(scaled.insert_axis(Axis(0)))
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Learned per-column means
    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    /// Learned per-column scales
    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }

    pub fn n_features(&self) -> usize {
        self.mean.as_ref().map_or(0, |m| m.len())
    }

    fn params(&self) -> Result<(&Array1<f64>, &Array1<f64>)> {
        match (&self.mean, &self.scale) {
            (Some(m), Some(s)) => Ok((m, s)),
            _ => Err(DiagnosisError::ModelNotFitted),
        }
    }

    fn check_width(&self, width: usize) -> Result<()> {
        let expected = self.n_features();
        if width != expected {
            return Err(DiagnosisError::ShapeError {
                expected: format!("{} features", expected),
                actual: format!("{} features", width),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standardized_columns_have_zero_mean_unit_std() {
        let x = array![
            [1.0, 10.0, 3.0],
            [2.0, 20.0, 3.5],
            [3.0, 35.0, 2.0],
            [4.0, 40.0, 8.0],
            [5.0, 55.0, 1.0],
        ];

        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();

        for col in scaled.columns() {
            let mean = col.mean().unwrap();
            let std = col.std(0.0);
            assert!(mean.abs() < 1e-10, "mean {}", mean);
            assert!((std - 1.0).abs() < 1e-10, "std {}", std);
        }
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let x = array![[1.0, 7.0], [2.0, 7.0], [3.0, 7.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();

        assert!(scaled.column(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_transform_one_matches_batch() {
        let x = array![[1.0, 2.0], [3.0, 6.0], [5.0, 4.0]];
        let mut scaler = StandardScaler::new();
        let batch = scaler.fit_transform(&x).unwrap();

        let single = scaler.transform_one(x.row(1)).unwrap();
        assert_eq!(single.nrows(), 1);
        for j in 0..2 {
            assert!((single[[0, j]] - batch[[1, j]]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_width_mismatch() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let mut scaler = StandardScaler::new();
        scaler.fit(&x).unwrap();

        let err = scaler.transform_one(array![1.0, 2.0, 3.0].view()).unwrap_err();
        assert!(matches!(err, DiagnosisError::ShapeError { .. }));
    }

    #[test]
    fn test_unfitted() {
        let scaler = StandardScaler::new();
        assert!(matches!(
            scaler.transform(&array![[1.0]]),
            Err(DiagnosisError::ModelNotFitted)
        ));
    }
}
