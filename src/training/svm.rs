//! Support vector classification
//!
//! Binary soft-margin SVM trained with SMO (Sequential Minimal
//! Optimization) over a precomputed kernel matrix. Probabilities come from
//! Platt scaling fitted on out-of-fold decision values.

use super::models::{binary_proba, check_binary_labels, check_training_data, Classifier};
use crate::calibration::{Calibrator, PlattScaling};
use crate::error::{DiagnosisError, Result};
use crate::preprocessing::stratified_k_fold;
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maximum number of samples for eager kernel matrix computation.
/// Beyond this, training will return an error to prevent OOM.
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// Kernel width selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Gamma {
    /// `1 / (n_features * Var(X))`
    Scale,
    /// Fixed value
    Value(f64),
}

/// Kernel function type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KernelType {
    /// Linear kernel: K(x, y) = x · y
    Linear,
    /// Radial Basis Function (Gaussian): K(x, y) = exp(-γ * ||x - y||²)
    RBF { gamma: Gamma },
}

impl Default for KernelType {
    fn default() -> Self {
        KernelType::RBF {
            gamma: Gamma::Scale,
        }
    }
}

/// SVM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMConfig {
    /// Regularization parameter (C)
    pub c: f64,
    /// Kernel function
    pub kernel: KernelType,
    /// KKT tolerance for the SMO stopping criterion
    pub tol: f64,
    /// Maximum number of SMO sweeps
    pub max_iter: usize,
    /// Random seed
    pub random_state: u64,
    /// Fit a Platt calibrator so `predict_proba` is available
    pub probability: bool,
    /// Folds used to collect out-of-fold decision values for calibration
    pub calibration_folds: usize,
}

impl Default for SVMConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: KernelType::default(),
            tol: 1e-3,
            max_iter: 1000,
            random_state: 42,
            probability: true,
            calibration_folds: 5,
        }
    }
}

/// A trained binary machine: `f(x) = Σ coef_i K(sv_i, x) + bias`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinarySVM {
    support_vectors: Array2<f64>,
    /// `alpha_i * y_i` per support vector
    dual_coef: Array1<f64>,
    bias: f64,
}

/// Support Vector Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMClassifier {
    config: SVMConfig,
    machine: Option<BinarySVM>,
    /// Resolved kernel width
    gamma: f64,
    n_features: usize,
    calibrator: Option<PlattScaling>,
}

impl Default for SVMClassifier {
    fn default() -> Self {
        Self::new(SVMConfig::default())
    }
}

impl SVMClassifier {
    /// Create a new SVM classifier
    pub fn new(config: SVMConfig) -> Self {
        Self {
            config,
            machine: None,
            gamma: 1.0,
            n_features: 0,
            calibrator: None,
        }
    }

    pub fn config(&self) -> &SVMConfig {
        &self.config
    }

    /// Resolved RBF width, available after fit
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Get number of support vectors
    pub fn n_support_vectors(&self) -> usize {
        self.machine
            .as_ref()
            .map_or(0, |m| m.support_vectors.nrows())
    }

    /// Signed distance to the separating surface; positive means class 1
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let machine = self.machine.as_ref().ok_or(DiagnosisError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(DiagnosisError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(self.score(machine, x))
    }

    fn score(&self, machine: &BinarySVM, x: &Array2<f64>) -> Array1<f64> {
        let k = self.cross_kernel(x, &machine.support_vectors);
        k.dot(&machine.dual_coef) + machine.bias
    }

    fn resolve_gamma(&self, x: &Array2<f64>) -> f64 {
        let n_features = x.ncols() as f64;
        match self.config.kernel {
            KernelType::Linear => 0.0,
            KernelType::RBF { gamma } => match gamma {
                Gamma::Value(g) => g,
                Gamma::Scale => {
                    let var = x.var(0.0);
                    if var > 0.0 {
                        1.0 / (n_features * var)
                    } else {
                        1.0
                    }
                }
            },
        }
    }

    /// Kernel between every row of `a` and every row of `b`
    fn cross_kernel(&self, a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
        let gram = a.dot(&b.t());
        match self.config.kernel {
            KernelType::Linear => gram,
            KernelType::RBF { .. } => {
                let a_sq: Array1<f64> = a.rows().into_iter().map(|r| r.dot(&r)).collect();
                let b_sq: Array1<f64> = b.rows().into_iter().map(|r| r.dot(&r)).collect();
                let gamma = self.gamma;
                let mut k = gram;
                for ((i, j), v) in k.indexed_iter_mut() {
                    let dist = (a_sq[i] + b_sq[j] - 2.0 * *v).max(0.0);
                    *v = (-gamma * dist).exp();
                }
                k
            }
        }
    }

    fn train_binary(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<BinarySVM> {
        let n = x.nrows();
        if n > MAX_KERNEL_MATRIX_SAMPLES {
            return Err(DiagnosisError::TrainingError(format!(
                "dataset has {} samples, exceeding the maximum {} for the SVM kernel matrix",
                n, MAX_KERNEL_MATRIX_SAMPLES
            )));
        }

        let signs = y.mapv(|v| if v > 0.5 { 1.0 } else { -1.0 });
        let kernel_matrix = self.cross_kernel(x, x);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let (alphas, bias) = Smo::new(&kernel_matrix, &signs, &self.config).solve(&mut rng);

        let support: Vec<usize> = alphas
            .iter()
            .enumerate()
            .filter(|(_, &a)| a > 1e-8)
            .map(|(i, _)| i)
            .collect();

        Ok(BinarySVM {
            support_vectors: x.select(Axis(0), &support),
            dual_coef: support.iter().map(|&i| alphas[i] * signs[i]).collect(),
            bias,
        })
    }

    /// Decision values for each sample from a machine that never saw it
    fn out_of_fold_scores(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<Array1<f64>> {
        let positives = y.iter().filter(|&&v| v > 0.5).count();
        let minority = positives.min(y.len() - positives);
        let n_folds = self.config.calibration_folds.min(minority);

        if n_folds < 2 {
            debug!("Minority class too small for calibration folds, using in-sample scores");
            let machine = self.train_binary(x, y)?;
            return Ok(self.score(&machine, x));
        }

        let mut scores = Array1::<f64>::zeros(y.len());
        for fold in stratified_k_fold(y, n_folds, self.config.random_state)? {
            let x_train = x.select(Axis(0), &fold.train_indices);
            let y_train = y.select(Axis(0), &fold.train_indices);
            let machine = self.train_binary(&x_train, &y_train)?;

            let fold_scores = self.score(&machine, &x.select(Axis(0), &fold.test_indices));
            for (&idx, &s) in fold.test_indices.iter().zip(fold_scores.iter()) {
                scores[idx] = s;
            }
        }
        Ok(scores)
    }
}

impl Classifier for SVMClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        check_binary_labels(y)?;
        if self.config.c <= 0.0 {
            return Err(DiagnosisError::InvalidParameter {
                name: "c".to_string(),
                value: self.config.c.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        self.n_features = x.ncols();
        self.gamma = self.resolve_gamma(x);

        self.calibrator = if self.config.probability {
            let scores = self.out_of_fold_scores(x, y)?;
            let mut platt = PlattScaling::new();
            platt.fit(&scores, y)?;
            debug!(params = ?platt.parameters(), "Fitted Platt calibration");
            Some(platt)
        } else {
            None
        };

        let machine = self.train_binary(x, y)?;
        debug!(
            support_vectors = machine.support_vectors.nrows(),
            gamma = self.gamma,
            "Fitted SVM"
        );
        self.machine = Some(machine);
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let calibrator = self.calibrator.as_ref().ok_or_else(|| {
            DiagnosisError::ValidationError(
                "SVM was fitted without probability estimates".to_string(),
            )
        })?;
        let scores = self.decision_function(x)?;
        Ok(binary_proba(&calibrator.calibrate(&scores)?))
    }

    /// Sign of the decision function, so hard labels work without calibration
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self
            .decision_function(x)?
            .mapv(|s| if s > 0.0 { 1.0 } else { 0.0 }))
    }

    fn is_fitted(&self) -> bool {
        self.machine.is_some()
    }
}

/// SMO solver state with an incrementally maintained error cache
struct Smo<'a> {
    k: &'a Array2<f64>,
    y: &'a Array1<f64>,
    c: f64,
    tol: f64,
    max_iter: usize,
    alphas: Array1<f64>,
    bias: f64,
    /// `f(x_i) - y_i`
    errors: Array1<f64>,
}

impl<'a> Smo<'a> {
    fn new(k: &'a Array2<f64>, y: &'a Array1<f64>, config: &SVMConfig) -> Self {
        let n = y.len();
        Self {
            k,
            y,
            c: config.c,
            tol: config.tol,
            max_iter: config.max_iter,
            alphas: Array1::zeros(n),
            bias: 0.0,
            errors: y.mapv(|v| -v),
        }
    }

    fn violates_kkt(&self, i: usize) -> bool {
        let r = self.y[i] * self.errors[i];
        (r < -self.tol && self.alphas[i] < self.c) || (r > self.tol && self.alphas[i] > 0.0)
    }

    fn solve(mut self, rng: &mut Xoshiro256PlusPlus) -> (Array1<f64>, f64) {
        let n = self.y.len();
        let max_passes = 5;
        let mut passes = 0;
        let mut sweeps = 0;

        while passes < max_passes && sweeps < self.max_iter {
            let mut num_changed = 0;
            for i in 0..n {
                if !self.violates_kkt(i) {
                    continue;
                }
                // Second-choice heuristic, then a random partner
                let j = self.partner_for(i);
                if self.take_step(i, j) {
                    num_changed += 1;
                    continue;
                }
                let j = loop {
                    let j = rng.gen_range(0..n);
                    if j != i {
                        break j;
                    }
                };
                if self.take_step(i, j) {
                    num_changed += 1;
                }
            }
            sweeps += 1;
            if num_changed == 0 {
                passes += 1;
            } else {
                passes = 0;
            }
        }

        (self.alphas, self.bias)
    }

    fn partner_for(&self, i: usize) -> usize {
        let e_i = self.errors[i];
        let mut best = if i == 0 { 1 } else { 0 };
        let mut best_gap = -1.0;
        for (j, &e_j) in self.errors.iter().enumerate() {
            if j == i {
                continue;
            }
            let gap = (e_i - e_j).abs();
            if gap > best_gap {
                best_gap = gap;
                best = j;
            }
        }
        best
    }

    fn take_step(&mut self, i: usize, j: usize) -> bool {
        if i == j {
            return false;
        }
        let (y_i, y_j) = (self.y[i], self.y[j]);
        let (e_i, e_j) = (self.errors[i], self.errors[j]);
        let alpha_i_old = self.alphas[i];
        let alpha_j_old = self.alphas[j];

        let (l, h) = if y_i != y_j {
            (
                (alpha_j_old - alpha_i_old).max(0.0),
                (self.c + alpha_j_old - alpha_i_old).min(self.c),
            )
        } else {
            (
                (alpha_i_old + alpha_j_old - self.c).max(0.0),
                (alpha_i_old + alpha_j_old).min(self.c),
            )
        };
        if (h - l).abs() < 1e-12 {
            return false;
        }

        let k_ii = self.k[[i, i]];
        let k_jj = self.k[[j, j]];
        let k_ij = self.k[[i, j]];
        let eta = 2.0 * k_ij - k_ii - k_jj;
        if eta >= 0.0 {
            return false;
        }

        let alpha_j = (alpha_j_old - y_j * (e_i - e_j) / eta).clamp(l, h);
        if (alpha_j - alpha_j_old).abs() < 1e-5 * (alpha_j + alpha_j_old + 1e-5) {
            return false;
        }
        let alpha_i = alpha_i_old + y_i * y_j * (alpha_j_old - alpha_j);

        let d_i = y_i * (alpha_i - alpha_i_old);
        let d_j = y_j * (alpha_j - alpha_j_old);
        let b1 = self.bias - e_i - d_i * k_ii - d_j * k_ij;
        let b2 = self.bias - e_j - d_i * k_ij - d_j * k_jj;
        let bias = if alpha_i > 0.0 && alpha_i < self.c {
            b1
        } else if alpha_j > 0.0 && alpha_j < self.c {
            b2
        } else {
            (b1 + b2) / 2.0
        };
        let d_b = bias - self.bias;

        let row_i = self.k.row(i);
        let row_j = self.k.row(j);
        for (idx, e) in self.errors.iter_mut().enumerate() {
            *e += d_i * row_i[idx] + d_j * row_j[idx] + d_b;
        }

        self.alphas[i] = alpha_i;
        self.alphas[j] = alpha_j;
        self.bias = bias;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [-2.0, -1.0],
            [-1.5, -1.8],
            [-1.0, -2.2],
            [-2.2, -0.6],
            [-1.7, -1.3],
            [-0.9, -1.6],
            [1.0, 1.2],
            [1.6, 0.8],
            [2.1, 1.5],
            [0.8, 2.0],
            [1.3, 1.7],
            [1.9, 0.9],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_svm_separates_linear_data() {
        let (x, y) = separable();
        let mut model = SVMClassifier::default();
        model.fit(&x, &y).unwrap();

        assert_eq!(model.predict(&x).unwrap(), y);
        assert!(model.n_support_vectors() > 0);
    }

    #[test]
    fn test_probabilities_follow_decision_values() {
        let (x, y) = separable();
        let mut model = SVMClassifier::default();
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
        let far = model.predict_proba(&array![[-3.0, -3.0], [3.0, 3.0]]).unwrap();
        assert!(far[[0, 1]] < 0.5);
        assert!(far[[1, 1]] > 0.5);
    }

    #[test]
    fn test_gamma_scale() {
        let (x, y) = separable();
        let mut model = SVMClassifier::default();
        model.fit(&x, &y).unwrap();

        let expected = 1.0 / (2.0 * x.var(0.0));
        assert!((model.gamma() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_linear_kernel_without_probability() {
        let (x, y) = separable();
        let mut model = SVMClassifier::new(SVMConfig {
            kernel: KernelType::Linear,
            probability: false,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        assert_eq!(model.predict(&x).unwrap(), y);
        assert!(model.predict_proba(&x).is_err());
    }

    #[test]
    fn test_deterministic() {
        let (x, y) = separable();
        let mut a = SVMClassifier::default();
        let mut b = SVMClassifier::default();
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_unfitted() {
        let model = SVMClassifier::default();
        assert!(matches!(
            model.decision_function(&array![[0.0, 0.0]]),
            Err(DiagnosisError::ModelNotFitted)
        ));
    }
}
