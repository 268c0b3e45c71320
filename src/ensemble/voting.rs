//! Voting ensemble methods

use crate::error::{DiagnosisError, Result};
use crate::training::{argmax_rows, Classifier, ModelBank};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Voting strategy for classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum VotingStrategy {
    /// Hard voting: weighted majority of predicted labels
    Hard,
    /// Soft voting: argmax of averaged probabilities
    Soft,
}

/// Voting rule over already-computed member outputs.
///
/// Both strategies break ties in favor of the lowest class code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingClassifier {
    /// Voting strategy
    strategy: VotingStrategy,
    /// Weights for each model; uniform when unset
    weights: Option<Vec<f64>>,
}

impl VotingClassifier {
    /// Create a new voting classifier
    pub fn new(strategy: VotingStrategy) -> Self {
        Self {
            strategy,
            weights: None,
        }
    }

    /// Set model weights
    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn strategy(&self) -> VotingStrategy {
        self.strategy
    }

    /// Weights normalized to sum to one
    fn normalized_weights(&self, n_models: usize) -> Result<Vec<f64>> {
        let weights = match &self.weights {
            Some(w) if w.len() != n_models => {
                return Err(DiagnosisError::ShapeError {
                    expected: format!("{} weights", n_models),
                    actual: format!("{} weights", w.len()),
                })
            }
            Some(w) => w.clone(),
            None => vec![1.0; n_models],
        };
        if weights.iter().any(|&w| w < 0.0 || !w.is_finite()) {
            return Err(DiagnosisError::ValidationError(
                "voting weights must be finite and non-negative".to_string(),
            ));
        }
        let weight_sum: f64 = weights.iter().sum();
        if weight_sum <= 0.0 {
            return Err(DiagnosisError::ValidationError(
                "voting weights sum to zero".to_string(),
            ));
        }
        Ok(weights.iter().map(|w| w / weight_sum).collect())
    }

    /// Weighted mean of member probability matrices
    pub fn predict_proba_from_probas(&self, probas: &[Array2<f64>]) -> Result<Array2<f64>> {
        let first = probas.first().ok_or_else(|| {
            DiagnosisError::ValidationError("No predictions provided".to_string())
        })?;
        if let Some(bad) = probas.iter().find(|p| p.dim() != first.dim()) {
            return Err(DiagnosisError::ShapeError {
                expected: format!("{:?}", first.dim()),
                actual: format!("{:?}", bad.dim()),
            });
        }

        let weights = self.normalized_weights(probas.len())?;
        let mut result = Array2::<f64>::zeros(first.dim());
        for (proba, &weight) in probas.iter().zip(weights.iter()) {
            result.scaled_add(weight, proba);
        }
        Ok(result)
    }

    /// Labels from member probability matrices, using the configured strategy
    pub fn predict_from_probas(&self, probas: &[Array2<f64>]) -> Result<Array1<f64>> {
        match self.strategy {
            VotingStrategy::Soft => Ok(argmax_rows(&self.predict_proba_from_probas(probas)?)),
            VotingStrategy::Hard => {
                let labels: Vec<Array1<f64>> = probas.iter().map(argmax_rows).collect();
                self.predict_from_predictions(&labels)
            }
        }
    }

    /// Weighted majority over member label vectors
    pub fn predict_from_predictions(&self, predictions: &[Array1<f64>]) -> Result<Array1<f64>> {
        let first = predictions.first().ok_or_else(|| {
            DiagnosisError::ValidationError("No predictions provided".to_string())
        })?;
        let n_samples = first.len();
        if predictions.iter().any(|p| p.len() != n_samples) {
            return Err(DiagnosisError::ShapeError {
                expected: format!("{} predictions per model", n_samples),
                actual: "ragged prediction vectors".to_string(),
            });
        }

        let weights = self.normalized_weights(predictions.len())?;
        Ok(self.hard_vote(predictions, &weights, n_samples))
    }

    fn hard_vote(
        &self,
        predictions: &[Array1<f64>],
        weights: &[f64],
        n_samples: usize,
    ) -> Array1<f64> {
        let mut result = Array1::zeros(n_samples);

        for i in 0..n_samples {
            let mut vote_counts: BTreeMap<i64, f64> = BTreeMap::new();
            for (pred, &weight) in predictions.iter().zip(weights.iter()) {
                *vote_counts.entry(pred[i].round() as i64).or_insert(0.0) += weight;
            }

            // Ascending key order: a later class must strictly beat the leader
            let mut winner = 0i64;
            let mut best = f64::NEG_INFINITY;
            for (class, votes) in vote_counts {
                if votes > best {
                    best = votes;
                    winner = class;
                }
            }
            result[i] = winner as f64;
        }

        result
    }
}

impl Default for VotingClassifier {
    fn default() -> Self {
        Self::new(VotingStrategy::Soft)
    }
}

/// Refit-free ensemble over a fitted model bank.
///
/// Borrows the bank and never mutates it; the only state is the voting rule.
#[derive(Debug, Clone)]
pub struct Ensemble<'a> {
    bank: &'a ModelBank,
    voter: VotingClassifier,
}

impl<'a> Ensemble<'a> {
    /// Uniform soft voting over every model in the bank
    pub fn soft(bank: &'a ModelBank) -> Result<Self> {
        Self::new(bank, VotingClassifier::new(VotingStrategy::Soft))
    }

    pub fn new(bank: &'a ModelBank, voter: VotingClassifier) -> Result<Self> {
        if bank.is_empty() {
            return Err(DiagnosisError::ValidationError(
                "ensemble needs at least one fitted model".to_string(),
            ));
        }
        if let Some(unfitted) = bank.iter().find(|m| !m.model.is_fitted()) {
            return Err(DiagnosisError::ValidationError(format!(
                "{} is not fitted",
                unfitted.name()
            )));
        }
        voter.normalized_weights(bank.len())?;
        Ok(Self { bank, voter })
    }

    /// Per-member probability matrices, in bank order
    pub fn member_probas(&self, x: &Array2<f64>) -> Result<Vec<Array2<f64>>> {
        self.bank.iter().map(|m| m.model.predict_proba(x)).collect()
    }

    /// Averaged class probabilities
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.voter.predict_proba_from_probas(&self.member_probas(x)?)
    }

    /// Ensemble labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.voter.predict_from_probas(&self.member_probas(x)?)
    }

    pub fn bank(&self) -> &ModelBank {
        self.bank
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_soft_vote_averages() {
        let voter = VotingClassifier::new(VotingStrategy::Soft);
        let probas = vec![array![[0.9, 0.1], [0.2, 0.8]], array![[0.5, 0.5], [0.6, 0.4]]];

        let avg = voter.predict_proba_from_probas(&probas).unwrap();
        assert!((avg[[0, 0]] - 0.7).abs() < 1e-12);
        assert!((avg[[1, 1]] - 0.6).abs() < 1e-12);
        assert_eq!(voter.predict_from_probas(&probas).unwrap().to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_soft_vote_tie_goes_to_benign() {
        let voter = VotingClassifier::new(VotingStrategy::Soft);
        let probas = vec![array![[0.8, 0.2]], array![[0.2, 0.8]]];
        assert_eq!(voter.predict_from_probas(&probas).unwrap()[0], 0.0);
    }

    #[test]
    fn test_weighted_soft_vote() {
        let voter = VotingClassifier::new(VotingStrategy::Soft).with_weights(vec![3.0, 1.0]);
        let probas = vec![array![[0.2, 0.8]], array![[1.0, 0.0]]];

        let avg = voter.predict_proba_from_probas(&probas).unwrap();
        assert!((avg[[0, 1]] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_hard_vote_majority_and_tie() {
        let voter = VotingClassifier::new(VotingStrategy::Hard);
        let predictions = vec![array![1.0, 1.0], array![1.0, 0.0], array![0.0, 1.0], array![0.0, 0.0]];

        let result = voter.predict_from_predictions(&predictions).unwrap();
        // Sample 0 is a 2-2 tie, sample 1 a 2-2 tie: lowest class wins both
        assert_eq!(result.to_vec(), vec![0.0, 0.0]);

        let predictions = vec![array![1.0], array![1.0], array![0.0]];
        assert_eq!(voter.predict_from_predictions(&predictions).unwrap()[0], 1.0);
    }

    #[test]
    fn test_weight_count_mismatch() {
        let voter = VotingClassifier::new(VotingStrategy::Soft).with_weights(vec![1.0]);
        let probas = vec![array![[0.5, 0.5]], array![[0.5, 0.5]]];
        assert!(matches!(
            voter.predict_proba_from_probas(&probas),
            Err(DiagnosisError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_empty_input() {
        let voter = VotingClassifier::default();
        assert!(voter.predict_proba_from_probas(&[]).is_err());
    }
}
