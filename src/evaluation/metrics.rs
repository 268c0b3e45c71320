//! Classification metrics

use crate::error::{DiagnosisError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

fn check_lengths(y_true: &Array1<f64>, other: &Array1<f64>) -> Result<()> {
    if y_true.is_empty() {
        return Err(DiagnosisError::ComputationError(
            "cannot score an empty label set".to_string(),
        ));
    }
    if y_true.len() != other.len() {
        return Err(DiagnosisError::ShapeError {
            expected: format!("{} values", y_true.len()),
            actual: format!("{} values", other.len()),
        });
    }
    Ok(())
}

/// Fraction of exact label matches
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (*t - *p).abs() < 0.5)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Area under the ROC curve of `scores` for the positive class (code 1).
///
/// Computed from the Mann-Whitney U statistic; tied scores share the
/// average of their ranks. Undefined when `y_true` holds a single class.
pub fn roc_auc(y_true: &Array1<f64>, scores: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, scores)?;
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(DiagnosisError::ComputationError(
            "ROC-AUC scores must be finite".to_string(),
        ));
    }

    let n_pos = y_true.iter().filter(|&&y| y > 0.5).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(DiagnosisError::ComputationError(
            "ROC-AUC is undefined when only one class is present".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // 1-based ranks start+1..=end share their mean
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg_rank;
        }
        start = end;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(&y, _)| y > 0.5)
        .map(|(_, &r)| r)
        .sum();
    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Per-class row of a classification report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Precision, recall and F1 per class plus accuracy and averages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    /// Build a report for labels `0..class_names.len()`.
    ///
    /// Undefined precision or recall (no predictions or no members of a
    /// class) counts as zero.
    pub fn compute(
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        class_names: &[String],
    ) -> Result<Self> {
        check_lengths(y_true, y_pred)?;
        if class_names.is_empty() {
            return Err(DiagnosisError::ValidationError(
                "classification report needs class names".to_string(),
            ));
        }

        let classes: Vec<ClassMetrics> = class_names
            .iter()
            .enumerate()
            .map(|(code, label)| {
                let code = code as f64;
                let is = |v: f64| (v - code).abs() < 0.5;
                let mut tp = 0usize;
                let mut fp = 0usize;
                let mut fn_ = 0usize;
                for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
                    match (is(t), is(p)) {
                        (true, true) => tp += 1,
                        (false, true) => fp += 1,
                        (true, false) => fn_ += 1,
                        (false, false) => {}
                    }
                }
                let precision = ratio(tp, tp + fp);
                let recall = ratio(tp, tp + fn_);
                let f1_score = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    label: label.clone(),
                    precision,
                    recall,
                    f1_score,
                    support: tp + fn_,
                }
            })
            .collect();

        let total: usize = classes.iter().map(|c| c.support).sum();
        let k = classes.len() as f64;
        let macro_avg = ClassMetrics {
            label: "macro avg".to_string(),
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / k,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / k,
            f1_score: classes.iter().map(|c| c.f1_score).sum::<f64>() / k,
            support: total,
        };
        let weighted = |f: fn(&ClassMetrics) -> f64| {
            if total == 0 {
                0.0
            } else {
                classes.iter().map(|c| f(c) * c.support as f64).sum::<f64>() / total as f64
            }
        };
        let weighted_avg = ClassMetrics {
            label: "weighted avg".to_string(),
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1_score: weighted(|c| c.f1_score),
            support: total,
        };

        Ok(Self {
            accuracy: accuracy(y_true, y_pred)?,
            classes,
            macro_avg,
            weighted_avg,
        })
    }

    pub fn support(&self) -> usize {
        self.macro_avg.support
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.label.len())
            .chain(std::iter::once(self.weighted_avg.label.len()))
            .max()
            .unwrap_or(12);

        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;

        let row = |f: &mut fmt::Formatter<'_>, m: &ClassMetrics| {
            writeln!(
                f,
                "{:>width$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.label, m.precision, m.recall, m.f1_score, m.support
            )
        };
        for class in &self.classes {
            row(f, class)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.support()
        )?;
        row(f, &self.macro_avg)?;
        row(f, &self.weighted_avg)
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
    fn test_accuracy() {
        let y = array![0.0, 1.0, 1.0, 0.0];
        let p = array![0.0, 1.0, 0.0, 0.0];
        assert!((accuracy(&y, &p).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_accuracy_length_mismatch() {
        assert!(matches!(
            accuracy(&array![0.0, 1.0], &array![0.0]),
            Err(DiagnosisError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_roc_auc_perfect_and_inverted() {
        let y = array![0.0, 0.0, 1.0, 1.0];
        assert!((roc_auc(&y, &array![0.1, 0.2, 0.8, 0.9]).unwrap() - 1.0).abs() < 1e-12);
        assert!(roc_auc(&y, &array![0.9, 0.8, 0.2, 0.1]).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc_ties_average() {
        // One positive tied with one negative contributes one half
        let y = array![0.0, 1.0, 0.0, 1.0];
        let s = array![0.1, 0.5, 0.5, 0.9];
        assert!((roc_auc(&y, &s).unwrap() - 0.875).abs() < 1e-12);

        let constant = array![0.3, 0.3, 0.3, 0.3];
        assert!((roc_auc(&y, &constant).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc_single_class_is_undefined() {
        let y = array![1.0, 1.0, 1.0];
        assert!(matches!(
            roc_auc(&y, &array![0.2, 0.5, 0.9]),
            Err(DiagnosisError::ComputationError(_))
        ));
    }

    #[test]
    fn test_classification_report_values() {
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0];
        let p = array![0.0, 0.0, 1.0, 1.0, 0.0];
        let report = ClassificationReport::compute(&y, &p, &names()).unwrap();

        let benign = &report.classes[0];
        assert!((benign.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((benign.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(benign.support, 3);

        let malignant = &report.classes[1];
        assert!((malignant.precision - 0.5).abs() < 1e-12);
        assert!((malignant.recall - 0.5).abs() < 1e-12);
        assert_eq!(malignant.support, 2);

        assert!((report.accuracy - 0.6).abs() < 1e-12);
        assert!((report.macro_avg.recall - (2.0 / 3.0 + 0.5) / 2.0).abs() < 1e-12);
        assert!((report.weighted_avg.recall - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_classification_report_no_predictions_for_class() {
        let y = array![0.0, 1.0];
        let p = array![0.0, 0.0];
        let report = ClassificationReport::compute(&y, &p, &names()).unwrap();
        assert_eq!(report.classes[1].precision, 0.0);
        assert_eq!(report.classes[1].f1_score, 0.0);
    }

    #[test]
    fn test_classification_report_layout() {
        let y = array![0.0, 1.0];
        let p = array![0.0, 1.0];
        let text = ClassificationReport::compute(&y, &p, &names()).unwrap().to_string();

        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].contains("precision"));
        assert!(lines[0].ends_with("support"));
        assert!(lines[2].trim_start().starts_with("Benign"));
        assert!(lines[3].trim_start().starts_with("Malignant"));
        assert!(text.contains("accuracy"));
        assert!(text.contains("macro avg"));
        assert!(text.contains("weighted avg"));
        assert!(text.contains("1.00"));
    }
}
