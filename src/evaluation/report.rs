//! Evaluation report: per-model scores, terminal chart and JSON export

use super::metrics::{accuracy, roc_auc, ClassificationReport};
use crate::error::{DiagnosisError, Result};
use crate::training::argmax_rows;
use chrono::{DateTime, Utc};
use colored::*;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;

const BLOCK_FULL: char = '\u{2588}';
const BLOCK_LIGHT: char = '\u{2591}';
const RULE: &str = "==============================";

/// Test-partition scores of one model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelScore {
    pub name: String,
    pub accuracy: f64,
    pub roc_auc: f64,
    /// Fit time; `None` for the ensemble, which is never fitted
    pub training_time_secs: Option<f64>,
}

impl ModelScore {
    /// Score an `n x 2` probability matrix against encoded labels
    pub fn from_proba(
        name: impl Into<String>,
        proba: &Array2<f64>,
        y_true: &Array1<f64>,
        training_time_secs: Option<f64>,
    ) -> Result<Self> {
        if proba.ncols() != 2 {
            return Err(DiagnosisError::ShapeError {
                expected: "2 probability columns".to_string(),
                actual: format!("{} columns", proba.ncols()),
            });
        }
        let labels = argmax_rows(proba);
        Ok(Self {
            name: name.into(),
            accuracy: accuracy(y_true, &labels)?,
            roc_auc: roc_auc(y_true, &proba.column(1).to_owned())?,
            training_time_secs,
        })
    }
}

/// Raw target label and the code it was encoded to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassMapping {
    pub label: String,
    pub code: usize,
    pub display_name: String,
}

/// Partition sizes and per-class counts, indexed by class code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitSummary {
    pub n_train: usize,
    pub n_test: usize,
    pub train_class_counts: Vec<usize>,
    pub test_class_counts: Vec<usize>,
}

impl SplitSummary {
    pub fn from_labels(y_train: &Array1<f64>, y_test: &Array1<f64>, n_classes: usize) -> Self {
        let count = |y: &Array1<f64>| {
            let mut counts = vec![0usize; n_classes];
            for &v in y.iter() {
                if let Some(c) = counts.get_mut(v.round() as usize) {
                    *c += 1;
                }
            }
            counts
        };
        Self {
            n_train: y_train.len(),
            n_test: y_test.len(),
            train_class_counts: count(y_train),
            test_class_counts: count(y_test),
        }
    }
}

/// Everything the run reports about the fitted models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub created_at: DateTime<Utc>,
    pub random_seed: u64,
    pub class_mapping: Vec<ClassMapping>,
    pub split: SplitSummary,
    pub feature_names: Vec<String>,
    /// Base models in training order
    pub models: Vec<ModelScore>,
    pub ensemble: ModelScore,
    pub classification_report: ClassificationReport,
}

impl EvaluationReport {
    /// Model table: accuracy percent, ROC-AUC and fit time
    pub fn summary_table(&self) -> String {
        let mut out = format!(
            "{:<24} {:>10} {:>10} {:>10}\n",
            "Model", "Accuracy", "ROC-AUC", "Time"
        );
        out.push_str(&"─".repeat(57));
        out.push('\n');
        for score in self.models.iter().chain(std::iter::once(&self.ensemble)) {
            let time = score
                .training_time_secs
                .map(|t| format!("{:.3}s", t))
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(
                "{:<24} {:>9.2}% {:>10.4} {:>10}\n",
                score.name,
                score.accuracy * 100.0,
                score.roc_auc,
                time
            ));
        }
        out
    }

    /// Horizontal bars of accuracy and ROC-AUC per model, ensemble last
    pub fn bar_chart(&self, width: usize) -> String {
        let label_width = self
            .models
            .iter()
            .chain(std::iter::once(&self.ensemble))
            .map(|s| s.name.len())
            .max()
            .unwrap_or(0);

        let mut out = format!(
            "{:<label_width$}   {} {}\n",
            "",
            "█ Accuracy".truecolor(120, 170, 255),
            "█ ROC-AUC".truecolor(100, 210, 120)
        );
        for score in self.models.iter().chain(std::iter::once(&self.ensemble)) {
            out.push_str(&format!(
                "{:<label_width$} A {} {:>6.2}%\n",
                score.name,
                colored_bar(score.accuracy, width, (120, 170, 255)),
                score.accuracy * 100.0
            ));
            out.push_str(&format!(
                "{:<label_width$} R {} {:>7.4}\n",
                "",
                colored_bar(score.roc_auc, width, (100, 210, 120)),
                score.roc_auc
            ));
        }
        out
    }

    /// The ensemble summary block
    pub fn performance_summary(&self) -> String {
        format!(
            "{RULE}\n      PERFORMANCE SUMMARY\n{RULE}\n Ensemble Model Accuracy: {:.2}%\nEnsemble Model ROC-AUC: {:.4}\n{RULE}\n",
            self.ensemble.accuracy * 100.0,
            self.ensemble.roc_auc
        )
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Block bar for a value in `[0, 1]`
pub fn build_block_bar(fraction: f64, width: usize) -> String {
    let filled = filled_cells(fraction, width);
    format!(
        "{}{}",
        BLOCK_FULL.to_string().repeat(filled),
        BLOCK_LIGHT.to_string().repeat(width - filled)
    )
}

fn colored_bar(fraction: f64, width: usize, color: (u8, u8, u8)) -> String {
    let filled = filled_cells(fraction, width);
    format!(
        "{}{}",
        BLOCK_FULL
            .to_string()
            .repeat(filled)
            .truecolor(color.0, color.1, color.2),
        BLOCK_LIGHT
            .to_string()
            .repeat(width - filled)
            .truecolor(60, 60, 60)
    )
}

fn filled_cells(fraction: f64, width: usize) -> usize {
    let f = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    ((f * width as f64).round() as usize).min(width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn score(name: &str, acc: f64, auc: f64, time: Option<f64>) -> ModelScore {
        ModelScore {
            name: name.to_string(),
            accuracy: acc,
            roc_auc: auc,
            training_time_secs: time,
        }
    }

    fn sample_report() -> EvaluationReport {
        let y = array![0.0, 0.0, 1.0, 1.0];
        let p = array![0.0, 0.0, 1.0, 0.0];
        let names = vec!["Benign".to_string(), "Malignant".to_string()];
        EvaluationReport {
            created_at: Utc::now(),
            random_seed: 42,
            class_mapping: vec![
                ClassMapping {
                    label: "B".to_string(),
                    code: 0,
                    display_name: "Benign".to_string(),
                },
                ClassMapping {
                    label: "M".to_string(),
                    code: 1,
                    display_name: "Malignant".to_string(),
                },
            ],
            split: SplitSummary::from_labels(&array![0.0, 1.0, 0.0], &y, 2),
            feature_names: vec!["radius_mean".to_string()],
            models: vec![
                score("Logistic Regression", 0.95, 0.99, Some(0.01)),
                score("SVM", 0.5, 0.5, Some(0.2)),
            ],
            ensemble: score("Ensemble", 0.9737, 0.99604, None),
            classification_report: ClassificationReport::compute(&y, &p, &names).unwrap(),
        }
    }

    #[test]
    fn test_model_score_from_proba() {
        let proba = array![[0.9, 0.1], [0.3, 0.7], [0.6, 0.4], [0.2, 0.8]];
        let y = array![0.0, 1.0, 1.0, 1.0];
        let s = ModelScore::from_proba("LR", &proba, &y, Some(1.0)).unwrap();
        assert!((s.accuracy - 0.75).abs() < 1e-12);
        assert!((s.roc_auc - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_model_score_rejects_wrong_width() {
        let proba = array![[1.0], [0.0]];
        assert!(ModelScore::from_proba("x", &proba, &array![0.0, 1.0], None).is_err());
    }

    #[test]
    fn test_performance_summary_format() {
        let text = sample_report().performance_summary();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], RULE);
        assert_eq!(lines[1], "      PERFORMANCE SUMMARY");
        assert_eq!(lines[3], " Ensemble Model Accuracy: 97.37%");
        assert_eq!(lines[4], "Ensemble Model ROC-AUC: 0.9960");
        assert_eq!(lines[5], RULE);
    }

    #[test]
    fn test_summary_table_lists_every_model() {
        let table = sample_report().summary_table();
        assert!(table.contains("Logistic Regression"));
        assert!(table.contains("95.00%"));
        assert!(table.contains("Ensemble"));
        assert_eq!(table.lines().count(), 2 + 3);
    }

    #[test]
    fn test_block_bar() {
        assert_eq!(build_block_bar(0.5, 4), "██░░");
        assert_eq!(build_block_bar(1.7, 3), "███");
        assert_eq!(build_block_bar(f64::NAN, 2), "░░");
    }

    #[test]
    fn test_bar_chart_has_two_bars_per_model() {
        let chart = sample_report().bar_chart(20);
        assert!(chart.contains("SVM"));
        // Legend plus two rows for each of three entries
        assert_eq!(chart.lines().count(), 1 + 2 * 3);
    }

    #[test]
    fn test_split_summary_counts() {
        let s = SplitSummary::from_labels(&array![0.0, 1.0, 0.0], &array![1.0], 2);
        assert_eq!(s.train_class_counts, vec![2, 1]);
        assert_eq!(s.test_class_counts, vec![0, 1]);
    }

    #[test]
    fn test_json_roundtrip() {
        let file = tempfile::NamedTempFile::with_suffix(".json").unwrap();
        let report = sample_report();
        report.write_json(file.path()).unwrap();

        let text = std::fs::read_to_string(file.path()).unwrap();
        let back: EvaluationReport = serde_json::from_str(&text).unwrap();
        assert_eq!(back.models.len(), 2);
        assert_eq!(back.class_mapping[1].label, "M");
        assert_eq!(back.random_seed, 42);
    }
}
