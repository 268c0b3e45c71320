//! Model evaluation
//!
//! Accuracy, rank-based ROC-AUC and per-class reports computed on the held-out
//! partition, plus the terminal and JSON renderings of those scores.

pub mod metrics;
mod report;

pub use metrics::{accuracy, roc_auc, ClassMetrics, ClassificationReport};
pub use report::{
    build_block_bar, ClassMapping, EvaluationReport, ModelScore, SplitSummary,
};
