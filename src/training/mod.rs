//! Model training module
//!
//! Provides the base learners of the diagnosis ensemble:
//! - L2-regularized logistic regression
//! - CART decision trees
//! - Random forests
//! - Gradient boosting
//! - RBF support vector machines with calibrated probabilities

mod config;
mod engine;
mod models;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod linear_models;
pub mod random_forest;
pub mod svm;

pub use config::{ModelBankConfig, ModelKind, TreeConfig};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use engine::{FittedModel, ModelBank, TrainedModel};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use linear_models::LogisticRegression;
pub use models::{argmax_rows, binary_proba, Classifier};
pub use random_forest::{MaxFeatures, RandomForest};
pub use svm::{Gamma, KernelType, SVMClassifier, SVMConfig};
