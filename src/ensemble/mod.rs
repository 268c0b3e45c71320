//! Ensemble methods module
//!
//! Voting ensembles over an already-fitted model bank. Soft voting averages
//! member probabilities; hard voting takes a weighted majority of labels.

mod voting;

pub use voting::{Ensemble, VotingClassifier, VotingStrategy};
