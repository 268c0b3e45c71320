//! Single-sample inference
//!
//! Collects one feature vector through a [`FeatureSource`] and turns the
//! ensemble output for it into a [`Diagnosis`].

mod diagnosis;
mod source;

pub use diagnosis::Diagnosis;
pub use source::{
    check_finite, parse_feature_value, FeatureSource, PromptFeatureSource, TerminalFeatureSource,
    DEFAULT_MAX_ATTEMPTS,
};
