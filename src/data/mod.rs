//! Data generation
//!
//! Synthetic team profiles and the synthetic labelled training set.

pub mod dataset;
pub mod synthetic;

pub use dataset::{OutcomeDataset, TrainingExample};
pub use synthetic::{ProfileSource, SyntheticProfiles};
