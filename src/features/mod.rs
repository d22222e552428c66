//! Feature extraction and encoding
//!
//! Converts team profiles into model-ready features.

pub mod match_repr;
pub mod strength;

pub use match_repr::MatchFeatures;
pub use strength::team_strength;
