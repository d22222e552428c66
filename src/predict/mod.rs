//! Prediction and inference
//!
//! Run the per-request pipeline and assemble the user-facing result.

pub mod inference;
pub mod report;
pub mod score;

pub use inference::{DefaultBackend, Engine, OutcomeProbabilities, Predictor, TrainingBackend};
pub use report::PredictionAssembler;
pub use score::{generate_score, ScoreSampler, Scoreline};
