//! Neural network architecture

pub mod mlp;

pub use mlp::{OutcomeNet, OutcomeNetConfig};
