//! Outcome classifier
//!
//! Architecture: Input(14) → Dense(64) → ReLU → BatchNorm → Dropout(0.3)
//!                         → Dense(48) → ReLU → BatchNorm → Dropout(0.25)
//!                         → Dense(32) → ReLU → Dropout(0.2)
//!                         → Dense(16) → ReLU
//!                         → Dense(3)  → softmax over [home win, draw, away win]

use burn::module::{Module, Param};
use burn::nn::{
    BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Initializer, Linear, LinearConfig,
};
use burn::tensor::activation::{relu, softmax};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::features::MatchFeatures;
use crate::{ModelConfig, Outcome};

/// He-normal initialization for ReLU layers
fn he_normal() -> Initializer {
    Initializer::KaimingNormal {
        gain: std::f64::consts::SQRT_2,
        fan_out_only: false,
    }
}

/// Dense layer with `init` kernels and a zero bias
fn dense<B: Backend>(
    device: &B::Device,
    in_dim: usize,
    out_dim: usize,
    init: Initializer,
) -> Linear<B> {
    let mut linear = LinearConfig::new(in_dim, out_dim)
        .with_initializer(init)
        .init(device);
    linear.bias = Some(Param::from_tensor(Tensor::zeros([out_dim], device)));
    linear
}

/// Configuration for the outcome classifier
#[derive(Debug, Clone)]
pub struct OutcomeNetConfig {
    /// Input dimension (feature slots)
    pub input_dim: usize,
    /// Widths of the four hidden layers
    pub hidden_dims: [usize; 4],
    /// Dropout after the first three hidden layers
    pub dropout: [f64; 3],
}

impl Default for OutcomeNetConfig {
    fn default() -> Self {
        Self::from_model_config(&ModelConfig::default())
    }
}

impl OutcomeNetConfig {
    pub fn from_model_config(config: &ModelConfig) -> Self {
        OutcomeNetConfig {
            input_dim: MatchFeatures::DIM,
            hidden_dims: config.hidden_dims,
            dropout: config.dropout,
        }
    }
}

/// Dense → ReLU → BatchNorm → Dropout
#[derive(Module, Debug)]
pub struct NormalizedBlock<B: Backend> {
    linear: Linear<B>,
    norm: BatchNorm<B, 1>,
    dropout: Dropout,
}

impl<B: Backend> NormalizedBlock<B> {
    pub fn new(device: &B::Device, in_dim: usize, out_dim: usize, dropout: f64) -> Self {
        NormalizedBlock {
            linear: dense(device, in_dim, out_dim, he_normal()),
            // Keras-style running averages: keep 99% of the previous estimate
            norm: BatchNormConfig::new(out_dim)
                .with_momentum(0.01)
                .with_epsilon(1e-3)
                .init(device),
            dropout: DropoutConfig::new(dropout).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.linear.forward(x));
        // BatchNorm expects [batch, channels, length]
        let x = self.norm.forward(x.unsqueeze_dim::<3>(2)).squeeze::<2>(2);
        self.dropout.forward(x)
    }

    /// Sum of squared kernel weights (bias excluded)
    pub fn kernel_sq_norm(&self) -> Tensor<B, 1> {
        self.linear.weight.val().powf_scalar(2.0).sum()
    }
}

/// Feed-forward classifier over the 14 feature slots
#[derive(Module, Debug)]
pub struct OutcomeNet<B: Backend> {
    block1: NormalizedBlock<B>,
    block2: NormalizedBlock<B>,
    hidden3: Linear<B>,
    dropout3: Dropout,
    hidden4: Linear<B>,
    output: Linear<B>,
}

impl<B: Backend> OutcomeNet<B> {
    /// Create a freshly initialized classifier
    pub fn new(device: &B::Device, config: &OutcomeNetConfig) -> Self {
        let [h1, h2, h3, h4] = config.hidden_dims;
        let [d1, d2, d3] = config.dropout;

        OutcomeNet {
            block1: NormalizedBlock::new(device, config.input_dim, h1, d1),
            block2: NormalizedBlock::new(device, h1, h2, d2),
            hidden3: dense(device, h2, h3, he_normal()),
            dropout3: DropoutConfig::new(d3).init(),
            hidden4: dense(device, h3, h4, he_normal()),
            output: dense(device, h4, Outcome::COUNT, Initializer::XavierUniform { gain: 1.0 }),
        }
    }

    /// Forward pass returning logits [batch, 3]
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.block1.forward(features);
        let x = self.block2.forward(x);
        let x = self.dropout3.forward(relu(self.hidden3.forward(x)));
        let x = relu(self.hidden4.forward(x));
        self.output.forward(x)
    }

    /// Forward pass returning class probabilities [batch, 3]
    pub fn forward_probs(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        softmax(self.forward(features), 1)
    }

    /// L2 penalty over the regularized kernels (the two normalized blocks)
    pub fn l2_penalty(&self, weight: f64) -> Tensor<B, 1> {
        (self.block1.kernel_sq_norm() + self.block2.kernel_sq_norm()) * weight
    }
}
