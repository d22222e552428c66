//! Synthetic labelled training set
//!
//! Examples are drawn from uniform feature distributions and labelled by a
//! hand-tuned power heuristic. They only train the classifier and never describe
//! the fixture being predicted.

use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::features::match_repr::HOME_ADVANTAGE;
use crate::features::MatchFeatures;
use crate::Outcome;

/// Power difference above which the home side wins
pub const HOME_WIN_THRESHOLD: f64 = 0.22;
/// Power difference below which the away side wins
pub const AWAY_WIN_THRESHOLD: f64 = -0.18;
/// Half-width of the uniform label noise
pub const NOISE_HALF_WIDTH: f64 = 0.125;

/// One labelled training example
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingExample {
    pub features: MatchFeatures,
    pub outcome: Outcome,
}

/// Per-class example counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelCounts {
    pub home_wins: usize,
    pub draws: usize,
    pub away_wins: usize,
}

impl LabelCounts {
    pub fn from_examples(examples: &[TrainingExample]) -> Self {
        let mut counts = LabelCounts::default();
        for example in examples {
            match example.outcome {
                Outcome::HomeWin => counts.home_wins += 1,
                Outcome::Draw => counts.draws += 1,
                Outcome::AwayWin => counts.away_wins += 1,
            }
        }
        counts
    }

    /// All three classes are present
    pub fn is_complete(&self) -> bool {
        self.home_wins > 0 && self.draws > 0 && self.away_wins > 0
    }
}

/// Uniform draw in [lo, hi)
fn uniform(rng: &mut StdRng, lo: f64, hi: f64) -> f64 {
    lo + rng.gen::<f64>() * (hi - lo)
}

/// Draw one feature vector from the training distributions
pub fn sample_features(rng: &mut StdRng) -> MatchFeatures {
    MatchFeatures {
        strength: uniform(rng, 0.3, 1.0) as f32,
        opponent_strength: uniform(rng, 0.3, 1.0) as f32,
        form: uniform(rng, 0.0, 1.0) as f32,
        goal_diff: uniform(rng, -1.0, 1.0) as f32,
        head_to_head: uniform(rng, 0.0, 1.0) as f32,
        home_advantage: HOME_ADVANTAGE,
        recent_goals_balance: uniform(rng, -2.0, 2.0) as f32,
        win_streak: uniform(rng, 0.0, 1.0) as f32,
        clean_sheet_rate: uniform(rng, 0.0, 0.7) as f32,
        rest_advantage: uniform(rng, -1.0, 1.0) as f32,
        venue_form_diff: uniform(rng, -1.0, 1.0) as f32,
        attack_strength: uniform(rng, 0.3, 1.0) as f32,
        defense_strength: uniform(rng, 0.3, 1.0) as f32,
        points_per_game_diff: uniform(rng, -0.5, 0.5) as f32,
    }
}

/// Home and away power scores for a feature vector
///
/// Differentials count for whichever side they favour.
pub fn power_scores(f: &MatchFeatures) -> (f64, f64) {
    let v = f.to_array().map(|x| x as f64);
    let [hs, aws, form, gd, h2h, ha, rgb, ws, cs, rest, vfd, att, def, ppg] = v;
    let pos = |x: f64| x.max(0.0);
    let neg = |x: f64| (-x).max(0.0);

    let home = hs * 0.20
        + form * 0.15
        + pos(gd) * 0.10
        + h2h * 0.08
        + ha
        + pos(rgb) * 0.05
        + ws * 0.08
        + cs * 0.05
        + pos(rest) * 0.03
        + pos(vfd) * 0.04
        + att * 0.10
        + def * 0.08
        + pos(ppg) * 0.04;

    let away = aws * 0.20
        + (1.0 - form) * 0.12
        + neg(gd) * 0.10
        + (1.0 - h2h) * 0.08
        + neg(rgb) * 0.05
        + (1.0 - ws) * 0.05
        + (1.0 - cs) * 0.03
        + neg(rest) * 0.03
        + neg(vfd) * 0.04
        + (1.0 - att) * 0.08
        + (1.0 - def) * 0.06
        + neg(ppg) * 0.04;

    (home, away)
}

/// Label for a noisy power difference (thresholds favour the home side)
pub fn label_for(power_diff: f64) -> Outcome {
    if power_diff > HOME_WIN_THRESHOLD {
        Outcome::HomeWin
    } else if power_diff < AWAY_WIN_THRESHOLD {
        Outcome::AwayWin
    } else {
        Outcome::Draw
    }
}

/// Draw `samples` independent labelled examples, in generation order
pub fn labelled_examples(samples: usize, rng: &mut StdRng) -> Vec<TrainingExample> {
    (0..samples)
        .map(|_| {
            let features = sample_features(rng);
            let (home, away) = power_scores(&features);
            let noise = (rng.gen::<f64>() - 0.5) * 2.0 * NOISE_HALF_WIDTH;
            TrainingExample {
                features,
                outcome: label_for(home - away + noise),
            }
        })
        .collect()
}

/// Generate `samples` independent labelled examples, then shuffle them
pub fn generate_training_set(samples: usize, rng: &mut StdRng) -> Vec<TrainingExample> {
    let mut examples = labelled_examples(samples, rng);

    // Features and labels travel together, so one permutation covers both
    examples.shuffle(rng);

    let counts = LabelCounts::from_examples(&examples);
    log::debug!(
        "Generated {} training examples: home={}, draw={}, away={}",
        examples.len(),
        counts.home_wins,
        counts.draws,
        counts.away_wins
    );

    examples
}

/// In-memory dataset of training examples
#[derive(Debug, Clone, Default)]
pub struct OutcomeDataset {
    examples: Vec<TrainingExample>,
}

impl OutcomeDataset {
    pub fn new(examples: Vec<TrainingExample>) -> Self {
        OutcomeDataset { examples }
    }

    /// Generate a fresh shuffled synthetic dataset
    pub fn synthetic(samples: usize, rng: &mut StdRng) -> Self {
        Self::new(generate_training_set(samples, rng))
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn examples(&self) -> &[TrainingExample] {
        &self.examples
    }

    pub fn label_counts(&self) -> LabelCounts {
        LabelCounts::from_examples(&self.examples)
    }

    /// Hold out the last `validation_len` examples, preserving order
    pub fn split_validation(mut self, validation_len: usize) -> (Self, Self) {
        let split_idx = self.examples.len().saturating_sub(validation_len);
        let val_examples = self.examples.split_off(split_idx);
        (self, OutcomeDataset::new(val_examples))
    }
}

impl Dataset<TrainingExample> for OutcomeDataset {
    fn get(&self, index: usize) -> Option<TrainingExample> {
        self.examples.get(index).copied()
    }

    fn len(&self) -> usize {
        self.examples.len()
    }
}

/// Batch of training examples
#[derive(Debug, Clone)]
pub struct OutcomeBatch<B: Backend> {
    /// Feature vectors: [batch, 14]
    pub features: Tensor<B, 2>,
    /// One-hot outcomes: [batch, 3]
    pub targets: Tensor<B, 2>,
}

/// Batcher for creating training batches
#[derive(Clone)]
pub struct OutcomeBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> OutcomeBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        OutcomeBatcher { device }
    }
}

impl<B: Backend> burn::data::dataloader::batcher::Batcher<B, TrainingExample, OutcomeBatch<B>>
    for OutcomeBatcher<B>
{
    fn batch(&self, items: Vec<TrainingExample>, _device: &B::Device) -> OutcomeBatch<B> {
        let batch_size = items.len();
        let mut feature_data = Vec::with_capacity(batch_size * MatchFeatures::DIM);
        let mut target_data = Vec::with_capacity(batch_size * Outcome::COUNT);

        for example in &items {
            feature_data.extend(example.features.to_array());
            target_data.extend(example.outcome.one_hot());
        }

        let features = Tensor::<B, 1>::from_floats(feature_data.as_slice(), &self.device)
            .reshape([batch_size, MatchFeatures::DIM]);
        let targets = Tensor::<B, 1>::from_floats(target_data.as_slice(), &self.device)
            .reshape([batch_size, Outcome::COUNT]);

        OutcomeBatch { features, targets }
    }
}
