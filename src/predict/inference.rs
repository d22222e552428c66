//! Model inference for predictions

use std::panic;

use burn::backend::{Autodiff, NdArray};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::Tensor;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::data::{ProfileSource, SyntheticProfiles};
use crate::features::{team_strength, MatchFeatures};
use crate::model::OutcomeNet;
use crate::predict::report::{PredictionAssembler, PredictionInputs};
use crate::predict::score::ScoreSampler;
use crate::training::{ClassifierTrainer, RetrainPerRequest, TrainedClassifier};
use crate::{
    panic_message, CancelFlag, Config, MatchError, Outcome, PredictionData, Probabilities, Result,
    Side,
};

/// Inference backend
pub type DefaultBackend = NdArray<f32>;
/// Backend used while fitting the classifier
pub type TrainingBackend = Autodiff<DefaultBackend>;

/// Softmax output for one fixture, in [home win, draw, away win] order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeProbabilities {
    pub raw: [f32; Outcome::COUNT],
}

impl OutcomeProbabilities {
    /// Rounded percentages (not renormalized to sum to 100)
    pub fn percentages(&self) -> Probabilities {
        Probabilities {
            home: to_percent(self.raw[Outcome::HomeWin.index()]),
            draw: to_percent(self.raw[Outcome::Draw.index()]),
            away: to_percent(self.raw[Outcome::AwayWin.index()]),
        }
    }

    pub fn most_likely(&self) -> Outcome {
        let idx = crate::training::metrics::argmax(&self.raw);
        Outcome::from_index(idx).unwrap_or(Outcome::Draw)
    }
}

fn to_percent(p: f32) -> u8 {
    if p.is_finite() {
        (p * 100.0).round().clamp(0.0, 100.0) as u8
    } else {
        0
    }
}

/// Predictor for making match predictions
pub struct Predictor<B: Backend> {
    model: OutcomeNet<B>,
    device: B::Device,
}

impl<B: Backend> Predictor<B> {
    /// Create a new predictor
    pub fn new(model: OutcomeNet<B>, device: B::Device) -> Self {
        Predictor { model, device }
    }

    /// One forward pass over a single feature vector
    pub fn predict(&self, features: &MatchFeatures) -> OutcomeProbabilities {
        let input = Tensor::<B, 1>::from_floats(features.to_vec().as_slice(), &self.device)
            .reshape([1, MatchFeatures::DIM]);

        let probs = self.model.forward_probs(input).into_data();

        let mut raw = [0.0f32; Outcome::COUNT];
        for (slot, value) in raw.iter_mut().zip(probs.iter::<f32>()) {
            *slot = value;
        }
        OutcomeProbabilities { raw }
    }
}

/// Request pipeline: profiles → features → classifier → probabilities → score
///
/// Every call to [`Engine::predict`] generates its own training set and
/// classifier; nothing but configuration survives between calls.
pub struct Engine<B: AutodiffBackend = TrainingBackend> {
    config: Config,
    device: B::Device,
    profiles: Box<dyn ProfileSource>,
    trainer: Box<dyn ClassifierTrainer<B>>,
    sampler: ScoreSampler,
    assembler: PredictionAssembler,
}

impl<B: AutodiffBackend> Engine<B> {
    /// Validate the configuration and prepare the numeric backend
    pub fn new(config: Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| MatchError::Initialization(e.to_string()))?;

        let seed = config.engine.seed;
        let device = panic::catch_unwind(move || {
            let device = B::Device::default();
            if let Some(seed) = seed {
                B::seed(seed);
            }
            device
        })
        .map_err(|payload| MatchError::Initialization(panic_message(payload)))?;

        log::debug!("Numeric backend ready on {:?}", device);

        Ok(Engine {
            trainer: Box::new(RetrainPerRequest::new(&config)),
            profiles: Box::new(SyntheticProfiles::new()),
            sampler: ScoreSampler::new(),
            assembler: PredictionAssembler::new(&config),
            config,
            device,
        })
    }

    /// Replace the team data source
    pub fn with_profiles(mut self, profiles: Box<dyn ProfileSource>) -> Self {
        self.profiles = profiles;
        self
    }

    /// Replace how the classifier is obtained
    pub fn with_trainer(mut self, trainer: Box<dyn ClassifierTrainer<B>>) -> Self {
        self.trainer = trainer;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn predict(&self, home_team: &str, away_team: &str, league: &str) -> Result<PredictionData> {
        self.predict_with_cancel(home_team, away_team, league, &CancelFlag::new())
    }

    /// Run the pipeline, checking `cancel` between stages and during training
    pub fn predict_with_cancel(
        &self,
        home_team: &str,
        away_team: &str,
        league: &str,
        cancel: &CancelFlag,
    ) -> Result<PredictionData> {
        let home_team = required_name(home_team, "home")?;
        let away_team = required_name(away_team, "away")?;
        cancel.check()?;

        log::info!("Predicting {} vs {} ({})", home_team, away_team, league);

        let mut rng = self.request_rng();
        let context = self
            .profiles
            .match_context(home_team, away_team, league, &mut rng);
        let features = MatchFeatures::from_context(&context, Side::Home);

        let classifier = self
            .trainer
            .train_classifier(&self.device, &mut rng, cancel)?;
        cancel.check()?;

        let TrainedClassifier {
            model,
            train_accuracy,
            val_accuracy,
            epochs_completed,
            trained,
        } = classifier;
        let predictor = Predictor::new(model, self.device.clone());
        let probabilities = predictor.predict(&features);
        let pct = probabilities.percentages();
        log::info!(
            "Probabilities: home {}%, draw {}%, away {}% ({})",
            pct.home,
            pct.draw,
            pct.away,
            probabilities.most_likely()
        );

        let score = self.sampler.sample(
            team_strength(&context.home),
            team_strength(&context.away),
            &pct,
            &mut rng,
        );

        Ok(self.assembler.assemble(&PredictionInputs {
            context: &context,
            probabilities: &probabilities,
            score,
            train_accuracy,
            val_accuracy,
            epochs_completed,
            trained,
        }))
    }

    fn request_rng(&self) -> StdRng {
        match self.config.engine.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

fn required_name<'a>(name: &'a str, side: &str) -> Result<&'a str> {
    let name = name.trim();
    if name.is_empty() {
        Err(MatchError::InvalidInput(format!("{} team name is required", side)))
    } else {
        Ok(name)
    }
}
