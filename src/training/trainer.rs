//! Training loop and loss computation

use std::panic::{self, AssertUnwindSafe};

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataloader::DataLoaderBuilder;
use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::tensor::activation::softmax;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Tensor};
use rand::rngs::StdRng;

use crate::data::dataset::{OutcomeBatch, OutcomeBatcher, OutcomeDataset};
use crate::model::{OutcomeNet, OutcomeNetConfig};
use crate::training::metrics::{count_correct, Metrics, TrainingHistory};
use crate::{panic_message, CancelFlag, Config, MatchError, Outcome, Result, TrainingConfig};

/// Clamp applied to probabilities before the log
const PROB_EPSILON: f32 = 1e-7;

/// Categorical cross-entropy plus L2 on the normalized-block kernels
pub struct OutcomeLoss {
    pub l2_penalty: f64,
}

impl OutcomeLoss {
    pub fn new(config: &TrainingConfig) -> Self {
        OutcomeLoss {
            l2_penalty: config.l2_penalty,
        }
    }

    /// Compute loss and return (total, cross_entropy)
    pub fn forward<B: Backend>(
        &self,
        model: &OutcomeNet<B>,
        logits: Tensor<B, 2>,
        targets: Tensor<B, 2>,
    ) -> (Tensor<B, 1>, Tensor<B, 1>) {
        let cross_entropy = categorical_cross_entropy(logits, targets);
        let total = cross_entropy.clone() + model.l2_penalty(self.l2_penalty);
        (total, cross_entropy)
    }
}

/// Mean categorical cross-entropy of softmax(logits) against one-hot targets
pub fn categorical_cross_entropy<B: Backend>(
    logits: Tensor<B, 2>,
    targets: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let probs = softmax(logits, 1).clamp(PROB_EPSILON, 1.0 - PROB_EPSILON);
    (targets * probs.log()).sum_dim(1).neg().mean()
}

/// Trainer for the outcome classifier
pub struct Trainer<B: AutodiffBackend> {
    model: OutcomeNet<B>,
    optimizer: OptimizerAdaptor<Adam, OutcomeNet<B>, B>,
    loss_fn: OutcomeLoss,
    config: TrainingConfig,
    device: B::Device,
    history: TrainingHistory,
}

impl<B: AutodiffBackend> Trainer<B> {
    /// Create a new trainer
    pub fn new(model: OutcomeNet<B>, config: TrainingConfig, device: B::Device) -> Self {
        let optimizer = AdamConfig::new()
            .with_beta_1(config.beta_1)
            .with_beta_2(config.beta_2)
            .with_epsilon(config.epsilon)
            .init();

        Trainer {
            model,
            optimizer,
            loss_fn: OutcomeLoss::new(&config),
            config,
            device,
            history: TrainingHistory::new(),
        }
    }

    /// Fit the model in place
    ///
    /// Panics raised by the backend are caught and reported as
    /// [`MatchError::Training`]; the model keeps whatever weights it held when
    /// the failure happened.
    pub fn fit(
        &mut self,
        train_dataset: OutcomeDataset,
        val_dataset: OutcomeDataset,
        cancel: &CancelFlag,
    ) -> Result<()> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_epochs(train_dataset, val_dataset, cancel)
        }));

        match outcome {
            Ok(result) => result,
            Err(payload) => Err(MatchError::Training(panic_message(payload))),
        }
    }

    fn run_epochs(
        &mut self,
        train_dataset: OutcomeDataset,
        val_dataset: OutcomeDataset,
        cancel: &CancelFlag,
    ) -> Result<()> {
        // Already shuffled by the generator; batches keep dataset order
        let train_loader = DataLoaderBuilder::new(OutcomeBatcher::<B>::new(self.device.clone()))
            .batch_size(self.config.batch_size)
            .build(train_dataset);

        let epochs = self.config.epochs;
        log::info!("Starting training for {} epochs", epochs);

        for epoch in 0..epochs {
            cancel.check()?;

            let train_metrics = self.train_epoch(train_loader.iter(), cancel)?;
            let val_metrics = self.validate_epoch(&val_dataset);

            self.history.record_epoch(&train_metrics, &val_metrics);

            if epoch % self.config.log_every.max(1) == 0 || epoch + 1 == epochs {
                log::info!(
                    "Epoch {}/{}: Train: {} | Val: {}",
                    epoch + 1,
                    epochs,
                    train_metrics,
                    val_metrics
                );
            }
        }

        log::info!(
            "Training completed: accuracy {:.1}% training, {:.1}% validation",
            self.history.final_train_accuracy() * 100.0,
            self.history.final_val_accuracy() * 100.0
        );

        Ok(())
    }

    /// Train one epoch
    fn train_epoch(
        &mut self,
        loader: impl Iterator<Item = OutcomeBatch<B>>,
        cancel: &CancelFlag,
    ) -> Result<Metrics> {
        let mut metrics = Metrics::new();

        for batch in loader {
            cancel.check()?;
            let batch_size = batch.features.dims()[0];

            let logits = self.model.forward(batch.features);
            let correct = batch_correct(logits.clone(), batch.targets.clone());

            let (total_loss, _) = self.loss_fn.forward(&self.model, logits, batch.targets);
            let loss_val: f32 = total_loss.clone().into_scalar().elem();
            if !loss_val.is_finite() {
                return Err(MatchError::Training(format!(
                    "non-finite loss at batch {}",
                    metrics.batch_count + 1
                )));
            }

            // Backward pass
            let grads = total_loss.backward();
            let grads = GradientsParams::from_grads(grads, &self.model);

            // Update weights
            self.model = self
                .optimizer
                .step(self.config.learning_rate, self.model.clone(), grads);

            metrics.update(loss_val, correct, batch_size);
        }

        Ok(metrics)
    }

    /// Evaluate the held-out tail in a single batch, in inference mode
    fn validate_epoch(&self, val_dataset: &OutcomeDataset) -> Metrics {
        let mut metrics = Metrics::new();
        if val_dataset.is_empty() {
            return metrics;
        }

        let model = self.model.valid();
        let batcher = OutcomeBatcher::<B::InnerBackend>::new(self.device.clone());
        let batch = batcher.batch(val_dataset.examples().to_vec(), &self.device);
        let batch_size = batch.features.dims()[0];

        let logits = model.forward(batch.features);
        let correct = batch_correct(logits.clone(), batch.targets.clone());
        let (total_loss, _) = self.loss_fn.forward(&model, logits, batch.targets);
        let loss_val: f32 = total_loss.into_scalar().elem();

        metrics.update(loss_val, correct, batch_size);
        metrics
    }

    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    /// Get the current model
    pub fn model(&self) -> &OutcomeNet<B> {
        &self.model
    }

    /// Get the model, consuming the trainer
    pub fn into_model(self) -> OutcomeNet<B> {
        self.model
    }
}

fn batch_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 2>) -> usize {
    let probs: Vec<f32> = softmax(logits, 1).into_data().iter::<f32>().collect();
    let targets: Vec<f32> = targets.into_data().iter::<f32>().collect();
    count_correct(&probs, &targets, Outcome::COUNT)
}

/// Classifier ready for inference, with the accuracies reached while fitting
#[derive(Debug)]
pub struct TrainedClassifier<B: Backend> {
    pub model: OutcomeNet<B>,
    pub train_accuracy: f64,
    pub val_accuracy: f64,
    pub epochs_completed: usize,
    /// False when fitting failed and the model holds best-effort weights
    pub trained: bool,
}

/// Source of a classifier for one prediction request
pub trait ClassifierTrainer<B: AutodiffBackend> {
    fn train_classifier(
        &self,
        device: &B::Device,
        rng: &mut StdRng,
        cancel: &CancelFlag,
    ) -> Result<TrainedClassifier<B::InnerBackend>>;
}

/// Fits a fresh classifier on a fresh synthetic set for every request
#[derive(Debug, Clone)]
pub struct RetrainPerRequest {
    training: TrainingConfig,
    model: OutcomeNetConfig,
}

impl RetrainPerRequest {
    pub fn new(config: &Config) -> Self {
        RetrainPerRequest {
            training: config.training.clone(),
            model: OutcomeNetConfig::from_model_config(&config.model),
        }
    }
}

impl<B: AutodiffBackend> ClassifierTrainer<B> for RetrainPerRequest {
    fn train_classifier(
        &self,
        device: &B::Device,
        rng: &mut StdRng,
        cancel: &CancelFlag,
    ) -> Result<TrainedClassifier<B::InnerBackend>> {
        cancel.check()?;

        let dataset = OutcomeDataset::synthetic(self.training.samples, rng);
        let (train, val) = dataset.split_validation(self.training.validation_len());
        log::debug!(
            "Training on {} examples, validating on {}",
            train.len(),
            val.len()
        );

        let model = OutcomeNet::<B>::new(device, &self.model);
        let mut trainer = Trainer::new(model, self.training.clone(), device.clone());

        let trained = match trainer.fit(train, val, cancel) {
            Ok(()) => true,
            Err(MatchError::Training(msg)) => {
                log::warn!("Training failed, predicting with current weights: {}", msg);
                false
            }
            Err(e) => return Err(e),
        };

        let history = trainer.history().clone();
        Ok(TrainedClassifier {
            model: trainer.into_model().valid(),
            train_accuracy: history.final_train_accuracy(),
            val_accuracy: history.final_val_accuracy(),
            epochs_completed: history.epochs_completed(),
            trained,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use rand::SeedableRng;

    type TestBackend = Autodiff<NdArray<f32>>;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.training.samples = 200;
        config.training.epochs = 3;
        config.training.batch_size = 32;
        config
    }

    #[test]
    fn test_cross_entropy_uniform_logits() {
        let device = Default::default();
        let logits = Tensor::<NdArray<f32>, 2>::zeros([4, 3], &device);
        let targets = Tensor::<NdArray<f32>, 1>::from_floats(
            [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
            &device,
        )
        .reshape([4, 3]);

        let loss: f32 = categorical_cross_entropy(logits, targets).into_scalar();
        assert!((loss - 3.0f32.ln()).abs() < 1e-5, "loss = {}", loss);
    }

    #[test]
    fn test_cross_entropy_rewards_confident_correct() {
        let device = Default::default();
        let targets =
            Tensor::<NdArray<f32>, 1>::from_floats([0.0, 1.0, 0.0], &device).reshape([1, 3]);
        let good = Tensor::<NdArray<f32>, 1>::from_floats([0.0, 8.0, 0.0], &device).reshape([1, 3]);
        let bad = Tensor::<NdArray<f32>, 1>::from_floats([8.0, 0.0, 0.0], &device).reshape([1, 3]);

        let good_loss: f32 = categorical_cross_entropy(good, targets.clone()).into_scalar();
        let bad_loss: f32 = categorical_cross_entropy(bad, targets).into_scalar();
        assert!(good_loss < 0.01);
        assert!(bad_loss > 5.0);
    }

    #[test]
    fn test_fit_records_every_epoch() {
        let config = small_config();
        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(11);

        let dataset = OutcomeDataset::synthetic(config.training.samples, &mut rng);
        let (train, val) = dataset.split_validation(config.training.validation_len());
        assert_eq!(val.len(), 40);

        let model = OutcomeNet::<TestBackend>::new(&device, &OutcomeNetConfig::default());
        let mut trainer = Trainer::new(model, config.training.clone(), device);
        trainer
            .fit(train, val, &CancelFlag::new())
            .expect("training should succeed");

        let history = trainer.history();
        assert_eq!(history.epochs_completed(), 3);
        assert!(history.train_losses.iter().all(|l| l.is_finite() && *l > 0.0));
        assert!(history.val_losses.iter().all(|l| l.is_finite() && *l > 0.0));
        for acc in history.train_accuracies.iter().chain(&history.val_accuracies) {
            assert!((0.0..=1.0).contains(acc));
        }
    }

    #[test]
    fn test_fit_stops_when_cancelled() {
        let config = small_config();
        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(12);
        let (train, val) = OutcomeDataset::synthetic(100, &mut rng).split_validation(20);

        let cancel = CancelFlag::new();
        cancel.cancel();

        let model = OutcomeNet::<TestBackend>::new(&device, &OutcomeNetConfig::default());
        let mut trainer = Trainer::new(model, config.training, device);
        let result = trainer.fit(train, val, &cancel);
        assert!(matches!(result, Err(MatchError::Cancelled)));
        assert_eq!(trainer.history().epochs_completed(), 0);
    }

    #[test]
    fn test_retrain_per_request() {
        let config = small_config();
        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(13);

        let classifier = <RetrainPerRequest as ClassifierTrainer<TestBackend>>::train_classifier(
            &RetrainPerRequest::new(&config),
            &device,
            &mut rng,
            &CancelFlag::new(),
        )
        .expect("classifier");

        assert!(classifier.trained);
        assert_eq!(classifier.epochs_completed, 3);
        assert!((0.0..=1.0).contains(&classifier.train_accuracy));
        assert!((0.0..=1.0).contains(&classifier.val_accuracy));
    }

    #[test]
    fn test_fit_reports_non_finite_loss() {
        let mut config = small_config();
        config.training.learning_rate = 1e30;
        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(15);
        let (train, val) = OutcomeDataset::synthetic(200, &mut rng).split_validation(40);

        let model = OutcomeNet::<TestBackend>::new(&device, &OutcomeNetConfig::default());
        let mut trainer = Trainer::new(model, config.training, device);
        let result = trainer.fit(train, val, &CancelFlag::new());
        assert!(matches!(result, Err(MatchError::Training(_))), "{:?}", result);
        assert_eq!(trainer.history().epochs_completed(), 0);
    }

    #[test]
    fn test_retrain_recovers_from_failed_fit() {
        let mut config = small_config();
        config.training.learning_rate = 1e30;

        let classifier = <RetrainPerRequest as ClassifierTrainer<TestBackend>>::train_classifier(
            &RetrainPerRequest::new(&config),
            &Default::default(),
            &mut StdRng::seed_from_u64(16),
            &CancelFlag::new(),
        )
        .expect("failed fit still yields a classifier");

        assert!(!classifier.trained);
        assert_eq!(classifier.epochs_completed, 0);
        assert_eq!(classifier.train_accuracy, 0.0);
        assert_eq!(classifier.val_accuracy, 0.0);
    }

    #[test]
    fn test_retrain_propagates_cancellation() {
        let config = small_config();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let result = <RetrainPerRequest as ClassifierTrainer<TestBackend>>::train_classifier(
            &RetrainPerRequest::new(&config),
            &Default::default(),
            &mut StdRng::seed_from_u64(14),
            &cancel,
        );
        assert!(matches!(result, Err(MatchError::Cancelled)));
    }
}
