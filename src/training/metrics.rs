//! Training metrics and evaluation

use std::fmt;

/// Metrics accumulated during training/evaluation
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    /// Sum of batch losses (cross-entropy + L2)
    pub total_loss: f64,
    /// Number of correctly classified examples
    pub correct: usize,
    /// Total examples seen
    pub total_predictions: usize,
    /// Number of batches accumulated
    pub batch_count: usize,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update metrics with a batch result
    pub fn update(&mut self, loss: f32, correct: usize, batch_size: usize) {
        self.total_loss += loss as f64;
        self.correct += correct;
        self.total_predictions += batch_size;
        self.batch_count += 1;
    }

    /// Get average loss per batch
    pub fn avg_loss(&self) -> f64 {
        if self.batch_count == 0 {
            0.0
        } else {
            self.total_loss / self.batch_count as f64
        }
    }

    /// Get classification accuracy
    pub fn accuracy(&self) -> f64 {
        if self.total_predictions == 0 {
            0.0
        } else {
            self.correct as f64 / self.total_predictions as f64
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loss: {:.4} | Acc: {:.1}%",
            self.avg_loss(),
            self.accuracy() * 100.0
        )
    }
}

/// Count rows whose predicted class matches the one-hot target
pub fn count_correct(probs: &[f32], targets: &[f32], classes: usize) -> usize {
    probs
        .chunks(classes)
        .zip(targets.chunks(classes))
        .filter(|(p, t)| argmax(p) == argmax(t))
        .count()
}

/// Index of the largest value (first one on ties)
pub fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, max), (i, v)| {
            if *v > max {
                (i, *v)
            } else {
                (best, max)
            }
        })
        .0
}

/// Training history for tracking progress
#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    pub train_losses: Vec<f64>,
    pub val_losses: Vec<f64>,
    pub train_accuracies: Vec<f64>,
    pub val_accuracies: Vec<f64>,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record metrics for an epoch
    pub fn record_epoch(&mut self, train: &Metrics, val: &Metrics) {
        self.train_losses.push(train.avg_loss());
        self.val_losses.push(val.avg_loss());
        self.train_accuracies.push(train.accuracy());
        self.val_accuracies.push(val.accuracy());
    }

    pub fn epochs_completed(&self) -> usize {
        self.train_losses.len()
    }

    /// Training accuracy of the last completed epoch (0 before any epoch)
    pub fn final_train_accuracy(&self) -> f64 {
        self.train_accuracies.last().copied().unwrap_or(0.0)
    }

    /// Validation accuracy of the last completed epoch, falling back to training accuracy
    pub fn final_val_accuracy(&self) -> f64 {
        self.val_accuracies
            .last()
            .copied()
            .unwrap_or_else(|| self.final_train_accuracy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), 1);
        assert_eq!(argmax(&[0.5, 0.5, 0.0]), 0);
        assert_eq!(argmax(&[0.0, 0.0, 1.0]), 2);
    }

    #[test]
    fn test_count_correct() {
        let probs = [0.6, 0.3, 0.1, 0.2, 0.2, 0.6, 0.1, 0.8, 0.1];
        let targets = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        assert_eq!(count_correct(&probs, &targets, 3), 2);
    }

    #[test]
    fn test_metrics_averages() {
        let mut metrics = Metrics::new();
        assert_eq!(metrics.accuracy(), 0.0);

        metrics.update(1.0, 30, 64);
        metrics.update(0.5, 34, 36);
        assert!((metrics.avg_loss() - 0.75).abs() < 1e-12);
        assert!((metrics.accuracy() - 0.64).abs() < 1e-12);
    }

    #[test]
    fn test_history_final_values() {
        let mut history = TrainingHistory::new();
        assert_eq!(history.final_train_accuracy(), 0.0);
        assert_eq!(history.final_val_accuracy(), 0.0);

        let mut train = Metrics::new();
        train.update(0.9, 40, 100);
        let mut val = Metrics::new();
        val.update(0.8, 12, 20);
        history.record_epoch(&train, &val);

        assert_eq!(history.epochs_completed(), 1);
        assert!((history.final_train_accuracy() - 0.4).abs() < 1e-12);
        assert!((history.final_val_accuracy() - 0.6).abs() < 1e-12);
    }
}
