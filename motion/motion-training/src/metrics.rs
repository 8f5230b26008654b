//! Training metrics and logging.

use serde::{Deserialize, Serialize};

/// Losses of a single optimizer step, read back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepMetrics {
    /// Total generator loss that was backpropagated.
    pub generator_loss: f32,

    /// Weighted critic loss, when critics are trained.
    pub critic_loss: Option<f32>,

    /// Weighted reconstruction part of the generator loss.
    pub reconstruction: f32,

    /// Weighted adversarial part of the generator loss.
    pub adversarial: f32,

    /// Unweighted divergence reward.
    pub divergence: f32,

    /// Largest generator gradient norm before clipping.
    pub grad_norm: f32,

    /// Frames the generator produced.
    pub frames: usize,
}

impl StepMetrics {
    /// Returns true if every loss is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.generator_loss.is_finite()
            && self.critic_loss.is_none_or(f32::is_finite)
            && self.grad_norm.is_finite()
    }
}

/// Metrics for a single training epoch.
///
/// # Example
///
/// ```
/// use motion_training::EpochMetrics;
///
/// let metrics = EpochMetrics::new(0, 0.5).with_critic_loss(0.25);
/// assert_eq!(metrics.epoch, 0);
/// assert_eq!(metrics.critic_loss, Some(0.25));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Epoch number (0-indexed).
    pub epoch: usize,

    /// Mean generator loss over the epoch's steps.
    pub generator_loss: f32,

    /// Mean critic loss, when critics are trained.
    pub critic_loss: Option<f32>,

    /// Mean weighted reconstruction loss.
    pub reconstruction: f32,

    /// Mean divergence reward.
    pub divergence: f32,

    /// Learning rate used.
    pub learning_rate: f64,

    /// Training time in seconds.
    pub train_time_secs: f32,

    /// Optimizer steps taken.
    pub steps: usize,

    /// Upper bound of the rollout length (recurrent backbone only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curriculum: Option<usize>,
}

impl EpochMetrics {
    /// Creates epoch metrics with the mean generator loss.
    #[must_use]
    pub const fn new(epoch: usize, generator_loss: f32) -> Self {
        Self {
            epoch,
            generator_loss,
            critic_loss: None,
            reconstruction: 0.0,
            divergence: 0.0,
            learning_rate: 0.0,
            train_time_secs: 0.0,
            steps: 0,
            curriculum: None,
        }
    }

    /// Averages step metrics into epoch metrics.
    ///
    /// With no steps every loss is NaN.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_steps(epoch: usize, steps: &[StepMetrics]) -> Self {
        let n = steps.len() as f32;
        let mean = |f: fn(&StepMetrics) -> f32| {
            if steps.is_empty() {
                f32::NAN
            } else {
                steps.iter().map(f).sum::<f32>() / n
            }
        };
        let critic: Vec<f32> = steps.iter().filter_map(|s| s.critic_loss).collect();
        let critic_loss =
            (!critic.is_empty()).then(|| critic.iter().sum::<f32>() / critic.len() as f32);

        Self {
            epoch,
            generator_loss: mean(|s| s.generator_loss),
            critic_loss,
            reconstruction: mean(|s| s.reconstruction),
            divergence: mean(|s| s.divergence),
            learning_rate: 0.0,
            train_time_secs: 0.0,
            steps: steps.len(),
            curriculum: None,
        }
    }

    /// Sets the critic loss.
    #[must_use]
    pub const fn with_critic_loss(mut self, loss: f32) -> Self {
        self.critic_loss = Some(loss);
        self
    }

    /// Sets the learning rate.
    #[must_use]
    pub const fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Sets the training time.
    #[must_use]
    pub const fn with_train_time(mut self, secs: f32) -> Self {
        self.train_time_secs = secs;
        self
    }

    /// Sets the curriculum bound.
    #[must_use]
    pub const fn with_curriculum(mut self, frames: usize) -> Self {
        self.curriculum = Some(frames);
        self
    }

    /// Returns true if the generator loss is lower than `previous_best`.
    #[must_use]
    pub fn improved(&self, previous_best: Option<f32>) -> bool {
        match previous_best {
            _ if !self.generator_loss.is_finite() => false,
            Some(best) => self.generator_loss < best,
            None => true,
        }
    }
}

/// Aggregate metrics for a training run.
///
/// # Example
///
/// ```
/// use motion_training::{EpochMetrics, TrainingMetrics};
///
/// let mut metrics = TrainingMetrics::new();
/// metrics.add_epoch(EpochMetrics::new(0, 0.5));
/// metrics.add_epoch(EpochMetrics::new(1, 0.3));
///
/// assert_eq!(metrics.epochs_completed(), 2);
/// assert!((metrics.final_loss() - 0.3).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// Metrics for each epoch.
    pub epoch_metrics: Vec<EpochMetrics>,

    /// Lowest generator loss seen.
    pub best_loss: Option<f32>,

    /// Epoch with the lowest generator loss.
    pub best_epoch: Option<usize>,

    /// Total training time in seconds.
    pub total_time_secs: f32,

    /// Epochs whose loss was not finite.
    pub non_finite_epochs: usize,
}

impl TrainingMetrics {
    /// Creates empty metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds metrics for an epoch.
    pub fn add_epoch(&mut self, metrics: EpochMetrics) {
        if metrics.improved(self.best_loss) {
            self.best_loss = Some(metrics.generator_loss);
            self.best_epoch = Some(metrics.epoch);
        }
        if !metrics.generator_loss.is_finite() {
            self.non_finite_epochs += 1;
        }
        self.total_time_secs += metrics.train_time_secs;
        self.epoch_metrics.push(metrics);
    }

    /// Number of completed epochs.
    #[must_use]
    pub fn epochs_completed(&self) -> usize {
        self.epoch_metrics.len()
    }

    /// Generator loss of the last epoch.
    #[must_use]
    pub fn final_loss(&self) -> f32 {
        self.epoch_metrics.last().map_or(f32::NAN, |m| m.generator_loss)
    }

    /// Generator loss of the first epoch.
    #[must_use]
    pub fn initial_loss(&self) -> f32 {
        self.epoch_metrics.first().map_or(f32::NAN, |m| m.generator_loss)
    }

    /// Generator losses per epoch.
    #[must_use]
    pub fn generator_losses(&self) -> Vec<f32> {
        self.epoch_metrics.iter().map(|m| m.generator_loss).collect()
    }

    /// Critic losses per epoch.
    #[must_use]
    pub fn critic_losses(&self) -> Vec<Option<f32>> {
        self.epoch_metrics.iter().map(|m| m.critic_loss).collect()
    }

    /// Returns a human-readable summary.
    #[must_use]
    #[allow(clippy::let_underscore_must_use)] // String::write_fmt is infallible
    pub fn summary(&self) -> String {
        use std::fmt::Write;

        let mut s = String::new();
        let _ = writeln!(s, "Training Summary");
        let _ = writeln!(s, "================");
        let _ = writeln!(s, "Epochs completed: {}", self.epochs_completed());
        let _ = writeln!(s, "Total time: {:.1}s", self.total_time_secs);
        let _ = writeln!(
            s,
            "Generator loss: {:.4} -> {:.4}",
            self.initial_loss(),
            self.final_loss()
        );
        if let Some(critic) = self.epoch_metrics.last().and_then(|m| m.critic_loss) {
            let _ = writeln!(s, "Final critic loss: {critic:.4}");
        }
        if let Some(best) = self.best_loss {
            let _ = writeln!(
                s,
                "Best generator loss: {:.4} (epoch {})",
                best,
                self.best_epoch.unwrap_or(0)
            );
        }
        if self.non_finite_epochs > 0 {
            let _ = writeln!(s, "Non-finite epochs: {}", self.non_finite_epochs);
        }
        s
    }
}
