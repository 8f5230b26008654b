//! Progress of a training run.

use serde::{Deserialize, Serialize};

use crate::config::TrainingConfig;
use crate::metrics::{EpochMetrics, TrainingMetrics};

/// State of a training run.
///
/// # Example
///
/// ```
/// use motion_training::TrainingState;
///
/// let state = TrainingState::new();
/// assert_eq!(state.epoch, 0);
/// assert!(!state.is_finished());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingState {
    /// Next epoch to run (0-indexed).
    pub epoch: usize,

    /// Optimizer steps taken so far.
    pub step: usize,

    /// Total epochs to run.
    pub total_epochs: usize,

    /// Whether training has finished.
    pub finished: bool,

    /// Accumulated metrics.
    pub metrics: TrainingMetrics,
}

impl Default for TrainingState {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainingState {
    /// Creates a new training state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: 0,
            step: 0,
            total_epochs: 0,
            finished: false,
            metrics: TrainingMetrics::new(),
        }
    }

    /// Creates a training state for the given config.
    #[must_use]
    pub fn from_config(config: &TrainingConfig) -> Self {
        Self {
            total_epochs: config.epochs,
            ..Self::new()
        }
    }

    /// Creates a state that continues after `epoch` has completed.
    #[must_use]
    pub fn resumed(config: &TrainingConfig, epoch: usize) -> Self {
        let mut state = Self::from_config(config);
        state.epoch = epoch;
        state.next_epoch();
        state
    }

    /// Returns true if training is finished.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Returns the progress as a fraction [0, 1].
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f32 {
        if self.total_epochs == 0 {
            0.0
        } else {
            self.epoch as f32 / self.total_epochs as f32
        }
    }

    /// Advances to the next epoch.
    pub const fn next_epoch(&mut self) {
        self.epoch += 1;
        if self.epoch >= self.total_epochs {
            self.finished = true;
        }
    }

    /// Counts one optimizer step.
    pub const fn next_step(&mut self) {
        self.step += 1;
    }

    /// Adds epoch metrics.
    pub fn add_epoch_metrics(&mut self, metrics: EpochMetrics) {
        self.metrics.add_epoch(metrics);
    }
}
