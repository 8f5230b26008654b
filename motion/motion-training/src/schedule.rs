//! Rollout curriculum and divergence time weighting.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainingError};

/// Growing range of rollout lengths for the recurrent backbone.
///
/// At epoch `e` rollouts are drawn from `[start, current(e)]`, where
/// `current` grows by one frame every `epochs_per_frame` epochs until it
/// reaches `ceiling`.
///
/// # Example
///
/// ```
/// use motion_training::Curriculum;
///
/// let curriculum = Curriculum::new(5, 30, 10);
/// assert_eq!(curriculum.current(0), 5);
/// assert_eq!(curriculum.current(25), 7);
/// assert_eq!(curriculum.current(10_000), 30);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Curriculum {
    /// Shortest rollout.
    pub start: usize,

    /// Longest rollout ever sampled.
    pub ceiling: usize,

    /// Epochs between one-frame increases.
    pub epochs_per_frame: usize,
}

impl Default for Curriculum {
    fn default() -> Self {
        Self::new(5, 30, 10)
    }
}

impl Curriculum {
    /// Creates a curriculum.
    #[must_use]
    pub const fn new(start: usize, ceiling: usize, epochs_per_frame: usize) -> Self {
        Self {
            start,
            ceiling,
            epochs_per_frame,
        }
    }

    /// Upper end of the sampling range at `epoch`.
    #[must_use]
    pub fn current(&self, epoch: usize) -> usize {
        let grown = self.start + epoch / self.epochs_per_frame.max(1);
        grown.min(self.ceiling)
    }

    /// Returns true once the range has stopped growing.
    #[must_use]
    pub fn at_ceiling(&self, epoch: usize) -> bool {
        self.current(epoch) >= self.ceiling
    }

    /// Draws a rollout length from `[start, current(epoch)]`.
    pub fn sample<R: Rng>(&self, epoch: usize, rng: &mut R) -> usize {
        rng.gen_range(self.start..=self.current(epoch))
    }

    /// Checks the curriculum.
    ///
    /// # Errors
    ///
    /// Returns `TrainingError::InvalidConfig` for a zero start, a ceiling
    /// below the start or a zero growth period.
    pub fn validate(&self) -> Result<()> {
        if self.start == 0 {
            return Err(TrainingError::invalid_config("curriculum start must be > 0"));
        }
        if self.ceiling < self.start {
            return Err(TrainingError::invalid_config(format!(
                "curriculum ceiling {} below start {}",
                self.ceiling, self.start
            )));
        }
        if self.epochs_per_frame == 0 {
            return Err(TrainingError::invalid_config(
                "curriculum epochs_per_frame must be > 0",
            ));
        }
        Ok(())
    }
}

/// Weight of the divergence reward at each rollout frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceSchedule {
    /// 1 everywhere.
    Constant,

    /// Falls linearly from 1 at the first frame to `1 / length` at the last.
    LinearDecay,

    /// Rises linearly from `1 / length` to 1 at the last frame.
    LinearRamp,

    /// Half sine: small near both keyframes, 1 in the middle.
    #[default]
    Sine,
}

impl DivergenceSchedule {
    /// Multiplier for frame `t` of a rollout of `length` frames.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn multiplier(&self, t: usize, length: usize) -> f32 {
        if length == 0 {
            return 0.0;
        }
        let len = length as f32;
        let t = t.min(length - 1) as f32;
        match self {
            Self::Constant => 1.0,
            Self::LinearDecay => (len - t) / len,
            Self::LinearRamp => (t + 1.0) / len,
            Self::Sine => (std::f32::consts::PI * (t + 1.0) / (len + 1.0)).sin(),
        }
    }
}

/// Draws a mask start from `[0, frames - 1)`.
///
/// Windows shorter than two frames have nothing to mask and always get 0.
pub fn sample_mask_start<R: Rng>(frames: usize, rng: &mut R) -> usize {
    if frames < 2 {
        0
    } else {
        rng.gen_range(0..frames - 1)
    }
}
