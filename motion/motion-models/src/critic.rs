//! Adversarial critics.
//!
//! Three critics judge generated motion at different time scales: a
//! per-frame critic and two temporal-window critics (short and long). Each
//! returns an unbounded realness score (least-squares GAN) plus logits over
//! the latent code classes.

use burn::module::Module;
use burn::nn;
use burn::nn::conv::{Conv1d, Conv1dConfig};
use burn::prelude::Backend;
use burn::tensor::Tensor;
use burn::tensor::activation::leaky_relu;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

const LEAKY_SLOPE: f64 = 0.2;

/// Configuration shared by the critic ensemble.
///
/// # Example
///
/// ```
/// use motion_models::CriticConfig;
///
/// let config = CriticConfig::new(22, 2);
/// assert_eq!(config.window_channels(), 22 * 3 * 2);
/// assert_eq!(config.single_pose_dim(), 22 * 3 * 2 + 22 * 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticConfig {
    /// Joints per frame.
    pub joints: usize,

    /// Latent code classes predicted by the auxiliary head.
    pub code_classes: usize,

    /// Hidden width.
    pub hidden: usize,

    /// Window length of the short critic.
    pub short_window: usize,

    /// Window length of the long critic.
    pub long_window: usize,
}

impl CriticConfig {
    /// Creates a configuration with windows of 2 and 5 frames.
    #[must_use]
    pub const fn new(joints: usize, code_classes: usize) -> Self {
        Self {
            joints,
            code_classes,
            hidden: 512,
            short_window: 2,
            long_window: 5,
        }
    }

    /// Sets the hidden width.
    #[must_use]
    pub const fn with_hidden(mut self, hidden: usize) -> Self {
        self.hidden = hidden;
        self
    }

    /// Channels fed to a window critic: positions and velocities.
    #[must_use]
    pub const fn window_channels(&self) -> usize {
        self.joints * 3 * 2
    }

    /// Width of a single-pose critic input: positions, velocities, rotations.
    #[must_use]
    pub const fn single_pose_dim(&self) -> usize {
        self.window_channels() + self.joints * 4
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidConfig` for zero sizes or a long window
    /// not longer than the short one.
    pub fn validate(&self) -> Result<()> {
        if self.joints == 0 || self.code_classes == 0 || self.hidden == 0 || self.short_window == 0 {
            return Err(ModelError::invalid_config("critic sizes must be positive"));
        }
        if self.long_window <= self.short_window {
            return Err(ModelError::invalid_config(format!(
                "long window {} must exceed short window {}",
                self.long_window, self.short_window
            )));
        }
        Ok(())
    }
}

/// Per-frame critic.
#[derive(Debug, Module)]
pub struct SinglePoseCritic<B: Backend> {
    hidden1: nn::Linear<B>,
    hidden2: nn::Linear<B>,
    realness: nn::Linear<B>,
    code: nn::Linear<B>,
}

impl<B: Backend> SinglePoseCritic<B> {
    /// Creates the critic.
    #[must_use]
    pub fn new(config: &CriticConfig, device: &B::Device) -> Self {
        let half = (config.hidden / 2).max(1);
        Self {
            hidden1: nn::LinearConfig::new(config.single_pose_dim(), config.hidden).init(device),
            hidden2: nn::LinearConfig::new(config.hidden, half).init(device),
            realness: nn::LinearConfig::new(half, 1).init(device),
            code: nn::LinearConfig::new(half, config.code_classes).init(device),
        }
    }

    /// Scores `[N, single_pose_dim]` frames.
    ///
    /// Returns realness `[N, 1]` and code logits `[N, C]`.
    pub fn forward(&self, frames: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let x = leaky_relu(self.hidden1.forward(frames), LEAKY_SLOPE);
        let x = leaky_relu(self.hidden2.forward(x), LEAKY_SLOPE);
        (self.realness.forward(x.clone()), self.code.forward(x))
    }
}

/// Scores of a window critic.
#[derive(Debug, Clone)]
pub struct WindowScores<B: Backend> {
    /// Realness per window `[B, W]`.
    pub realness: Tensor<B, 2>,

    /// Code logits per window `[B, C, W]`.
    pub code_logits: Tensor<B, 3>,
}

/// Temporal-window critic built from 1D convolutions.
///
/// The first convolution spans the whole window, so each output position
/// judges one window of `window` consecutive frames.
#[derive(Debug, Module)]
pub struct WindowCritic<B: Backend> {
    window_conv: Conv1d<B>,
    mix_conv: Conv1d<B>,
    realness: Conv1d<B>,
    code: Conv1d<B>,
    #[module(skip)]
    window: usize,
}

impl<B: Backend> WindowCritic<B> {
    /// Creates a critic over windows of `window` frames.
    #[must_use]
    pub fn new(config: &CriticConfig, window: usize, device: &B::Device) -> Self {
        let half = (config.hidden / 2).max(1);
        Self {
            window_conv: Conv1dConfig::new(config.window_channels(), config.hidden, window).init(device),
            mix_conv: Conv1dConfig::new(config.hidden, half, 1).init(device),
            realness: Conv1dConfig::new(half, 1, 1).init(device),
            code: Conv1dConfig::new(half, config.code_classes, 1).init(device),
            window,
        }
    }

    /// Window length.
    #[must_use]
    pub const fn window(&self) -> usize {
        self.window
    }

    /// Scores channel-first motion `[B, channels, T]`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ShapeMismatch` if `T` is shorter than the window.
    pub fn forward(&self, motion: Tensor<B, 3>) -> Result<WindowScores<B>> {
        let [batch, _, frames] = motion.dims();
        if frames < self.window {
            return Err(ModelError::shape_mismatch(
                format!("at least {} frames", self.window),
                format!("{frames}"),
            ));
        }
        let windows = frames - self.window + 1;
        let x = leaky_relu(self.window_conv.forward(motion), LEAKY_SLOPE);
        let x = leaky_relu(self.mix_conv.forward(x), LEAKY_SLOPE);
        Ok(WindowScores {
            realness: self.realness.forward(x.clone()).reshape([batch, windows]),
            code_logits: self.code.forward(x),
        })
    }
}

/// Single-pose, short-window and long-window critics trained together.
#[derive(Debug, Module)]
pub struct CriticEnsemble<B: Backend> {
    /// Per-frame critic.
    pub single_pose: SinglePoseCritic<B>,

    /// Short-window critic.
    pub short: WindowCritic<B>,

    /// Long-window critic.
    pub long: WindowCritic<B>,
}

impl<B: Backend> CriticEnsemble<B> {
    /// Creates all three critics.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: &CriticConfig, device: &B::Device) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            single_pose: SinglePoseCritic::new(config, device),
            short: WindowCritic::new(config, config.short_window, device),
            long: WindowCritic::new(config, config.long_window, device),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn config() -> CriticConfig {
        CriticConfig::new(2, 3).with_hidden(8)
    }

    #[test]
    fn single_pose_shapes() {
        let device = <TestBackend as Backend>::Device::default();
        let critic = SinglePoseCritic::<TestBackend>::new(&config(), &device);
        let (score, logits) = critic.forward(Tensor::zeros([10, config().single_pose_dim()], &device));
        assert_eq!(score.dims(), [10, 1]);
        assert_eq!(logits.dims(), [10, 3]);
    }

    #[test]
    fn window_shapes() {
        let device = <TestBackend as Backend>::Device::default();
        let ensemble = CriticEnsemble::<TestBackend>::new(&config(), &device).unwrap();
        let motion = Tensor::<TestBackend, 3>::zeros([4, 12, 9], &device);

        let short = ensemble.short.forward(motion.clone()).unwrap();
        assert_eq!(short.realness.dims(), [4, 8]);
        assert_eq!(short.code_logits.dims(), [4, 3, 8]);

        let long = ensemble.long.forward(motion).unwrap();
        assert_eq!(long.realness.dims(), [4, 5]);
        assert_eq!(long.code_logits.dims(), [4, 3, 5]);
    }

    #[test]
    fn too_short_for_window() {
        let device = <TestBackend as Backend>::Device::default();
        let critic = WindowCritic::<TestBackend>::new(&config(), 5, &device);
        let result = critic.forward(Tensor::zeros([1, 12, 4], &device));
        assert!(matches!(result, Err(ModelError::ShapeMismatch { .. })));
    }

    #[test]
    fn config_validation() {
        assert!(config().validate().is_ok());
        let mut bad = config();
        bad.long_window = 2;
        assert!(bad.validate().is_err());
        assert!(CriticConfig::new(22, 0).validate().is_err());
    }
}
