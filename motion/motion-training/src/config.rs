//! Training configuration.

use std::path::Path;

use motion_dataset::DatasetKind;
use motion_models::{RecurrentInbetweenerConfig, TransformerInbetweenerConfig};
use motion_types::InterpolationMode;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainingError};
use crate::schedule::{Curriculum, DivergenceSchedule};

/// Which generator drives training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backbone {
    /// Whole-window attention model fed interpolated input.
    #[default]
    Transformer,

    /// Closed-loop recurrent model fed keyframes.
    Recurrent,
}

impl Backbone {
    /// Lowercase name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Transformer => "transformer",
            Self::Recurrent => "recurrent",
        }
    }
}

impl std::fmt::Display for Backbone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration for a training run.
///
/// # Example
///
/// ```
/// use motion_training::{Backbone, TrainingConfig};
///
/// let config = TrainingConfig::default();
/// assert_eq!(config.backbone, Backbone::Transformer);
/// assert_eq!(config.window, 21);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Generator family.
    pub backbone: Backbone,

    /// Dataset family the run trains on.
    pub dataset: DatasetKind,

    /// Frames per training window (the horizon, without the conditioning slot).
    pub window: usize,

    /// Batch size.
    pub batch_size: usize,

    /// Number of training epochs.
    pub epochs: usize,

    /// Optimizer steps per batch, each with a fresh mask or rollout length.
    pub trials_per_batch: usize,

    /// Epochs between checkpoints.
    pub save_interval: usize,

    /// How masked frames are filled before the transformer sees them.
    pub interpolation: InterpolationMode,

    /// Optimizer configuration, shared by generator and critics.
    pub optimizer: OptimizerConfig,

    /// Learning rate schedule.
    pub lr_schedule: LearningRateSchedule,

    /// Loss term weights.
    pub weights: LossWeights,

    /// Rollout lengths for the recurrent backbone.
    pub curriculum: Curriculum,

    /// Time weighting of the divergence reward.
    pub divergence: DivergenceSchedule,

    /// Latent code classes (0 disables codes).
    pub code_classes: usize,

    /// Hidden width of the critics.
    pub critic_hidden: usize,

    /// Transformer shape.
    pub transformer: TransformerShape,

    /// Recurrent shape.
    pub recurrent: RecurrentShape,

    /// Global gradient norm per generator part (0.0 disables clipping).
    pub gradient_clip: f32,

    /// Whether to shuffle windows every epoch.
    pub shuffle: bool,

    /// Random seed for reproducibility.
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::transformer()
    }
}

impl TrainingConfig {
    /// Reconstruction-only transformer run on LAFAN1.
    #[must_use]
    pub const fn transformer() -> Self {
        Self {
            backbone: Backbone::Transformer,
            dataset: DatasetKind::Lafan,
            window: 21,
            batch_size: 32,
            epochs: 3000,
            trials_per_batch: 5,
            save_interval: 50,
            interpolation: InterpolationMode::Slerp,
            optimizer: OptimizerConfig::adamw(1e-4),
            lr_schedule: LearningRateSchedule::step(0.9, 100),
            weights: LossWeights::reconstruction(),
            curriculum: Curriculum::new(5, 30, 10),
            divergence: DivergenceSchedule::Sine,
            code_classes: 0,
            critic_hidden: 512,
            transformer: TransformerShape::new(),
            recurrent: RecurrentShape::new(),
            gradient_clip: 1.0,
            shuffle: true,
            seed: None,
        }
    }

    /// Adversarial recurrent run with latent codes on LAFAN1.
    #[must_use]
    pub const fn recurrent() -> Self {
        Self {
            backbone: Backbone::Recurrent,
            dataset: DatasetKind::Lafan,
            window: 31,
            batch_size: 32,
            epochs: 1000,
            trials_per_batch: 1,
            save_interval: 50,
            interpolation: InterpolationMode::Slerp,
            optimizer: OptimizerConfig::adamw(1e-3).with_betas(0.5, 0.9),
            lr_schedule: LearningRateSchedule::Constant,
            weights: LossWeights::adversarial(),
            curriculum: Curriculum::new(5, 30, 10),
            divergence: DivergenceSchedule::Sine,
            code_classes: 2,
            critic_hidden: 512,
            transformer: TransformerShape::new(),
            recurrent: RecurrentShape::new(),
            gradient_clip: 1.0,
            shuffle: true,
            seed: None,
        }
    }

    /// Sets the dataset family.
    #[must_use]
    pub const fn with_dataset(mut self, dataset: DatasetKind) -> Self {
        self.dataset = dataset;
        self
    }

    /// Sets the window length.
    #[must_use]
    pub const fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Sets the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the number of epochs.
    #[must_use]
    pub const fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Sets the optimizer steps per batch.
    #[must_use]
    pub const fn with_trials_per_batch(mut self, trials: usize) -> Self {
        self.trials_per_batch = trials;
        self
    }

    /// Sets the checkpoint interval.
    #[must_use]
    pub const fn with_save_interval(mut self, save_interval: usize) -> Self {
        self.save_interval = save_interval;
        self
    }

    /// Sets the interpolation mode.
    #[must_use]
    pub const fn with_interpolation(mut self, interpolation: InterpolationMode) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Sets the optimizer.
    #[must_use]
    pub const fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Sets the learning rate schedule.
    #[must_use]
    pub const fn with_lr_schedule(mut self, schedule: LearningRateSchedule) -> Self {
        self.lr_schedule = schedule;
        self
    }

    /// Sets the loss weights.
    #[must_use]
    pub const fn with_weights(mut self, weights: LossWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Sets the rollout curriculum.
    #[must_use]
    pub const fn with_curriculum(mut self, curriculum: Curriculum) -> Self {
        self.curriculum = curriculum;
        self
    }

    /// Sets the divergence schedule.
    #[must_use]
    pub const fn with_divergence(mut self, divergence: DivergenceSchedule) -> Self {
        self.divergence = divergence;
        self
    }

    /// Sets the latent code classes.
    #[must_use]
    pub const fn with_code_classes(mut self, code_classes: usize) -> Self {
        self.code_classes = code_classes;
        self
    }

    /// Sets the critic hidden width.
    #[must_use]
    pub const fn with_critic_hidden(mut self, hidden: usize) -> Self {
        self.critic_hidden = hidden;
        self
    }

    /// Sets the transformer shape.
    #[must_use]
    pub const fn with_transformer(mut self, shape: TransformerShape) -> Self {
        self.transformer = shape;
        self
    }

    /// Sets the recurrent shape.
    #[must_use]
    pub const fn with_recurrent(mut self, shape: RecurrentShape) -> Self {
        self.recurrent = shape;
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Disables shuffling.
    #[must_use]
    pub const fn without_shuffle(mut self) -> Self {
        self.shuffle = false;
        self
    }

    /// Returns true if any critic contributes to the loss.
    #[must_use]
    pub fn uses_critics(&self) -> bool {
        self.weights.has_adversarial()
    }

    /// Checks every value before any step runs.
    ///
    /// # Errors
    ///
    /// Returns `TrainingError::InvalidConfig` naming the first bad value.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("window", self.window),
            ("batch_size", self.batch_size),
            ("epochs", self.epochs),
            ("trials_per_batch", self.trials_per_batch),
            ("save_interval", self.save_interval),
            ("critic_hidden", self.critic_hidden),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(TrainingError::invalid_config(format!("{name} must be > 0")));
        }
        if self.window < 2 {
            return Err(TrainingError::invalid_config("window must hold at least 2 frames"));
        }
        if !self.gradient_clip.is_finite() || self.gradient_clip < 0.0 {
            return Err(TrainingError::invalid_config("gradient_clip must be >= 0"));
        }
        if !self.optimizer.is_valid() {
            return Err(TrainingError::invalid_config(format!(
                "optimizer {:?}",
                self.optimizer
            )));
        }
        self.weights.validate()?;

        if self.backbone == Backbone::Recurrent {
            self.curriculum.validate()?;
            if self.curriculum.ceiling + 1 > self.window {
                return Err(TrainingError::invalid_config(format!(
                    "curriculum ceiling {} needs a window of at least {} frames",
                    self.curriculum.ceiling,
                    self.curriculum.ceiling + 1
                )));
            }
        }
        if self.uses_critics() {
            let shortest = match self.backbone {
                Backbone::Transformer => self.window,
                Backbone::Recurrent => self.curriculum.start,
            };
            if shortest < LONG_WINDOW {
                return Err(TrainingError::invalid_config(format!(
                    "critics need at least {LONG_WINDOW} generated frames, got {shortest}"
                )));
            }
        }
        if (self.uses_critics() || self.weights.divergence > 0.0) && self.code_classes < 2 {
            return Err(TrainingError::invalid_config(
                "adversarial training needs at least 2 code classes",
            ));
        }
        Ok(())
    }

    /// Loads a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Saves the configuration as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Learning rate for `epoch` under the configured schedule.
    #[must_use]
    pub fn learning_rate(&self, epoch: usize) -> f64 {
        self.lr_schedule
            .compute_lr(self.optimizer.learning_rate, epoch, self.epochs)
    }

    /// Returns whether a checkpoint is written after `epoch`.
    #[must_use]
    pub const fn should_checkpoint(&self, epoch: usize) -> bool {
        self.save_interval > 0 && (epoch + 1) % self.save_interval == 0
    }

    /// Number of batches for a dataset of `windows` samples.
    #[must_use]
    pub const fn num_batches(&self, windows: usize) -> usize {
        if self.batch_size == 0 {
            0
        } else {
            windows.div_ceil(self.batch_size)
        }
    }
}

const LONG_WINDOW: usize = 5;

/// Weights of every loss term.
///
/// # Example
///
/// ```
/// use motion_training::LossWeights;
///
/// assert!(!LossWeights::reconstruction().has_adversarial());
/// assert!(LossWeights::adversarial().has_adversarial());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossWeights {
    /// Global joint positions (L1).
    pub position: f32,

    /// Rotations (L1).
    pub rotation: f32,

    /// Root trajectory (L1).
    pub root: f32,

    /// Conditioning token reconstruction (L1).
    pub condition: f32,

    /// Window critics, critic side.
    pub discriminator: f32,

    /// Window critics, generator side.
    pub generator: f32,

    /// Single-pose critic, critic side.
    pub single_pose_discriminator: f32,

    /// Single-pose critic plus its code head, generator side.
    pub single_pose_generator: f32,

    /// Divergence reward subtracted from the generator loss.
    pub divergence: f32,

    /// Code classification by the window critics.
    pub window_code: f32,
}

impl Default for LossWeights {
    fn default() -> Self {
        Self::reconstruction()
    }
}

impl LossWeights {
    /// Reconstruction terms only.
    #[must_use]
    pub const fn reconstruction() -> Self {
        Self {
            position: 0.05,
            rotation: 2.0,
            root: 0.0,
            condition: 1.5,
            discriminator: 0.0,
            generator: 0.0,
            single_pose_discriminator: 0.0,
            single_pose_generator: 0.0,
            divergence: 0.0,
            window_code: 0.0,
        }
    }

    /// Reconstruction, all three critics and the divergence reward.
    #[must_use]
    pub const fn adversarial() -> Self {
        Self {
            position: 1.0,
            rotation: 1.0,
            root: 1.0,
            condition: 0.0,
            discriminator: 1.0,
            generator: 1.0,
            single_pose_discriminator: 1.0,
            single_pose_generator: 1.0,
            divergence: 0.1,
            window_code: 0.0,
        }
    }

    /// Returns true if any critic term is weighted.
    #[must_use]
    pub fn has_adversarial(&self) -> bool {
        [
            self.discriminator,
            self.generator,
            self.single_pose_discriminator,
            self.single_pose_generator,
            self.window_code,
        ]
        .iter()
        .any(|w| *w > 0.0)
    }

    /// Checks that every weight is finite and non-negative.
    ///
    /// # Errors
    ///
    /// Returns `TrainingError::InvalidConfig` for a bad weight.
    pub fn validate(&self) -> Result<()> {
        let all = [
            self.position,
            self.rotation,
            self.root,
            self.condition,
            self.discriminator,
            self.generator,
            self.single_pose_discriminator,
            self.single_pose_generator,
            self.divergence,
            self.window_code,
        ];
        if all.iter().all(|w| w.is_finite() && *w >= 0.0) {
            Ok(())
        } else {
            Err(TrainingError::invalid_config(format!("loss weights {self:?}")))
        }
    }
}

/// Transformer hyperparameters that fix the model shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformerShape {
    /// Model width.
    pub d_model: usize,

    /// Attention heads.
    pub n_heads: usize,

    /// Feed-forward width.
    pub d_ff: usize,

    /// Encoder layers.
    pub n_layers: usize,

    /// Dropout probability.
    pub dropout: f64,
}

impl Default for TransformerShape {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformerShape {
    /// Default shape.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            d_model: 256,
            n_heads: 8,
            d_ff: 2048,
            n_layers: 8,
            dropout: 0.05,
        }
    }

    /// Model configuration for pose vectors of `feature_dim` and `labels`
    /// categories, sized for windows of `window` frames plus the
    /// conditioning token.
    #[must_use]
    pub const fn model_config(
        &self,
        feature_dim: usize,
        labels: usize,
        code_classes: usize,
        window: usize,
    ) -> TransformerInbetweenerConfig {
        TransformerInbetweenerConfig::new(feature_dim, labels)
            .with_code_classes(code_classes)
            .with_max_frames(window + 1)
            .with_encoder(self.d_model, self.n_heads, self.d_ff, self.n_layers)
            .with_dropout(self.dropout)
    }
}

/// Recurrent hyperparameters that fix the model shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrentShape {
    /// Encoder hidden width.
    pub encoder_hidden: usize,

    /// Encoder output width.
    pub encoder_out: usize,

    /// LSTM hidden width.
    pub lstm_hidden: usize,

    /// Decoder hidden width.
    pub decoder_hidden: usize,
}

impl Default for RecurrentShape {
    fn default() -> Self {
        Self::new()
    }
}

impl RecurrentShape {
    /// Default shape.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            encoder_hidden: 512,
            encoder_out: 256,
            lstm_hidden: 1024,
            decoder_hidden: 512,
        }
    }

    /// Model configuration for `joints` joints.
    #[must_use]
    pub const fn model_config(&self, joints: usize, code_classes: usize) -> RecurrentInbetweenerConfig {
        RecurrentInbetweenerConfig::new(joints, code_classes).with_widths(
            self.encoder_hidden,
            self.encoder_out,
            self.lstm_hidden,
            self.decoder_hidden,
        )
    }
}

/// `AdamW` optimizer configuration.
///
/// # Example
///
/// ```
/// use motion_training::OptimizerConfig;
///
/// let adamw = OptimizerConfig::adamw(1e-3).with_betas(0.5, 0.9);
/// assert!((adamw.beta1 - 0.5).abs() < 1e-6);
/// assert!(adamw.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Base learning rate.
    pub learning_rate: f64,

    /// Decoupled weight decay.
    pub weight_decay: f32,

    /// First moment decay.
    pub beta1: f32,

    /// Second moment decay.
    pub beta2: f32,

    /// Epsilon for numerical stability.
    pub epsilon: f32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::adamw(1e-3)
    }
}

impl OptimizerConfig {
    /// Creates an `AdamW` config.
    #[must_use]
    pub const fn adamw(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            weight_decay: 1e-2,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }

    /// Sets the moment decays.
    #[must_use]
    pub const fn with_betas(mut self, beta1: f32, beta2: f32) -> Self {
        self.beta1 = beta1;
        self.beta2 = beta2;
        self
    }

    /// Sets weight decay.
    #[must_use]
    pub const fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    /// Validates the configuration.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.learning_rate > 0.0
            && self.weight_decay >= 0.0
            && (0.0..1.0).contains(&self.beta1)
            && (0.0..1.0).contains(&self.beta2)
            && self.epsilon > 0.0
    }
}

/// Learning rate schedule, evaluated once per epoch.
///
/// # Example
///
/// ```
/// use motion_training::LearningRateSchedule;
///
/// let schedule = LearningRateSchedule::step(0.9, 100);
/// assert!((schedule.compute_lr(1.0, 100, 3000) - 0.9).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum LearningRateSchedule {
    /// Constant learning rate.
    #[default]
    Constant,

    /// Multiply by `factor` every `step_size` epochs.
    Step {
        /// Decay factor.
        factor: f64,
        /// Epochs between decays.
        step_size: usize,
    },

    /// `lr * gamma^epoch`.
    Exponential {
        /// Decay rate per epoch.
        gamma: f64,
    },

    /// Cosine annealing down to `min_lr` at the last epoch.
    Cosine {
        /// Minimum learning rate.
        min_lr: f64,
    },
}

impl LearningRateSchedule {
    /// Creates a step decay schedule.
    #[must_use]
    pub const fn step(factor: f64, step_size: usize) -> Self {
        Self::Step { factor, step_size }
    }

    /// Creates an exponential decay schedule.
    #[must_use]
    pub const fn exponential(gamma: f64) -> Self {
        Self::Exponential { gamma }
    }

    /// Creates a cosine annealing schedule.
    #[must_use]
    pub const fn cosine(min_lr: f64) -> Self {
        Self::Cosine { min_lr }
    }

    /// Learning rate for `epoch` (0-indexed) of `total_epochs`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap
    )]
    pub fn compute_lr(&self, base_lr: f64, epoch: usize, total_epochs: usize) -> f64 {
        match self {
            Self::Constant => base_lr,
            Self::Step { factor, step_size } => {
                base_lr * factor.powi((epoch / (*step_size).max(1)) as i32)
            }
            Self::Exponential { gamma } => base_lr * gamma.powi(epoch as i32),
            Self::Cosine { min_lr } => {
                let progress = epoch as f64 / total_epochs.max(1) as f64;
                let cosine = (std::f64::consts::PI * progress).cos();
                min_lr + (base_lr - min_lr) * (1.0 + cosine) / 2.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn presets_are_valid() {
        assert!(TrainingConfig::transformer().validate().is_ok());
        assert!(TrainingConfig::recurrent().validate().is_ok());
        assert!(!TrainingConfig::transformer().uses_critics());
        assert!(TrainingConfig::recurrent().uses_critics());
    }

    #[test]
    fn builder() {
        let config = TrainingConfig::recurrent()
            .with_batch_size(4)
            .with_epochs(2)
            .with_seed(42)
            .without_shuffle();
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.epochs, 2);
        assert_eq!(config.seed, Some(42));
        assert!(!config.shuffle);
    }

    #[test]
    fn zero_values_rejected() {
        let err = TrainingConfig::default().with_batch_size(0).validate().unwrap_err();
        assert!(err.to_string().contains("batch_size"));
        assert!(TrainingConfig::default().with_epochs(0).validate().is_err());
        assert!(TrainingConfig::default().with_window(1).validate().is_err());
    }

    #[test]
    fn curriculum_must_fit_window() {
        let config = TrainingConfig::recurrent().with_window(20);
        assert!(config.validate().is_err());
        let config = config.with_curriculum(Curriculum::new(5, 19, 1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn critics_need_codes_and_frames() {
        assert!(TrainingConfig::recurrent().with_code_classes(1).validate().is_err());
        let short = TrainingConfig::recurrent().with_curriculum(Curriculum::new(3, 10, 1));
        assert!(short.validate().is_err());
    }

    #[test]
    fn negative_weight_rejected() {
        let mut weights = LossWeights::adversarial();
        weights.divergence = -1.0;
        assert!(TrainingConfig::recurrent().with_weights(weights).validate().is_err());
    }

    #[test]
    fn invalid_interpolation_name_fails_to_parse() {
        let mut json = serde_json::to_value(TrainingConfig::default()).unwrap();
        json["interpolation"] = serde_json::Value::String("cubic".into());
        assert!(serde_json::from_value::<TrainingConfig>(json).is_err());
    }

    #[test]
    fn json_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = TrainingConfig::recurrent().with_seed(7);
        config.save(&path).unwrap();
        assert_eq!(TrainingConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn optimizer_validation() {
        assert!(OptimizerConfig::adamw(1e-3).is_valid());
        assert!(!OptimizerConfig::adamw(0.0).is_valid());
        assert!(!OptimizerConfig::adamw(1e-3).with_betas(1.0, 0.9).is_valid());
    }

    #[test]
    fn lr_schedule_step() {
        let schedule = LearningRateSchedule::step(0.1, 30);
        assert_relative_eq!(schedule.compute_lr(1.0, 29, 100), 1.0);
        assert_relative_eq!(schedule.compute_lr(1.0, 30, 100), 0.1, epsilon = 1e-12);
        assert_relative_eq!(schedule.compute_lr(1.0, 60, 100), 0.01, epsilon = 1e-12);
    }

    #[test]
    fn lr_schedule_exponential_and_cosine() {
        let exp = LearningRateSchedule::exponential(0.95);
        assert_relative_eq!(exp.compute_lr(1.0, 2, 100), 0.9025, epsilon = 1e-12);

        let cosine = LearningRateSchedule::cosine(0.0);
        assert_relative_eq!(cosine.compute_lr(1.0, 0, 100), 1.0);
        assert_relative_eq!(cosine.compute_lr(1.0, 50, 100), 0.5, epsilon = 1e-9);
        assert_relative_eq!(cosine.compute_lr(1.0, 100, 100), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn checkpoint_cadence() {
        let config = TrainingConfig::transformer().with_save_interval(10);
        assert!(!config.should_checkpoint(0));
        assert!(config.should_checkpoint(9));
        assert!(!config.should_checkpoint(10));
        assert!(config.should_checkpoint(19));
    }

    #[test]
    fn batches_round_up() {
        let config = TrainingConfig::transformer().with_batch_size(32);
        assert_eq!(config.num_batches(100), 4);
        assert_eq!(config.num_batches(32), 1);
        assert_eq!(config.num_batches(0), 0);
    }

    #[test]
    fn transformer_lr_decays_every_hundred_epochs() {
        let config = TrainingConfig::transformer();
        assert_relative_eq!(config.learning_rate(99), 1e-4, epsilon = 1e-12);
        assert_relative_eq!(config.learning_rate(100), 0.9e-4, epsilon = 1e-12);
    }

    #[test]
    fn model_configs_follow_shapes() {
        let transformer = TransformerShape::new().model_config(154, 12, 0, 21);
        assert_eq!(transformer.feature_dim, 154);
        assert_eq!(transformer.n_heads, 8);
        assert_eq!(transformer.max_frames, 22);

        let long = TransformerShape::new().model_config(154, 12, 0, 520);
        assert_eq!(long.max_frames, 521);
        assert!(long.validate().is_ok());

        let recurrent = RecurrentShape::new().model_config(22, 2);
        assert_eq!(recurrent.lstm_hidden, 1024);
        assert_eq!(recurrent.code_classes, 2);
    }
}
