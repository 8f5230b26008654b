//! Adversarial training for motion in-betweening.
//!
//! One orchestrator drives either generator backbone against a three-critic
//! ensemble:
//!
//! # Session
//!
//! - [`TrainingSession`] - Owns models, optimizers, RNG and progress
//! - [`TrainingConfig`] - Backbone presets, loss weights, schedules
//! - [`CheckpointManifest`] - Epoch-tagged `train-<epoch>/` directories
//!
//! # Backbones
//!
//! - [`Inbetweener`] - What the session needs from a generator
//! - Transformer: masked window filled by interpolation, predicted in one pass
//! - Recurrent: closed-loop rollout toward a keyframe, length from a
//!   [`Curriculum`]
//!
//! # Objectives
//!
//! - [`lsgan_critic_loss`], [`lsgan_generator_loss`] - Least-squares GAN
//! - [`code_cross_entropy`] - Latent code recovery by the critics
//! - [`divergence_reward`] - Rollouts with different codes drifting apart,
//!   shaped by a [`DivergenceSchedule`]
//! - [`clip_grad_norm`] - Global-norm clipping per sub-network
//!
//! # Logging
//!
//! Progress goes through `tracing`: one `info` event per epoch and per
//! checkpoint, `debug` per step and `warn` for non-finite losses.
//!
//! # Example
//!
//! ```ignore
//! use motion_models::RecurrentInbetweener;
//! use motion_training::{TrainingConfig, TrainingSession};
//!
//! let config = TrainingConfig::recurrent().with_seed(1);
//! let mut session =
//!     TrainingSession::<MyBackend, RecurrentInbetweener<MyBackend>>::new(config, &dataset, &device)?;
//! let metrics = session.fit(&dataset, Some(Path::new("runs/recurrent")))?;
//! println!("{}", metrics.summary());
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod adversarial;
mod backbone;
mod checkpoint;
mod clip;
mod config;
mod error;
mod latent;
mod loss;
mod metrics;
mod optim;
mod schedule;
mod session;
mod state;

// Re-export configuration
pub use config::{
    Backbone, LearningRateSchedule, LossWeights, OptimizerConfig, RecurrentShape, TrainingConfig,
    TransformerShape,
};
pub use schedule::{Curriculum, DivergenceSchedule, sample_mask_start};

// Re-export the session and backbones
pub use backbone::{GeneratorConfig, Generated, Inbetweener, Reconstruction, StepContext, TrainingBatch};
pub use session::TrainingSession;

// Re-export objectives
pub use adversarial::{
    CriticInputs, CriticLosses, GeneratorAdversarial, critic_objective, divergence_reward,
    generator_objective,
};
pub use clip::{clip_grad_norm, grad_norm};
pub use latent::LatentCodes;
pub use loss::{code_cross_entropy, l1_loss, lsgan_critic_loss, lsgan_generator_loss, pairwise_distance};
pub use optim::{ModuleOptimizer, adamw};

// Re-export progress and checkpoints
pub use checkpoint::{CheckpointManifest, MANIFEST_FILE, checkpoint_dir};
pub use metrics::{EpochMetrics, StepMetrics, TrainingMetrics};
pub use state::TrainingState;

// Re-export error types
pub use error::{Result, TrainingError};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        Backbone, CheckpointManifest, Curriculum, DivergenceSchedule, EpochMetrics, Inbetweener,
        LossWeights, OptimizerConfig, TrainingConfig, TrainingError, TrainingMetrics, TrainingSession,
        TrainingState,
    };
}
