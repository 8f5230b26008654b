//! Burn models and tensor kinematics for motion in-betweening.
//!
//! # Backbones
//!
//! Two interchangeable generators share one contract (interpolated or
//! keyframe input in, pose vectors out):
//!
//! - [`TransformerInbetweener`] - Predicts a whole window in one pass,
//!   conditioned on a category token
//! - [`RecurrentInbetweener`] - Encoder / LSTM / decoder stepped frame by
//!   frame with an explicit [`RecurrentState`]
//!
//! # Critics
//!
//! - [`SinglePoseCritic`] - Judges individual frames
//! - [`WindowCritic`] - Judges short or long runs of frames
//! - [`CriticEnsemble`] - All three, trained together
//!
//! # Tensor Utilities
//!
//! - [`Kinematics`] - Batched forward kinematics for a skeleton
//! - [`quat_mul`], [`quat_rotate`], [`normalize_quaternions`] - `(w, x, y, z)` algebra
//! - [`vectorize_pose`], [`split_pose`] - Pose-vector reshaping
//! - [`TimeToArrivalEncoding`] - Sinusoidal arrival-time features
//!
//! # Checkpoint Persistence
//!
//! Weights and optimizer state use Burn's recorders:
//! - Binary format (compact, fast)
//! - JSON format (human-readable, debuggable)
//!
//! # Backend Support
//!
//! Everything is generic over Burn backends. Tests run on `burn-ndarray`.
//!
//! # Example
//!
//! ```ignore
//! use motion_models::{Kinematics, TransformerInbetweener, TransformerInbetweenerConfig};
//!
//! let config = TransformerInbetweenerConfig::new(154, categories);
//! let model = TransformerInbetweener::<MyBackend>::new(&config, &device)?;
//! let out = model.forward(input, None, mask, labels)?;
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod checkpoint;
mod critic;
mod encoding;
mod error;
mod kinematics;
mod quaternion;
mod recurrent;
mod representation;
mod transformer;

// Re-export model types
pub use critic::{CriticConfig, CriticEnsemble, SinglePoseCritic, WindowCritic, WindowScores};
pub use recurrent::{
    Decoder, InputEncoder, RecurrentInbetweener, RecurrentInbetweenerConfig, RecurrentState, StepInput,
    StepOutput,
};
pub use transformer::{
    SequenceOutput, TransformerInbetweener, TransformerInbetweenerConfig, unmasked_attention,
};

// Re-export tensor utilities
pub use encoding::TimeToArrivalEncoding;
pub use kinematics::Kinematics;
pub use quaternion::{cross, normalize_quaternions, quat_mul, quat_rotate};
pub use representation::{split_pose, vectorize_pose};

// Re-export checkpoint utilities
pub use checkpoint::{CheckpointFormat, load_checkpoint, load_record, save_checkpoint, save_record};

// Re-export error types
pub use error::{ModelError, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        CheckpointFormat, CriticConfig, CriticEnsemble, Kinematics, ModelError,
        RecurrentInbetweener, RecurrentInbetweenerConfig, RecurrentState, StepInput, StepOutput,
        TransformerInbetweener, TransformerInbetweenerConfig, load_checkpoint, save_checkpoint,
    };
}
