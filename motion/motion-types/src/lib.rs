//! Skeleton and pose types for motion in-betweening.
//!
//! This crate holds everything about poses that does not need a tensor
//! backend:
//!
//! # Kinematics
//!
//! - [`Skeleton`] - Joint tree with rest offsets and reference forward kinematics
//! - [`JointRemoval`] - Mapping from a recorded rig to a reduced skeleton
//! - [`Rig`] - Built-in LAFAN1 and SMPL (AMASS) rigs
//!
//! # Poses
//!
//! - [`PoseFrame`] - Root position plus local joint rotations
//! - [`PoseSequence`] - Labelled run of frames
//! - [`GlobalPose`] - World-space joint positions and rotations
//! - [`PoseLayout`] - Flat `[positions | rotations]` pose vectors
//!
//! # Interpolation
//!
//! - [`FeatureSequence`] - Pose vectors over time
//! - [`constant_hold`], [`lerp`], [`slerp`], [`nlerp`] - Masked-range fillers
//! - [`InterpolationMode`] - Named combination used for model inputs
//!
//! Quaternions are always `(w, x, y, z)` when flattened.
//!
//! # Example
//!
//! ```
//! use motion_types::{PoseFrame, Rig};
//!
//! let skeleton = Rig::Lafan.skeleton().unwrap();
//! let global = skeleton
//!     .forward_kinematics(&PoseFrame::rest(skeleton.joint_count()))
//!     .unwrap();
//! assert_eq!(global.joint_count(), 22);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
mod interpolation;
mod layout;
mod pose;
mod rigs;
mod skeleton;

pub use error::{MotionError, Result};
pub use interpolation::{
    FeatureSequence, InterpolationMode, constant_hold, lerp, nlerp, slerp,
};
pub use layout::PoseLayout;
pub use pose::{GlobalPose, PoseFrame, PoseSequence, quat_from_wxyz, quat_to_wxyz, unit_from_wxyz};
pub use rigs::Rig;
pub use skeleton::{JointRemoval, Skeleton};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        FeatureSequence, GlobalPose, InterpolationMode, JointRemoval, MotionError, PoseFrame,
        PoseLayout, PoseSequence, Rig, Skeleton,
    };
}
