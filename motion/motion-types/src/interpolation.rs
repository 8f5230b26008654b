//! Keyframe interpolation over pose-vector sequences.
//!
//! Every operation rewrites frames `[mask_start, len - 1)` from the two
//! boundary frames `mask_start` and `len - 1`. Frame `mask_start` is the
//! source keyframe and keeps its values, as do the first and last frames, so
//! a `mask_start` of `len - 2` leaves the sequence unchanged.

use std::str::FromStr;

use nalgebra::UnitQuaternion;
use serde::{Deserialize, Serialize};

use crate::error::{MotionError, Result};
use crate::layout::PoseLayout;
use crate::pose::{quat_to_wxyz, unit_from_wxyz};

/// Sequence of pose vectors sharing one layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSequence {
    layout: PoseLayout,
    frames: Vec<Vec<f32>>,
}

impl FeatureSequence {
    /// Creates a sequence, checking every frame against the layout.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::InvalidSequence` for an empty sequence and
    /// `MotionError::ShapeMismatch` for a frame of the wrong width.
    pub fn new(layout: PoseLayout, frames: Vec<Vec<f32>>) -> Result<Self> {
        if frames.is_empty() {
            return Err(MotionError::invalid_sequence("sequence has no frames"));
        }
        for frame in &frames {
            layout.check_len(frame)?;
        }
        Ok(Self { layout, frames })
    }

    /// Channel layout.
    #[must_use]
    pub const fn layout(&self) -> PoseLayout {
        self.layout
    }

    /// Frames in order.
    #[must_use]
    pub fn frames(&self) -> &[Vec<f32>] {
        &self.frames
    }

    /// Consumes the sequence, returning its frames.
    #[must_use]
    pub fn into_frames(self) -> Vec<Vec<f32>> {
        self.frames
    }

    /// Number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false; construction rejects empty sequences.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames as one row-major `[len * repr_dim]` buffer.
    #[must_use]
    pub fn to_flat(&self) -> Vec<f32> {
        self.frames.concat()
    }

    fn masked_range(&self, mask_start: usize) -> Result<std::ops::Range<usize>> {
        let len = self.frames.len();
        if len < 2 {
            return Err(MotionError::invalid_interpolation(format!(
                "need at least 2 frames, got {len}"
            )));
        }
        if mask_start >= len - 1 {
            return Err(MotionError::invalid_interpolation(format!(
                "mask start {mask_start} outside [0, {})",
                len - 1
            )));
        }
        Ok(mask_start..len - 1)
    }
}

#[allow(clippy::cast_precision_loss)]
fn blend_weight(frame: usize, mask_start: usize, last: usize) -> f32 {
    (frame - mask_start) as f32 / (last - mask_start) as f32
}

/// Holds frame `mask_start` over the masked range.
///
/// # Errors
///
/// Returns `MotionError::InvalidInterpolation` if the sequence has fewer than
/// two frames or `mask_start >= len - 1`.
pub fn constant_hold(sequence: &FeatureSequence, mask_start: usize) -> Result<FeatureSequence> {
    let range = sequence.masked_range(mask_start)?;
    let mut frames = sequence.frames.clone();
    let held = frames[mask_start].clone();
    for frame in &mut frames[range] {
        frame.clone_from(&held);
    }
    Ok(FeatureSequence {
        layout: sequence.layout,
        frames,
    })
}

/// Linearly interpolates the position channels over the masked range.
///
/// Frame `i` receives weight `(i - mask_start) / (len - 1 - mask_start)`
/// toward the last frame. Rotation channels are left untouched.
///
/// # Errors
///
/// Same as [`constant_hold`].
pub fn lerp(sequence: &FeatureSequence, mask_start: usize) -> Result<FeatureSequence> {
    let range = sequence.masked_range(mask_start)?;
    let pos_dim = sequence.layout.pos_dim();
    let last = sequence.len() - 1;
    let start = sequence.frames[mask_start][..pos_dim].to_vec();
    let end = sequence.frames[last][..pos_dim].to_vec();

    let mut frames = sequence.frames.clone();
    for i in range.skip(1) {
        let t = blend_weight(i, mask_start, last);
        for (c, value) in frames[i][..pos_dim].iter_mut().enumerate() {
            *value = start[c] + (end[c] - start[c]) * t;
        }
    }
    Ok(FeatureSequence {
        layout: sequence.layout,
        frames,
    })
}

/// Spherically interpolates every joint's rotation over the masked range.
///
/// Takes the shorter arc and writes unit quaternions. Position channels are
/// left untouched.
///
/// # Errors
///
/// Same as [`constant_hold`].
pub fn slerp(sequence: &FeatureSequence, mask_start: usize) -> Result<FeatureSequence> {
    blend_rotations(sequence, mask_start, |a, b, t| {
        a.try_slerp(b, t, 1e-6).unwrap_or_else(|| a.nlerp(b, t))
    })
}

/// Normalized linear interpolation of every joint's rotation.
///
/// # Errors
///
/// Same as [`constant_hold`].
pub fn nlerp(sequence: &FeatureSequence, mask_start: usize) -> Result<FeatureSequence> {
    blend_rotations(sequence, mask_start, |a, b, t| a.nlerp(b, t))
}

fn blend_rotations<F>(sequence: &FeatureSequence, mask_start: usize, blend: F) -> Result<FeatureSequence>
where
    F: Fn(&UnitQuaternion<f32>, &UnitQuaternion<f32>, f32) -> UnitQuaternion<f32>,
{
    let range = sequence.masked_range(mask_start)?;
    let layout = sequence.layout;
    let pos_dim = layout.pos_dim();
    let last = sequence.len() - 1;

    let joint_rotation = |frame: &[f32], joint: usize| {
        let base = pos_dim + joint * 4;
        unit_from_wxyz([frame[base], frame[base + 1], frame[base + 2], frame[base + 3]])
    };

    let mut frames = sequence.frames.clone();
    for joint in 0..layout.joints {
        let start = joint_rotation(&sequence.frames[mask_start], joint);
        let mut end = joint_rotation(&sequence.frames[last], joint);
        if start.coords.dot(&end.coords) < 0.0 {
            end = UnitQuaternion::new_unchecked(-end.into_inner());
        }
        for i in range.clone().skip(1) {
            let t = blend_weight(i, mask_start, last);
            let q = blend(&start, &end, t);
            let base = pos_dim + joint * 4;
            frames[i][base..base + 4].copy_from_slice(&quat_to_wxyz(q.quaternion()));
        }
    }
    Ok(FeatureSequence { layout, frames })
}

/// How masked frames are filled before being fed to the model.
///
/// # Example
///
/// ```
/// use motion_types::InterpolationMode;
///
/// let mode: InterpolationMode = "slerp".parse().unwrap();
/// assert_eq!(mode, InterpolationMode::Slerp);
/// assert!("cubic".parse::<InterpolationMode>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMode {
    /// Hold the first masked frame.
    Constant,

    /// Lerp positions, nlerp rotations.
    Lerp,

    /// Lerp positions, slerp rotations.
    #[default]
    Slerp,
}

impl InterpolationMode {
    /// Fills the masked range according to the mode.
    ///
    /// # Errors
    ///
    /// Same as [`constant_hold`].
    pub fn apply(&self, sequence: &FeatureSequence, mask_start: usize) -> Result<FeatureSequence> {
        match self {
            Self::Constant => constant_hold(sequence, mask_start),
            Self::Lerp => nlerp(&lerp(sequence, mask_start)?, mask_start),
            Self::Slerp => slerp(&lerp(sequence, mask_start)?, mask_start),
        }
    }

    /// Returns the mode name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::Lerp => "lerp",
            Self::Slerp => "slerp",
        }
    }
}

impl std::fmt::Display for InterpolationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for InterpolationMode {
    type Err = MotionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "constant" => Ok(Self::Constant),
            "lerp" => Ok(Self::Lerp),
            "slerp" => Ok(Self::Slerp),
            other => Err(MotionError::invalid_interpolation(format!(
                "unknown mode '{other}'"
            ))),
        }
    }
}
