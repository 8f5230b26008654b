//! Pose frames, sequences and derived global poses.
//!
//! Quaternions are exchanged with flat arrays and tensors in `(w, x, y, z)`
//! order. nalgebra stores coordinates as `[i, j, k, w]`, so conversions go
//! through [`quat_to_wxyz`] and [`quat_from_wxyz`] and never through
//! `coords` directly.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{MotionError, Result};

/// Converts a quaternion to `[w, x, y, z]`.
#[must_use]
pub fn quat_to_wxyz(q: &Quaternion<f32>) -> [f32; 4] {
    [q.w, q.i, q.j, q.k]
}

/// Builds a raw (possibly unnormalized) quaternion from `[w, x, y, z]`.
#[must_use]
pub fn quat_from_wxyz(q: [f32; 4]) -> Quaternion<f32> {
    Quaternion::new(q[0], q[1], q[2], q[3])
}

/// Normalizes `[w, x, y, z]` into a unit quaternion.
///
/// A zero quaternion maps to identity.
#[must_use]
pub fn unit_from_wxyz(q: [f32; 4]) -> UnitQuaternion<f32> {
    let raw = quat_from_wxyz(q);
    if raw.norm_squared() <= f32::EPSILON {
        UnitQuaternion::identity()
    } else {
        UnitQuaternion::from_quaternion(raw)
    }
}

/// One animation frame: root translation plus per-joint local rotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    /// World-space root translation.
    pub root_position: Vector3<f32>,

    /// Parent-relative rotation of every joint, root first.
    pub local_rotations: Vec<UnitQuaternion<f32>>,
}

impl PoseFrame {
    /// Creates a frame.
    #[must_use]
    pub fn new(root_position: Vector3<f32>, local_rotations: Vec<UnitQuaternion<f32>>) -> Self {
        Self {
            root_position,
            local_rotations,
        }
    }

    /// Rest pose: origin root and identity rotations.
    #[must_use]
    pub fn rest(joint_count: usize) -> Self {
        Self {
            root_position: Vector3::zeros(),
            local_rotations: vec![UnitQuaternion::identity(); joint_count],
        }
    }

    /// Number of joints.
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.local_rotations.len()
    }

    /// Adds a root displacement and per-joint quaternion deltas, then
    /// renormalizes every rotation.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::ShapeMismatch` if the delta count differs from
    /// the joint count.
    pub fn apply_delta(&mut self, root_delta: Vector3<f32>, rotation_deltas: &[[f32; 4]]) -> Result<()> {
        if rotation_deltas.len() != self.local_rotations.len() {
            return Err(MotionError::shape_mismatch(
                format!("{} rotation deltas", self.local_rotations.len()),
                format!("{}", rotation_deltas.len()),
            ));
        }
        self.root_position += root_delta;
        for (rotation, delta) in self.local_rotations.iter_mut().zip(rotation_deltas) {
            let sum = rotation.into_inner() + quat_from_wxyz(*delta);
            *rotation = unit_from_wxyz(quat_to_wxyz(&sum));
        }
        Ok(())
    }

    /// Flattens local rotations to `[J * 4]` in `(w, x, y, z)` order.
    #[must_use]
    pub fn local_rotations_wxyz(&self) -> Vec<f32> {
        self.local_rotations
            .iter()
            .flat_map(|q| quat_to_wxyz(q.quaternion()))
            .collect()
    }
}

/// Global (world-space) pose of every joint, derived from a frame by
/// forward kinematics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalPose {
    /// World position per joint.
    pub positions: Vec<Vector3<f32>>,

    /// World rotation per joint.
    pub rotations: Vec<UnitQuaternion<f32>>,
}

impl GlobalPose {
    /// Number of joints.
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.positions.len()
    }
}

/// Fixed-length run of frames with a category label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseSequence {
    /// Frames in playback order.
    pub frames: Vec<PoseFrame>,

    /// Motion category (e.g. "walk", "dance").
    pub category: String,
}

impl PoseSequence {
    /// Creates a sequence, checking every frame has the same joint count.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::InvalidSequence` for an empty sequence and
    /// `MotionError::ShapeMismatch` for ragged frames.
    pub fn new(frames: Vec<PoseFrame>, category: impl Into<String>) -> Result<Self> {
        let Some(first) = frames.first() else {
            return Err(MotionError::invalid_sequence("sequence has no frames"));
        };
        let joints = first.joint_count();
        if let Some((index, frame)) = frames
            .iter()
            .enumerate()
            .find(|(_, f)| f.joint_count() != joints)
        {
            return Err(MotionError::shape_mismatch(
                format!("{joints} joints"),
                format!("{} joints at frame {index}", frame.joint_count()),
            ));
        }
        Ok(Self {
            frames,
            category: category.into(),
        })
    }

    /// Number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns true if the sequence has no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Joints per frame.
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.frames.first().map_or(0, PoseFrame::joint_count)
    }

    /// Copies frames `[start, start + len)` into a new sequence.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::InvalidSequence` if the range is out of bounds
    /// or empty.
    pub fn window(&self, start: usize, len: usize) -> Result<Self> {
        if len == 0 || start + len > self.frames.len() {
            return Err(MotionError::invalid_sequence(format!(
                "window [{start}, {}) outside {} frames",
                start + len,
                self.frames.len()
            )));
        }
        Ok(Self {
            frames: self.frames[start..start + len].to_vec(),
            category: self.category.clone(),
        })
    }

    /// Root displacement between consecutive frames.
    ///
    /// Entry `t` is `root[t + 1] - root[t]`; the last entry repeats the
    /// previous one so the result has one velocity per frame.
    #[must_use]
    pub fn root_velocities(&self) -> Vec<Vector3<f32>> {
        let n = self.frames.len();
        let mut velocities: Vec<Vector3<f32>> = self
            .frames
            .windows(2)
            .map(|w| w[1].root_position - w[0].root_position)
            .collect();
        match velocities.last().copied() {
            Some(last) => velocities.push(last),
            None if n == 1 => velocities.push(Vector3::zeros()),
            None => {}
        }
        velocities
    }
}
