//! Flat per-frame pose vectors.
//!
//! A pose vector is `[J * 3 positions | J * 4 rotations]`, rotations in
//! `(w, x, y, z)` order. Reshaping is exact in both directions; nothing is
//! renormalized here.

use nalgebra::{Quaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{MotionError, Result};
use crate::pose::{GlobalPose, quat_from_wxyz, quat_to_wxyz};

/// Channel layout of a pose vector for a fixed joint count.
///
/// # Example
///
/// ```
/// use motion_types::PoseLayout;
///
/// let layout = PoseLayout::new(22);
/// assert_eq!(layout.pos_dim(), 66);
/// assert_eq!(layout.rot_dim(), 88);
/// assert_eq!(layout.repr_dim(), 154);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoseLayout {
    /// Joints per frame.
    pub joints: usize,
}

impl PoseLayout {
    /// Creates a layout for `joints` joints.
    #[must_use]
    pub const fn new(joints: usize) -> Self {
        Self { joints }
    }

    /// Width of the position block.
    #[must_use]
    pub const fn pos_dim(&self) -> usize {
        self.joints * 3
    }

    /// Width of the rotation block.
    #[must_use]
    pub const fn rot_dim(&self) -> usize {
        self.joints * 4
    }

    /// Width of a whole pose vector.
    #[must_use]
    pub const fn repr_dim(&self) -> usize {
        self.pos_dim() + self.rot_dim()
    }

    /// Flattens positions and raw quaternions into one pose vector.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::ShapeMismatch` if either slice does not hold
    /// exactly one entry per joint.
    pub fn vectorize(&self, positions: &[Vector3<f32>], rotations: &[Quaternion<f32>]) -> Result<Vec<f32>> {
        if positions.len() != self.joints || rotations.len() != self.joints {
            return Err(MotionError::shape_mismatch(
                format!("{} positions and rotations", self.joints),
                format!("{} positions, {} rotations", positions.len(), rotations.len()),
            ));
        }
        let mut out = Vec::with_capacity(self.repr_dim());
        out.extend(positions.iter().flat_map(|p| [p.x, p.y, p.z]));
        out.extend(rotations.iter().flat_map(quat_to_wxyz));
        Ok(out)
    }

    /// Flattens a global pose.
    ///
    /// # Errors
    ///
    /// Same as [`PoseLayout::vectorize`].
    pub fn vectorize_global(&self, pose: &GlobalPose) -> Result<Vec<f32>> {
        let rotations: Vec<Quaternion<f32>> = pose.rotations.iter().map(|q| *q.quaternion()).collect();
        self.vectorize(&pose.positions, &rotations)
    }

    /// Splits a pose vector back into positions and raw quaternions.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::ShapeMismatch` if `flat` is not `repr_dim` long.
    pub fn devectorize(&self, flat: &[f32]) -> Result<(Vec<Vector3<f32>>, Vec<Quaternion<f32>>)> {
        self.check_len(flat)?;
        let (pos, rot) = flat.split_at(self.pos_dim());
        let positions = pos
            .chunks_exact(3)
            .map(|c| Vector3::new(c[0], c[1], c[2]))
            .collect();
        let rotations = rot
            .chunks_exact(4)
            .map(|c| quat_from_wxyz([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok((positions, rotations))
    }

    /// Returns an error unless `flat` has `repr_dim` entries.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::ShapeMismatch` on a length mismatch.
    pub fn check_len(&self, flat: &[f32]) -> Result<()> {
        if flat.len() == self.repr_dim() {
            Ok(())
        } else {
            Err(MotionError::shape_mismatch(
                format!("pose vector of {}", self.repr_dim()),
                format!("{}", flat.len()),
            ))
        }
    }
}
