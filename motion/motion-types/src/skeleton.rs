//! Joint hierarchy and host-side forward kinematics.
//!
//! Joints are stored in topological order: the root is joint 0 and every
//! other joint's parent has a smaller index. A single forward pass over the
//! joints therefore visits every parent before its children.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{MotionError, Result};
use crate::pose::{GlobalPose, PoseFrame};

/// Kinematic tree with rest offsets.
///
/// # Example
///
/// ```
/// use motion_types::Skeleton;
/// use nalgebra::Vector3;
///
/// let skeleton = Skeleton::from_parent_indices(
///     vec!["hips".into(), "spine".into()],
///     &[-1, 0],
///     vec![Vector3::zeros(), Vector3::new(0.0, 10.0, 0.0)],
/// )
/// .unwrap();
/// assert_eq!(skeleton.joint_count(), 2);
/// assert_eq!(skeleton.parent(1), Some(0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    names: Vec<String>,
    parents: Vec<Option<usize>>,
    offsets: Vec<Vector3<f32>>,
}

impl Skeleton {
    /// Creates a skeleton, validating the tree invariants.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::InvalidSkeleton` if the arrays differ in length,
    /// joint 0 is not the only root, or a parent index is not smaller than
    /// its child's.
    pub fn new(
        names: Vec<String>,
        parents: Vec<Option<usize>>,
        offsets: Vec<Vector3<f32>>,
    ) -> Result<Self> {
        if names.len() != parents.len() || offsets.len() != parents.len() {
            return Err(MotionError::invalid_skeleton(format!(
                "{} names, {} parents, {} offsets",
                names.len(),
                parents.len(),
                offsets.len()
            )));
        }
        if parents.is_empty() {
            return Err(MotionError::invalid_skeleton("no joints"));
        }
        for (joint, parent) in parents.iter().enumerate() {
            match (joint, parent) {
                (0, None) => {}
                (0, Some(p)) => {
                    return Err(MotionError::invalid_skeleton(format!(
                        "root joint has parent {p}"
                    )));
                }
                (j, None) => {
                    return Err(MotionError::invalid_skeleton(format!(
                        "joint {j} is a second root"
                    )));
                }
                (j, Some(p)) if *p >= j => {
                    return Err(MotionError::invalid_skeleton(format!(
                        "parent {p} of joint {j} is not earlier in order"
                    )));
                }
                _ => {}
            }
        }
        Ok(Self {
            names,
            parents,
            offsets,
        })
    }

    /// Creates a skeleton from signed parent indices where `-1` marks the root.
    ///
    /// # Errors
    ///
    /// Same as [`Skeleton::new`].
    pub fn from_parent_indices(
        names: Vec<String>,
        parents: &[i32],
        offsets: Vec<Vector3<f32>>,
    ) -> Result<Self> {
        let parents = parents
            .iter()
            .map(|&p| usize::try_from(p).ok())
            .collect();
        Self::new(names, parents, offsets)
    }

    /// Number of joints.
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.parents.len()
    }

    /// Joint names in index order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Parent of every joint (`None` for the root).
    #[must_use]
    pub fn parents(&self) -> &[Option<usize>] {
        &self.parents
    }

    /// Parent indices with `-1` for the root.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn parent_indices(&self) -> Vec<i32> {
        self.parents
            .iter()
            .map(|p| p.map_or(-1, |p| p as i32))
            .collect()
    }

    /// Rest offsets in parent space.
    #[must_use]
    pub fn offsets(&self) -> &[Vector3<f32>] {
        &self.offsets
    }

    /// Parent of `joint`, `None` for the root or an out-of-range index.
    #[must_use]
    pub fn parent(&self, joint: usize) -> Option<usize> {
        self.parents.get(joint).copied().flatten()
    }

    /// Direct children of `joint`.
    #[must_use]
    pub fn children(&self, joint: usize) -> Vec<usize> {
        self.parents
            .iter()
            .enumerate()
            .filter_map(|(child, p)| (*p == Some(joint)).then_some(child))
            .collect()
    }

    /// Looks up a joint by name.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Computes world positions and rotations for one frame.
    ///
    /// The root takes the frame's root position and its own local rotation.
    /// Every other joint composes `R_g[j] = R_g[p] * R_l[j]` and
    /// `P_g[j] = P_g[p] + R_g[p] * offset[j]`.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::ShapeMismatch` if the frame's joint count
    /// differs from the skeleton's.
    pub fn forward_kinematics(&self, frame: &PoseFrame) -> Result<GlobalPose> {
        if frame.joint_count() != self.joint_count() {
            return Err(MotionError::shape_mismatch(
                format!("{} joints", self.joint_count()),
                format!("{} joints", frame.joint_count()),
            ));
        }

        let mut positions: Vec<Vector3<f32>> = Vec::with_capacity(self.joint_count());
        let mut rotations: Vec<UnitQuaternion<f32>> = Vec::with_capacity(self.joint_count());
        for (joint, parent) in self.parents.iter().enumerate() {
            let local = frame.local_rotations[joint];
            match parent {
                None => {
                    positions.push(frame.root_position);
                    rotations.push(local);
                }
                Some(p) => {
                    let parent_rotation = rotations[*p];
                    let offset = parent_rotation.transform_vector(&self.offsets[joint]);
                    positions.push(positions[*p] + offset);
                    rotations.push(parent_rotation * local);
                }
            }
        }

        Ok(GlobalPose {
            positions,
            rotations,
        })
    }

    /// Removes joints, re-parenting their children to the nearest surviving
    /// ancestor.
    ///
    /// A re-parented child's offset absorbs the offsets of every removed
    /// joint between it and its new parent. That is exact in the rest pose
    /// and whenever the removed joints carry identity local rotations; a
    /// rotated interior joint moves its re-parented children. Removing only
    /// leaves (see [`JointRemoval::is_leaf_only`]) is exact for every pose.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::UnknownJoint` for an out-of-range index and
    /// `MotionError::InvalidSkeleton` when asked to remove the root.
    pub fn remove_joints(&self, removed: &[usize]) -> Result<JointRemoval> {
        let count = self.joint_count();
        if let Some(bad) = removed.iter().find(|&&j| j >= count) {
            return Err(MotionError::unknown_joint(format!("index {bad}")));
        }
        if removed.contains(&0) {
            return Err(MotionError::invalid_skeleton("cannot remove the root joint"));
        }

        let is_removed: Vec<bool> = (0..count).map(|j| removed.contains(&j)).collect();
        let mut new_index: Vec<Option<usize>> = vec![None; count];
        let mut kept = Vec::with_capacity(count);
        for joint in 0..count {
            if !is_removed[joint] {
                new_index[joint] = Some(kept.len());
                kept.push(joint);
            }
        }

        let mut names = Vec::with_capacity(kept.len());
        let mut parents = Vec::with_capacity(kept.len());
        let mut offsets = Vec::with_capacity(kept.len());
        let mut absorbed = Vec::with_capacity(kept.len());
        for &joint in &kept {
            let mut offset = self.offsets[joint];
            let mut chain = Vec::new();
            let mut parent = self.parents[joint];
            while let Some(p) = parent {
                if !is_removed[p] {
                    break;
                }
                offset += self.offsets[p];
                chain.push(p);
                parent = self.parents[p];
            }
            chain.reverse();
            names.push(self.names[joint].clone());
            parents.push(parent.and_then(|p| new_index[p]));
            offsets.push(offset);
            absorbed.push(chain);
        }

        Ok(JointRemoval {
            skeleton: Self::new(names, parents, offsets)?,
            kept,
            absorbed,
            original_count: count,
        })
    }

    /// Removes joints by name.
    ///
    /// # Errors
    ///
    /// Returns `MotionError::UnknownJoint` for a name not in the skeleton,
    /// otherwise as [`Skeleton::remove_joints`].
    pub fn remove_joints_by_name(&self, names: &[&str]) -> Result<JointRemoval> {
        let indices = names
            .iter()
            .map(|name| {
                self.index_of(name)
                    .ok_or_else(|| MotionError::unknown_joint(*name))
            })
            .collect::<Result<Vec<_>>>()?;
        self.remove_joints(&indices)
    }
}

/// Result of [`Skeleton::remove_joints`]: the reduced skeleton plus the
/// mapping needed to reduce pose frames recorded on the full skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct JointRemoval {
    skeleton: Skeleton,
    kept: Vec<usize>,
    absorbed: Vec<Vec<usize>>,
    original_count: usize,
}

impl JointRemoval {
    /// The reduced skeleton.
    #[must_use]
    pub const fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    /// Consumes the removal, returning the reduced skeleton.
    #[must_use]
    pub fn into_skeleton(self) -> Skeleton {
        self.skeleton
    }

    /// Original index of each surviving joint.
    #[must_use]
    pub fn kept(&self) -> &[usize] {
        &self.kept
    }

    /// Returns true if no surviving joint was re-parented, so reduced
    /// frames reproduce every surviving joint's world transform.
    #[must_use]
    pub fn is_leaf_only(&self) -> bool {
        self.absorbed.iter().all(Vec::is_empty)
    }

    /// Reduces a full-skeleton frame to the surviving joints.
    ///
    /// Local rotations of removed ancestors are folded into their nearest
    /// surviving descendant so world rotations are preserved. World
    /// positions are preserved only under the conditions listed on
    /// [`Skeleton::remove_joints`].
    ///
    /// # Errors
    ///
    /// Returns `MotionError::ShapeMismatch` if the frame does not match the
    /// original skeleton.
    pub fn reduce_frame(&self, frame: &PoseFrame) -> Result<PoseFrame> {
        if frame.joint_count() != self.original_count {
            return Err(MotionError::shape_mismatch(
                format!("{} joints", self.original_count),
                format!("{} joints", frame.joint_count()),
            ));
        }
        let local_rotations = self
            .kept
            .iter()
            .zip(&self.absorbed)
            .map(|(&joint, chain)| {
                chain
                    .iter()
                    .fold(UnitQuaternion::identity(), |acc, &p| acc * frame.local_rotations[p])
                    * frame.local_rotations[joint]
            })
            .collect();
        Ok(PoseFrame::new(frame.root_position, local_rotations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    fn chain() -> Skeleton {
        Skeleton::from_parent_indices(
            vec!["root".into(), "a".into(), "b".into(), "c".into()],
            &[-1, 0, 1, 2],
            vec![
                Vector3::zeros(),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 2.0, 0.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn rejects_parent_after_child() {
        let result = Skeleton::from_parent_indices(
            vec!["r".into(), "a".into(), "b".into()],
            &[-1, 2, 0],
            vec![Vector3::zeros(); 3],
        );
        assert!(matches!(result, Err(MotionError::InvalidSkeleton(_))));
    }

    #[test]
    fn rejects_second_root() {
        let result = Skeleton::from_parent_indices(
            vec!["r".into(), "a".into()],
            &[-1, -1],
            vec![Vector3::zeros(); 2],
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_length_mismatch() {
        let result = Skeleton::new(vec!["r".into()], vec![None], Vec::new());
        assert!(result.is_err());
    }

    #[test]
    fn three_joint_chain_from_offset_root() {
        let skeleton = Skeleton::from_parent_indices(
            vec!["root".into(), "child".into(), "grandchild".into()],
            &[-1, 0, 1],
            vec![
                Vector3::zeros(),
                Vector3::new(0.0, 1.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            ],
        )
        .unwrap();
        let mut frame = PoseFrame::rest(3);
        frame.root_position = Vector3::new(1.0, 0.0, 0.0);
        let global = skeleton.forward_kinematics(&frame).unwrap();

        assert_relative_eq!(global.positions[0], Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(global.positions[1], Vector3::new(1.0, 1.0, 0.0));
        assert_relative_eq!(global.positions[2], Vector3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn identity_pose_accumulates_offsets() {
        let skeleton = chain();
        let mut frame = PoseFrame::rest(4);
        frame.root_position = Vector3::new(0.0, 0.0, 5.0);
        let global = skeleton.forward_kinematics(&frame).unwrap();

        assert_relative_eq!(global.positions[0], Vector3::new(0.0, 0.0, 5.0));
        assert_relative_eq!(global.positions[1], Vector3::new(1.0, 0.0, 5.0));
        assert_relative_eq!(global.positions[2], Vector3::new(2.0, 0.0, 5.0));
        assert_relative_eq!(global.positions[3], Vector3::new(2.0, 2.0, 5.0));
        for rotation in &global.rotations {
            assert_relative_eq!(rotation.angle(), 0.0);
        }
    }

    #[test]
    fn rotation_propagates_to_descendants() {
        let skeleton = chain();
        let mut frame = PoseFrame::rest(4);
        frame.local_rotations[1] = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        let global = skeleton.forward_kinematics(&frame).unwrap();

        assert_relative_eq!(global.positions[1], Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(global.positions[2], Vector3::new(1.0, 1.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(global.positions[3], Vector3::new(-1.0, 1.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(global.rotations[3].angle(), FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn fk_rejects_wrong_joint_count() {
        let skeleton = chain();
        assert!(skeleton.forward_kinematics(&PoseFrame::rest(3)).is_err());
    }

    #[test]
    fn remove_middle_joint_reparents_and_composes_offset() {
        let skeleton = chain();
        let removal = skeleton.remove_joints(&[2]).unwrap();
        let reduced = removal.skeleton();

        assert_eq!(reduced.joint_count(), 3);
        assert_eq!(reduced.parents(), &[None, Some(0), Some(1)]);
        assert_relative_eq!(reduced.offsets()[2], Vector3::new(1.0, 2.0, 0.0));
        assert_eq!(removal.kept(), &[0, 1, 3]);
    }

    #[test]
    fn remove_joints_preserves_rest_positions() {
        let skeleton = chain();
        let full = skeleton.forward_kinematics(&PoseFrame::rest(4)).unwrap();
        let removal = skeleton.remove_joints(&[1, 2]).unwrap();
        let reduced = removal
            .skeleton()
            .forward_kinematics(&PoseFrame::rest(2))
            .unwrap();
        assert_relative_eq!(reduced.positions[1], full.positions[3]);
    }

    #[test]
    fn reduce_frame_folds_removed_rotations() {
        let skeleton = chain();
        let mut frame = PoseFrame::rest(4);
        frame.local_rotations[2] = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.3);
        let removal = skeleton.remove_joints(&[2]).unwrap();
        let reduced = removal.reduce_frame(&frame).unwrap();

        let full = skeleton.forward_kinematics(&frame).unwrap();
        let small = removal.skeleton().forward_kinematics(&reduced).unwrap();
        assert_relative_eq!(
            small.rotations[2].angle_to(&full.rotations[3]),
            0.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn leaf_removal_is_exact_for_rotated_poses() {
        let skeleton = chain();
        let mut frame = PoseFrame::rest(4);
        frame.root_position = Vector3::new(0.5, -1.0, 2.0);
        for (j, q) in frame.local_rotations.iter_mut().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let angle = 0.4 + j as f32 * 0.3;
            *q = UnitQuaternion::from_euler_angles(angle, -angle, 0.5 * angle);
        }
        let removal = skeleton.remove_joints(&[3]).unwrap();
        assert!(removal.is_leaf_only());

        let full = skeleton.forward_kinematics(&frame).unwrap();
        let reduced = removal.reduce_frame(&frame).unwrap();
        let small = removal.skeleton().forward_kinematics(&reduced).unwrap();
        for j in 0..3 {
            assert_relative_eq!(small.positions[j], full.positions[j], epsilon = 1e-5);
        }
    }

    #[test]
    fn interior_removal_reparents() {
        assert!(!chain().remove_joints(&[2]).unwrap().is_leaf_only());
    }

    #[test]
    fn cannot_remove_root() {
        assert!(chain().remove_joints(&[0]).is_err());
        assert!(chain().remove_joints(&[9]).is_err());
    }

    #[test]
    fn remove_by_name() {
        let removal = chain().remove_joints_by_name(&["c"]).unwrap();
        assert_eq!(removal.skeleton().joint_count(), 3);
        assert!(chain().remove_joints_by_name(&["missing"]).is_err());
    }

    #[test]
    fn children_and_lookup() {
        let skeleton = chain();
        assert_eq!(skeleton.children(1), vec![2]);
        assert_eq!(skeleton.index_of("b"), Some(2));
        assert_eq!(skeleton.parent_indices(), vec![-1, 0, 1, 2]);
    }
}
