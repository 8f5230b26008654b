//! Batched forward kinematics on tensors.

use burn::prelude::Backend;
use burn::tensor::{Tensor, TensorData};
use motion_types::Skeleton;

use crate::error::{ModelError, Result};
use crate::quaternion::{quat_mul, quat_rotate};

/// Forward-kinematics engine for one skeleton.
///
/// Built once per training session; holds the parent table and the rest
/// offsets as a `[J, 3]` tensor on the session device. Input rotations are
/// used as given, so callers normalize predicted quaternions first.
#[derive(Debug, Clone)]
pub struct Kinematics<B: Backend> {
    parents: Vec<Option<usize>>,
    offsets: Tensor<B, 2>,
}

impl<B: Backend> Kinematics<B> {
    /// Uploads a skeleton to `device`.
    #[must_use]
    pub fn new(skeleton: &Skeleton, device: &B::Device) -> Self {
        let joints = skeleton.joint_count();
        let flat: Vec<f32> = skeleton
            .offsets()
            .iter()
            .flat_map(|o| [o.x, o.y, o.z])
            .collect();
        Self {
            parents: skeleton.parents().to_vec(),
            offsets: Tensor::from_data(TensorData::new(flat, [joints, 3]), device),
        }
    }

    /// Number of joints.
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.parents.len()
    }

    /// Computes global joint positions and rotations.
    ///
    /// - `local_rotations`: `[N, J, 4]`
    /// - `root_positions`: `[N, 3]`
    ///
    /// Returns positions `[N, J, 3]` and rotations `[N, J, 4]`.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ShapeMismatch` if `J` differs from the skeleton or
    /// the batch sizes disagree.
    pub fn forward(
        &self,
        local_rotations: Tensor<B, 3>,
        root_positions: Tensor<B, 2>,
    ) -> Result<(Tensor<B, 3>, Tensor<B, 3>)> {
        let [n, joints, width] = local_rotations.dims();
        let [root_n, root_width] = root_positions.dims();
        if joints != self.joint_count() || width != 4 || root_n != n || root_width != 3 {
            return Err(ModelError::shape_mismatch(
                format!("[{n}, {}, 4] rotations and [{n}, 3] roots", self.joint_count()),
                format!("[{n}, {joints}, {width}] and [{root_n}, {root_width}]"),
            ));
        }

        let mut positions: Vec<Tensor<B, 2>> = Vec::with_capacity(joints);
        let mut rotations: Vec<Tensor<B, 2>> = Vec::with_capacity(joints);
        for (joint, parent) in self.parents.iter().enumerate() {
            let local = local_rotations.clone().narrow(1, joint, 1).reshape([n, 4]);
            match parent {
                None => {
                    positions.push(root_positions.clone());
                    rotations.push(local);
                }
                Some(p) => {
                    let parent_rotation = rotations[*p].clone();
                    let offset = self.offsets.clone().narrow(0, joint, 1);
                    let position =
                        positions[*p].clone() + quat_rotate(parent_rotation.clone(), offset);
                    positions.push(position);
                    rotations.push(quat_mul(parent_rotation, local));
                }
            }
        }

        Ok((Tensor::stack(positions, 1), Tensor::stack(rotations, 1)))
    }

    /// Sequence form of [`Kinematics::forward`].
    ///
    /// - `local_rotations`: `[B, T, J, 4]`
    /// - `root_positions`: `[B, T, 3]`
    ///
    /// Returns positions `[B, T, J, 3]` and rotations `[B, T, J, 4]`.
    ///
    /// # Errors
    ///
    /// Same as [`Kinematics::forward`].
    pub fn forward_sequence(
        &self,
        local_rotations: Tensor<B, 4>,
        root_positions: Tensor<B, 3>,
    ) -> Result<(Tensor<B, 4>, Tensor<B, 4>)> {
        let [batch, frames, joints, width] = local_rotations.dims();
        let [root_batch, root_frames, root_width] = root_positions.dims();
        if root_batch != batch || root_frames != frames {
            return Err(ModelError::shape_mismatch(
                format!("[{batch}, {frames}, 3] roots"),
                format!("[{root_batch}, {root_frames}, {root_width}]"),
            ));
        }
        let n = batch * frames;
        let (positions, rotations) = self.forward(
            local_rotations.reshape([n, joints, width]),
            root_positions.reshape([n, root_width]),
        )?;
        Ok((
            positions.reshape([batch, frames, joints, 3]),
            rotations.reshape([batch, frames, joints, 4]),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use burn_ndarray::NdArray;
    use motion_types::{PoseFrame, Rig};
    use nalgebra::{UnitQuaternion, Vector3};

    type TestBackend = NdArray<f32>;

    fn random_frame(joints: usize, seed: f32) -> PoseFrame {
        #[allow(clippy::cast_precision_loss)]
        let rotations = (0..joints)
            .map(|j| {
                let s = seed + j as f32 * 0.37;
                UnitQuaternion::from_euler_angles(s.sin(), (s * 1.3).cos() * 0.5, s * 0.2)
            })
            .collect();
        PoseFrame::new(Vector3::new(seed, 90.0, -seed), rotations)
    }

    #[test]
    fn matches_host_forward_kinematics() {
        let device = <TestBackend as Backend>::Device::default();
        let skeleton = Rig::Lafan.skeleton().unwrap();
        let joints = skeleton.joint_count();
        let frames = [random_frame(joints, 0.5), random_frame(joints, -1.2)];
        let fk = Kinematics::<TestBackend>::new(&skeleton, &device);

        let rot: Vec<f32> = frames.iter().flat_map(PoseFrame::local_rotations_wxyz).collect();
        let root: Vec<f32> = frames
            .iter()
            .flat_map(|f| [f.root_position.x, f.root_position.y, f.root_position.z])
            .collect();
        let (positions, rotations) = fk
            .forward(
                Tensor::from_data(TensorData::new(rot, [2, joints, 4]), &device),
                Tensor::from_data(TensorData::new(root, [2, 3]), &device),
            )
            .unwrap();
        assert_eq!(positions.dims(), [2, joints, 3]);
        assert_eq!(rotations.dims(), [2, joints, 4]);

        let positions = positions.into_data().to_vec::<f32>().unwrap();
        let rotations = rotations.into_data().to_vec::<f32>().unwrap();
        for (n, frame) in frames.iter().enumerate() {
            let host = skeleton.forward_kinematics(frame).unwrap();
            for j in 0..joints {
                let base = (n * joints + j) * 3;
                assert_relative_eq!(positions[base], host.positions[j].x, epsilon = 1e-3);
                assert_relative_eq!(positions[base + 1], host.positions[j].y, epsilon = 1e-3);
                assert_relative_eq!(positions[base + 2], host.positions[j].z, epsilon = 1e-3);

                let q = host.rotations[j].quaternion();
                let base = (n * joints + j) * 4;
                let dot = rotations[base] * q.w
                    + rotations[base + 1] * q.i
                    + rotations[base + 2] * q.j
                    + rotations[base + 3] * q.k;
                assert_relative_eq!(dot.abs(), 1.0, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn identity_rotations_place_joints_at_rest_offsets() {
        let device = <TestBackend as Backend>::Device::default();
        let skeleton = Rig::Amass.skeleton().unwrap();
        let joints = skeleton.joint_count();
        let fk = Kinematics::<TestBackend>::new(&skeleton, &device);
        let rest = PoseFrame::rest(joints);

        let (positions, _) = fk
            .forward(
                Tensor::from_data(TensorData::new(rest.local_rotations_wxyz(), [1, joints, 4]), &device),
                Tensor::zeros([1, 3], &device),
            )
            .unwrap();
        let positions = positions.into_data().to_vec::<f32>().unwrap();
        let host = skeleton.forward_kinematics(&rest).unwrap();
        for j in 0..joints {
            assert_relative_eq!(positions[j * 3 + 1], host.positions[j].y, epsilon = 1e-5);
        }
    }

    #[test]
    fn sequence_shapes() {
        let device = <TestBackend as Backend>::Device::default();
        let skeleton = Rig::Lafan.skeleton().unwrap();
        let fk = Kinematics::<TestBackend>::new(&skeleton, &device);
        let rest = PoseFrame::rest(22).local_rotations_wxyz();
        let rot: Vec<f32> = (0..6).flat_map(|_| rest.clone()).collect();

        let (positions, rotations) = fk
            .forward_sequence(
                Tensor::from_data(TensorData::new(rot, [2, 3, 22, 4]), &device),
                Tensor::zeros([2, 3, 3], &device),
            )
            .unwrap();
        assert_eq!(positions.dims(), [2, 3, 22, 3]);
        assert_eq!(rotations.dims(), [2, 3, 22, 4]);
    }

    #[test]
    fn wrong_joint_count_is_an_error() {
        let device = <TestBackend as Backend>::Device::default();
        let skeleton = Rig::Lafan.skeleton().unwrap();
        let fk = Kinematics::<TestBackend>::new(&skeleton, &device);
        let result = fk.forward(Tensor::zeros([1, 24, 4], &device), Tensor::zeros([1, 3], &device));
        assert!(matches!(result, Err(ModelError::ShapeMismatch { .. })));
    }
}
