//! Pose-vector reshaping on tensors.
//!
//! Tensor counterpart of `motion_types::PoseLayout`: a frame is
//! `[J * 3 positions | J * 4 rotations]`.

use burn::prelude::Backend;
use burn::tensor::Tensor;

use crate::error::{ModelError, Result};

/// Flattens `[B, T, J, 3]` positions and `[B, T, J, 4]` rotations into
/// `[B, T, J * 7]` pose vectors.
pub fn vectorize_pose<B: Backend>(positions: Tensor<B, 4>, rotations: Tensor<B, 4>) -> Tensor<B, 3> {
    let [batch, frames, joints, _] = positions.dims();
    Tensor::cat(
        vec![
            positions.reshape([batch, frames, joints * 3]),
            rotations.reshape([batch, frames, joints * 4]),
        ],
        2,
    )
}

/// Splits `[B, T, J * 7]` pose vectors into positions `[B, T, J, 3]` and
/// rotations `[B, T, J, 4]`.
///
/// # Errors
///
/// Returns `ModelError::ShapeMismatch` if the feature width is not `J * 7`.
pub fn split_pose<B: Backend>(
    features: Tensor<B, 3>,
    joints: usize,
) -> Result<(Tensor<B, 4>, Tensor<B, 4>)> {
    let [batch, frames, width] = features.dims();
    if width != joints * 7 {
        return Err(ModelError::shape_mismatch(
            format!("feature width {}", joints * 7),
            format!("{width}"),
        ));
    }
    let positions = features
        .clone()
        .narrow(2, 0, joints * 3)
        .reshape([batch, frames, joints, 3]);
    let rotations = features
        .narrow(2, joints * 3, joints * 4)
        .reshape([batch, frames, joints, 4]);
    Ok((positions, rotations))
}
