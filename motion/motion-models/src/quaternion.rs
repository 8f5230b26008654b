//! Quaternion algebra on tensors whose last dimension holds `(w, x, y, z)`.
//!
//! All functions broadcast over leading dimensions, so a `[1, 3]` offset can
//! be rotated by `[N, 4]` quaternions.

use burn::prelude::Backend;
use burn::tensor::Tensor;

const NORM_EPS: f32 = 1e-8;

fn component<B: Backend, const D: usize>(t: &Tensor<B, D>, index: usize) -> Tensor<B, D> {
    t.clone().narrow(D - 1, index, 1)
}

/// Hamilton product `a * b`.
pub fn quat_mul<B: Backend, const D: usize>(a: Tensor<B, D>, b: Tensor<B, D>) -> Tensor<B, D> {
    let (aw, ax, ay, az) = (
        component(&a, 0),
        component(&a, 1),
        component(&a, 2),
        component(&a, 3),
    );
    let (bw, bx, by, bz) = (
        component(&b, 0),
        component(&b, 1),
        component(&b, 2),
        component(&b, 3),
    );

    let w = aw.clone() * bw.clone() - ax.clone() * bx.clone() - ay.clone() * by.clone()
        - az.clone() * bz.clone();
    let x = aw.clone() * bx.clone() + ax.clone() * bw.clone() + ay.clone() * bz.clone()
        - az.clone() * by.clone();
    let y = aw.clone() * by.clone() - ax.clone() * bz.clone() + ay.clone() * bw.clone()
        + az.clone() * bx.clone();
    let z = aw * bz + ax * by - ay * bx + az * bw;

    Tensor::cat(vec![w, x, y, z], D - 1)
}

/// Cross product over the last dimension (size 3).
pub fn cross<B: Backend, const D: usize>(a: Tensor<B, D>, b: Tensor<B, D>) -> Tensor<B, D> {
    let (ax, ay, az) = (component(&a, 0), component(&a, 1), component(&a, 2));
    let (bx, by, bz) = (component(&b, 0), component(&b, 1), component(&b, 2));

    let x = ay.clone() * bz.clone() - az.clone() * by.clone();
    let y = az * bx.clone() - ax.clone() * bz;
    let z = ax * by - ay * bx;

    Tensor::cat(vec![x, y, z], D - 1)
}

/// Rotates vectors `v` (last dim 3) by unit quaternions `q` (last dim 4).
///
/// Uses `v + 2w(u x v) + 2u x (u x v)` with `u = (x, y, z)`.
pub fn quat_rotate<B: Backend, const D: usize>(q: Tensor<B, D>, v: Tensor<B, D>) -> Tensor<B, D> {
    let w = component(&q, 0);
    let u = q.narrow(D - 1, 1, 3);
    let uv = cross(u.clone(), v.clone());
    let uuv = cross(u, uv.clone());
    v + (uv * w + uuv).mul_scalar(2.0)
}

/// Scales quaternions to unit length. Zero quaternions stay near zero
/// instead of producing NaN.
pub fn normalize_quaternions<B: Backend, const D: usize>(q: Tensor<B, D>) -> Tensor<B, D> {
    let norm = q
        .clone()
        .powf_scalar(2.0)
        .sum_dim(D - 1)
        .sqrt()
        .clamp_min(NORM_EPS);
    q / norm
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;
    use motion_types::quat_to_wxyz;
    use nalgebra::{UnitQuaternion, Vector3};

    type TestBackend = NdArray<f32>;

    fn quat_tensor(qs: &[UnitQuaternion<f32>]) -> Tensor<TestBackend, 2> {
        let device = <TestBackend as Backend>::Device::default();
        let flat: Vec<f32> = qs.iter().flat_map(|q| quat_to_wxyz(q.quaternion())).collect();
        Tensor::from_data(TensorData::new(flat, [qs.len(), 4]), &device)
    }

    fn values<const D: usize>(t: Tensor<TestBackend, D>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn mul_matches_nalgebra() {
        let a = UnitQuaternion::from_euler_angles(0.3, -0.2, 1.1);
        let b = UnitQuaternion::from_euler_angles(-0.7, 0.4, 0.25);
        let product = values(quat_mul(quat_tensor(&[a]), quat_tensor(&[b])));
        let expected = quat_to_wxyz((a * b).quaternion());
        for (got, want) in product.iter().zip(expected) {
            assert_relative_eq!(*got, want, epsilon = 1e-5);
        }
    }

    #[test]
    fn rotate_matches_nalgebra_and_broadcasts() {
        let device = <TestBackend as Backend>::Device::default();
        let qs = [
            UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3),
            UnitQuaternion::from_euler_angles(1.0, -0.5, 2.0),
        ];
        let v = Vector3::new(1.0, -2.0, 0.5);
        let offset: Tensor<TestBackend, 2> =
            Tensor::from_data(TensorData::new(vec![v.x, v.y, v.z], [1, 3]), &device);

        let rotated = quat_rotate(quat_tensor(&qs), offset);
        assert_eq!(rotated.dims(), [2, 3]);
        let got = values(rotated);
        for (i, q) in qs.iter().enumerate() {
            let want = q.transform_vector(&v);
            assert_relative_eq!(got[i * 3], want.x, epsilon = 1e-5);
            assert_relative_eq!(got[i * 3 + 1], want.y, epsilon = 1e-5);
            assert_relative_eq!(got[i * 3 + 2], want.z, epsilon = 1e-5);
        }
    }

    #[test]
    fn normalize_produces_unit_length() {
        let device = <TestBackend as Backend>::Device::default();
        let q: Tensor<TestBackend, 2> = Tensor::from_data(
            TensorData::new(vec![2.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0], [2, 4]),
            &device,
        );
        let got = values(normalize_quaternions(q));
        assert_relative_eq!(got[0], 1.0, epsilon = 1e-6);
        for v in &got[4..] {
            assert_relative_eq!(*v, 0.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn normalize_zero_is_finite() {
        let device = <TestBackend as Backend>::Device::default();
        let q = Tensor::<TestBackend, 2>::zeros([1, 4], &device);
        assert!(values(normalize_quaternions(q)).iter().all(|v| v.is_finite()));
    }
}
