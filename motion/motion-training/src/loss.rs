//! Loss functions for adversarial in-betweening.

use burn::prelude::Backend;
use burn::tensor::activation::log_softmax;
use burn::tensor::{ElementConversion, Tensor};

/// Least-squares critic loss.
///
/// `(mean(fake²) + mean((real - 1)²)) / 2`; fakes are pushed to 0 and real
/// samples to 1.
pub fn lsgan_critic_loss<B: Backend>(fake: Tensor<B, 1>, real: Tensor<B, 1>) -> Tensor<B, 1> {
    let fake_term = fake.powf_scalar(2.0).mean();
    let real_term = real.sub_scalar(1.0).powf_scalar(2.0).mean();
    (fake_term + real_term).div_scalar(2.0)
}

/// Least-squares generator loss `mean((fake - 1)²)`.
pub fn lsgan_generator_loss<B: Backend>(fake: Tensor<B, 1>) -> Tensor<B, 1> {
    fake.sub_scalar(1.0).powf_scalar(2.0).mean()
}

/// Mean absolute error over every element.
pub fn l1_loss<B: Backend, const D: usize>(pred: Tensor<B, D>, target: Tensor<B, D>) -> Tensor<B, 1> {
    (pred - target).abs().mean()
}

/// Cross-entropy of `[N, C]` logits against `[N, C]` one-hot targets.
pub fn code_cross_entropy<B: Backend>(logits: Tensor<B, 2>, one_hot: Tensor<B, 2>) -> Tensor<B, 1> {
    let [n, _] = logits.dims();
    let picked = (log_softmax(logits, 1) * one_hot).sum();
    #[allow(clippy::cast_precision_loss)]
    picked.div_scalar(-(n.max(1) as f32))
}

/// Euclidean distance between rows of two `[N, D]` tensors, as `[N]`.
///
/// A small offset keeps the gradient finite when the rows coincide.
pub fn pairwise_distance<B: Backend>(a: Tensor<B, 2>, b: Tensor<B, 2>) -> Tensor<B, 1> {
    let [n, _] = a.dims();
    (a - b)
        .add_scalar(1e-6)
        .powf_scalar(2.0)
        .sum_dim(1)
        .sqrt()
        .reshape([n])
}

/// Reads a one-element tensor back to the host.
pub fn scalar<B: Backend>(value: Tensor<B, 1>) -> f32 {
    value.into_scalar().elem::<f32>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn vector(values: &[f32]) -> Tensor<TestBackend, 1> {
        Tensor::from_data(TensorData::new(values.to_vec(), [values.len()]), &Default::default())
    }

    fn matrix(values: Vec<f32>, rows: usize, cols: usize) -> Tensor<TestBackend, 2> {
        Tensor::from_data(TensorData::new(values, [rows, cols]), &Default::default())
    }

    #[test]
    fn critic_loss_with_all_ones_is_a_half() {
        // (mean(1²) + mean((1 - 1)²)) / 2
        let loss = lsgan_critic_loss(vector(&[1.0, 1.0, 1.0]), vector(&[1.0, 1.0, 1.0]));
        assert_relative_eq!(scalar(loss), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn critic_loss_is_zero_for_a_perfect_critic() {
        let loss = lsgan_critic_loss(vector(&[0.0, 0.0]), vector(&[1.0, 1.0]));
        assert_relative_eq!(scalar(loss), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn generator_loss_zero_at_one() {
        assert_relative_eq!(scalar(lsgan_generator_loss(vector(&[1.0, 1.0]))), 0.0, epsilon = 1e-6);
        assert_relative_eq!(scalar(lsgan_generator_loss(vector(&[0.0, 0.0]))), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn l1_is_mean_absolute_error() {
        let loss = l1_loss(vector(&[1.0, -1.0, 3.0, 0.0]), vector(&[0.0, 0.0, 0.0, 0.0]));
        assert_relative_eq!(scalar(loss), 1.25, epsilon = 1e-6);
    }

    #[test]
    fn cross_entropy_of_uniform_logits() {
        let logits = matrix(vec![0.0; 6], 2, 3);
        let targets = matrix(vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0], 2, 3);
        let loss = code_cross_entropy(logits, targets);
        assert_relative_eq!(scalar(loss), 3.0_f32.ln(), epsilon = 1e-5);
    }

    #[test]
    fn cross_entropy_rewards_confident_correct_logits() {
        let confident = matrix(vec![10.0, 0.0, 0.0, 10.0], 2, 2);
        let targets = matrix(vec![1.0, 0.0, 0.0, 1.0], 2, 2);
        assert!(scalar(code_cross_entropy(confident, targets)) < 1e-3);
    }

    #[test]
    fn pairwise_distance_per_row() {
        let a = matrix(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0], 2, 3);
        let b = matrix(vec![3.0, 4.0, 0.0, 1.0, 1.0, 1.0], 2, 3);
        let d = pairwise_distance(a, b).into_data().to_vec::<f32>().unwrap();
        assert_relative_eq!(d[0], 5.0, epsilon = 1e-4);
        assert!(d[1] < 1e-4);
    }
}
