//! Critic inputs and the weighted adversarial objectives.

use burn::prelude::Backend;
use burn::tensor::Tensor;
use motion_models::CriticEnsemble;

use crate::config::LossWeights;
use crate::error::{Result, TrainingError};
use crate::latent::LatentCodes;
use crate::loss::{code_cross_entropy, lsgan_critic_loss, lsgan_generator_loss, pairwise_distance};
use crate::schedule::DivergenceSchedule;

/// Motion prepared for the critic ensemble.
#[derive(Debug, Clone)]
pub struct CriticInputs<B: Backend> {
    /// `[B, J * 6, T]` positions and velocities, channel-first.
    pub windows: Tensor<B, 3>,

    /// `[B * T, J * 6 + J * 4]` per-frame rows for the single-pose critic.
    pub single_pose: Tensor<B, 2>,
}

impl<B: Backend> CriticInputs<B> {
    /// Builds critic inputs from `[B, T, J, 3]` global positions and
    /// `[B, T, J * 4]` rotations.
    ///
    /// Velocities are forward differences; the last frame gets zero.
    ///
    /// # Errors
    ///
    /// Returns `TrainingError::ShapeMismatch` if batch or frame counts differ.
    pub fn new(positions: Tensor<B, 4>, rotations: Tensor<B, 3>) -> Result<Self> {
        let [batch, frames, joints, _] = positions.dims();
        let [rot_batch, rot_frames, rot_width] = rotations.dims();
        if rot_batch != batch || rot_frames != frames || rot_width != joints * 4 {
            return Err(TrainingError::shape_mismatch(
                format!("rotations [{batch}, {frames}, {}]", joints * 4),
                format!("[{rot_batch}, {rot_frames}, {rot_width}]"),
            ));
        }
        let device = positions.device();
        let pos = positions.reshape([batch, frames, joints * 3]).swap_dims(1, 2);

        let velocity = if frames > 1 {
            let ahead = pos.clone().narrow(2, 1, frames - 1);
            let behind = pos.clone().narrow(2, 0, frames - 1);
            Tensor::cat(
                vec![ahead - behind, Tensor::zeros([batch, joints * 3, 1], &device)],
                2,
            )
        } else {
            Tensor::zeros([batch, joints * 3, frames], &device)
        };
        let windows = Tensor::cat(vec![pos, velocity], 1);

        let single_pose = Tensor::cat(vec![windows.clone(), rotations.swap_dims(1, 2)], 1)
            .swap_dims(1, 2)
            .reshape([batch * frames, joints * 10]);

        Ok(Self {
            windows,
            single_pose,
        })
    }

    /// Stops gradients flowing back into the generator.
    #[must_use]
    pub fn detach(self) -> Self {
        Self {
            windows: self.windows.detach(),
            single_pose: self.single_pose.detach(),
        }
    }

    /// Fails unless `other` has exactly the same shapes.
    ///
    /// # Errors
    ///
    /// Returns `TrainingError::ShapeMismatch` naming both shapes.
    pub fn check_same_shape(&self, other: &Self) -> Result<()> {
        if self.windows.dims() != other.windows.dims() {
            return Err(TrainingError::shape_mismatch(
                format!("window input {:?}", other.windows.dims()),
                format!("{:?}", self.windows.dims()),
            ));
        }
        if self.single_pose.dims() != other.single_pose.dims() {
            return Err(TrainingError::shape_mismatch(
                format!("single-pose input {:?}", other.single_pose.dims()),
                format!("{:?}", self.single_pose.dims()),
            ));
        }
        Ok(())
    }
}

/// Realness per sample from every critic.
struct Scores<B: Backend> {
    single_pose: Tensor<B, 1>,
    single_pose_codes: Tensor<B, 2>,
    short: Tensor<B, 1>,
    short_codes: Tensor<B, 3>,
    long: Tensor<B, 1>,
    long_codes: Tensor<B, 3>,
}

fn score<B: Backend>(critics: &CriticEnsemble<B>, inputs: &CriticInputs<B>) -> Result<Scores<B>> {
    let [rows, _] = inputs.single_pose.dims();
    let (realness, single_pose_codes) = critics.single_pose.forward(inputs.single_pose.clone());
    let short = critics.short.forward(inputs.windows.clone())?;
    let long = critics.long.forward(inputs.windows.clone())?;
    Ok(Scores {
        single_pose: realness.reshape([rows]),
        single_pose_codes,
        short: window_mean(short.realness),
        short_codes: short.code_logits,
        long: window_mean(long.realness),
        long_codes: long.code_logits,
    })
}

fn window_mean<B: Backend>(realness: Tensor<B, 2>) -> Tensor<B, 1> {
    let [batch, _] = realness.dims();
    realness.mean_dim(1).reshape([batch])
}

/// Critic-side losses of one step.
#[derive(Debug, Clone)]
pub struct CriticLosses<B: Backend> {
    /// Weighted sum that is backpropagated.
    pub total: Tensor<B, 1>,

    /// Single-pose critic loss.
    pub single_pose: Tensor<B, 1>,

    /// Short-window critic loss.
    pub short: Tensor<B, 1>,

    /// Long-window critic loss.
    pub long: Tensor<B, 1>,
}

/// LSGAN critic objective over the ensemble.
///
/// `fake` should already be detached from the generator.
///
/// # Errors
///
/// Returns `TrainingError::ShapeMismatch` if fake and real inputs differ.
pub fn critic_objective<B: Backend>(
    critics: &CriticEnsemble<B>,
    fake: &CriticInputs<B>,
    real: &CriticInputs<B>,
    weights: &LossWeights,
) -> Result<CriticLosses<B>> {
    fake.check_same_shape(real)?;
    let fake = score(critics, fake)?;
    let real = score(critics, real)?;

    let single_pose = lsgan_critic_loss(fake.single_pose, real.single_pose);
    let short = lsgan_critic_loss(fake.short, real.short);
    let long = lsgan_critic_loss(fake.long, real.long);
    let total = single_pose.clone().mul_scalar(weights.single_pose_discriminator)
        + (short.clone() + long.clone()).mul_scalar(weights.discriminator);

    Ok(CriticLosses {
        total,
        single_pose,
        short,
        long,
    })
}

/// Generator-side adversarial terms of one step.
#[derive(Debug, Clone)]
pub struct GeneratorAdversarial<B: Backend> {
    /// Weighted adversarial total.
    pub total: Tensor<B, 1>,

    /// Single-pose generator loss.
    pub single_pose: Tensor<B, 1>,

    /// Window generator losses (short + long).
    pub windows: Tensor<B, 1>,

    /// Code classification by the single-pose critic.
    pub code: Tensor<B, 1>,
}

/// LSGAN generator objective plus latent-code recovery.
///
/// `codes` must cover the same frames as `fake`. Without codes the code
/// terms are zero.
///
/// # Errors
///
/// Returns `TrainingError::ShapeMismatch` if the codes do not match `fake`.
pub fn generator_objective<B: Backend>(
    critics: &CriticEnsemble<B>,
    fake: &CriticInputs<B>,
    codes: Option<&LatentCodes<B>>,
    weights: &LossWeights,
) -> Result<GeneratorAdversarial<B>> {
    let device = fake.windows.device();
    let scores = score(critics, fake)?;

    let single_pose = lsgan_generator_loss(scores.single_pose);
    let windows = lsgan_generator_loss(scores.short) + lsgan_generator_loss(scores.long);

    let (code, window_code) = match codes {
        Some(codes) => {
            let flat = codes.flat();
            if flat.dims() != scores.single_pose_codes.dims() {
                return Err(TrainingError::shape_mismatch(
                    format!("codes {:?}", scores.single_pose_codes.dims()),
                    format!("{:?}", flat.dims()),
                ));
            }
            let code = code_cross_entropy(scores.single_pose_codes, flat);
            let window_code = if weights.window_code > 0.0 {
                window_code_loss(scores.short_codes, codes, critics.short.window())
                    + window_code_loss(scores.long_codes, codes, critics.long.window())
            } else {
                Tensor::zeros([1], &device)
            };
            (code, window_code)
        }
        None => (Tensor::zeros([1], &device), Tensor::zeros([1], &device)),
    };

    let total = (single_pose.clone() + code.clone()).mul_scalar(weights.single_pose_generator)
        + windows.clone().mul_scalar(weights.generator)
        + window_code.mul_scalar(weights.window_code);

    Ok(GeneratorAdversarial {
        total,
        single_pose,
        windows,
        code,
    })
}

fn window_code_loss<B: Backend>(
    logits: Tensor<B, 3>,
    codes: &LatentCodes<B>,
    window: usize,
) -> Tensor<B, 1> {
    let [batch, classes, windows] = logits.dims();
    let logits = logits.swap_dims(1, 2).reshape([batch * windows, classes]);
    code_cross_entropy(logits, codes.window_targets(window))
}

/// Reward for two rollouts with different codes drifting apart.
///
/// `a` and `b` are `[B, L, 3]` root trajectories. Each frame contributes the
/// batch-mean root distance scaled by `schedule`; frames are summed.
pub fn divergence_reward<B: Backend>(
    a: Tensor<B, 3>,
    b: Tensor<B, 3>,
    schedule: DivergenceSchedule,
) -> Tensor<B, 1> {
    let [batch, length, width] = a.dims();
    let mut total = Tensor::zeros([1], &a.device());
    for t in 0..length {
        let at = a.clone().narrow(1, t, 1).reshape([batch, width]);
        let bt = b.clone().narrow(1, t, 1).reshape([batch, width]);
        let distance = pairwise_distance(at, bt).mean();
        total = total + distance.mul_scalar(schedule.multiplier(t, length));
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loss::scalar;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;
    use motion_models::CriticConfig;

    type TestBackend = NdArray<f32>;

    fn ramp(batch: usize, frames: usize, joints: usize) -> Tensor<TestBackend, 4> {
        #[allow(clippy::cast_precision_loss)]
        let values: Vec<f32> = (0..batch * frames * joints * 3).map(|i| i as f32).collect();
        Tensor::from_data(
            TensorData::new(values, [batch, frames, joints, 3]),
            &Default::default(),
        )
    }

    fn inputs(batch: usize, frames: usize, joints: usize) -> CriticInputs<TestBackend> {
        let rotations = Tensor::ones([batch, frames, joints * 4], &Default::default());
        CriticInputs::new(ramp(batch, frames, joints), rotations).unwrap()
    }

    #[test]
    fn input_shapes() {
        let inputs = inputs(2, 6, 3);
        assert_eq!(inputs.windows.dims(), [2, 18, 6]);
        assert_eq!(inputs.single_pose.dims(), [12, 30]);
    }

    #[test]
    fn velocities_are_forward_differences() {
        let inputs = inputs(1, 3, 1);
        // channels 3..6 are velocities; positions step by 3 per frame
        let data = inputs.windows.into_data().to_vec::<f32>().unwrap();
        let velocity_x = &data[3 * 3..4 * 3];
        assert_eq!(velocity_x, &[3.0, 3.0, 0.0]);
    }

    #[test]
    fn mismatched_rotations_rejected() {
        let rotations = Tensor::ones([2, 5, 12], &Default::default());
        let result = CriticInputs::<TestBackend>::new(ramp(2, 6, 3), rotations);
        assert!(matches!(result, Err(TrainingError::ShapeMismatch { .. })));
    }

    #[test]
    fn fake_real_shape_mismatch_is_fatal() {
        let device = Default::default();
        let critics =
            CriticEnsemble::<TestBackend>::new(&CriticConfig::new(3, 2).with_hidden(8), &device)
                .unwrap();
        let result = critic_objective(
            &critics,
            &inputs(2, 6, 3),
            &inputs(2, 7, 3),
            &LossWeights::adversarial(),
        );
        assert!(matches!(result, Err(TrainingError::ShapeMismatch { .. })));
    }

    #[test]
    fn objectives_are_finite() {
        let device = Default::default();
        let critics =
            CriticEnsemble::<TestBackend>::new(&CriticConfig::new(3, 2).with_hidden(8), &device)
                .unwrap();
        let mut weights = LossWeights::adversarial();
        weights.window_code = 1.0;
        let fake = inputs(2, 6, 3);
        let real = inputs(2, 6, 3);

        let critic = critic_objective(&critics, &fake, &real, &weights).unwrap();
        assert!(scalar(critic.total).is_finite());

        let codes = LatentCodes::fixed(2, 6, 2, 1, &device).unwrap();
        let generator = generator_objective(&critics, &fake, Some(&codes), &weights).unwrap();
        assert!(scalar(generator.total).is_finite());
        assert!(scalar(generator.code) > 0.0);
    }

    #[test]
    fn divergence_of_parallel_trajectories() {
        let device = Default::default();
        let a = Tensor::<TestBackend, 3>::zeros([2, 4, 3], &device);
        let b = Tensor::<TestBackend, 3>::zeros([2, 4, 3], &device).add_scalar(1.0);

        let constant = scalar(divergence_reward(a.clone(), b.clone(), DivergenceSchedule::Constant));
        assert!((constant - 4.0 * 3.0_f32.sqrt()).abs() < 1e-3);

        let sine = scalar(divergence_reward(a.clone(), b, DivergenceSchedule::Sine));
        assert!(sine < constant);

        let same = scalar(divergence_reward(a.clone(), a, DivergenceSchedule::Constant));
        assert!(same < 1e-4);
    }

    #[test]
    fn codes_must_cover_fake_frames() {
        let device = Default::default();
        let critics =
            CriticEnsemble::<TestBackend>::new(&CriticConfig::new(3, 2).with_hidden(8), &device)
                .unwrap();
        let codes = LatentCodes::fixed(2, 5, 2, 0, &device).unwrap();
        let result =
            generator_objective(&critics, &inputs(2, 6, 3), Some(&codes), &LossWeights::adversarial());
        assert!(matches!(result, Err(TrainingError::ShapeMismatch { .. })));
    }
}
