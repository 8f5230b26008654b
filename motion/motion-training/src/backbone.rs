//! The two generators behind one training contract.
//!
//! [`Inbetweener`] hides how a backbone turns a batch into generated motion.
//! The session only sees [`Generated`]: fake and real frames aligned for the
//! critics, latent codes, reconstruction terms and the divergence reward.

use burn::module::AutodiffModule;
use burn::optim::GradientsParams;
use burn::prelude::Backend;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{Int, Tensor, TensorData};
use motion_dataset::MotionBatch;
use motion_models::{
    Kinematics, RecurrentInbetweener, RecurrentInbetweenerConfig, StepInput, TransformerInbetweener,
    TransformerInbetweenerConfig, normalize_quaternions, split_pose, unmasked_attention,
};
use motion_types::FeatureSequence;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::adversarial::divergence_reward;
use crate::clip::clip_grad_norm;
use crate::config::{Backbone, LossWeights, TrainingConfig};
use crate::error::{Result, TrainingError};
use crate::latent::LatentCodes;
use crate::loss::l1_loss;
use crate::schedule::sample_mask_start;

/// Generator architecture stored in a checkpoint manifest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GeneratorConfig {
    /// Attention backbone.
    Transformer(TransformerInbetweenerConfig),

    /// Recurrent backbone.
    Recurrent(RecurrentInbetweenerConfig),
}

impl GeneratorConfig {
    /// Backbone this configuration builds.
    #[must_use]
    pub const fn backbone(&self) -> Backbone {
        match self {
            Self::Transformer(_) => Backbone::Transformer,
            Self::Recurrent(_) => Backbone::Recurrent,
        }
    }
}

/// A host batch uploaded to the training device.
#[derive(Debug, Clone)]
pub struct TrainingBatch<'a, B: Backend> {
    /// Host copy, used for interpolation.
    pub host: &'a MotionBatch,

    /// `[B, T, J, 4]` local rotations.
    pub local_rotations: Tensor<B, 4>,

    /// `[B, T, 3]` root positions.
    pub root_positions: Tensor<B, 3>,

    /// `[B, T, 3]` root velocities.
    pub root_velocities: Tensor<B, 3>,

    /// `[B, T, J, 3]` global positions.
    pub global_positions: Tensor<B, 4>,

    /// `[B, T, J, 4]` global rotations.
    pub global_rotations: Tensor<B, 4>,

    /// `[B]` category ids.
    pub labels: Tensor<B, 1, Int>,
}

impl<'a, B: Backend> TrainingBatch<'a, B> {
    /// Uploads `host` to `device`.
    #[must_use]
    pub fn new(host: &'a MotionBatch, device: &B::Device) -> Self {
        let (b, t, j) = (host.batch, host.frames, host.joints);
        let upload3 = |values: &[f32], width: usize| {
            Tensor::from_data(TensorData::new(values.to_vec(), [b, t, width]), device)
        };
        let upload4 = |values: &[f32], width: usize| {
            Tensor::from_data(TensorData::new(values.to_vec(), [b, t, j, width]), device)
        };
        Self {
            host,
            local_rotations: upload4(&host.local_rotations, 4),
            root_positions: upload3(&host.root_positions, 3),
            root_velocities: upload3(&host.root_velocities, 3),
            global_positions: upload4(&host.global_positions, 3),
            global_rotations: upload4(&host.global_rotations, 4),
            labels: Tensor::from_data(TensorData::new(host.labels.clone(), [b]), device),
        }
    }

    /// Sequences in the batch.
    #[must_use]
    pub const fn batch(&self) -> usize {
        self.host.batch
    }

    /// Frames per sequence.
    #[must_use]
    pub const fn frames(&self) -> usize {
        self.host.frames
    }

    /// Joints per frame.
    #[must_use]
    pub const fn joints(&self) -> usize {
        self.host.joints
    }

    fn local_frame(&self, t: usize) -> Tensor<B, 2> {
        self.local_rotations
            .clone()
            .narrow(1, t, 1)
            .reshape([self.batch(), self.joints() * 4])
    }

    fn root_frame(&self, t: usize) -> Tensor<B, 2> {
        self.root_positions.clone().narrow(1, t, 1).reshape([self.batch(), 3])
    }

    fn velocity_frame(&self, t: usize) -> Tensor<B, 2> {
        self.root_velocities.clone().narrow(1, t, 1).reshape([self.batch(), 3])
    }
}

/// Everything a generator step needs besides the batch.
pub struct StepContext<'a, B: Backend> {
    /// Training configuration.
    pub config: &'a TrainingConfig,

    /// Forward kinematics for the training skeleton.
    pub kinematics: &'a Kinematics<B>,

    /// Current epoch.
    pub epoch: usize,

    /// Session RNG.
    pub rng: &'a mut ChaCha8Rng,
}

/// Unweighted reconstruction terms.
#[derive(Debug, Clone)]
pub struct Reconstruction<B: Backend> {
    /// Global joint positions.
    pub position: Tensor<B, 1>,

    /// Rotations (global for the transformer, local for the recurrent model).
    pub rotation: Tensor<B, 1>,

    /// Root trajectory.
    pub root: Tensor<B, 1>,

    /// Conditioning token.
    pub condition: Tensor<B, 1>,
}

impl<B: Backend> Reconstruction<B> {
    /// Weighted sum of the terms.
    #[must_use]
    pub fn weighted(&self, weights: &LossWeights) -> Tensor<B, 1> {
        self.position.clone().mul_scalar(weights.position)
            + self.rotation.clone().mul_scalar(weights.rotation)
            + self.root.clone().mul_scalar(weights.root)
            + self.condition.clone().mul_scalar(weights.condition)
    }
}

/// Output of one generator pass, ready for the objectives.
#[derive(Debug, Clone)]
pub struct Generated<B: Backend> {
    /// Generated frames `L`.
    pub frames: usize,

    /// `[B, L, J, 3]` generated global positions.
    pub fake_positions: Tensor<B, 4>,

    /// `[B, L, J * 4]` generated rotations.
    pub fake_rotations: Tensor<B, 3>,

    /// `[B, L, J, 3]` ground-truth global positions for the same frames.
    pub real_positions: Tensor<B, 4>,

    /// `[B, L, J * 4]` ground-truth rotations for the same frames.
    pub real_rotations: Tensor<B, 3>,

    /// Codes the generator was driven with, covering the `L` frames.
    pub codes: Option<LatentCodes<B>>,

    /// Reconstruction terms.
    pub reconstruction: Reconstruction<B>,

    /// Divergence reward, when enabled.
    pub divergence: Option<Tensor<B, 1>>,
}

/// A generator the training session can drive.
pub trait Inbetweener<B: AutodiffBackend>: AutodiffModule<B> + 'static {
    /// Which backbone this is.
    const BACKBONE: Backbone;

    /// Architecture for `joints` joints and `categories` motion categories.
    fn generator_config(config: &TrainingConfig, joints: usize, categories: usize) -> GeneratorConfig;

    /// Builds a fresh model.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is for another backbone or is invalid.
    fn from_config(config: &GeneratorConfig, device: &B::Device) -> Result<Self>;

    /// Runs the generator over one batch.
    ///
    /// # Errors
    ///
    /// Returns `TrainingError::ShapeMismatch` on any tensor contract
    /// violation.
    fn generate(&self, batch: &TrainingBatch<'_, B>, ctx: &mut StepContext<'_, B>) -> Result<Generated<B>>;

    /// Clips gradients per sub-network and returns the largest norm seen.
    fn clip_gradients(&self, grads: &mut GradientsParams, max_norm: f32) -> f32;
}

fn wrong_backbone(expected: Backbone, config: &GeneratorConfig) -> TrainingError {
    TrainingError::checkpoint(format!(
        "expected a {expected} generator, found {}",
        config.backbone()
    ))
}

fn divergence_enabled(config: &TrainingConfig, classes: usize) -> bool {
    config.weights.divergence > 0.0 && classes >= 2
}

/// Predicted positions, rotations and the conditioning loss for one input.
fn predict<B: AutodiffBackend>(
    model: &TransformerInbetweener<B>,
    input: Tensor<B, 3>,
    codes: Option<&LatentCodes<B>>,
    labels: Tensor<B, 1, Int>,
    joints: usize,
) -> Result<(Tensor<B, 4>, Tensor<B, 4>, Tensor<B, 1>)> {
    let [frames, _, _] = input.dims();
    let mask = unmasked_attention(frames + 1, &input.device());
    let output = model.forward(input, codes.map(LatentCodes::time_major), mask, labels)?;
    let condition = l1_loss(output.condition, output.condition_target);
    let (positions, rotations) = split_pose(output.frames.swap_dims(0, 1), joints)?;
    Ok((positions, rotations, condition))
}

fn interpolated_input<B: Backend>(
    host: &MotionBatch,
    config: &TrainingConfig,
    mask_start: usize,
    device: &B::Device,
) -> Result<Tensor<B, 3>> {
    let layout = host.layout();
    let mut flat = Vec::with_capacity(host.pose_vectors.len());
    for i in 0..host.batch {
        let sequence = FeatureSequence::new(layout, host.sequence_frames(i)?)?;
        flat.extend(config.interpolation.apply(&sequence, mask_start)?.to_flat());
    }
    let input = Tensor::<B, 3>::from_data(
        TensorData::new(flat, [host.batch, host.frames, layout.repr_dim()]),
        device,
    );
    Ok(input.swap_dims(0, 1))
}

fn root_trajectory<B: Backend>(positions: Tensor<B, 4>) -> Tensor<B, 3> {
    let [batch, frames, _, _] = positions.dims();
    positions.narrow(2, 0, 1).reshape([batch, frames, 3])
}

impl<B: AutodiffBackend> Inbetweener<B> for TransformerInbetweener<B> {
    const BACKBONE: Backbone = Backbone::Transformer;

    fn generator_config(config: &TrainingConfig, joints: usize, categories: usize) -> GeneratorConfig {
        GeneratorConfig::Transformer(config.transformer.model_config(
            joints * 7,
            categories,
            config.code_classes,
            config.window,
        ))
    }

    fn from_config(config: &GeneratorConfig, device: &B::Device) -> Result<Self> {
        match config {
            GeneratorConfig::Transformer(inner) => Ok(Self::new(inner, device)?),
            GeneratorConfig::Recurrent(_) => Err(wrong_backbone(Self::BACKBONE, config)),
        }
    }

    fn generate(&self, batch: &TrainingBatch<'_, B>, ctx: &mut StepContext<'_, B>) -> Result<Generated<B>> {
        let device = batch.local_rotations.device();
        let (b, frames, joints) = (batch.batch(), batch.frames(), batch.joints());
        let mask_start = sample_mask_start(frames, ctx.rng);
        let input = interpolated_input::<B>(batch.host, ctx.config, mask_start, &device)?;

        let classes = self.code_classes();
        let codes = if classes > 0 {
            Some(LatentCodes::sample(b, frames, classes, ctx.rng, &device)?)
        } else {
            None
        };
        let (positions, rotations, condition) =
            predict(self, input.clone(), codes.as_ref(), batch.labels.clone(), joints)?;

        let reconstruction = Reconstruction {
            position: l1_loss(positions.clone(), batch.global_positions.clone()),
            rotation: l1_loss(rotations.clone(), batch.global_rotations.clone()),
            root: l1_loss(
                root_trajectory(positions.clone()),
                batch.root_positions.clone(),
            ),
            condition,
        };

        let divergence = if divergence_enabled(ctx.config, classes) {
            let first = LatentCodes::fixed(b, frames, classes, 0, &device)?;
            let second = LatentCodes::fixed(b, frames, classes, 1, &device)?;
            let (a, _, _) = predict(self, input.clone(), Some(&first), batch.labels.clone(), joints)?;
            let (c, _, _) = predict(self, input, Some(&second), batch.labels.clone(), joints)?;
            Some(divergence_reward(
                root_trajectory(a),
                root_trajectory(c),
                ctx.config.divergence,
            ))
        } else {
            None
        };

        Ok(Generated {
            frames,
            fake_positions: positions,
            fake_rotations: rotations.reshape([b, frames, joints * 4]),
            real_positions: batch.global_positions.clone(),
            real_rotations: batch.global_rotations.clone().reshape([b, frames, joints * 4]),
            codes,
            reconstruction,
            divergence,
        })
    }

    fn clip_gradients(&self, grads: &mut GradientsParams, max_norm: f32) -> f32 {
        clip_grad_norm::<B, Self>(self, grads, max_norm)
    }
}

/// Frames produced by one closed-loop rollout.
struct Rollout<B: Backend> {
    positions: Tensor<B, 4>,
    global_rotations: Tensor<B, 4>,
    local_rotations: Tensor<B, 3>,
    roots: Tensor<B, 3>,
}

/// Rolls out frames `1..=length` from frame 0 toward keyframe `length`,
/// feeding each normalized prediction back in.
fn rollout<B: AutodiffBackend>(
    model: &RecurrentInbetweener<B>,
    batch: &TrainingBatch<'_, B>,
    kinematics: &Kinematics<B>,
    length: usize,
    codes: Option<&LatentCodes<B>>,
) -> Result<Rollout<B>> {
    let device = batch.local_rotations.device();
    let (b, joints) = (batch.batch(), model.joints());

    let target_rotations = batch.local_frame(length);
    let target_root = batch.root_frame(length);
    let mut rotations = batch.local_frame(0);
    let mut root = batch.root_frame(0);
    let mut velocity = batch.velocity_frame(0);
    let mut state = model.initial_state(b, &device);

    let mut positions = Vec::with_capacity(length);
    let mut globals = Vec::with_capacity(length);
    let mut locals = Vec::with_capacity(length);
    let mut roots = Vec::with_capacity(length);
    for t in 0..length {
        let input = StepInput {
            rotations: rotations.clone(),
            root_velocity: velocity,
            code: codes.map(|c| c.frame(t)),
            root_offset: target_root.clone() - root.clone(),
            rotation_offset: target_rotations.clone() - rotations.clone(),
            target_rotations: target_rotations.clone(),
            time_to_arrival: length - t,
        };
        let (next, output) = model.step(state, input)?;
        state = next;

        rotations = normalize_quaternions((rotations + output.rotation_delta).reshape([b, joints, 4]))
            .reshape([b, joints * 4]);
        velocity = output.root_velocity;
        root = root + velocity.clone();

        let (position, global) = kinematics.forward(rotations.clone().reshape([b, joints, 4]), root.clone())?;
        positions.push(position);
        globals.push(global);
        locals.push(rotations.clone());
        roots.push(root.clone());
    }

    Ok(Rollout {
        positions: Tensor::stack(positions, 1),
        global_rotations: Tensor::stack(globals, 1),
        local_rotations: Tensor::stack(locals, 1),
        roots: Tensor::stack(roots, 1),
    })
}

impl<B: AutodiffBackend> Inbetweener<B> for RecurrentInbetweener<B> {
    const BACKBONE: Backbone = Backbone::Recurrent;

    fn generator_config(config: &TrainingConfig, joints: usize, _categories: usize) -> GeneratorConfig {
        GeneratorConfig::Recurrent(config.recurrent.model_config(joints, config.code_classes))
    }

    fn from_config(config: &GeneratorConfig, device: &B::Device) -> Result<Self> {
        match config {
            GeneratorConfig::Recurrent(inner) => Ok(Self::new(inner, device)?),
            GeneratorConfig::Transformer(_) => Err(wrong_backbone(Self::BACKBONE, config)),
        }
    }

    fn generate(&self, batch: &TrainingBatch<'_, B>, ctx: &mut StepContext<'_, B>) -> Result<Generated<B>> {
        let device = batch.local_rotations.device();
        let (b, frames, joints) = (batch.batch(), batch.frames(), batch.joints());
        if frames < 2 {
            return Err(TrainingError::shape_mismatch(
                "at least 2 frames per window",
                format!("{frames}"),
            ));
        }
        let length = ctx.config.curriculum.sample(ctx.epoch, ctx.rng).clamp(1, frames - 1);

        let classes = self.code_classes();
        let codes = if classes > 0 {
            Some(LatentCodes::sample(b, length, classes, ctx.rng, &device)?)
        } else {
            None
        };
        let rolled = rollout(self, batch, ctx.kinematics, length, codes.as_ref())?;

        let real_positions = batch.global_positions.clone().narrow(1, 1, length);
        let real_locals = batch
            .local_rotations
            .clone()
            .narrow(1, 1, length)
            .reshape([b, length, joints * 4]);
        let real_roots = batch.root_positions.clone().narrow(1, 1, length);

        let reconstruction = Reconstruction {
            position: l1_loss(rolled.positions.clone(), real_positions.clone()),
            rotation: l1_loss(rolled.local_rotations, real_locals),
            root: l1_loss(rolled.roots, real_roots),
            condition: Tensor::zeros([1], &device),
        };

        let divergence = if divergence_enabled(ctx.config, classes) {
            let first = LatentCodes::fixed(b, length, classes, 0, &device)?;
            let second = LatentCodes::fixed(b, length, classes, 1, &device)?;
            let a = rollout(self, batch, ctx.kinematics, length, Some(&first))?;
            let c = rollout(self, batch, ctx.kinematics, length, Some(&second))?;
            Some(divergence_reward(a.roots, c.roots, ctx.config.divergence))
        } else {
            None
        };

        Ok(Generated {
            frames: length,
            fake_positions: rolled.positions,
            fake_rotations: rolled.global_rotations.reshape([b, length, joints * 4]),
            real_positions,
            real_rotations: batch
                .global_rotations
                .clone()
                .narrow(1, 1, length)
                .reshape([b, length, joints * 4]),
            codes,
            reconstruction,
            divergence,
        })
    }

    fn clip_gradients(&self, grads: &mut GradientsParams, max_norm: f32) -> f32 {
        [
            clip_grad_norm::<B, _>(self.state_encoder(), grads, max_norm),
            clip_grad_norm::<B, _>(self.offset_encoder(), grads, max_norm),
            clip_grad_norm::<B, _>(self.target_encoder(), grads, max_norm),
            clip_grad_norm::<B, _>(self.lstm(), grads, max_norm),
            clip_grad_norm::<B, _>(self.decoder(), grads, max_norm),
        ]
        .into_iter()
        .fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RecurrentShape, TransformerShape};
    use crate::schedule::Curriculum;
    use burn::backend::Autodiff;
    use burn_ndarray::NdArray;
    use rand::SeedableRng;

    type TestBackend = Autodiff<NdArray<f32>>;

    const JOINTS: usize = 3;

    fn skeleton() -> motion_types::Skeleton {
        motion_types::Skeleton::from_parent_indices(
            vec!["root".into(), "spine".into(), "head".into()],
            &[-1, 0, 1],
            vec![
                nalgebra::Vector3::zeros(),
                nalgebra::Vector3::new(0.0, 1.0, 0.0),
                nalgebra::Vector3::new(0.0, 1.0, 0.0),
            ],
        )
        .unwrap()
    }

    #[allow(clippy::cast_precision_loss)]
    fn host_batch(batch: usize, frames: usize) -> MotionBatch {
        let skeleton = skeleton();
        let layout = motion_types::PoseLayout::new(JOINTS);
        let mut host = MotionBatch {
            batch,
            frames,
            joints: JOINTS,
            local_rotations: Vec::new(),
            root_positions: Vec::new(),
            root_velocities: Vec::new(),
            global_positions: Vec::new(),
            global_rotations: Vec::new(),
            pose_vectors: Vec::new(),
            labels: Vec::new(),
        };
        for s in 0..batch {
            for t in 0..frames {
                let angle = 0.1 * t as f32 + 0.3 * s as f32;
                let rotations = (0..JOINTS)
                    .map(|_| nalgebra::UnitQuaternion::from_euler_angles(0.0, angle, 0.0))
                    .collect();
                let frame =
                    motion_types::PoseFrame::new(nalgebra::Vector3::new(t as f32, 0.0, 0.0), rotations);
                let global = skeleton.forward_kinematics(&frame).unwrap();
                host.local_rotations.extend(frame.local_rotations_wxyz());
                host.root_positions.extend([t as f32, 0.0, 0.0]);
                host.root_velocities.extend([1.0, 0.0, 0.0]);
                for p in &global.positions {
                    host.global_positions.extend([p.x, p.y, p.z]);
                }
                for q in &global.rotations {
                    host.global_rotations.extend(motion_types::quat_to_wxyz(q.quaternion()));
                }
                host.pose_vectors.extend(layout.vectorize_global(&global).unwrap());
            }
            host.labels.push(0);
        }
        host
    }

    fn tiny_config(backbone: Backbone) -> TrainingConfig {
        let base = match backbone {
            Backbone::Transformer => TrainingConfig::transformer(),
            Backbone::Recurrent => TrainingConfig::recurrent(),
        };
        base.with_window(8)
            .with_code_classes(2)
            .with_curriculum(Curriculum::new(5, 6, 1))
            .with_transformer(TransformerShape {
                d_model: 8,
                n_heads: 2,
                d_ff: 16,
                n_layers: 1,
                dropout: 0.0,
            })
            .with_recurrent(RecurrentShape {
                encoder_hidden: 8,
                encoder_out: 4,
                lstm_hidden: 8,
                decoder_hidden: 8,
            })
    }

    #[test]
    fn generator_config_round_trips_through_json() {
        let config = tiny_config(Backbone::Recurrent);
        let generator = RecurrentInbetweener::<TestBackend>::generator_config(&config, JOINTS, 1);
        let json = serde_json::to_string(&generator).unwrap();
        assert!(json.contains("\"kind\":\"recurrent\""));
        let parsed: GeneratorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, generator);
    }

    #[test]
    fn wrong_backbone_is_rejected() {
        let config = tiny_config(Backbone::Transformer);
        let generator = TransformerInbetweener::<TestBackend>::generator_config(&config, JOINTS, 1);
        let result = RecurrentInbetweener::<TestBackend>::from_config(&generator, &Default::default());
        assert!(matches!(result, Err(TrainingError::Checkpoint(_))));
    }

    #[test]
    fn transformer_generates_the_whole_window() {
        let device = Default::default();
        let config = tiny_config(Backbone::Transformer);
        let model = TransformerInbetweener::<TestBackend>::from_config(
            &TransformerInbetweener::<TestBackend>::generator_config(&config, JOINTS, 1),
            &device,
        )
        .unwrap();
        let kinematics = Kinematics::new(&skeleton(), &device);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let host = host_batch(2, 8);
        let batch = TrainingBatch::new(&host, &device);
        let mut ctx = StepContext {
            config: &config,
            kinematics: &kinematics,
            epoch: 0,
            rng: &mut rng,
        };

        let generated = model.generate(&batch, &mut ctx).unwrap();
        assert_eq!(generated.frames, 8);
        assert_eq!(generated.fake_positions.dims(), [2, 8, JOINTS, 3]);
        assert_eq!(generated.fake_rotations.dims(), generated.real_rotations.dims());
        assert!(generated.codes.is_some());
        assert!(generated.divergence.is_none());
    }

    #[test]
    fn recurrent_rollout_covers_frames_up_to_the_keyframe() {
        let device = Default::default();
        let mut weights = LossWeights::adversarial();
        weights.divergence = 0.5;
        let config = tiny_config(Backbone::Recurrent).with_weights(weights);
        let model = RecurrentInbetweener::<TestBackend>::from_config(
            &RecurrentInbetweener::<TestBackend>::generator_config(&config, JOINTS, 1),
            &device,
        )
        .unwrap();
        let kinematics = Kinematics::new(&skeleton(), &device);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let host = host_batch(2, 8);
        let batch = TrainingBatch::new(&host, &device);
        let mut ctx = StepContext {
            config: &config,
            kinematics: &kinematics,
            epoch: 3,
            rng: &mut rng,
        };

        let generated = model.generate(&batch, &mut ctx).unwrap();
        assert!((5..=6).contains(&generated.frames));
        let l = generated.frames;
        assert_eq!(generated.fake_positions.dims(), [2, l, JOINTS, 3]);
        assert_eq!(generated.real_positions.dims(), [2, l, JOINTS, 3]);
        assert_eq!(generated.codes.as_ref().map(|c| c.one_hot().dims()), Some([2, l, 2]));
        assert!(generated.divergence.is_some());
    }

    #[test]
    fn rollout_keeps_rotations_unit_length() {
        let device = Default::default();
        let config = tiny_config(Backbone::Recurrent);
        let model = RecurrentInbetweener::<TestBackend>::new(
            &config.recurrent.model_config(JOINTS, 2),
            &device,
        )
        .unwrap();
        let kinematics = Kinematics::new(&skeleton(), &device);
        let host = host_batch(2, 8);
        let batch = TrainingBatch::new(&host, &device);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let codes = LatentCodes::sample(2, 6, 2, &mut rng, &device).unwrap();

        let rolled = rollout(&model, &batch, &kinematics, 6, Some(&codes)).unwrap();
        assert_eq!(rolled.local_rotations.dims(), [2, 6, JOINTS * 4]);
        let norms = rolled
            .local_rotations
            .reshape([2, 6, JOINTS, 4])
            .powf_scalar(2.0)
            .sum_dim(3)
            .sqrt()
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        assert_eq!(norms.len(), 2 * 6 * JOINTS);
        for norm in norms {
            assert!((norm - 1.0).abs() < 1e-5, "norm {norm}");
        }
    }

    #[test]
    fn recurrent_clipping_bounds_every_group() {
        let device = Default::default();
        let config = tiny_config(Backbone::Recurrent);
        let model = RecurrentInbetweener::<TestBackend>::new(
            &config.recurrent.model_config(JOINTS, 2),
            &device,
        )
        .unwrap();
        let kinematics = Kinematics::new(&skeleton(), &device);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let host = host_batch(2, 8);
        let batch = TrainingBatch::new(&host, &device);
        let mut ctx = StepContext {
            config: &config,
            kinematics: &kinematics,
            epoch: 0,
            rng: &mut rng,
        };
        let generated = model.generate(&batch, &mut ctx).unwrap();
        let loss = generated.reconstruction.weighted(&config.weights).mul_scalar(1000.0);
        let mut grads = GradientsParams::from_grads(loss.backward(), &model);

        let before = model.clip_gradients(&mut grads, 1e-3);
        assert!(before > 1e-3);
        let after = crate::clip::grad_norm::<TestBackend, _>(model.lstm(), &grads);
        assert!(after <= 1e-3 + 1e-6);
    }
}
