//! Recurrent backbone for in-betweening.
//!
//! The model only exposes a single step. The caller owns the
//! [`RecurrentState`] and threads it through the rollout, feeding each
//! step's prediction back as the next step's input.

use burn::module::Module;
use burn::nn;
use burn::nn::{Lstm, LstmConfig, LstmState};
use burn::prelude::Backend;
use burn::tensor::Tensor;
use burn::tensor::activation::leaky_relu;
use serde::{Deserialize, Serialize};

use crate::encoding::TimeToArrivalEncoding;
use crate::error::{ModelError, Result};

const LEAKY_SLOPE: f64 = 0.01;

/// Configuration for [`RecurrentInbetweener`].
///
/// # Example
///
/// ```
/// use motion_models::RecurrentInbetweenerConfig;
///
/// let config = RecurrentInbetweenerConfig::new(22, 2);
/// assert_eq!(config.state_dim(), 22 * 4 + 3 + 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecurrentInbetweenerConfig {
    /// Joints per frame.
    pub joints: usize,

    /// Latent code classes appended to the state input.
    pub code_classes: usize,

    /// Hidden width of each input encoder.
    pub encoder_hidden: usize,

    /// Output width of each input encoder (and of the arrival encoding).
    pub encoder_out: usize,

    /// LSTM hidden width.
    pub lstm_hidden: usize,

    /// Hidden width of the decoder.
    pub decoder_hidden: usize,

    /// Arrival time at which the encoding saturates.
    pub max_tta: usize,
}

impl RecurrentInbetweenerConfig {
    /// Creates a configuration with default widths.
    #[must_use]
    pub const fn new(joints: usize, code_classes: usize) -> Self {
        Self {
            joints,
            code_classes,
            encoder_hidden: 512,
            encoder_out: 256,
            lstm_hidden: 1024,
            decoder_hidden: 512,
            max_tta: 65,
        }
    }

    /// Sets encoder, LSTM and decoder widths.
    #[must_use]
    pub const fn with_widths(
        mut self,
        encoder_hidden: usize,
        encoder_out: usize,
        lstm_hidden: usize,
        decoder_hidden: usize,
    ) -> Self {
        self.encoder_hidden = encoder_hidden;
        self.encoder_out = encoder_out;
        self.lstm_hidden = lstm_hidden;
        self.decoder_hidden = decoder_hidden;
        self
    }

    /// Width of the state encoder input: rotations, root velocity, code.
    #[must_use]
    pub const fn state_dim(&self) -> usize {
        self.joints * 4 + 3 + self.code_classes
    }

    /// Width of the offset encoder input: root offset plus rotation offsets.
    #[must_use]
    pub const fn offset_dim(&self) -> usize {
        3 + self.joints * 4
    }

    /// Width of the target encoder input.
    #[must_use]
    pub const fn target_dim(&self) -> usize {
        self.joints * 4
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidConfig` if a width is zero or the encoder
    /// output is odd.
    pub fn validate(&self) -> Result<()> {
        if self.joints == 0
            || self.encoder_hidden == 0
            || self.encoder_out == 0
            || self.lstm_hidden == 0
            || self.decoder_hidden == 0
        {
            return Err(ModelError::invalid_config("recurrent widths must be positive"));
        }
        if self.encoder_out % 2 != 0 {
            return Err(ModelError::invalid_config("encoder output must be even"));
        }
        Ok(())
    }
}

/// Two-layer leaky-ReLU encoder.
#[derive(Debug, Module)]
pub struct InputEncoder<B: Backend> {
    hidden: nn::Linear<B>,
    output: nn::Linear<B>,
}

impl<B: Backend> InputEncoder<B> {
    fn new(input: usize, hidden: usize, output: usize, device: &B::Device) -> Self {
        Self {
            hidden: nn::LinearConfig::new(input, hidden).init(device),
            output: nn::LinearConfig::new(hidden, output).init(device),
        }
    }

    /// `[B, in] -> [B, out]`.
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = leaky_relu(self.hidden.forward(x), LEAKY_SLOPE);
        leaky_relu(self.output.forward(x), LEAKY_SLOPE)
    }
}

/// Maps the LSTM output to rotation and root deltas.
#[derive(Debug, Module)]
pub struct Decoder<B: Backend> {
    hidden: nn::Linear<B>,
    output: nn::Linear<B>,
}

impl<B: Backend> Decoder<B> {
    fn new(input: usize, hidden: usize, output: usize, device: &B::Device) -> Self {
        Self {
            hidden: nn::LinearConfig::new(input, hidden).init(device),
            output: nn::LinearConfig::new(hidden, output).init(device),
        }
    }

    /// `[B, lstm_hidden] -> [B, J * 4 + 3]`.
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.output.forward(leaky_relu(self.hidden.forward(x), LEAKY_SLOPE))
    }
}

/// LSTM memory carried between steps.
#[derive(Debug, Clone)]
pub struct RecurrentState<B: Backend> {
    /// Hidden state `[B, H]`.
    pub hidden: Tensor<B, 2>,

    /// Cell state `[B, H]`.
    pub cell: Tensor<B, 2>,
}

impl<B: Backend> RecurrentState<B> {
    /// Zero state, used at the start of every rollout.
    #[must_use]
    pub fn zeros(batch: usize, hidden: usize, device: &B::Device) -> Self {
        Self {
            hidden: Tensor::zeros([batch, hidden], device),
            cell: Tensor::zeros([batch, hidden], device),
        }
    }

    /// Batch size.
    #[must_use]
    pub fn batch(&self) -> usize {
        self.hidden.dims()[0]
    }
}

/// Inputs of one recurrent step.
#[derive(Debug, Clone)]
pub struct StepInput<B: Backend> {
    /// Current local rotations `[B, J * 4]`.
    pub rotations: Tensor<B, 2>,

    /// Current root velocity `[B, 3]`.
    pub root_velocity: Tensor<B, 2>,

    /// One-hot latent code `[B, C]` (ignored when the model has no codes).
    pub code: Option<Tensor<B, 2>>,

    /// Target root minus current root `[B, 3]`.
    pub root_offset: Tensor<B, 2>,

    /// Target rotations minus current rotations `[B, J * 4]`.
    pub rotation_offset: Tensor<B, 2>,

    /// Target keyframe rotations `[B, J * 4]`.
    pub target_rotations: Tensor<B, 2>,

    /// Frames left until the target keyframe.
    pub time_to_arrival: usize,
}

/// Prediction of one recurrent step.
#[derive(Debug, Clone)]
pub struct StepOutput<B: Backend> {
    /// Additive update for the local rotations `[B, J * 4]`.
    pub rotation_delta: Tensor<B, 2>,

    /// Predicted root velocity `[B, 3]`.
    pub root_velocity: Tensor<B, 2>,
}

/// Encoder / LSTM / decoder in-betweener.
#[derive(Debug, Module)]
pub struct RecurrentInbetweener<B: Backend> {
    state_encoder: InputEncoder<B>,
    offset_encoder: InputEncoder<B>,
    target_encoder: InputEncoder<B>,
    lstm: Lstm<B>,
    decoder: Decoder<B>,
    #[module(skip)]
    joints: usize,
    #[module(skip)]
    code_classes: usize,
    #[module(skip)]
    lstm_hidden: usize,
    #[module(skip)]
    encoder_out: usize,
    #[module(skip)]
    max_tta: usize,
}

impl<B: Backend> RecurrentInbetweener<B> {
    /// Creates the model.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: &RecurrentInbetweenerConfig, device: &B::Device) -> Result<Self> {
        config.validate()?;
        let encoder = |input| InputEncoder::new(input, config.encoder_hidden, config.encoder_out, device);
        Ok(Self {
            state_encoder: encoder(config.state_dim()),
            offset_encoder: encoder(config.offset_dim()),
            target_encoder: encoder(config.target_dim()),
            lstm: LstmConfig::new(config.encoder_out * 3, config.lstm_hidden, true).init(device),
            decoder: Decoder::new(config.lstm_hidden, config.decoder_hidden, config.joints * 4 + 3, device),
            joints: config.joints,
            code_classes: config.code_classes,
            lstm_hidden: config.lstm_hidden,
            encoder_out: config.encoder_out,
            max_tta: config.max_tta,
        })
    }

    /// Fresh state for a rollout of `batch` sequences.
    #[must_use]
    pub fn initial_state(&self, batch: usize, device: &B::Device) -> RecurrentState<B> {
        RecurrentState::zeros(batch, self.lstm_hidden, device)
    }

    /// Joints per frame.
    #[must_use]
    pub const fn joints(&self) -> usize {
        self.joints
    }

    /// Latent code classes.
    #[must_use]
    pub const fn code_classes(&self) -> usize {
        self.code_classes
    }

    /// LSTM hidden width.
    #[must_use]
    pub const fn lstm_hidden(&self) -> usize {
        self.lstm_hidden
    }

    /// Encoder of the current state.
    pub const fn state_encoder(&self) -> &InputEncoder<B> {
        &self.state_encoder
    }

    /// Encoder of the offset to the target keyframe.
    pub const fn offset_encoder(&self) -> &InputEncoder<B> {
        &self.offset_encoder
    }

    /// Encoder of the target keyframe.
    pub const fn target_encoder(&self) -> &InputEncoder<B> {
        &self.target_encoder
    }

    /// Temporal core.
    pub const fn lstm(&self) -> &Lstm<B> {
        &self.lstm
    }

    /// Output decoder.
    pub const fn decoder(&self) -> &Decoder<B> {
        &self.decoder
    }

    /// Advances the model by one frame.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ShapeMismatch` if an input width or batch size
    /// disagrees with the model or the state.
    pub fn step(&self, state: RecurrentState<B>, input: StepInput<B>) -> Result<(RecurrentState<B>, StepOutput<B>)> {
        let batch = state.batch();
        let rot_dim = self.joints * 4;
        check_dims("rotations", &input.rotations, batch, rot_dim)?;
        check_dims("root velocity", &input.root_velocity, batch, 3)?;
        check_dims("root offset", &input.root_offset, batch, 3)?;
        check_dims("rotation offset", &input.rotation_offset, batch, rot_dim)?;
        check_dims("target rotations", &input.target_rotations, batch, rot_dim)?;

        let device = input.rotations.device();
        let mut state_parts = vec![input.rotations, input.root_velocity];
        if self.code_classes > 0 {
            let code = match input.code {
                Some(code) => {
                    check_dims("code", &code, batch, self.code_classes)?;
                    code
                }
                None => Tensor::zeros([batch, self.code_classes], &device),
            };
            state_parts.push(code);
        }

        let tta = TimeToArrivalEncoding::new(self.encoder_out)
            .with_max_tta(self.max_tta)
            .encode::<B>(input.time_to_arrival, &device);
        let h_state = self.state_encoder.forward(Tensor::cat(state_parts, 1)) + tta.clone();
        let h_offset = self
            .offset_encoder
            .forward(Tensor::cat(vec![input.root_offset, input.rotation_offset], 1))
            + tta.clone();
        let h_target = self.target_encoder.forward(input.target_rotations) + tta;

        let x = Tensor::cat(vec![h_state, h_offset, h_target], 1).unsqueeze_dim::<3>(1);
        let (out, next) = self
            .lstm
            .forward(x, Some(LstmState::new(state.cell, state.hidden)));

        let h = out.reshape([batch, self.lstm_hidden]);
        let decoded = self.decoder.forward(h);

        Ok((
            RecurrentState {
                hidden: next.hidden,
                cell: next.cell,
            },
            StepOutput {
                rotation_delta: decoded.clone().narrow(1, 0, rot_dim),
                root_velocity: decoded.narrow(1, rot_dim, 3),
            },
        ))
    }
}

fn check_dims<B: Backend>(name: &str, t: &Tensor<B, 2>, batch: usize, width: usize) -> Result<()> {
    let dims = t.dims();
    if dims == [batch, width] {
        Ok(())
    } else {
        Err(ModelError::shape_mismatch(
            format!("{name} [{batch}, {width}]"),
            format!("{dims:?}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn small_model(device: &<TestBackend as Backend>::Device) -> RecurrentInbetweener<TestBackend> {
        let config = RecurrentInbetweenerConfig::new(3, 2).with_widths(16, 8, 12, 16);
        RecurrentInbetweener::new(&config, device).unwrap()
    }

    fn input(batch: usize, device: &<TestBackend as Backend>::Device) -> StepInput<TestBackend> {
        StepInput {
            rotations: Tensor::ones([batch, 12], device),
            root_velocity: Tensor::zeros([batch, 3], device),
            code: Some(Tensor::ones([batch, 2], device)),
            root_offset: Tensor::ones([batch, 3], device),
            rotation_offset: Tensor::zeros([batch, 12], device),
            target_rotations: Tensor::ones([batch, 12], device),
            time_to_arrival: 7,
        }
    }

    #[test]
    fn step_shapes() {
        let device = <TestBackend as Backend>::Device::default();
        let model = small_model(&device);
        let state = model.initial_state(4, &device);
        let (next, out) = model.step(state, input(4, &device)).unwrap();

        assert_eq!(next.hidden.dims(), [4, 12]);
        assert_eq!(next.cell.dims(), [4, 12]);
        assert_eq!(out.rotation_delta.dims(), [4, 12]);
        assert_eq!(out.root_velocity.dims(), [4, 3]);
    }

    #[test]
    fn step_is_deterministic_given_state() {
        let device = <TestBackend as Backend>::Device::default();
        let model = small_model(&device);
        let (state, _) = model.step(model.initial_state(2, &device), input(2, &device)).unwrap();

        let (_, a) = model.step(state.clone(), input(2, &device)).unwrap();
        let (_, b) = model.step(state, input(2, &device)).unwrap();
        let a = a.rotation_delta.into_data().to_vec::<f32>().unwrap();
        let b = b.rotation_delta.into_data().to_vec::<f32>().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn state_changes_output() {
        let device = <TestBackend as Backend>::Device::default();
        let model = small_model(&device);
        let zero = model.initial_state(2, &device);
        let (warm, _) = model.step(zero.clone(), input(2, &device)).unwrap();

        let (_, from_zero) = model.step(zero, input(2, &device)).unwrap();
        let (_, from_warm) = model.step(warm, input(2, &device)).unwrap();
        assert_ne!(
            from_zero.root_velocity.into_data().to_vec::<f32>().unwrap(),
            from_warm.root_velocity.into_data().to_vec::<f32>().unwrap()
        );
    }

    #[test]
    fn wrong_width_is_rejected() {
        let device = <TestBackend as Backend>::Device::default();
        let model = small_model(&device);
        let mut bad = input(2, &device);
        bad.rotations = Tensor::ones([2, 11], &device);
        let result = model.step(model.initial_state(2, &device), bad);
        assert!(matches!(result, Err(ModelError::ShapeMismatch { .. })));
    }

    #[test]
    fn config_validation() {
        assert!(RecurrentInbetweenerConfig::new(22, 2).validate().is_ok());
        assert!(RecurrentInbetweenerConfig::new(0, 2).validate().is_err());
        assert!(
            RecurrentInbetweenerConfig::new(22, 2)
                .with_widths(16, 7, 8, 8)
                .validate()
                .is_err()
        );
    }
}
