//! Attention backbone for in-betweening.
//!
//! The whole window is predicted in one pass. A label embedding is prepended
//! as a conditioning token; output slot 0 reconstructs that token and slots
//! `1..=T` are the predicted frames.

use burn::module::Module;
use burn::nn;
use burn::nn::transformer::{TransformerEncoder, TransformerEncoderConfig, TransformerEncoderInput};
use burn::prelude::Backend;
use burn::tensor::{Bool, Int, Tensor};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Configuration for [`TransformerInbetweener`].
///
/// # Example
///
/// ```
/// use motion_models::TransformerInbetweenerConfig;
///
/// let config = TransformerInbetweenerConfig::new(154, 12);
/// assert_eq!(config.d_model, 256);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformerInbetweenerConfig {
    /// Width of a pose vector (`J * 7`).
    pub feature_dim: usize,

    /// Number of motion categories for the conditioning token.
    pub num_labels: usize,

    /// Number of latent code classes (0 disables code input).
    pub code_classes: usize,

    /// Embedding width inside the encoder.
    pub d_model: usize,

    /// Attention heads.
    pub n_heads: usize,

    /// Feed-forward hidden width.
    pub d_ff: usize,

    /// Encoder layers.
    pub n_layers: usize,

    /// Dropout probability.
    pub dropout: f64,

    /// Longest supported window including the conditioning token.
    pub max_frames: usize,
}

impl TransformerInbetweenerConfig {
    /// Creates a configuration with default encoder sizes.
    #[must_use]
    pub const fn new(feature_dim: usize, num_labels: usize) -> Self {
        Self {
            feature_dim,
            num_labels,
            code_classes: 0,
            d_model: 256,
            n_heads: 8,
            d_ff: 2048,
            n_layers: 8,
            dropout: 0.05,
            max_frames: 512,
        }
    }

    /// Sets the latent code classes.
    #[must_use]
    pub const fn with_code_classes(mut self, code_classes: usize) -> Self {
        self.code_classes = code_classes;
        self
    }

    /// Sets the encoder shape.
    #[must_use]
    pub const fn with_encoder(mut self, d_model: usize, n_heads: usize, d_ff: usize, n_layers: usize) -> Self {
        self.d_model = d_model;
        self.n_heads = n_heads;
        self.d_ff = d_ff;
        self.n_layers = n_layers;
        self
    }

    /// Sets the dropout probability.
    #[must_use]
    pub const fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    /// Sets the longest supported window, conditioning token included.
    #[must_use]
    pub const fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidConfig` when a size is zero, `d_model` is
    /// odd or not divisible by `n_heads`, or dropout is outside `[0, 1)`.
    pub fn validate(&self) -> Result<()> {
        if self.feature_dim == 0
            || self.num_labels == 0
            || self.n_layers == 0
            || self.d_ff == 0
            || self.max_frames < 2
        {
            return Err(ModelError::invalid_config("transformer sizes must be positive"));
        }
        if self.n_heads == 0 || self.d_model % self.n_heads != 0 {
            return Err(ModelError::invalid_config(format!(
                "d_model {} not divisible by {} heads",
                self.d_model, self.n_heads
            )));
        }
        if self.d_model % 2 != 0 {
            return Err(ModelError::invalid_config("d_model must be even"));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::invalid_config(format!("dropout {}", self.dropout)));
        }
        Ok(())
    }
}

/// Output of a full-window forward pass.
#[derive(Debug, Clone)]
pub struct SequenceOutput<B: Backend> {
    /// Predicted frames `[T, B, F]`.
    pub frames: Tensor<B, 3>,

    /// Reconstructed conditioning token `[1, B, F]`.
    pub condition: Tensor<B, 3>,

    /// Conditioning token that was fed in `[1, B, F]`.
    pub condition_target: Tensor<B, 3>,
}

/// Transformer-encoder in-betweener.
#[derive(Debug, Module)]
pub struct TransformerInbetweener<B: Backend> {
    label: nn::Embedding<B>,
    input: nn::Linear<B>,
    code: Option<nn::Linear<B>>,
    positional: nn::PositionalEncoding<B>,
    encoder: TransformerEncoder<B>,
    output: nn::Linear<B>,
    #[module(skip)]
    feature_dim: usize,
    #[module(skip)]
    code_classes: usize,
    #[module(skip)]
    d_model: usize,
    #[module(skip)]
    max_frames: usize,
}

impl<B: Backend> TransformerInbetweener<B> {
    /// Creates the model.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: &TransformerInbetweenerConfig, device: &B::Device) -> Result<Self> {
        config.validate()?;
        let code = (config.code_classes > 0)
            .then(|| nn::LinearConfig::new(config.code_classes, config.d_model).init(device));
        Ok(Self {
            label: nn::EmbeddingConfig::new(config.num_labels, config.feature_dim).init(device),
            input: nn::LinearConfig::new(config.feature_dim, config.d_model).init(device),
            code,
            positional: nn::PositionalEncodingConfig::new(config.d_model)
                .with_max_sequence_size(config.max_frames)
                .init(device),
            encoder: TransformerEncoderConfig::new(
                config.d_model,
                config.d_ff,
                config.n_heads,
                config.n_layers,
            )
            .with_dropout(config.dropout)
            .init(device),
            output: nn::LinearConfig::new(config.d_model, config.feature_dim).init(device),
            feature_dim: config.feature_dim,
            code_classes: config.code_classes,
            d_model: config.d_model,
            max_frames: config.max_frames,
        })
    }

    /// Runs the model over a whole window.
    ///
    /// - `input`: interpolated frames `[T, B, F]`
    /// - `codes`: optional one-hot latent codes `[T, B, C]`
    /// - `mask`: attention mask `[T + 1, T + 1]`, `true` blocks attention
    /// - `labels`: category ids `[B]`
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ShapeMismatch` if any input disagrees with the
    /// others or with the configuration, or if `T + 1` exceeds `max_frames`.
    pub fn forward(
        &self,
        input: Tensor<B, 3>,
        codes: Option<Tensor<B, 3>>,
        mask: Tensor<B, 2, Bool>,
        labels: Tensor<B, 1, Int>,
    ) -> Result<SequenceOutput<B>> {
        let [frames, batch, features] = input.dims();
        if frames + 1 > self.max_frames {
            return Err(ModelError::shape_mismatch(
                format!("at most {} frames", self.max_frames - 1),
                format!("{frames} frames"),
            ));
        }
        if features != self.feature_dim {
            return Err(ModelError::shape_mismatch(
                format!("[T, B, {}]", self.feature_dim),
                format!("[{frames}, {batch}, {features}]"),
            ));
        }
        if mask.dims() != [frames + 1, frames + 1] {
            return Err(ModelError::shape_mismatch(
                format!("mask [{}, {}]", frames + 1, frames + 1),
                format!("{:?}", mask.dims()),
            ));
        }
        if labels.dims() != [batch] {
            return Err(ModelError::shape_mismatch(
                format!("labels [{batch}]"),
                format!("{:?}", labels.dims()),
            ));
        }
        let device = input.device();

        let token = self.label.forward(labels.reshape([batch, 1]));
        let sequence = Tensor::cat(vec![token.clone(), input.swap_dims(0, 1)], 1);
        let mut x = self.input.forward(sequence);

        match (&self.code, codes) {
            (Some(code), Some(codes)) => {
                if codes.dims() != [frames, batch, self.code_classes] {
                    return Err(ModelError::shape_mismatch(
                        format!("codes [{frames}, {batch}, {}]", self.code_classes),
                        format!("{:?}", codes.dims()),
                    ));
                }
                let embedded = code.forward(codes.swap_dims(0, 1));
                let pad = Tensor::zeros([batch, 1, self.d_model], &device);
                x = x + Tensor::cat(vec![pad, embedded], 1);
            }
            (None, Some(_)) => {
                return Err(ModelError::shape_mismatch("no latent codes", "latent codes"));
            }
            (_, None) => {}
        }

        let x = self.positional.forward(x);
        let mask = Tensor::stack::<3>(vec![mask; batch], 0);
        let x = self.encoder.forward(TransformerEncoderInput::new(x).mask_attn(mask));
        let out = self.output.forward(x).swap_dims(0, 1);

        Ok(SequenceOutput {
            condition: out.clone().narrow(0, 0, 1),
            frames: out.narrow(0, 1, frames),
            condition_target: token.swap_dims(0, 1),
        })
    }

    /// Width of a pose vector.
    #[must_use]
    pub const fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    /// Latent code classes accepted by [`TransformerInbetweener::forward`].
    #[must_use]
    pub const fn code_classes(&self) -> usize {
        self.code_classes
    }
}

/// All-false (fully visible) attention mask of side `len`.
#[must_use]
pub fn unmasked_attention<B: Backend>(len: usize, device: &B::Device) -> Tensor<B, 2, Bool> {
    Tensor::<B, 2, Int>::zeros([len, len], device).equal_elem(1)
}
