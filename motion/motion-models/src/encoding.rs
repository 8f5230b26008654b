//! Sinusoidal time-to-arrival encoding.

use burn::prelude::Backend;
use burn::tensor::{Tensor, TensorData};

/// Encodes the number of frames left before the target keyframe.
///
/// Channel `2i` is `sin(tta / basis^(2i / dim))` and channel `2i + 1` the
/// matching cosine. Arrival times past `max_tta` are clamped so far-away
/// targets share one code.
///
/// # Example
///
/// ```
/// use motion_models::TimeToArrivalEncoding;
///
/// let encoding = TimeToArrivalEncoding::new(256);
/// assert_eq!(encoding.values(0).len(), 256);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeToArrivalEncoding {
    dim: usize,
    basis: f32,
    max_tta: usize,
}

impl TimeToArrivalEncoding {
    /// Creates an encoding of width `dim` with basis 10000.
    #[must_use]
    pub const fn new(dim: usize) -> Self {
        Self {
            dim,
            basis: 10_000.0,
            max_tta: 65,
        }
    }

    /// Sets the arrival time beyond which the encoding saturates.
    #[must_use]
    pub const fn with_max_tta(mut self, max_tta: usize) -> Self {
        self.max_tta = max_tta;
        self
    }

    /// Encoding width.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Host values for one arrival time.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn values(&self, tta: usize) -> Vec<f32> {
        let t = tta.min(self.max_tta) as f32;
        (0..self.dim)
            .map(|c| {
                let pair = (c / 2 * 2) as f32;
                let angle = t / self.basis.powf(pair / self.dim as f32);
                if c % 2 == 0 { angle.sin() } else { angle.cos() }
            })
            .collect()
    }

    /// Encoding as a `[1, dim]` tensor for broadcasting over a batch.
    #[must_use]
    pub fn encode<B: Backend>(&self, tta: usize, device: &B::Device) -> Tensor<B, 2> {
        Tensor::from_data(TensorData::new(self.values(tta), [1, self.dim]), device)
    }
}
