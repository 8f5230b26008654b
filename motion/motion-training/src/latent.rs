//! Discrete latent codes fed to the generator and recovered by the critics.

use burn::prelude::Backend;
use burn::tensor::{Tensor, TensorData};
use rand::Rng;

use crate::error::{Result, TrainingError};

/// One-hot code per sequence and frame, drawn fresh every step.
#[derive(Debug, Clone)]
pub struct LatentCodes<B: Backend> {
    one_hot: Tensor<B, 3>,
    indices: Vec<usize>,
    classes: usize,
}

impl<B: Backend> LatentCodes<B> {
    /// Draws an independent class for every `(sequence, frame)`.
    ///
    /// # Errors
    ///
    /// Returns `TrainingError::InvalidConfig` if `classes` is 0.
    pub fn sample<R: Rng>(
        batch: usize,
        frames: usize,
        classes: usize,
        rng: &mut R,
        device: &B::Device,
    ) -> Result<Self> {
        if classes == 0 {
            return Err(TrainingError::invalid_config("latent codes need at least one class"));
        }
        let indices = (0..batch * frames).map(|_| rng.gen_range(0..classes)).collect();
        Ok(Self::from_indices(indices, batch, frames, classes, device))
    }

    /// The same class everywhere.
    ///
    /// # Errors
    ///
    /// Returns `TrainingError::InvalidConfig` if `class >= classes`.
    pub fn fixed(
        batch: usize,
        frames: usize,
        classes: usize,
        class: usize,
        device: &B::Device,
    ) -> Result<Self> {
        if class >= classes {
            return Err(TrainingError::invalid_config(format!(
                "code class {class} out of {classes}"
            )));
        }
        Ok(Self::from_indices(vec![class; batch * frames], batch, frames, classes, device))
    }

    fn from_indices(
        indices: Vec<usize>,
        batch: usize,
        frames: usize,
        classes: usize,
        device: &B::Device,
    ) -> Self {
        let mut values = vec![0.0_f32; batch * frames * classes];
        for (slot, class) in indices.iter().enumerate() {
            values[slot * classes + class] = 1.0;
        }
        let one_hot = Tensor::from_data(TensorData::new(values, [batch, frames, classes]), device);
        Self {
            one_hot,
            indices,
            classes,
        }
    }

    /// Number of classes.
    #[must_use]
    pub const fn classes(&self) -> usize {
        self.classes
    }

    /// Class per `(sequence, frame)`, sequence-major.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// `[B, T, C]` one-hot codes.
    #[must_use]
    pub fn one_hot(&self) -> Tensor<B, 3> {
        self.one_hot.clone()
    }

    /// `[B, C]` codes of frame `t`.
    #[must_use]
    pub fn frame(&self, t: usize) -> Tensor<B, 2> {
        let [batch, _, classes] = self.one_hot.dims();
        self.one_hot.clone().narrow(1, t, 1).reshape([batch, classes])
    }

    /// `[T, B, C]` codes for time-major models.
    #[must_use]
    pub fn time_major(&self) -> Tensor<B, 3> {
        self.one_hot.clone().swap_dims(0, 1)
    }

    /// `[B * T, C]` codes, matching per-frame critic rows.
    #[must_use]
    pub fn flat(&self) -> Tensor<B, 2> {
        let [batch, frames, classes] = self.one_hot.dims();
        self.one_hot.clone().reshape([batch * frames, classes])
    }

    /// `[B * W, C]` codes of the last frame in each `window`-long window.
    #[must_use]
    pub fn window_targets(&self, window: usize) -> Tensor<B, 2> {
        let [batch, frames, classes] = self.one_hot.dims();
        let windows = frames + 1 - window.clamp(1, frames.max(1));
        self.one_hot
            .clone()
            .narrow(1, frames - windows, windows)
            .reshape([batch * windows, classes])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    type TestBackend = NdArray<f32>;

    #[test]
    fn sampled_codes_are_one_hot() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let codes =
            LatentCodes::<TestBackend>::sample(2, 4, 3, &mut rng, &Default::default()).unwrap();
        assert_eq!(codes.one_hot().dims(), [2, 4, 3]);
        assert_eq!(codes.indices().len(), 8);

        let rows = codes.flat().into_data().to_vec::<f32>().unwrap();
        for (row, class) in rows.chunks(3).zip(codes.indices()) {
            assert_eq!(row.iter().sum::<f32>(), 1.0);
            assert_eq!(row[*class], 1.0);
        }
    }

    #[test]
    fn fixed_codes() {
        let codes = LatentCodes::<TestBackend>::fixed(2, 3, 2, 1, &Default::default()).unwrap();
        let frame = codes.frame(2).into_data().to_vec::<f32>().unwrap();
        assert_eq!(frame, vec![0.0, 1.0, 0.0, 1.0]);
        assert!(LatentCodes::<TestBackend>::fixed(2, 3, 2, 2, &Default::default()).is_err());
    }

    #[test]
    fn zero_classes_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert!(LatentCodes::<TestBackend>::sample(2, 4, 0, &mut rng, &Default::default()).is_err());
    }

    #[test]
    fn window_targets_use_last_frame_of_each_window() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let codes =
            LatentCodes::<TestBackend>::sample(1, 6, 4, &mut rng, &Default::default()).unwrap();
        let targets = codes.window_targets(5);
        assert_eq!(targets.dims(), [2, 4]);

        let rows = targets.into_data().to_vec::<f32>().unwrap();
        assert_eq!(rows[codes.indices()[4]], 1.0);
        assert_eq!(rows[4 + codes.indices()[5]], 1.0);
    }

    #[test]
    fn time_major_swaps_batch_and_frames() {
        let codes = LatentCodes::<TestBackend>::fixed(2, 5, 3, 0, &Default::default()).unwrap();
        assert_eq!(codes.time_major().dims(), [5, 2, 3]);
    }
}
