//! Type-erased `AdamW` optimizers with checkpointable state.

use std::path::{Path, PathBuf};

use burn::module::AutodiffModule;
use burn::optim::{AdamWConfig, GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use motion_models::{CheckpointFormat, load_record, save_record};

use crate::config::OptimizerConfig;
use crate::error::Result;

/// An optimizer for module `M` whose state can be saved and restored.
pub trait ModuleOptimizer<B: AutodiffBackend, M: AutodiffModule<B>>: Send {
    /// Applies one update and returns the new module.
    fn step(&mut self, lr: f64, module: M, grads: GradientsParams) -> M;

    /// Writes the optimizer state next to `stem`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn save(&self, stem: &Path, format: CheckpointFormat) -> Result<PathBuf>;

    /// Replaces the optimizer state with the record at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read.
    fn load(self: Box<Self>, path: &Path, device: &B::Device) -> Result<Box<dyn ModuleOptimizer<B, M>>>;
}

impl<B, M, O> ModuleOptimizer<B, M> for O
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B> + 'static,
{
    fn step(&mut self, lr: f64, module: M, grads: GradientsParams) -> M {
        Optimizer::step(self, lr, module, grads)
    }

    fn save(&self, stem: &Path, format: CheckpointFormat) -> Result<PathBuf> {
        Ok(save_record::<B, O::Record>(self.to_record(), stem, format)?)
    }

    fn load(self: Box<Self>, path: &Path, device: &B::Device) -> Result<Box<dyn ModuleOptimizer<B, M>>> {
        let record = load_record::<B, O::Record>(path, device)?;
        Ok(Box::new((*self).load_record(record)))
    }
}

/// Builds an `AdamW` optimizer for `M`.
#[must_use]
pub fn adamw<B, M>(config: &OptimizerConfig) -> Box<dyn ModuleOptimizer<B, M>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + 'static,
{
    Box::new(
        AdamWConfig::new()
            .with_beta_1(config.beta1)
            .with_beta_2(config.beta2)
            .with_epsilon(config.epsilon)
            .with_weight_decay(config.weight_decay)
            .init::<B, M>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::Autodiff;
    use burn::nn::{Linear, LinearConfig};
    use burn::tensor::Tensor;
    use burn_ndarray::NdArray;

    type TestBackend = Autodiff<NdArray<f32>>;

    fn weights(layer: &Linear<TestBackend>) -> Vec<f32> {
        layer.weight.val().into_data().to_vec::<f32>().unwrap()
    }

    fn train_step(
        optim: &mut Box<dyn ModuleOptimizer<TestBackend, Linear<TestBackend>>>,
        layer: Linear<TestBackend>,
    ) -> Linear<TestBackend> {
        let x = Tensor::<TestBackend, 2>::ones([2, 3], &Default::default());
        let loss = layer.forward(x).sum();
        let grads = GradientsParams::from_grads(loss.backward(), &layer);
        optim.step(1e-2, layer, grads)
    }

    #[test]
    fn step_updates_weights() {
        let layer = LinearConfig::new(3, 2).init::<TestBackend>(&Default::default());
        let before = weights(&layer);
        let mut optim = adamw::<TestBackend, Linear<TestBackend>>(&OptimizerConfig::adamw(1e-2));
        let layer = train_step(&mut optim, layer);
        assert_ne!(weights(&layer), before);
    }

    #[test]
    fn state_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("optim");
        let device = Default::default();

        let layer = LinearConfig::new(3, 2).init::<TestBackend>(&device);
        let mut optim = adamw::<TestBackend, Linear<TestBackend>>(&OptimizerConfig::adamw(1e-2));
        let layer = train_step(&mut optim, layer);
        let path = optim.save(&stem, CheckpointFormat::Binary).unwrap();

        let fresh = adamw::<TestBackend, Linear<TestBackend>>(&OptimizerConfig::adamw(1e-2));
        let mut restored = fresh.load(&path, &device).unwrap();

        let a = train_step(&mut optim, layer.clone());
        let b = train_step(&mut restored, layer);
        let (a, b) = (weights(&a), weights(&b));
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-6);
        }
    }
}
