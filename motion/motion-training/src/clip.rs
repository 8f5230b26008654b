//! Global-norm gradient clipping per module.
//!
//! Burn's built-in clipping works tensor by tensor. Here the norm is taken
//! over every parameter of one module, so a whole sub-network is rescaled
//! together.

use std::marker::PhantomData;

use burn::module::{Module, ModuleVisitor, ParamId};
use burn::optim::GradientsParams;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{ElementConversion, Tensor};
use tracing::warn;

struct SquaredNorm<'a, B: AutodiffBackend> {
    grads: &'a GradientsParams,
    sum: f32,
    backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for SquaredNorm<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(id) {
            self.sum += grad.powf_scalar(2.0).sum().into_scalar().elem::<f32>();
        }
    }
}

struct Rescale<'a, B: AutodiffBackend> {
    grads: &'a mut GradientsParams,
    factor: f32,
    backend: PhantomData<B>,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for Rescale<'_, B> {
    fn visit_float<const D: usize>(&mut self, id: ParamId, _tensor: &Tensor<B, D>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(id) {
            self.grads.register(id, grad.mul_scalar(self.factor));
        }
    }
}

/// L2 norm of all gradients that belong to `module`.
pub fn grad_norm<B, M>(module: &M, grads: &GradientsParams) -> f32
where
    B: AutodiffBackend,
    M: Module<B>,
{
    let mut visitor = SquaredNorm::<B> {
        grads,
        sum: 0.0,
        backend: PhantomData,
    };
    module.visit(&mut visitor);
    visitor.sum.sqrt()
}

/// Rescales `module`'s gradients so their global norm is at most `max_norm`.
///
/// Returns the norm before clipping. A non-finite norm leaves the gradients
/// untouched and is only logged. A `max_norm` of 0 disables clipping.
pub fn clip_grad_norm<B, M>(module: &M, grads: &mut GradientsParams, max_norm: f32) -> f32
where
    B: AutodiffBackend,
    M: Module<B>,
{
    let norm = grad_norm::<B, M>(module, grads);
    if !norm.is_finite() {
        warn!(norm, "non-finite gradient norm, skipping clip");
        return norm;
    }
    if max_norm > 0.0 && norm > max_norm {
        let mut visitor = Rescale::<B> {
            grads,
            factor: max_norm / (norm + 1e-6),
            backend: PhantomData,
        };
        module.visit(&mut visitor);
    }
    norm
}
