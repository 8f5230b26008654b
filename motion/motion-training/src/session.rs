//! The training session: models, optimizers, RNG and progress in one owner.

use std::path::{Path, PathBuf};
use std::time::Instant;

use burn::optim::GradientsParams;
use burn::tensor::backend::AutodiffBackend;
use motion_dataset::MotionDataset;
use motion_models::{CheckpointFormat, CriticConfig, CriticEnsemble, Kinematics, load_checkpoint};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::adversarial::{CriticInputs, critic_objective, generator_objective};
use crate::backbone::{GeneratorConfig, Inbetweener, StepContext, TrainingBatch};
use crate::checkpoint::{
    CRITIC_OPTIMIZER_STEM, CRITICS_STEM, CheckpointManifest, GENERATOR_OPTIMIZER_STEM, GENERATOR_STEM,
    checkpoint_dir,
};
use crate::config::{Backbone, OptimizerConfig, TrainingConfig};
use crate::error::{Result, TrainingError};
use crate::loss::scalar;
use crate::metrics::{EpochMetrics, StepMetrics, TrainingMetrics};
use crate::optim::{ModuleOptimizer, adamw};
use crate::state::TrainingState;

/// Critic ensemble with its optimizer.
struct Critics<B: AutodiffBackend> {
    ensemble: CriticEnsemble<B>,
    config: CriticConfig,
    optim: Box<dyn ModuleOptimizer<B, CriticEnsemble<B>>>,
}

impl<B: AutodiffBackend> Critics<B> {
    fn new(config: CriticConfig, optimizer: &OptimizerConfig, device: &B::Device) -> Result<Self> {
        Ok(Self {
            ensemble: CriticEnsemble::new(&config, device)?,
            config,
            optim: adamw::<B, CriticEnsemble<B>>(optimizer),
        })
    }

    fn load(self, dir: &Path, manifest: &CheckpointManifest, device: &B::Device) -> Result<Self> {
        let ensemble = load_checkpoint::<B, CriticEnsemble<B>>(
            self.ensemble,
            &manifest.record_path(dir, CRITICS_STEM),
            device,
        )?;
        let optim = self
            .optim
            .load(&manifest.record_path(dir, CRITIC_OPTIMIZER_STEM), device)?;
        Ok(Self {
            ensemble,
            config: self.config,
            optim,
        })
    }
}

/// Owns everything one training run needs.
///
/// Generic over the backend and the generator backbone. Critics exist only
/// when the configuration gives an adversarial term a non-zero weight.
///
/// # Example
///
/// ```ignore
/// use motion_models::TransformerInbetweener;
/// use motion_training::{TrainingConfig, TrainingSession};
///
/// let config = TrainingConfig::transformer().with_seed(7);
/// let mut session =
///     TrainingSession::<MyBackend, TransformerInbetweener<MyBackend>>::new(config, &dataset, &device)?;
/// let metrics = session.fit(&dataset, Some(Path::new("runs/lafan")))?;
/// println!("{}", metrics.summary());
/// ```
pub struct TrainingSession<B: AutodiffBackend, M: Inbetweener<B>> {
    config: TrainingConfig,
    device: B::Device,
    generator: M,
    generator_config: GeneratorConfig,
    generator_optim: Box<dyn ModuleOptimizer<B, M>>,
    critics: Option<Critics<B>>,
    kinematics: Kinematics<B>,
    categories: Vec<String>,
    rng: ChaCha8Rng,
    state: TrainingState,
    format: CheckpointFormat,
}

impl<B: AutodiffBackend, M: Inbetweener<B>> TrainingSession<B, M> {
    /// Creates a fresh session for `dataset`.
    ///
    /// # Errors
    ///
    /// Returns `TrainingError::InvalidConfig` if the configuration is invalid
    /// or names another backbone, and `TrainingError::Dataset` if the
    /// dataset is empty or its windows do not match the configuration.
    pub fn new(config: TrainingConfig, dataset: &MotionDataset, device: &B::Device) -> Result<Self> {
        check_compatible::<B, M>(&config, dataset)?;
        let joints = dataset.skeleton().joint_count();
        let categories = dataset.categories().classes().to_vec();

        let generator_config = M::generator_config(&config, joints, categories.len());
        let generator = M::from_config(&generator_config, device)?;
        let generator_optim = adamw::<B, M>(&config.optimizer);
        let critics = if config.uses_critics() {
            let critic_config =
                CriticConfig::new(joints, config.code_classes).with_hidden(config.critic_hidden);
            Some(Critics::new(critic_config, &config.optimizer, device)?)
        } else {
            None
        };

        info!(
            backbone = %config.backbone,
            joints,
            categories = categories.len(),
            windows = dataset.len(),
            critics = critics.is_some(),
            "training session ready"
        );
        Ok(Self {
            rng: config.seed.map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64),
            state: TrainingState::from_config(&config),
            kinematics: Kinematics::new(dataset.skeleton(), device),
            device: device.clone(),
            config,
            generator,
            generator_config,
            generator_optim,
            critics,
            categories,
            format: CheckpointFormat::default(),
        })
    }

    /// Rebuilds a session from a checkpoint directory written by
    /// [`TrainingSession::save_checkpoint`]. Training continues with the
    /// epoch after the one stored in the manifest.
    ///
    /// # Errors
    ///
    /// Returns `TrainingError::Checkpoint` if the manifest is missing, is for
    /// another backbone, or its records cannot be loaded, and
    /// `TrainingError::Dataset` if `dataset` has different categories.
    pub fn resume(dir: &Path, dataset: &MotionDataset, device: &B::Device) -> Result<Self> {
        let manifest = CheckpointManifest::load(dir)?;
        if manifest.backbone != M::BACKBONE {
            return Err(TrainingError::checkpoint(format!(
                "checkpoint holds a {} generator, session expects {}",
                manifest.backbone,
                M::BACKBONE
            )));
        }
        if dataset.categories().classes() != manifest.categories.as_slice() {
            return Err(TrainingError::dataset(format!(
                "categories {:?} differ from checkpoint {:?}",
                dataset.categories().classes(),
                manifest.categories
            )));
        }
        let config = manifest.config.clone();
        check_compatible::<B, M>(&config, dataset)?;

        let generator = load_checkpoint::<B, M>(
            M::from_config(&manifest.generator, device)?,
            &manifest.record_path(dir, GENERATOR_STEM),
            device,
        )?;
        let generator_optim = adamw::<B, M>(&config.optimizer)
            .load(&manifest.record_path(dir, GENERATOR_OPTIMIZER_STEM), device)?;
        let critics = match manifest.critics {
            Some(critic_config) => Some(
                Critics::new(critic_config, &config.optimizer, device)?.load(dir, &manifest, device)?,
            ),
            None if config.uses_critics() => {
                return Err(TrainingError::checkpoint("adversarial run saved without critics"));
            }
            None => None,
        };

        info!(
            dir = %dir.display(),
            epoch = manifest.epoch,
            backbone = %manifest.backbone,
            "resumed from checkpoint"
        );
        Ok(Self {
            rng: config.seed.map_or_else(ChaCha8Rng::from_entropy, |seed| {
                ChaCha8Rng::seed_from_u64(seed.wrapping_add(manifest.epoch as u64 + 1))
            }),
            state: TrainingState::resumed(&config, manifest.epoch),
            kinematics: Kinematics::new(dataset.skeleton(), device),
            device: device.clone(),
            config,
            generator,
            generator_config: manifest.generator,
            generator_optim,
            critics,
            categories: manifest.categories,
            format: manifest.format,
        })
    }

    /// Sets the record format used by [`TrainingSession::save_checkpoint`].
    #[must_use]
    pub fn with_checkpoint_format(mut self, format: CheckpointFormat) -> Self {
        self.format = format;
        self
    }

    /// Training configuration.
    pub const fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Current generator.
    pub const fn generator(&self) -> &M {
        &self.generator
    }

    /// Current critic ensemble, if trained.
    pub fn critics(&self) -> Option<&CriticEnsemble<B>> {
        self.critics.as_ref().map(|c| &c.ensemble)
    }

    /// Progress so far.
    pub const fn state(&self) -> &TrainingState {
        &self.state
    }

    /// Category names in id order.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// One critic update followed by one generator update.
    ///
    /// # Errors
    ///
    /// Returns `TrainingError::ShapeMismatch` if generated and reference
    /// motion disagree, or any model error from the forward passes.
    pub fn train_step(&mut self, batch: &TrainingBatch<'_, B>) -> Result<StepMetrics> {
        let epoch = self.state.epoch;
        let lr = self.config.learning_rate(epoch);
        let generated = {
            let mut ctx = StepContext {
                config: &self.config,
                kinematics: &self.kinematics,
                epoch,
                rng: &mut self.rng,
            };
            self.generator.generate(batch, &mut ctx)?
        };
        let weights = self.config.weights;

        let reconstruction = generated.reconstruction.weighted(&weights);
        let mut loss = reconstruction.clone();
        let mut critic_loss = None;
        let mut adversarial = 0.0;
        if let Some(critics) = self.critics.as_mut() {
            let fake = CriticInputs::new(generated.fake_positions, generated.fake_rotations)?;
            let real = CriticInputs::new(generated.real_positions, generated.real_rotations)?;
            fake.check_same_shape(&real)?;

            let losses = critic_objective(&critics.ensemble, &fake.clone().detach(), &real, &weights)?;
            critic_loss = Some(scalar(losses.total.clone()));
            let grads = GradientsParams::from_grads(losses.total.backward(), &critics.ensemble);
            critics.ensemble = critics.optim.step(lr, critics.ensemble.clone(), grads);

            let terms = generator_objective(&critics.ensemble, &fake, generated.codes.as_ref(), &weights)?;
            adversarial = scalar(terms.total.clone());
            loss = loss + terms.total;
        }

        let mut divergence = 0.0;
        if let Some(reward) = generated.divergence {
            divergence = scalar(reward.clone());
            loss = loss - reward.mul_scalar(weights.divergence);
        }

        let generator_loss = scalar(loss.clone());
        let mut grads = GradientsParams::from_grads(loss.backward(), &self.generator);
        let grad_norm = self.generator.clip_gradients(&mut grads, self.config.gradient_clip);
        self.generator = self.generator_optim.step(lr, self.generator.clone(), grads);
        self.state.next_step();

        let metrics = StepMetrics {
            generator_loss,
            critic_loss,
            reconstruction: scalar(reconstruction),
            adversarial,
            divergence,
            grad_norm,
            frames: generated.frames,
        };
        if !metrics.is_finite() {
            warn!(
                step = self.state.step,
                generator_loss,
                critic_loss = ?critic_loss,
                grad_norm,
                "non-finite loss"
            );
        }
        debug!(
            step = self.state.step,
            frames = metrics.frames,
            generator_loss,
            critic_loss = ?critic_loss,
            divergence,
            grad_norm,
            "train step"
        );
        Ok(metrics)
    }

    /// Runs every batch of `dataset` once, `trials_per_batch` steps each,
    /// then advances to the next epoch.
    ///
    /// # Errors
    ///
    /// Propagates any batch or step error.
    pub fn train_epoch(&mut self, dataset: &MotionDataset) -> Result<EpochMetrics> {
        let started = Instant::now();
        let epoch = self.state.epoch;
        let batches = dataset.batches(self.config.batch_size, self.config.shuffle, &mut self.rng);

        let mut steps = Vec::with_capacity(batches.len() * self.config.trials_per_batch);
        for indices in &batches {
            let host = dataset.batch(indices)?;
            let batch = TrainingBatch::new(&host, &self.device);
            for _ in 0..self.config.trials_per_batch {
                steps.push(self.train_step(&batch)?);
            }
        }

        let mut metrics = EpochMetrics::from_steps(epoch, &steps)
            .with_learning_rate(self.config.learning_rate(epoch))
            .with_train_time(started.elapsed().as_secs_f32());
        if self.config.backbone == Backbone::Recurrent {
            metrics = metrics.with_curriculum(self.config.curriculum.current(epoch));
        }

        info!(
            epoch,
            generator_loss = metrics.generator_loss,
            critic_loss = ?metrics.critic_loss,
            divergence = metrics.divergence,
            lr = metrics.learning_rate,
            steps = metrics.steps,
            secs = metrics.train_time_secs,
            "epoch complete"
        );
        self.state.add_epoch_metrics(metrics.clone());
        self.state.next_epoch();
        Ok(metrics)
    }

    /// Trains until the configured epoch count, writing a checkpoint under
    /// `checkpoint_root` every `save_interval` epochs.
    ///
    /// # Errors
    ///
    /// Propagates training and checkpoint errors.
    pub fn fit(&mut self, dataset: &MotionDataset, checkpoint_root: Option<&Path>) -> Result<TrainingMetrics> {
        while !self.state.is_finished() {
            let epoch = self.state.epoch;
            self.train_epoch(dataset)?;
            if let Some(root) = checkpoint_root {
                if self.config.should_checkpoint(epoch) {
                    self.save_checkpoint(root, epoch)?;
                }
            }
        }
        info!(
            epochs = self.state.metrics.epochs_completed(),
            final_loss = self.state.metrics.final_loss(),
            "training finished"
        );
        Ok(self.state.metrics.clone())
    }

    /// Manifest describing the current session after `epoch`.
    #[must_use]
    pub fn manifest(&self, epoch: usize) -> CheckpointManifest {
        let total_loss = self
            .state
            .metrics
            .epoch_metrics
            .last()
            .map(|m| m.generator_loss)
            .filter(|loss| loss.is_finite());
        CheckpointManifest {
            epoch,
            backbone: M::BACKBONE,
            horizon: self.config.window,
            interpolation: self.config.interpolation,
            generator: self.generator_config,
            critics: self.critics.as_ref().map(|c| c.config),
            code_classes: self.config.code_classes,
            categories: self.categories.clone(),
            total_loss,
            format: self.format,
            config: self.config.clone(),
        }
    }

    /// Writes `train-<epoch>/` under `root` with the manifest, weights and
    /// optimizer state.
    ///
    /// # Errors
    ///
    /// Returns an IO or checkpoint error if any file cannot be written.
    pub fn save_checkpoint(&self, root: &Path, epoch: usize) -> Result<PathBuf> {
        let dir = checkpoint_dir(root, epoch);
        let manifest = self.manifest(epoch);
        manifest.save(&dir)?;

        motion_models::save_checkpoint::<B, M>(&self.generator, &dir.join(GENERATOR_STEM), self.format)?;
        self.generator_optim
            .save(&dir.join(GENERATOR_OPTIMIZER_STEM), self.format)?;
        if let Some(critics) = &self.critics {
            motion_models::save_checkpoint::<B, CriticEnsemble<B>>(
                &critics.ensemble,
                &dir.join(CRITICS_STEM),
                self.format,
            )?;
            critics.optim.save(&dir.join(CRITIC_OPTIMIZER_STEM), self.format)?;
        }

        info!(dir = %dir.display(), epoch, "checkpoint saved");
        Ok(dir)
    }
}

fn check_compatible<B: AutodiffBackend, M: Inbetweener<B>>(
    config: &TrainingConfig,
    dataset: &MotionDataset,
) -> Result<()> {
    config.validate()?;
    if config.backbone != M::BACKBONE {
        return Err(TrainingError::invalid_config(format!(
            "configuration is for the {} backbone, session runs {}",
            config.backbone,
            M::BACKBONE
        )));
    }
    if config.dataset != dataset.kind() {
        return Err(TrainingError::invalid_config(format!(
            "configuration selects {}, dataset is {}",
            config.dataset,
            dataset.kind()
        )));
    }
    if dataset.is_empty() {
        return Err(TrainingError::dataset("no training windows"));
    }
    if dataset.window_len() != config.window {
        return Err(TrainingError::dataset(format!(
            "dataset windows hold {} frames, configuration expects {}",
            dataset.window_len(),
            config.window
        )));
    }
    Ok(())
}
