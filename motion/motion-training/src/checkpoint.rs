//! Epoch-tagged training checkpoints.
//!
//! A checkpoint is a directory `train-<epoch>/` holding `manifest.json` and
//! one Burn record per model and optimizer:
//!
//! ```text
//! train-49/
//!   manifest.json
//!   generator.bin
//!   generator-optimizer.bin
//!   critics.bin              (adversarial runs only)
//!   critic-optimizer.bin     (adversarial runs only)
//! ```

use std::path::{Path, PathBuf};

use motion_models::{CheckpointFormat, CriticConfig};
use motion_types::InterpolationMode;
use serde::{Deserialize, Serialize};

use crate::backbone::GeneratorConfig;
use crate::config::{Backbone, TrainingConfig};
use crate::error::{Result, TrainingError};

/// Manifest file name inside a checkpoint directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Record stem of the generator weights.
pub const GENERATOR_STEM: &str = "generator";

/// Record stem of the generator optimizer state.
pub const GENERATOR_OPTIMIZER_STEM: &str = "generator-optimizer";

/// Record stem of the critic ensemble weights.
pub const CRITICS_STEM: &str = "critics";

/// Record stem of the critic optimizer state.
pub const CRITIC_OPTIMIZER_STEM: &str = "critic-optimizer";

/// Directory of the checkpoint written after `epoch`.
#[must_use]
pub fn checkpoint_dir(root: &Path, epoch: usize) -> PathBuf {
    root.join(format!("train-{epoch}"))
}

/// Everything needed to rebuild a session from a checkpoint directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointManifest {
    /// Last completed epoch.
    pub epoch: usize,

    /// Generator backbone.
    pub backbone: Backbone,

    /// Window length the models were trained on.
    pub horizon: usize,

    /// Interpolation used for model inputs.
    pub interpolation: InterpolationMode,

    /// Generator architecture.
    pub generator: GeneratorConfig,

    /// Critic architecture, when critics were trained.
    pub critics: Option<CriticConfig>,

    /// Latent code classes.
    pub code_classes: usize,

    /// Category names in id order.
    pub categories: Vec<String>,

    /// Mean generator loss of the last epoch, if finite.
    pub total_loss: Option<f32>,

    /// Record format of the weight and optimizer files.
    pub format: CheckpointFormat,

    /// Full training configuration.
    pub config: TrainingConfig,
}

impl CheckpointManifest {
    /// Path of a record file in `dir`.
    #[must_use]
    pub fn record_path(&self, dir: &Path, stem: &str) -> PathBuf {
        dir.join(stem).with_extension(self.format.extension())
    }

    /// Writes `manifest.json` into `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory or file cannot be written.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(MANIFEST_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    /// Reads `manifest.json` from `dir`.
    ///
    /// # Errors
    ///
    /// Returns `TrainingError::Checkpoint` if the manifest is missing or
    /// disagrees with itself.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Err(TrainingError::checkpoint(format!(
                "no manifest at {}",
                path.display()
            )));
        }
        let manifest: Self = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        if manifest.generator.backbone() != manifest.backbone {
            return Err(TrainingError::checkpoint(format!(
                "manifest backbone {} does not match its {} generator",
                manifest.backbone,
                manifest.generator.backbone()
            )));
        }
        Ok(manifest)
    }
}
