//! Checkpoint persistence for model and optimizer records.

use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::prelude::Backend;
use burn::record::{
    BinFileRecorder, FullPrecisionSettings, PrettyJsonFileRecorder, Record, Recorder,
};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Supported checkpoint file formats.
///
/// # Example
///
/// ```
/// use motion_models::CheckpointFormat;
///
/// let format = CheckpointFormat::from_extension("bin");
/// assert_eq!(format, Some(CheckpointFormat::Binary));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckpointFormat {
    /// Compact binary records (`BinFileRecorder`, full precision).
    #[default]
    Binary,

    /// Human-readable records (`PrettyJsonFileRecorder`).
    Json,
}

impl CheckpointFormat {
    /// Determines format from file extension.
    ///
    /// - `.bin`, `.burn` -> Binary
    /// - `.json` -> Json
    /// - Other -> None
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "bin" | "burn" => Some(Self::Binary),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Determines format from file path.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Returns the default file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Binary => "bin",
            Self::Json => "json",
        }
    }

    /// Returns the format name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for CheckpointFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Saves any record (module weights, optimizer state) next to `stem`.
///
/// The format's extension is appended to `stem`; the full path is returned.
///
/// # Errors
///
/// Returns `ModelError::SaveCheckpoint` if writing fails.
pub fn save_record<B, R>(record: R, stem: &Path, format: CheckpointFormat) -> Result<PathBuf>
where
    B: Backend,
    R: Record<B>,
{
    let full_path = stem.with_extension(format.extension());
    let display = full_path.display().to_string();

    match format {
        CheckpointFormat::Binary => {
            let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
            Recorder::<B>::record(&recorder, record, full_path.clone())
                .map_err(|e| ModelError::save_checkpoint(&display, e.to_string()))?;
        }
        CheckpointFormat::Json => {
            let recorder = PrettyJsonFileRecorder::<FullPrecisionSettings>::new();
            Recorder::<B>::record(&recorder, record, full_path.clone())
                .map_err(|e| ModelError::save_checkpoint(&display, e.to_string()))?;
        }
    }

    Ok(full_path)
}

/// Loads a record saved by [`save_record`].
///
/// # Errors
///
/// Returns `ModelError::CheckpointNotFound` if the file does not exist,
/// `ModelError::UnsupportedFormat` for an unknown extension and
/// `ModelError::LoadCheckpoint` if decoding fails.
pub fn load_record<B, R>(path: &Path, device: &B::Device) -> Result<R>
where
    B: Backend,
    R: Record<B>,
{
    let display = path.display().to_string();
    if !path.exists() {
        return Err(ModelError::checkpoint_not_found(display));
    }
    let format = CheckpointFormat::from_path(path)
        .ok_or_else(|| ModelError::unsupported_format(&display))?;

    match format {
        CheckpointFormat::Binary => {
            let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
            Recorder::<B>::load(&recorder, path.to_path_buf(), device)
                .map_err(|e| ModelError::load_checkpoint(&display, e.to_string()))
        }
        CheckpointFormat::Json => {
            let recorder = PrettyJsonFileRecorder::<FullPrecisionSettings>::new();
            Recorder::<B>::load(&recorder, path.to_path_buf(), device)
                .map_err(|e| ModelError::load_checkpoint(&display, e.to_string()))
        }
    }
}

/// Saves a module's weights.
///
/// # Errors
///
/// Returns `ModelError::SaveCheckpoint` if writing fails.
pub fn save_checkpoint<B, M>(model: &M, stem: &Path, format: CheckpointFormat) -> Result<PathBuf>
where
    B: Backend,
    M: Module<B>,
{
    save_record::<B, M::Record>(model.clone().into_record(), stem, format)
}

/// Loads weights saved by [`save_checkpoint`] into `model`.
///
/// # Errors
///
/// Same as [`load_record`].
pub fn load_checkpoint<B, M>(model: M, path: &Path, device: &B::Device) -> Result<M>
where
    B: Backend,
    M: Module<B>,
{
    let record = load_record::<B, M::Record>(path, device)?;
    Ok(model.load_record(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::critic::{CriticConfig, SinglePoseCritic};
    use burn::tensor::Tensor;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn format_from_extension() {
        assert_eq!(CheckpointFormat::from_extension("bin"), Some(CheckpointFormat::Binary));
        assert_eq!(CheckpointFormat::from_extension("burn"), Some(CheckpointFormat::Binary));
        assert_eq!(CheckpointFormat::from_extension("JSON"), Some(CheckpointFormat::Json));
        assert_eq!(CheckpointFormat::from_extension("pt"), None);
    }

    #[test]
    fn format_from_path() {
        assert_eq!(
            CheckpointFormat::from_path(Path::new("train-50/generator.bin")),
            Some(CheckpointFormat::Binary)
        );
        assert_eq!(CheckpointFormat::from_path(Path::new("generator")), None);
    }

    #[test]
    fn format_display() {
        assert_eq!(CheckpointFormat::Binary.to_string(), "binary");
        assert_eq!(CheckpointFormat::Json.extension(), "json");
        assert_eq!(CheckpointFormat::default(), CheckpointFormat::Binary);
    }

    #[test]
    fn module_round_trip() {
        let device = <TestBackend as Backend>::Device::default();
        let config = CriticConfig::new(2, 2).with_hidden(4);
        let critic = SinglePoseCritic::<TestBackend>::new(&config, &device);
        let dir = tempfile::tempdir().unwrap();

        for format in [CheckpointFormat::Binary, CheckpointFormat::Json] {
            let path = save_checkpoint(&critic, &dir.path().join("critic"), format).unwrap();
            assert!(path.exists());

            let fresh = SinglePoseCritic::<TestBackend>::new(&config, &device);
            let loaded = load_checkpoint(fresh, &path, &device).unwrap();

            let input = Tensor::<TestBackend, 2>::ones([1, config.single_pose_dim()], &device);
            let (a, _) = critic.forward(input.clone());
            let (b, _) = loaded.forward(input);
            let a = a.into_data().to_vec::<f32>().unwrap();
            let b = b.into_data().to_vec::<f32>().unwrap();
            assert!((a[0] - b[0]).abs() < 1e-6);
        }
    }

    #[test]
    fn load_missing_file() {
        let device = <TestBackend as Backend>::Device::default();
        let config = CriticConfig::new(2, 2).with_hidden(4);
        let critic = SinglePoseCritic::<TestBackend>::new(&config, &device);
        let result = load_checkpoint(critic, Path::new("/nonexistent/critic.bin"), &device);
        assert!(matches!(result, Err(ModelError::CheckpointNotFound(_))));
    }
}
