//! Error types for motion-models crate.

use thiserror::Error;

/// Errors that can occur in motion-models operations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Failed to load checkpoint.
    #[error("failed to load checkpoint from {path}: {reason}")]
    LoadCheckpoint {
        /// Path to the checkpoint file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to save checkpoint.
    #[error("failed to save checkpoint to {path}: {reason}")]
    SaveCheckpoint {
        /// Path to the checkpoint file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Invalid model configuration.
    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),

    /// Checkpoint file not found.
    #[error("checkpoint not found: {0}")]
    CheckpointNotFound(String),

    /// Unsupported checkpoint format.
    #[error("unsupported checkpoint format: {0}")]
    UnsupportedFormat(String),

    /// Tensor shape does not match the model or skeleton.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Expected shape.
        expected: String,
        /// Actual shape.
        actual: String,
    },

    /// Skeleton or pose error from motion-types.
    #[error("motion error: {0}")]
    Motion(String),
}

impl ModelError {
    /// Creates a load checkpoint error.
    #[must_use]
    pub fn load_checkpoint(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoadCheckpoint {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a save checkpoint error.
    #[must_use]
    pub fn save_checkpoint(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SaveCheckpoint {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid config error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Creates a checkpoint not found error.
    #[must_use]
    pub fn checkpoint_not_found(path: impl Into<String>) -> Self {
        Self::CheckpointNotFound(path.into())
    }

    /// Creates an unsupported format error.
    #[must_use]
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat(format.into())
    }

    /// Creates a shape mismatch error.
    #[must_use]
    pub fn shape_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl From<motion_types::MotionError> for ModelError {
    fn from(err: motion_types::MotionError) -> Self {
        match err {
            motion_types::MotionError::ShapeMismatch { expected, actual } => {
                Self::ShapeMismatch { expected, actual }
            }
            other => Self::Motion(other.to_string()),
        }
    }
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_load_checkpoint() {
        let err = ModelError::load_checkpoint("train-50/generator.bin", "corrupt");
        let msg = err.to_string();
        assert!(msg.contains("train-50/generator.bin"));
        assert!(msg.contains("corrupt"));
    }

    #[test]
    fn error_save_checkpoint() {
        let err = ModelError::save_checkpoint("/readonly", "permission denied");
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn error_invalid_config() {
        let err = ModelError::invalid_config("d_model must divide by heads");
        assert!(err.to_string().contains("invalid model configuration"));
    }

    #[test]
    fn error_checkpoint_not_found() {
        let err = ModelError::checkpoint_not_found("missing.bin");
        assert!(err.to_string().contains("missing.bin"));
    }

    #[test]
    fn error_unsupported_format() {
        let err = ModelError::unsupported_format("model.xml");
        assert!(err.to_string().contains("unsupported"));
    }

    #[test]
    fn error_shape_mismatch() {
        let err = ModelError::shape_mismatch("[4, 22, 4]", "[4, 24, 4]");
        assert!(err.to_string().contains("[4, 24, 4]"));
    }

    #[test]
    fn error_from_motion_keeps_shape_mismatch() {
        let err: ModelError = motion_types::MotionError::shape_mismatch("a", "b").into();
        assert!(matches!(err, ModelError::ShapeMismatch { .. }));

        let err: ModelError = motion_types::MotionError::invalid_skeleton("loop").into();
        assert!(matches!(err, ModelError::Motion(_)));
    }
}
