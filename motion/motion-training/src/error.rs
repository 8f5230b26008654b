//! Error types for motion-training crate.

use thiserror::Error;

/// Errors that can occur during training.
#[derive(Debug, Error)]
pub enum TrainingError {
    /// Invalid training configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Dataset error.
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Model error.
    #[error("model error: {0}")]
    Model(String),

    /// Checkpoint error.
    #[error("checkpoint error: {0}")]
    Checkpoint(String),

    /// Generated and reference tensors disagree in shape.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Expected shape.
        expected: String,
        /// Actual shape.
        actual: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),
}

impl TrainingError {
    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Creates a dataset error.
    #[must_use]
    pub fn dataset(reason: impl Into<String>) -> Self {
        Self::Dataset(reason.into())
    }

    /// Creates a model error.
    #[must_use]
    pub fn model(reason: impl Into<String>) -> Self {
        Self::Model(reason.into())
    }

    /// Creates a checkpoint error.
    #[must_use]
    pub fn checkpoint(reason: impl Into<String>) -> Self {
        Self::Checkpoint(reason.into())
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

impl From<std::io::Error> for TrainingError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TrainingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<motion_dataset::DatasetError> for TrainingError {
    fn from(err: motion_dataset::DatasetError) -> Self {
        Self::Dataset(err.to_string())
    }
}

impl From<motion_types::MotionError> for TrainingError {
    fn from(err: motion_types::MotionError) -> Self {
        match err {
            motion_types::MotionError::ShapeMismatch { expected, actual } => {
                Self::ShapeMismatch { expected, actual }
            }
            other => Self::Model(other.to_string()),
        }
    }
}

impl From<motion_models::ModelError> for TrainingError {
    fn from(err: motion_models::ModelError) -> Self {
        match err {
            motion_models::ModelError::ShapeMismatch { expected, actual } => {
                Self::ShapeMismatch { expected, actual }
            }
            other => Self::Model(other.to_string()),
        }
    }
}

/// Result type for training operations.
pub type Result<T> = std::result::Result<T, TrainingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_invalid_config() {
        let err = TrainingError::invalid_config("batch size must be > 0");
        assert!(err.to_string().contains("invalid configuration"));
        assert!(err.to_string().contains("batch size"));
    }

    #[test]
    fn error_checkpoint() {
        let err = TrainingError::checkpoint("manifest missing");
        assert!(err.to_string().contains("checkpoint error"));
    }

    #[test]
    fn error_shape_mismatch() {
        let err = TrainingError::shape_mismatch("[2, 12, 8]", "[2, 12, 7]");
        assert!(err.to_string().contains("expected [2, 12, 8]"));
    }

    #[test]
    fn model_shape_mismatch_stays_a_shape_mismatch() {
        let err: TrainingError = motion_models::ModelError::shape_mismatch("a", "b").into();
        assert!(matches!(err, TrainingError::ShapeMismatch { .. }));

        let err: TrainingError = motion_models::ModelError::invalid_config("heads").into();
        assert!(matches!(err, TrainingError::Model(_)));
    }

    #[test]
    fn error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: TrainingError = io_err.into();
        assert!(matches!(err, TrainingError::Io(_)));
    }
}
