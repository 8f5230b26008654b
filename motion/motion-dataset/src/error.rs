//! Error types for motion-dataset crate.

use thiserror::Error;

/// Errors that can occur in motion-dataset operations.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Dataset name not recognised.
    #[error("unknown dataset: {0}")]
    UnknownDataset(String),

    /// No windows survived filtering.
    #[error("dataset is empty")]
    EmptyDataset,

    /// Window configuration cannot be applied.
    #[error("invalid window: {0}")]
    InvalidWindow(String),

    /// Category not seen when the encoder was fitted.
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    /// Sample index out of range.
    #[error("sample {index} out of range for {len} samples")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of samples.
        len: usize,
    },

    /// Skeleton or pose error.
    #[error("motion error: {0}")]
    Motion(String),
}

impl DatasetError {
    /// Creates an unknown dataset error.
    #[must_use]
    pub fn unknown_dataset(name: impl Into<String>) -> Self {
        Self::UnknownDataset(name.into())
    }

    /// Creates an invalid window error.
    #[must_use]
    pub fn invalid_window(reason: impl Into<String>) -> Self {
        Self::InvalidWindow(reason.into())
    }

    /// Creates an unknown category error.
    #[must_use]
    pub fn unknown_category(category: impl Into<String>) -> Self {
        Self::UnknownCategory(category.into())
    }
}

impl From<motion_types::MotionError> for DatasetError {
    fn from(err: motion_types::MotionError) -> Self {
        Self::Motion(err.to_string())
    }
}

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_unknown_dataset() {
        let err = DatasetError::unknown_dataset("CMU");
        assert!(err.to_string().contains("unknown dataset"));
        assert!(err.to_string().contains("CMU"));
    }

    #[test]
    fn error_empty() {
        assert!(DatasetError::EmptyDataset.to_string().contains("empty"));
    }

    #[test]
    fn error_invalid_window() {
        let err = DatasetError::invalid_window("window 0");
        assert!(err.to_string().contains("invalid window"));
    }

    #[test]
    fn error_unknown_category() {
        let err = DatasetError::unknown_category("swim");
        assert!(err.to_string().contains("swim"));
    }

    #[test]
    fn error_index_out_of_range() {
        let err = DatasetError::IndexOutOfRange { index: 9, len: 3 };
        assert!(err.to_string().contains("9"));
    }

    #[test]
    fn error_from_motion() {
        let err: DatasetError = motion_types::MotionError::invalid_sequence("empty").into();
        assert!(matches!(err, DatasetError::Motion(_)));
    }
}
