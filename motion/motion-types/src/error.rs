//! Error types for motion-types crate.

use thiserror::Error;

/// Errors raised by skeleton, pose and interpolation operations.
#[derive(Debug, Error)]
pub enum MotionError {
    /// Skeleton violates its tree invariants.
    #[error("invalid skeleton: {0}")]
    InvalidSkeleton(String),

    /// Joint index or name does not exist.
    #[error("unknown joint: {0}")]
    UnknownJoint(String),

    /// Array or frame shape does not match the skeleton.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Expected shape.
        expected: String,
        /// Actual shape.
        actual: String,
    },

    /// Interpolation request cannot be satisfied.
    #[error("invalid interpolation: {0}")]
    InvalidInterpolation(String),

    /// Sequence is empty or malformed.
    #[error("invalid sequence: {0}")]
    InvalidSequence(String),
}

impl MotionError {
    /// Creates an invalid skeleton error.
    #[must_use]
    pub fn invalid_skeleton(reason: impl Into<String>) -> Self {
        Self::InvalidSkeleton(reason.into())
    }

    /// Creates an unknown joint error.
    #[must_use]
    pub fn unknown_joint(joint: impl Into<String>) -> Self {
        Self::UnknownJoint(joint.into())
    }

    /// Creates a shape mismatch error.
    #[must_use]
    pub fn shape_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates an invalid interpolation error.
    #[must_use]
    pub fn invalid_interpolation(reason: impl Into<String>) -> Self {
        Self::InvalidInterpolation(reason.into())
    }

    /// Creates an invalid sequence error.
    #[must_use]
    pub fn invalid_sequence(reason: impl Into<String>) -> Self {
        Self::InvalidSequence(reason.into())
    }
}

/// Result type for motion-types operations.
pub type Result<T> = std::result::Result<T, MotionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_invalid_skeleton() {
        let err = MotionError::invalid_skeleton("parent 3 of joint 2 is not earlier");
        assert!(err.to_string().contains("invalid skeleton"));
        assert!(err.to_string().contains("joint 2"));
    }

    #[test]
    fn error_unknown_joint() {
        let err = MotionError::unknown_joint("LeftToe");
        assert!(err.to_string().contains("LeftToe"));
    }

    #[test]
    fn error_shape_mismatch() {
        let err = MotionError::shape_mismatch("[22, 4]", "[24, 4]");
        let msg = err.to_string();
        assert!(msg.contains("[22, 4]"));
        assert!(msg.contains("[24, 4]"));
    }

    #[test]
    fn error_invalid_interpolation() {
        let err = MotionError::invalid_interpolation("cubic");
        assert!(err.to_string().contains("invalid interpolation"));
    }

    #[test]
    fn error_invalid_sequence() {
        let err = MotionError::invalid_sequence("empty");
        assert!(err.to_string().contains("invalid sequence"));
    }
}
