//! Windowed motion-capture datasets for in-betweening training.
//!
//! Parsing the recorded files is left to the caller: clips arrive as
//! [`MotionClip`]s on the family's full rig, and this crate does the rest.
//!
//! - [`DatasetKind`] - Supported families, their rigs and actor partitions
//! - [`MotionDataset`] - Actor filtering, joint removal and windowing
//! - [`CategoryEncoder`] - Sorted category vocabulary
//! - [`MotionBatch`] - Flat host buffers ready for tensor upload
//!
//! # Example
//!
//! ```
//! use motion_dataset::{DatasetKind, MotionClip, MotionDataset, Split, WindowConfig};
//! use motion_types::PoseFrame;
//!
//! let clip = MotionClip {
//!     name: "walk1".into(),
//!     actor: "subject1".into(),
//!     frames: vec![PoseFrame::rest(22); 30],
//! };
//! let dataset = MotionDataset::from_clips(
//!     DatasetKind::Lafan,
//!     Split::Train,
//!     WindowConfig::new(10, 10),
//!     &[clip],
//! )
//! .unwrap();
//! assert_eq!(dataset.len(), 3);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod category;
mod dataset;
mod error;
mod kind;

pub use category::CategoryEncoder;
pub use dataset::{MotionBatch, MotionClip, MotionDataset, WindowConfig, WindowSample};
pub use error::{DatasetError, Result};
pub use kind::{DatasetKind, Split};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        CategoryEncoder, DatasetError, DatasetKind, MotionBatch, MotionClip, MotionDataset, Split,
        WindowConfig,
    };
}
