//! Windowed in-memory dataset and host batches.

use motion_types::{GlobalPose, PoseFrame, PoseLayout, PoseSequence, Skeleton};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::category::CategoryEncoder;
use crate::error::{DatasetError, Result};
use crate::kind::{DatasetKind, Split};

/// One recorded take on the dataset's full rig.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionClip {
    /// Sequence name, e.g. `walk1`.
    pub name: String,

    /// Actor that performed the take, e.g. `subject3`.
    pub actor: String,

    /// Frames on the recorded rig (before joint removal).
    pub frames: Vec<PoseFrame>,
}

/// Window length and stride used to cut clips.
///
/// # Example
///
/// ```
/// use motion_dataset::{DatasetKind, Split, WindowConfig};
///
/// let config = WindowConfig::for_kind(DatasetKind::Lafan, Split::Test, 50);
/// assert_eq!(config.stride, 40);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Frames per window.
    pub window: usize,

    /// Frames between window starts.
    pub stride: usize,
}

impl WindowConfig {
    /// Creates a window configuration.
    #[must_use]
    pub const fn new(window: usize, stride: usize) -> Self {
        Self { window, stride }
    }

    /// The family's stride for a partition.
    #[must_use]
    pub const fn for_kind(kind: DatasetKind, split: Split, window: usize) -> Self {
        Self {
            window,
            stride: kind.stride(split),
        }
    }

    /// Start frames of every full window in a clip of `frames` frames.
    #[must_use]
    pub fn starts(&self, frames: usize) -> Vec<usize> {
        if self.window == 0 || self.stride == 0 || frames < self.window {
            return Vec::new();
        }
        (0..=frames - self.window).step_by(self.stride).collect()
    }
}

/// One training window with precomputed global poses.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSample {
    /// Frames on the training skeleton.
    pub sequence: PoseSequence,

    /// Global pose per frame.
    pub global: Vec<GlobalPose>,

    /// Encoded category.
    pub label: usize,
}

/// Windowed dataset for one family and partition.
#[derive(Debug, Clone)]
pub struct MotionDataset {
    kind: DatasetKind,
    split: Split,
    skeleton: Skeleton,
    categories: CategoryEncoder,
    samples: Vec<WindowSample>,
}

impl MotionDataset {
    /// Cuts clips into windows, keeping only actors in `split`.
    ///
    /// Clips are reduced to the training skeleton (the rig's removed joints
    /// are folded away) and every window's global pose is computed once.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::InvalidWindow` for a zero window or stride,
    /// `DatasetError::EmptyDataset` if no window survives, and motion errors
    /// for frames that do not match the rig.
    pub fn from_clips(
        kind: DatasetKind,
        split: Split,
        window: WindowConfig,
        clips: &[MotionClip],
    ) -> Result<Self> {
        if window.window < 2 || window.stride == 0 {
            return Err(DatasetError::invalid_window(format!(
                "window {} stride {}",
                window.window, window.stride
            )));
        }
        let removal = kind.rig().removal()?;
        let skeleton = removal.skeleton().clone();
        let actors = kind.actors(split);

        let mut windows: Vec<(PoseSequence, Vec<GlobalPose>)> = Vec::new();
        for clip in clips.iter().filter(|c| actors.contains(&c.actor)) {
            let frames = clip
                .frames
                .iter()
                .map(|f| removal.reduce_frame(f))
                .collect::<motion_types::Result<Vec<_>>>()?;
            let category = kind.category_of(&clip.name);
            let starts = window.starts(frames.len());
            debug!(clip = %clip.name, actor = %clip.actor, windows = starts.len(), "windowing clip");
            for start in starts {
                let sequence = PoseSequence::new(
                    frames[start..start + window.window].to_vec(),
                    category.clone(),
                )?;
                let global = sequence
                    .frames
                    .iter()
                    .map(|f| skeleton.forward_kinematics(f))
                    .collect::<motion_types::Result<Vec<_>>>()?;
                windows.push((sequence, global));
            }
        }
        if windows.is_empty() {
            return Err(DatasetError::EmptyDataset);
        }

        let categories = CategoryEncoder::fit(windows.iter().map(|(s, _)| s.category.as_str()));
        let samples = windows
            .into_iter()
            .map(|(sequence, global)| {
                let label = categories.encode(&sequence.category)?;
                Ok(WindowSample {
                    sequence,
                    global,
                    label,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            dataset = %kind,
            ?split,
            windows = samples.len(),
            categories = categories.len(),
            "dataset ready"
        );

        Ok(Self {
            kind,
            split,
            skeleton,
            categories,
            samples,
        })
    }

    /// Dataset family.
    #[must_use]
    pub const fn kind(&self) -> DatasetKind {
        self.kind
    }

    /// Partition.
    #[must_use]
    pub const fn split(&self) -> Split {
        self.split
    }

    /// Training skeleton.
    #[must_use]
    pub const fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    /// Category encoder fitted on this dataset.
    #[must_use]
    pub const fn categories(&self) -> &CategoryEncoder {
        &self.categories
    }

    /// Number of windows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the dataset has no windows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Frames per window.
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.samples.first().map_or(0, |s| s.sequence.len())
    }

    /// Sample at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&WindowSample> {
        self.samples.get(index)
    }

    /// Sample order for one epoch, shuffled when `rng` is given.
    #[must_use]
    pub fn order(&self, rng: Option<&mut ChaCha8Rng>) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.samples.len()).collect();
        if let Some(rng) = rng {
            indices.shuffle(rng);
        }
        indices
    }

    /// Index batches for one epoch, shuffled when `shuffle` is set.
    ///
    /// The last batch may be partial. A zero batch size yields no batches.
    #[must_use]
    pub fn batches(&self, batch_size: usize, shuffle: bool, rng: &mut ChaCha8Rng) -> Vec<Vec<usize>> {
        if batch_size == 0 {
            return Vec::new();
        }
        let order = self.order(shuffle.then_some(rng));
        order.chunks(batch_size).map(<[usize]>::to_vec).collect()
    }

    /// Gathers samples into one host batch.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::IndexOutOfRange` for a bad index and
    /// `DatasetError::EmptyDataset` for an empty index list.
    pub fn batch(&self, indices: &[usize]) -> Result<MotionBatch> {
        if indices.is_empty() {
            return Err(DatasetError::EmptyDataset);
        }
        let joints = self.skeleton.joint_count();
        let frames = self.window_len();
        let layout = PoseLayout::new(joints);
        let n = indices.len() * frames;

        let mut batch = MotionBatch {
            batch: indices.len(),
            frames,
            joints,
            local_rotations: Vec::with_capacity(n * joints * 4),
            root_positions: Vec::with_capacity(n * 3),
            root_velocities: Vec::with_capacity(n * 3),
            global_positions: Vec::with_capacity(n * joints * 3),
            global_rotations: Vec::with_capacity(n * joints * 4),
            pose_vectors: Vec::with_capacity(n * layout.repr_dim()),
            labels: Vec::with_capacity(indices.len()),
        };

        for &index in indices {
            let sample = self.samples.get(index).ok_or(DatasetError::IndexOutOfRange {
                index,
                len: self.samples.len(),
            })?;
            for (frame, velocity) in sample
                .sequence
                .frames
                .iter()
                .zip(sample.sequence.root_velocities())
            {
                batch.local_rotations.extend(frame.local_rotations_wxyz());
                batch.root_positions.extend(frame.root_position.iter());
                batch.root_velocities.extend(velocity.iter());
            }
            for pose in &sample.global {
                batch
                    .global_positions
                    .extend(pose.positions.iter().flat_map(|p| [p.x, p.y, p.z]));
                batch.global_rotations.extend(
                    pose.rotations
                        .iter()
                        .flat_map(|q| motion_types::quat_to_wxyz(q.quaternion())),
                );
                batch.pose_vectors.extend(layout.vectorize_global(pose)?);
            }
            #[allow(clippy::cast_possible_wrap)]
            batch.labels.push(sample.label as i64);
        }
        Ok(batch)
    }
}

/// Host-side batch, every buffer row-major with the batch index first.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionBatch {
    /// Sequences in the batch.
    pub batch: usize,

    /// Frames per sequence.
    pub frames: usize,

    /// Joints per frame.
    pub joints: usize,

    /// `[B, T, J, 4]` local rotations.
    pub local_rotations: Vec<f32>,

    /// `[B, T, 3]` root positions.
    pub root_positions: Vec<f32>,

    /// `[B, T, 3]` forward-difference root velocities (last repeated).
    pub root_velocities: Vec<f32>,

    /// `[B, T, J, 3]` global positions.
    pub global_positions: Vec<f32>,

    /// `[B, T, J, 4]` global rotations.
    pub global_rotations: Vec<f32>,

    /// `[B, T, J * 7]` global pose vectors.
    pub pose_vectors: Vec<f32>,

    /// `[B]` category ids.
    pub labels: Vec<i64>,
}

impl MotionBatch {
    /// Pose-vector layout of this batch.
    #[must_use]
    pub const fn layout(&self) -> PoseLayout {
        PoseLayout::new(self.joints)
    }

    /// Pose vectors of one sequence, frame by frame.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::IndexOutOfRange` if `index >= batch`.
    pub fn sequence_frames(&self, index: usize) -> Result<Vec<Vec<f32>>> {
        if index >= self.batch {
            return Err(DatasetError::IndexOutOfRange {
                index,
                len: self.batch,
            });
        }
        let width = self.layout().repr_dim();
        let start = index * self.frames * width;
        Ok(self.pose_vectors[start..start + self.frames * width]
            .chunks_exact(width)
            .map(<[f32]>::to_vec)
            .collect())
    }
}
