//! Built-in skeleton definitions.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::skeleton::{JointRemoval, Skeleton};

const LAFAN_JOINTS: [&str; 22] = [
    "Hips",
    "LeftUpLeg",
    "LeftLeg",
    "LeftFoot",
    "LeftToe",
    "RightUpLeg",
    "RightLeg",
    "RightFoot",
    "RightToe",
    "Spine",
    "Spine1",
    "Spine2",
    "Neck",
    "Head",
    "LeftShoulder",
    "LeftArm",
    "LeftForeArm",
    "LeftHand",
    "RightShoulder",
    "RightArm",
    "RightForeArm",
    "RightHand",
];

const LAFAN_PARENTS: [i32; 22] = [
    -1, 0, 1, 2, 3, 0, 5, 6, 7, 0, 9, 10, 11, 12, 11, 14, 15, 16, 11, 18, 19, 20,
];

// Centimetres, Y-up.
const LAFAN_OFFSETS: [[f32; 3]; 22] = [
    [0.0, 0.0, 0.0],
    [0.103_457, 1.857_829, 10.548_506],
    [43.5, -0.000_027, 0.000_008],
    [42.372_192, 0.000_011, -0.000_007],
    [17.3, 0.0, 0.000_004],
    [0.103_456, 1.857_829, -10.548_503],
    [43.500_042, -0.000_001, -0.000_003],
    [42.372_257, -0.000_001, 0.000_007],
    [17.299_992, 0.000_002, 0.000_006],
    [6.901_968, -2.603_733, -0.000_001],
    [12.588_099, 0.000_003, 0.000_002],
    [12.343_206, 0.0, -0.000_001],
    [25.832_886, -0.000_002, 0.000_003],
    [11.766_62, 0.000_004, -0.000_006],
    [19.745_899, -1.480_37, 6.000_108],
    [11.284_125, -0.000_013, -0.000_007],
    [33.000_05, 0.000_004, 0.000_01],
    [25.200_008, 0.000_007, 0.000_007],
    [19.746_099, -1.480_375, -6.000_073],
    [11.284_138, -0.000_003, -0.000_009],
    [33.000_092, 0.000_006, 0.000_01],
    [25.199_78, 0.000_134, 0.000_002],
];

const SMPL_JOINTS: [&str; 24] = [
    "Pelvis",
    "L_Hip",
    "R_Hip",
    "Spine1",
    "L_Knee",
    "R_Knee",
    "Spine2",
    "L_Ankle",
    "R_Ankle",
    "Spine3",
    "L_Foot",
    "R_Foot",
    "Neck",
    "L_Collar",
    "R_Collar",
    "Head",
    "L_Shoulder",
    "R_Shoulder",
    "L_Elbow",
    "R_Elbow",
    "L_Wrist",
    "R_Wrist",
    "L_Hand",
    "R_Hand",
];

const SMPL_PARENTS: [i32; 24] = [
    -1, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 9, 9, 12, 13, 14, 16, 17, 18, 19, 20, 21,
];

// Metres, neutral body rest pose.
const SMPL_OFFSETS: [[f32; 3]; 24] = [
    [0.0, 0.0, 0.0],
    [0.0589, -0.0823, -0.0176],
    [-0.0603, -0.0905, -0.0135],
    [0.0044, 0.1244, -0.0384],
    [0.0435, -0.3865, 0.0080],
    [-0.0433, -0.3837, -0.0048],
    [0.0045, 0.1380, 0.0268],
    [-0.0148, -0.4269, -0.0374],
    [0.0191, -0.4200, -0.0346],
    [-0.0023, 0.0560, 0.0029],
    [0.0411, -0.0603, 0.1220],
    [-0.0348, -0.0621, 0.1303],
    [-0.0134, 0.2116, -0.0335],
    [0.0717, 0.1140, -0.0189],
    [-0.0830, 0.1125, -0.0237],
    [0.0101, 0.0889, 0.0504],
    [0.1229, 0.0452, -0.0190],
    [-0.1132, 0.0469, -0.0085],
    [0.2553, -0.0156, -0.0229],
    [-0.2601, -0.0143, -0.0313],
    [0.2657, 0.0127, -0.0074],
    [-0.2691, 0.0068, -0.0060],
    [0.0867, -0.0106, -0.0156],
    [-0.0888, -0.0098, -0.0132],
];

const SMPL_REMOVED: [&str; 2] = ["L_Hand", "R_Hand"];

/// Skeleton rig used by a dataset family.
///
/// # Example
///
/// ```
/// use motion_types::Rig;
///
/// let skeleton = Rig::Amass.skeleton().unwrap();
/// assert_eq!(skeleton.joint_count(), 22);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Rig {
    /// 22-joint LAFAN1 BVH rig, no joints removed.
    #[default]
    Lafan,

    /// 24-joint SMPL rig with both hand joints removed.
    Amass,
}

impl Rig {
    /// Rig as recorded, before any joint removal.
    ///
    /// # Errors
    ///
    /// Propagates skeleton validation errors.
    pub fn full_skeleton(&self) -> Result<Skeleton> {
        match self {
            Self::Lafan => build(&LAFAN_JOINTS, &LAFAN_PARENTS, &LAFAN_OFFSETS),
            Self::Amass => build(&SMPL_JOINTS, &SMPL_PARENTS, &SMPL_OFFSETS),
        }
    }

    /// Joints dropped from the recorded rig.
    #[must_use]
    pub const fn removed_joints(&self) -> &'static [&'static str] {
        match self {
            Self::Lafan => &[],
            Self::Amass => &SMPL_REMOVED,
        }
    }

    /// Removal mapping from the recorded rig to the training skeleton.
    ///
    /// # Errors
    ///
    /// Propagates skeleton validation errors.
    pub fn removal(&self) -> Result<JointRemoval> {
        self.full_skeleton()?
            .remove_joints_by_name(self.removed_joints())
    }

    /// Skeleton used for training.
    ///
    /// # Errors
    ///
    /// Propagates skeleton validation errors.
    pub fn skeleton(&self) -> Result<Skeleton> {
        Ok(self.removal()?.into_skeleton())
    }

    /// Returns the rig name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Lafan => "lafan",
            Self::Amass => "amass",
        }
    }
}

impl std::fmt::Display for Rig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn build(names: &[&str], parents: &[i32], offsets: &[[f32; 3]]) -> Result<Skeleton> {
    Skeleton::from_parent_indices(
        names.iter().map(|n| (*n).to_string()).collect(),
        parents,
        offsets
            .iter()
            .map(|o| Vector3::new(o[0], o[1], o[2]))
            .collect(),
    )
}
