//! Supported motion-capture dataset families and their actor partitions.

use std::str::FromStr;

use motion_types::Rig;
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};

/// Train or test partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Split {
    /// Training actors.
    #[default]
    Train,

    /// Held-out actors.
    Test,
}

/// Dataset family.
///
/// Each family fixes the rig, which actors form the train and test
/// partitions, and how far apart training windows start.
///
/// # Example
///
/// ```
/// use motion_dataset::{DatasetKind, Split};
///
/// let kind: DatasetKind = "LAFAN".parse().unwrap();
/// assert_eq!(kind.actors(Split::Test), vec!["subject5".to_string()]);
/// assert_eq!(kind.stride(Split::Train), 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DatasetKind {
    /// Ubisoft LAFAN1, subjects 1-4 train and 5 test.
    #[default]
    Lafan,

    /// AMASS export with numbered actors.
    Amass,

    /// HumanEva, subjects 1-2 train and 3 test.
    HumanEva,

    /// PosePrior, subjects 1-2 train and 3 test.
    PosePrior,

    /// HUMAN4D, subjects 1-7 train and 8 test.
    Human4d,

    /// MPI HDM05, subjects 1-3 train and 4 test.
    MpiHdm05,
}

impl DatasetKind {
    /// All families.
    pub const ALL: [Self; 6] = [
        Self::Lafan,
        Self::Amass,
        Self::HumanEva,
        Self::PosePrior,
        Self::Human4d,
        Self::MpiHdm05,
    ];

    /// Canonical dataset name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Lafan => "LAFAN",
            Self::Amass => "AMASS",
            Self::HumanEva => "HumanEva",
            Self::PosePrior => "PosePrior",
            Self::Human4d => "HUMAN4D",
            Self::MpiHdm05 => "MPI_HDM05",
        }
    }

    /// Skeleton rig the family is recorded on.
    #[must_use]
    pub const fn rig(&self) -> Rig {
        match self {
            Self::Lafan => Rig::Lafan,
            _ => Rig::Amass,
        }
    }

    /// Actors belonging to a partition.
    #[must_use]
    pub fn actors(&self, split: Split) -> Vec<String> {
        let (train, test) = match self {
            Self::Amass => {
                return match split {
                    Split::Train => (0..15).map(amass_actor).collect(),
                    Split::Test => vec![amass_actor(15)],
                };
            }
            Self::Lafan => (4, 5),
            Self::HumanEva | Self::PosePrior => (2, 3),
            Self::Human4d => (7, 8),
            Self::MpiHdm05 => (3, 4),
        };
        match split {
            Split::Train => (1..=train).map(|i| format!("subject{i}")).collect(),
            Split::Test => vec![format!("subject{test}")],
        }
    }

    /// Frames between the starts of consecutive windows.
    #[must_use]
    pub const fn stride(&self, split: Split) -> usize {
        match (self, split) {
            (Self::Amass, _) => 5,
            (_, Split::Train) => 20,
            (_, Split::Test) => 40,
        }
    }

    /// Derives the motion category from a sequence name.
    ///
    /// LAFAN names end in a take number (`walk1`, `aiming2`), which is
    /// dropped. Other families use the leading alphabetic part of the name
    /// before any separator or digit.
    #[must_use]
    pub fn category_of(&self, sequence_name: &str) -> String {
        match self {
            Self::Lafan => sequence_name
                .trim_end_matches(|c: char| c.is_ascii_digit())
                .to_string(),
            _ => {
                let head: String = sequence_name
                    .chars()
                    .take_while(|c| c.is_alphabetic())
                    .collect();
                if head.is_empty() {
                    sequence_name.to_string()
                } else {
                    head.to_lowercase()
                }
            }
        }
    }
}

// Actor directories are zero-padded to three digits below 10 and four above.
fn amass_actor(i: usize) -> String {
    if i < 10 { format!("{i:03}") } else { format!("{i:04}") }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DatasetKind {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| DatasetError::unknown_dataset(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names() {
        for kind in DatasetKind::ALL {
            assert_eq!(kind.name().parse::<DatasetKind>().unwrap(), kind);
        }
        assert_eq!("mpi_hdm05".parse::<DatasetKind>().unwrap(), DatasetKind::MpiHdm05);
        assert!("CMU".parse::<DatasetKind>().is_err());
    }

    #[test]
    fn actor_partitions() {
        assert_eq!(DatasetKind::Lafan.actors(Split::Train).len(), 4);
        assert_eq!(DatasetKind::Human4d.actors(Split::Train).len(), 7);
        assert_eq!(DatasetKind::Human4d.actors(Split::Test), vec!["subject8"]);
        assert_eq!(DatasetKind::MpiHdm05.actors(Split::Test), vec!["subject4"]);
        assert_eq!(DatasetKind::HumanEva.actors(Split::Train), vec!["subject1", "subject2"]);
    }

    #[test]
    fn amass_actors_do_not_overlap() {
        let train = DatasetKind::Amass.actors(Split::Train);
        let test = DatasetKind::Amass.actors(Split::Test);
        assert_eq!(train.first().map(String::as_str), Some("000"));
        assert_eq!(train.last().map(String::as_str), Some("0014"));
        assert_eq!(test, vec!["0015"]);
        assert!(train.iter().all(|a| !test.contains(a)));
    }

    #[test]
    fn strides() {
        assert_eq!(DatasetKind::Lafan.stride(Split::Train), 20);
        assert_eq!(DatasetKind::Lafan.stride(Split::Test), 40);
        assert_eq!(DatasetKind::Amass.stride(Split::Test), 5);
    }

    #[test]
    fn rigs() {
        assert_eq!(DatasetKind::Lafan.rig(), Rig::Lafan);
        assert_eq!(DatasetKind::HumanEva.rig(), Rig::Amass);
    }

    #[test]
    fn categories() {
        assert_eq!(DatasetKind::Lafan.category_of("aiming1"), "aiming");
        assert_eq!(DatasetKind::Lafan.category_of("walk12"), "walk");
        assert_eq!(DatasetKind::HumanEva.category_of("Jog_1_C1"), "jog");
        assert_eq!(DatasetKind::MpiHdm05.category_of("42"), "42");
    }
}
