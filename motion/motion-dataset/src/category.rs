//! Category label encoding.

use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};

/// Maps category names to dense ids in sorted order.
///
/// # Example
///
/// ```
/// use motion_dataset::CategoryEncoder;
///
/// let encoder = CategoryEncoder::fit(["walk", "run", "walk", "aiming"]);
/// assert_eq!(encoder.classes(), &["aiming", "run", "walk"]);
/// assert_eq!(encoder.encode("run").unwrap(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CategoryEncoder {
    classes: Vec<String>,
}

impl CategoryEncoder {
    /// Collects the sorted unique categories.
    pub fn fit<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes: Vec<String> = categories
            .into_iter()
            .map(|c| c.as_ref().to_string())
            .collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Rebuilds an encoder from a saved class list.
    #[must_use]
    pub fn from_classes(mut classes: Vec<String>) -> Self {
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Known categories in id order.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Number of categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns true if no categories are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Id of a category.
    ///
    /// # Errors
    ///
    /// Returns `DatasetError::UnknownCategory` if the category was not fitted.
    pub fn encode(&self, category: &str) -> Result<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(category))
            .map_err(|_| DatasetError::unknown_category(category))
    }

    /// Category of an id.
    #[must_use]
    pub fn decode(&self, id: usize) -> Option<&str> {
        self.classes.get(id).map(String::as_str)
    }
}
