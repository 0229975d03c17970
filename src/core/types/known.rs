//! Known-status classification shared by files, tag names and
//! correlation attribute instances.

use serde::{Deserialize, Serialize};

/// Known status of a piece of evidence.
///
/// The numeric values match the `known_status` column of the instance
/// tables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KnownStatus {
    /// No classification
    #[default]
    Unknown,
    /// Known good (e.g. matched a known-file hash set)
    Known,
    /// Notable
    Bad,
}

impl KnownStatus {
    /// Value stored in the database
    pub fn as_db_value(self) -> i64 {
        match self {
            KnownStatus::Unknown => 0,
            KnownStatus::Known => 1,
            KnownStatus::Bad => 2,
        }
    }

    /// Parse the stored database value
    pub fn from_db_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(KnownStatus::Unknown),
            1 => Some(KnownStatus::Known),
            2 => Some(KnownStatus::Bad),
            _ => None,
        }
    }

    pub fn is_notable(self) -> bool {
        self == KnownStatus::Bad
    }
}

impl std::fmt::Display for KnownStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KnownStatus::Unknown => write!(f, "unknown"),
            KnownStatus::Known => write!(f, "known"),
            KnownStatus::Bad => write!(f, "notable"),
        }
    }
}
