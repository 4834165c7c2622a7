use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::stats::percent_of;

/// Locally tracked progress for one work unit.
///
/// Serialized in camelCase (`{"total":10,"completed":4,"lastUpdated":"…"}`)
/// to match the persisted layout of the progress store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub total: u32,
    pub completed: u32,
    pub last_updated: DateTime<Utc>,
}

impl ProgressRecord {
    #[must_use]
    pub fn new(total: u32, completed: u32, last_updated: DateTime<Utc>) -> Self {
        Self {
            total,
            completed,
            last_updated,
        }
    }

    /// A unit counts as complete once `completed` reaches `total`.
    ///
    /// Note that a `{total: 0, completed: 0}` record is complete under this
    /// rule; the local store mirrors the annotator page, which never records
    /// an empty unit.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }

    #[must_use]
    pub fn percent(&self) -> u8 {
        percent_of(u64::from(self.completed), u64::from(self.total))
    }
}
