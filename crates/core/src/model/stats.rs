use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

use crate::model::entry::{EntryStatus, SubmissionEntry};
use crate::model::ids::WorkUnitId;
use crate::time::iso_timestamp;

/// Minutes of annotator time budgeted per remaining sentence.
pub const MINUTES_PER_ENTRY: u64 = 2;

/// `round(100 * part / whole)`, half up, clamped to 100; 0 when `whole` is 0.
#[must_use]
pub fn percent_of(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    let rounded = (part.saturating_mul(200) + whole) / whole.saturating_mul(2);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

//
// ─── LAST UPDATED ──────────────────────────────────────────────────────────────
//

/// Most recent activity on a unit. `Never` is rendered as such, not as the
/// Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LastUpdated {
    #[default]
    Never,
    At(DateTime<Utc>),
}

impl LastUpdated {
    /// Keeps the later of the two.
    #[must_use]
    pub fn max_with(self, at: DateTime<Utc>) -> Self {
        match self {
            LastUpdated::At(current) if current >= at => self,
            _ => LastUpdated::At(at),
        }
    }
}

impl From<Option<DateTime<Utc>>> for LastUpdated {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(LastUpdated::Never, LastUpdated::At)
    }
}

impl fmt::Display for LastUpdated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LastUpdated::Never => f.write_str("Never"),
            LastUpdated::At(at) => write!(f, "{}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        }
    }
}

impl Serialize for LastUpdated {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LastUpdated::Never => serializer.serialize_none(),
            LastUpdated::At(at) => serializer.serialize_some(&iso_timestamp(*at)),
        }
    }
}

//
// ─── STATUS LABEL ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusLabel {
    #[serde(rename = "Complete")]
    Complete,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Not Started")]
    NotStarted,
}

impl StatusLabel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StatusLabel::Complete => "Complete",
            StatusLabel::InProgress => "In Progress",
            StatusLabel::NotStarted => "Not Started",
        }
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── FILE STATS ────────────────────────────────────────────────────────────────
//

/// Authoritative statistics for one unit, derived from the remote log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    pub file_path: WorkUnitId,
    pub total_entries: u32,
    pub translated_entries: u32,
    pub no_translation_needed_entries: u32,
    pub completed_entries: u32,
    pub last_updated: LastUpdated,
    pub is_complete: bool,
}

impl FileStats {
    /// Stats for a unit with no entries at all.
    #[must_use]
    pub fn empty(file_path: WorkUnitId) -> Self {
        Self {
            file_path,
            total_entries: 0,
            translated_entries: 0,
            no_translation_needed_entries: 0,
            completed_entries: 0,
            last_updated: LastUpdated::Never,
            is_complete: false,
        }
    }

    /// Classify every entry of `log` whose source is `unit`.
    #[must_use]
    pub fn from_log(unit: &WorkUnitId, log: &[SubmissionEntry]) -> Self {
        let mut stats = Self::empty(unit.clone());
        for entry in log.iter().filter(|entry| &entry.source == unit) {
            stats.add(entry);
        }
        stats
    }

    fn add(&mut self, entry: &SubmissionEntry) {
        self.total_entries = self.total_entries.saturating_add(1);
        match entry.status {
            EntryStatus::Translated => {
                self.translated_entries = self.translated_entries.saturating_add(1);
            }
            EntryStatus::NoTranslationNeeded => {
                self.no_translation_needed_entries =
                    self.no_translation_needed_entries.saturating_add(1);
            }
            EntryStatus::Skipped => {}
        }
        if entry.status.counts_as_completed() {
            self.completed_entries = self.completed_entries.saturating_add(1);
        }
        if let Some(at) = entry.timestamp {
            self.last_updated = self.last_updated.max_with(at);
        }
        self.is_complete = self.total_entries > 0 && self.completed_entries >= self.total_entries;
    }

    #[must_use]
    pub fn percent(&self) -> u8 {
        percent_of(
            u64::from(self.completed_entries),
            u64::from(self.total_entries),
        )
    }

    #[must_use]
    pub fn status_label(&self) -> StatusLabel {
        if self.is_complete {
            StatusLabel::Complete
        } else if self.completed_entries > 0 {
            StatusLabel::InProgress
        } else {
            StatusLabel::NotStarted
        }
    }

    /// Orders by completion fraction, highest first. Units without entries
    /// have fraction 0. Compares exactly via cross-multiplication.
    #[must_use]
    pub fn cmp_completion_desc(&self, other: &Self) -> Ordering {
        let (a_num, a_den) = self.fraction();
        let (b_num, b_den) = other.fraction();
        (b_num * a_den).cmp(&(a_num * b_den))
    }

    fn fraction(&self) -> (u64, u64) {
        if self.total_entries == 0 {
            (0, 1)
        } else {
            (
                u64::from(self.completed_entries),
                u64::from(self.total_entries),
            )
        }
    }
}

//
// ─── OVERALL STATS ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub total_files: u32,
    pub completed_files: u32,
    pub in_progress_files: u32,
    pub total_entries: u64,
    pub completed_entries: u64,
    pub remaining_entries: u64,
    pub overall_progress: u8,
    pub average_unit_progress: u8,
    pub estimated_hours: u64,
}

impl OverallStats {
    /// All-zero stats, used when no snapshot is available.
    #[must_use]
    pub fn zeroed() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_units(units: &[FileStats]) -> Self {
        Self::tally(units.iter().map(|u| UnitTally {
            total: u.total_entries,
            completed: u.completed_entries,
            is_complete: u.is_complete,
        }))
    }

    /// Sum per-unit counts into overall figures. `overall_progress` is the
    /// completed share of all entries.
    #[must_use]
    pub fn tally(units: impl IntoIterator<Item = UnitTally>) -> Self {
        let mut total_files: u32 = 0;
        let mut completed_files: u32 = 0;
        let mut total_entries: u64 = 0;
        let mut completed_entries: u64 = 0;
        let mut percent_sum: u64 = 0;
        for unit in units {
            total_files = total_files.saturating_add(1);
            if unit.is_complete {
                completed_files = completed_files.saturating_add(1);
            }
            total_entries += u64::from(unit.total);
            completed_entries += u64::from(unit.completed);
            percent_sum += u64::from(percent_of(u64::from(unit.completed), u64::from(unit.total)));
        }
        let remaining_entries = total_entries.saturating_sub(completed_entries);

        Self {
            total_files,
            completed_files,
            in_progress_files: total_files - completed_files,
            total_entries,
            completed_entries,
            remaining_entries,
            overall_progress: percent_of(completed_entries, total_entries),
            average_unit_progress: percent_of(percent_sum, u64::from(total_files) * 100),
            estimated_hours: (remaining_entries * MINUTES_PER_ENTRY).div_ceil(60),
        }
    }
}

/// Entry counts of one unit, as summed by [`OverallStats::tally`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitTally {
    pub total: u32,
    pub completed: u32,
    pub is_complete: bool,
}

/// Per-unit and overall stats computed from one log snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllStats {
    pub per_unit: Vec<FileStats>,
    pub overall: OverallStats,
}

impl AllStats {
    #[must_use]
    pub fn from_units(per_unit: Vec<FileStats>) -> Self {
        let overall = OverallStats::from_units(&per_unit);
        Self { per_unit, overall }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
