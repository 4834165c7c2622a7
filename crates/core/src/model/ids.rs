use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::time::iso_timestamp;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkUnitIdError {
    #[error("work unit id cannot be empty")]
    Empty,
}

/// Identifier of one work unit: the path or key of a batch of source
/// sentences (`inputs/chat_001.csv`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkUnitId(String);

impl WorkUnitId {
    /// Creates a `WorkUnitId`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `WorkUnitIdError::Empty` if nothing is left after trimming.
    pub fn new(raw: impl Into<String>) -> Result<Self, WorkUnitIdError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(WorkUnitIdError::Empty);
        }
        if trimmed.len() == raw.len() {
            Ok(Self(raw))
        } else {
            Ok(Self(trimmed.to_owned()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment, used as the display name in reports.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl TryFrom<String> for WorkUnitId {
    type Error = WorkUnitIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WorkUnitId> for String {
    fn from(value: WorkUnitId) -> Self {
        value.0
    }
}

impl AsRef<str> for WorkUnitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for WorkUnitId {
    type Err = WorkUnitIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Debug for WorkUnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WorkUnitId({})", self.0)
    }
}

impl fmt::Display for WorkUnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one annotator session, derived from the session start time.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Builds the id from the start instant: ISO-8601 with `:` and `.`
    /// replaced by `-` (`2023-11-14T22-13-20-000Z`).
    #[must_use]
    pub fn from_start(started_at: DateTime<Utc>) -> Self {
        Self(iso_timestamp(started_at).replace([':', '.'], "-"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
