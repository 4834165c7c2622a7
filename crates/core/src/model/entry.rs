use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{SessionId, WorkUnitId};
use crate::time::{iso_timestamp, parse_iso_timestamp};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Reasons a remote log element is rejected at the ingestion boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EntryValidationError {
    #[error("entry is not a valid object: {0}")]
    Shape(String),

    #[error("entry has no source")]
    MissingSource,

    #[error("unknown entry status: {0:?}")]
    UnknownStatus(String),

    #[error("invalid entry timestamp: {0:?}")]
    InvalidTimestamp(String),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// How an annotator resolved one sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Translated,
    Skipped,
    NoTranslationNeeded,
}

impl EntryStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Translated => "translated",
            EntryStatus::Skipped => "skipped",
            EntryStatus::NoTranslationNeeded => "no_translation_needed",
        }
    }

    /// Skips are logged but never count toward completion.
    #[must_use]
    pub fn counts_as_completed(self) -> bool {
        !matches!(self, EntryStatus::Skipped)
    }
}

impl FromStr for EntryStatus {
    type Err = EntryValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "translated" => Ok(Self::Translated),
            "skipped" => Ok(Self::Skipped),
            "no_translation_needed" => Ok(Self::NoTranslationNeeded),
            other => Err(EntryValidationError::UnknownStatus(other.to_owned())),
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── ENTRY ─────────────────────────────────────────────────────────────────────
//

/// One annotated sentence as appended to the remote log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionEntry {
    pub session_id: String,
    pub user_name: String,
    pub source: WorkUnitId,
    pub sentence: String,
    pub translation: String,
    pub status: EntryStatus,
    pub particle: String,
    pub particle_meaning: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl SubmissionEntry {
    /// Entry with empty metadata, for the given unit and status.
    #[must_use]
    pub fn new(
        session_id: &SessionId,
        user_name: impl Into<String>,
        source: WorkUnitId,
        status: EntryStatus,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.as_str().to_owned(),
            user_name: user_name.into(),
            source,
            sentence: String::new(),
            translation: String::new(),
            status,
            particle: String::new(),
            particle_meaning: String::new(),
            timestamp: Some(timestamp),
        }
    }

    /// Validate one element of the remote log.
    ///
    /// # Errors
    ///
    /// Returns `EntryValidationError` if the element is not an object of the
    /// expected shape, has no source, an unknown status, or an unparseable
    /// timestamp.
    pub fn from_value(value: Value) -> Result<Self, EntryValidationError> {
        let wire: EntryWire = serde_json::from_value(value)
            .map_err(|err| EntryValidationError::Shape(err.to_string()))?;
        Self::try_from(wire)
    }
}

/// Wire shape of a remote log element (camelCase JSON).
///
/// Free-text fields accept numbers, booleans and `null` from the spreadsheet
/// and coerce them to text; `source` and `status` must be strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntryWire {
    #[serde(deserialize_with = "lenient_text")]
    pub session_id: String,
    #[serde(deserialize_with = "lenient_text")]
    pub user_name: String,
    pub source: String,
    #[serde(deserialize_with = "lenient_text")]
    pub sentence: String,
    #[serde(deserialize_with = "lenient_text")]
    pub translation: String,
    pub status: String,
    #[serde(deserialize_with = "lenient_text")]
    pub particle: String,
    #[serde(deserialize_with = "lenient_text")]
    pub particle_meaning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(de::Error::custom(format!("expected text, found {other}"))),
    }
}

impl TryFrom<EntryWire> for SubmissionEntry {
    type Error = EntryValidationError;

    fn try_from(wire: EntryWire) -> Result<Self, Self::Error> {
        let source = WorkUnitId::new(wire.source).map_err(|_| EntryValidationError::MissingSource)?;
        let status = wire.status.parse::<EntryStatus>()?;
        let timestamp = match wire.timestamp.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                parse_iso_timestamp(raw)
                    .ok_or_else(|| EntryValidationError::InvalidTimestamp(raw.to_owned()))?,
            ),
        };

        Ok(Self {
            session_id: wire.session_id,
            user_name: wire.user_name,
            source,
            sentence: wire.sentence,
            translation: wire.translation,
            status,
            particle: wire.particle,
            particle_meaning: wire.particle_meaning,
            timestamp,
        })
    }
}

impl From<&SubmissionEntry> for EntryWire {
    fn from(entry: &SubmissionEntry) -> Self {
        Self {
            session_id: entry.session_id.clone(),
            user_name: entry.user_name.clone(),
            source: entry.source.to_string(),
            sentence: entry.sentence.clone(),
            translation: entry.translation.clone(),
            status: entry.status.as_str().to_owned(),
            particle: entry.particle.clone(),
            particle_meaning: entry.particle_meaning.clone(),
            timestamp: entry.timestamp.map(iso_timestamp),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
