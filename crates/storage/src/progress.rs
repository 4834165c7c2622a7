//! Local progress store: per-unit progress records and the completed set,
//! persisted in a [`KeyValueStore`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;

use translate_core::Clock;
use translate_core::model::{Catalog, ProgressRecord, WorkUnitId, percent_of};
use translate_core::time::{iso_timestamp, parse_iso_timestamp};

use crate::repository::{KeyValueStore, StorageError, WriteBatch};

/// JSON array of completed unit ids.
pub const COMPLETED_UNITS_KEY: &str = "translated_files";
/// JSON object mapping unit id to progress record.
pub const PROGRESS_RECORDS_KEY: &str = "completion_data";
/// ISO-8601 timestamp of the last recorded update.
pub const LAST_UPDATED_KEY: &str = "completion_last_updated";

const EMPTY_COMPLETED: &str = "[]";
const EMPTY_RECORDS: &str = "{}";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressStoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Everything the store knows, read from one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalProgressSummary {
    pub records: BTreeMap<WorkUnitId, ProgressRecord>,
    pub completed_units: BTreeSet<WorkUnitId>,
    pub overall_percent: u8,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Snapshot {
    // Insertion order is kept so the persisted array stays stable.
    completed: Vec<WorkUnitId>,
    records: BTreeMap<WorkUnitId, ProgressRecord>,
    last_updated: Option<DateTime<Utc>>,
}

/// Tracks which units this profile has worked through.
///
/// Only this store writes the three progress keys. Every update rewrites the
/// records, the completed set and the last-updated marker in one atomic
/// batch. Corrupt values are logged and treated as empty.
#[derive(Clone)]
pub struct LocalProgressStore {
    kv: Arc<dyn KeyValueStore>,
    clock: Clock,
}

impl LocalProgressStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>, clock: Clock) -> Self {
        Self { kv, clock }
    }

    /// Ensure both collection keys hold valid JSON, writing empty defaults
    /// for missing or corrupt values, and drop an unparseable last-updated
    /// marker. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if storage cannot be read or written.
    pub async fn init(&self) -> Result<(), ProgressStoreError> {
        let values = self
            .kv
            .get_many(&[COMPLETED_UNITS_KEY, PROGRESS_RECORDS_KEY, LAST_UPDATED_KEY])
            .await?;
        let mut batch = WriteBatch::new();
        if !is_valid::<Vec<WorkUnitId>>(COMPLETED_UNITS_KEY, values[0].as_deref()) {
            batch = batch.put(COMPLETED_UNITS_KEY, EMPTY_COMPLETED);
        }
        if !is_valid::<BTreeMap<WorkUnitId, ProgressRecord>>(
            PROGRESS_RECORDS_KEY,
            values[1].as_deref(),
        ) {
            batch = batch.put(PROGRESS_RECORDS_KEY, EMPTY_RECORDS);
        }
        if values[2].as_deref().is_some_and(|raw| parse_last_updated(raw).is_none()) {
            batch = batch.delete(LAST_UPDATED_KEY);
        }
        if !batch.is_empty() {
            tracing::debug!(writes = batch.ops().len(), "initialising progress store");
            self.kv.apply(batch).await?;
        }
        Ok(())
    }

    /// Record that `completed` of `total` entries of `unit` are done.
    ///
    /// The unit joins the completed set when `completed >= total` and leaves
    /// it otherwise.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if storage cannot be read or written.
    pub async fn record_progress(
        &self,
        unit: &WorkUnitId,
        total: u32,
        completed: u32,
    ) -> Result<ProgressRecord, ProgressStoreError> {
        let mut snapshot = self.snapshot().await?;
        let now = self.clock.now();
        let record = ProgressRecord::new(total, completed, now);

        let listed = snapshot.completed.iter().position(|u| u == unit);
        match (record.is_complete(), listed) {
            (true, None) => snapshot.completed.push(unit.clone()),
            (false, Some(index)) => {
                snapshot.completed.remove(index);
            }
            _ => {}
        }
        snapshot.records.insert(unit.clone(), record.clone());

        let batch = WriteBatch::new()
            .put(PROGRESS_RECORDS_KEY, encode(&snapshot.records)?)
            .put(COMPLETED_UNITS_KEY, encode(&snapshot.completed)?)
            .put(LAST_UPDATED_KEY, iso_timestamp(now));
        self.kv.apply(batch).await?;

        tracing::debug!(
            unit = %unit,
            total,
            completed,
            complete = record.is_complete(),
            "recorded local progress"
        );
        Ok(record)
    }

    /// # Errors
    ///
    /// Returns `ProgressStoreError` if storage cannot be read.
    pub async fn completed_units(&self) -> Result<BTreeSet<WorkUnitId>, ProgressStoreError> {
        Ok(self.snapshot().await?.completed.into_iter().collect())
    }

    /// # Errors
    ///
    /// Returns `ProgressStoreError` if storage cannot be read.
    pub async fn progress_records(
        &self,
    ) -> Result<BTreeMap<WorkUnitId, ProgressRecord>, ProgressStoreError> {
        Ok(self.snapshot().await?.records)
    }

    /// Sum of completed over sum of total across all records, as a rounded
    /// percentage. 0 when nothing is recorded.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if storage cannot be read.
    pub async fn overall_completion_percent(&self) -> Result<u8, ProgressStoreError> {
        Ok(overall_percent(&self.snapshot().await?.records))
    }

    /// True when the completed set has as many units as the catalog.
    ///
    /// This compares sizes, not membership: ids completed under an older
    /// catalog still count.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if storage cannot be read.
    pub async fn all_units_complete(&self, catalog: &Catalog) -> Result<bool, ProgressStoreError> {
        Ok(self.snapshot().await?.completed.len() == catalog.len())
    }

    /// Timestamp of the last recorded update, if any.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if storage cannot be read.
    pub async fn last_updated(&self) -> Result<Option<DateTime<Utc>>, ProgressStoreError> {
        Ok(self.snapshot().await?.last_updated)
    }

    /// Everything above, from one snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if storage cannot be read.
    pub async fn summary(&self) -> Result<LocalProgressSummary, ProgressStoreError> {
        let snapshot = self.snapshot().await?;
        Ok(LocalProgressSummary {
            overall_percent: overall_percent(&snapshot.records),
            completed_units: snapshot.completed.into_iter().collect(),
            records: snapshot.records,
            last_updated: snapshot.last_updated,
        })
    }

    /// Remove all progress state and reinitialise empty defaults.
    ///
    /// # Errors
    ///
    /// Returns `ProgressStoreError` if storage cannot be written.
    pub async fn clear(&self) -> Result<(), ProgressStoreError> {
        self.kv
            .apply(
                WriteBatch::new()
                    .delete(COMPLETED_UNITS_KEY)
                    .delete(PROGRESS_RECORDS_KEY)
                    .delete(LAST_UPDATED_KEY),
            )
            .await?;
        tracing::info!("cleared local progress");
        self.init().await
    }

    async fn snapshot(&self) -> Result<Snapshot, ProgressStoreError> {
        let values = self
            .kv
            .get_many(&[COMPLETED_UNITS_KEY, PROGRESS_RECORDS_KEY, LAST_UPDATED_KEY])
            .await?;
        let mut values = values.into_iter();
        let completed = decode_or_default(COMPLETED_UNITS_KEY, values.next().flatten());
        let records = decode_or_default(PROGRESS_RECORDS_KEY, values.next().flatten());
        let last_updated = values
            .next()
            .flatten()
            .and_then(|raw| parse_last_updated(&raw));

        Ok(Snapshot {
            completed,
            records,
            last_updated,
        })
    }
}

fn overall_percent(records: &BTreeMap<WorkUnitId, ProgressRecord>) -> u8 {
    let total: u64 = records.values().map(|r| u64::from(r.total)).sum();
    let completed: u64 = records.values().map(|r| u64::from(r.completed)).sum();
    percent_of(completed, total)
}

fn parse_last_updated(raw: &str) -> Option<DateTime<Utc>> {
    let parsed = parse_iso_timestamp(raw);
    if parsed.is_none() {
        warn_corrupt(&StorageError::Corrupt {
            key: LAST_UPDATED_KEY.to_owned(),
            reason: format!("not an ISO-8601 timestamp: {raw:?}"),
        });
    }
    parsed
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T, StorageError> {
    serde_json::from_str(raw).map_err(|err| StorageError::Corrupt {
        key: key.to_owned(),
        reason: err.to_string(),
    })
}

fn decode_or_default<T: DeserializeOwned + Default>(key: &str, raw: Option<String>) -> T {
    let Some(raw) = raw else {
        return T::default();
    };
    decode(key, &raw).unwrap_or_else(|err| {
        warn_corrupt(&err);
        T::default()
    })
}

fn is_valid<T: DeserializeOwned>(key: &str, raw: Option<&str>) -> bool {
    match raw {
        None => false,
        Some(raw) => match decode::<T>(key, raw) {
            Ok(_) => true,
            Err(err) => {
                warn_corrupt(&err);
                false
            }
        },
    }
}

fn warn_corrupt(err: &StorageError) {
    tracing::warn!(error = %err, "discarding corrupt progress state");
}

fn encode<T: Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|err| StorageError::Serialization(err.to_string()))
}
