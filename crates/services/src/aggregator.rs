use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use translate_core::Clock;
use translate_core::model::{AllStats, Catalog, FileStats, SubmissionEntry, WorkUnitId};

use crate::error::FetchError;
use crate::remote::RemoteStore;
use crate::report::Report;

/// Entry count above which the "done files" export treats a unit as
/// finished.
pub const DEFAULT_DONE_THRESHOLD: usize = 45;

/// A unit and how many log entries name it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitCount {
    pub unit: WorkUnitId,
    pub entries: usize,
}

#[derive(Debug)]
struct CachedLog {
    entries: Arc<Vec<SubmissionEntry>>,
    fetched_at: DateTime<Utc>,
}

/// Computes authoritative statistics from the remote entry log.
///
/// The log is fetched at most once per cache window. Every computation runs
/// over one snapshot, so per-unit and overall numbers always agree.
#[derive(Clone)]
pub struct RemoteAggregator {
    remote: Arc<dyn RemoteStore>,
    clock: Clock,
    ttl: Duration,
    cache: Arc<Mutex<Option<CachedLog>>>,
}

impl RemoteAggregator {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteStore>, clock: Clock, ttl: Duration) -> Self {
        Self {
            remote,
            clock,
            ttl,
            cache: Arc::new(Mutex::new(None)),
        }
    }

    /// Validated log snapshot, served from cache while it is fresh.
    ///
    /// `force_refresh` always goes to the remote store. A failed fetch
    /// leaves the cache as it was.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if the remote store cannot be read.
    pub async fn fetch_log(
        &self,
        force_refresh: bool,
    ) -> Result<Arc<Vec<SubmissionEntry>>, FetchError> {
        if !force_refresh {
            if let Some(entries) = self.cached() {
                tracing::debug!(entries = entries.len(), "serving remote log from cache");
                return Ok(entries);
            }
        }

        let raw = self.remote.fetch_all().await?;
        let entries = Arc::new(ingest(raw));

        let mut slot = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(CachedLog {
            entries: Arc::clone(&entries),
            fetched_at: self.clock.now(),
        });
        Ok(entries)
    }

    /// Distinct units named by the log, in first-appearance order.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if the remote store cannot be read.
    pub async fn list_units(&self) -> Result<Vec<WorkUnitId>, FetchError> {
        let log = self.fetch_log(false).await?;
        Ok(units_in_order(&log))
    }

    /// Stats for one unit; a unit without entries has zero counts and
    /// `lastUpdated = Never`.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if the remote store cannot be read.
    pub async fn compute_unit_stats(&self, unit: &WorkUnitId) -> Result<FileStats, FetchError> {
        let log = self.fetch_log(false).await?;
        Ok(FileStats::from_log(unit, &log))
    }

    /// Stats for every unit in the log plus the overall rollup.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if the remote store cannot be read.
    pub async fn compute_all_stats(&self) -> Result<AllStats, FetchError> {
        let log = self.fetch_log(false).await?;
        Ok(all_stats(&log))
    }

    /// Like [`Self::compute_all_stats`], but every catalog unit is listed,
    /// in catalog order, including those nobody has started. Units only
    /// present in the log follow.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if the remote store cannot be read.
    pub async fn compute_catalog_stats(&self, catalog: &Catalog) -> Result<AllStats, FetchError> {
        let log = self.fetch_log(false).await?;
        Ok(catalog_stats(catalog, &log))
    }

    /// Units with at least `threshold` log entries of any status, most
    /// entries first.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if the remote store cannot be read.
    pub async fn units_with_at_least(&self, threshold: usize) -> Result<Vec<UnitCount>, FetchError> {
        let log = self.fetch_log(false).await?;
        let mut counts: HashMap<&WorkUnitId, usize> = HashMap::new();
        for entry in log.iter() {
            *counts.entry(&entry.source).or_default() += 1;
        }

        let mut done: Vec<UnitCount> = units_in_order(&log)
            .into_iter()
            .filter_map(|unit| {
                let entries = counts.get(&unit).copied().unwrap_or_default();
                (entries >= threshold).then_some(UnitCount { unit, entries })
            })
            .collect();
        done.sort_by(|a, b| b.entries.cmp(&a.entries));
        Ok(done)
    }

    /// Progress report over every unit in the log.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if the remote store cannot be read.
    pub async fn render_report(&self) -> Result<Report, FetchError> {
        let stats = self.compute_all_stats().await?;
        Ok(Report::from_stats(&stats, self.clock.now()))
    }

    fn cached(&self) -> Option<Arc<Vec<SubmissionEntry>>> {
        let slot = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let cached = slot.as_ref()?;
        let age = self.clock.now() - cached.fetched_at;
        (age < self.ttl).then(|| Arc::clone(&cached.entries))
    }
}

/// Validate raw log elements, dropping the ones that do not fit.
fn ingest(raw: Vec<Value>) -> Vec<SubmissionEntry> {
    let total = raw.len();
    let mut entries = Vec::with_capacity(total);
    for (index, value) in raw.into_iter().enumerate() {
        match SubmissionEntry::from_value(value) {
            Ok(entry) => entries.push(entry),
            Err(err) => tracing::debug!(index, error = %err, "rejected remote log entry"),
        }
    }
    let quarantined = total - entries.len();
    if quarantined > 0 {
        tracing::warn!(
            quarantined,
            total,
            "quarantined malformed remote log entries"
        );
    }
    entries
}

/// Per-unit and overall stats for every unit named in `log`.
#[must_use]
pub fn all_stats(log: &[SubmissionEntry]) -> AllStats {
    stats_for(&units_in_order(log), log)
}

/// Stats for the catalog units in catalog order, then log-only units.
#[must_use]
pub fn catalog_stats(catalog: &Catalog, log: &[SubmissionEntry]) -> AllStats {
    let mut units: Vec<WorkUnitId> = catalog.units().to_vec();
    units.extend(
        units_in_order(log)
            .into_iter()
            .filter(|unit| !catalog.contains(unit)),
    );
    stats_for(&units, log)
}

fn units_in_order(log: &[SubmissionEntry]) -> Vec<WorkUnitId> {
    let mut seen = std::collections::HashSet::new();
    log.iter()
        .filter(|entry| seen.insert(&entry.source))
        .map(|entry| entry.source.clone())
        .collect()
}

fn stats_for(units: &[WorkUnitId], log: &[SubmissionEntry]) -> AllStats {
    AllStats::from_units(
        units
            .iter()
            .map(|unit| FileStats::from_log(unit, log))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppendError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use translate_core::model::{LastUpdated, StatusLabel};
    use translate_core::time::fixed_now;

    /// Serves a fixed log and counts transport calls.
    #[derive(Default)]
    struct FakeRemote {
        log: Mutex<Vec<Value>>,
        fail: std::sync::atomic::AtomicBool,
        calls: AtomicUsize,
    }

    impl FakeRemote {
        fn with(log: Vec<Value>) -> Arc<Self> {
            Arc::new(Self {
                log: Mutex::new(log),
                ..Self::default()
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemoteStore for FakeRemote {
        async fn fetch_all(&self) -> Result<Vec<Value>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(FetchError::Malformed("offline".into()));
            }
            Ok(self.log.lock().unwrap().clone())
        }

        async fn append(&self, _entry: &SubmissionEntry) -> Result<(), AppendError> {
            Ok(())
        }
    }

    fn row(source: &str, status: &str, ts: &str) -> Value {
        json!({ "source": source, "status": status, "timestamp": ts, "translation": "x" })
    }

    fn aggregator(remote: &Arc<FakeRemote>, clock: &Clock) -> RemoteAggregator {
        RemoteAggregator::new(remote.clone(), clock.clone(), Duration::seconds(60))
    }

    fn unit(name: &str) -> WorkUnitId {
        WorkUnitId::new(name).unwrap()
    }

    #[tokio::test]
    async fn cache_serves_within_window_and_force_refreshes() {
        let remote = FakeRemote::with(vec![row("a", "translated", "")]);
        let mut clock = Clock::manual(fixed_now());
        let agg = aggregator(&remote, &clock);

        let first = agg.fetch_log(false).await.unwrap();
        clock.advance(Duration::seconds(10));
        let second = agg.fetch_log(false).await.unwrap();
        assert_eq!(remote.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));

        agg.fetch_log(true).await.unwrap();
        agg.fetch_log(true).await.unwrap();
        assert_eq!(remote.calls(), 3);
    }

    #[tokio::test]
    async fn cache_expires_after_window() {
        let remote = FakeRemote::with(vec![]);
        let mut clock = Clock::manual(fixed_now());
        let agg = aggregator(&remote, &clock);

        agg.fetch_log(false).await.unwrap();
        clock.advance(Duration::seconds(59));
        agg.fetch_log(false).await.unwrap();
        assert_eq!(remote.calls(), 1);

        clock.advance(Duration::seconds(1));
        agg.fetch_log(false).await.unwrap();
        assert_eq!(remote.calls(), 2);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_snapshot() {
        let remote = FakeRemote::with(vec![row("a", "translated", "")]);
        let clock = Clock::manual(fixed_now());
        let agg = aggregator(&remote, &clock);
        let before = agg.fetch_log(false).await.unwrap();

        remote.fail.store(true, Ordering::SeqCst);
        assert!(agg.fetch_log(true).await.is_err());

        let after = agg.fetch_log(false).await.unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(remote.calls(), 2);
    }

    #[tokio::test]
    async fn malformed_entries_are_quarantined() {
        let remote = FakeRemote::with(vec![
            row("a", "translated", "2023-11-14T22:13:20.000Z"),
            json!({ "status": "translated" }),
            json!({ "source": "a", "status": "done" }),
            json!({ "source": "a", "status": "skipped", "timestamp": "yesterday" }),
            json!("not an object"),
            json!({ "source": "a", "status": "skipped", "translation": 42 }),
        ]);
        let agg = aggregator(&remote, &Clock::manual(fixed_now()));

        let log = agg.fetch_log(false).await.unwrap();
        assert_eq!(log.len(), 2);
        let stats = agg.compute_unit_stats(&unit("a")).await.unwrap();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.completed_entries, 1);
    }

    #[tokio::test]
    async fn unit_stats_follow_statuses() {
        let remote = FakeRemote::with(vec![
            row("u", "translated", "2023-11-14T22:13:20.000Z"),
            row("u", "skipped", "2023-11-14T22:15:00.000Z"),
        ]);
        let agg = aggregator(&remote, &Clock::manual(fixed_now()));

        let stats = agg.compute_unit_stats(&unit("u")).await.unwrap();
        assert_eq!(
            (stats.total_entries, stats.completed_entries, stats.is_complete),
            (2, 1, false)
        );
        assert_eq!(
            stats.last_updated,
            LastUpdated::At(fixed_now() + Duration::seconds(100))
        );

        let remote = FakeRemote::with(vec![
            row("u", "translated", ""),
            row("u", "no_translation_needed", ""),
        ]);
        let agg = aggregator(&remote, &Clock::manual(fixed_now()));
        let stats = agg.compute_unit_stats(&unit("u")).await.unwrap();
        assert_eq!(
            (stats.total_entries, stats.completed_entries, stats.is_complete),
            (2, 2, true)
        );
    }

    #[tokio::test]
    async fn unknown_unit_has_never_updated() {
        let agg = aggregator(&FakeRemote::with(vec![]), &Clock::manual(fixed_now()));
        let stats = agg.compute_unit_stats(&unit("missing")).await.unwrap();
        assert_eq!(stats, FileStats::empty(unit("missing")));
        assert_eq!(stats.last_updated.to_string(), "Never");
    }

    #[tokio::test]
    async fn lists_units_in_first_appearance_order() {
        let remote = FakeRemote::with(vec![
            row("b", "translated", ""),
            row("a", "translated", ""),
            row("b", "skipped", ""),
        ]);
        let agg = aggregator(&remote, &Clock::manual(fixed_now()));
        assert_eq!(agg.list_units().await.unwrap(), vec![unit("b"), unit("a")]);
    }

    #[tokio::test]
    async fn all_stats_use_one_snapshot() {
        let remote = FakeRemote::with(vec![
            row("a", "translated", ""),
            row("a", "translated", ""),
            row("b", "skipped", ""),
            row("b", "translated", ""),
        ]);
        let agg = aggregator(&remote, &Clock::manual(fixed_now()));

        let stats = agg.compute_all_stats().await.unwrap();
        assert_eq!(remote.calls(), 1);
        assert_eq!(stats.per_unit.len(), 2);
        assert_eq!(stats.overall.total_files, 2);
        assert_eq!(stats.overall.completed_files, 1);
        assert_eq!(stats.overall.total_entries, 4);
        assert_eq!(stats.overall.completed_entries, 3);
        assert_eq!(stats.overall.overall_progress, 75);
    }

    #[tokio::test]
    async fn catalog_stats_include_untouched_units() {
        let remote = FakeRemote::with(vec![
            row("stray", "translated", ""),
            row("b", "translated", ""),
        ]);
        let agg = aggregator(&remote, &Clock::manual(fixed_now()));
        let catalog = Catalog::new(vec![unit("a"), unit("b")]).unwrap();

        let stats = agg.compute_catalog_stats(&catalog).await.unwrap();
        let order: Vec<&str> = stats.per_unit.iter().map(|s| s.file_path.as_str()).collect();
        assert_eq!(order, ["a", "b", "stray"]);
        assert_eq!(stats.per_unit[0].status_label(), StatusLabel::NotStarted);
        assert_eq!(stats.overall.total_files, 3);
    }

    #[tokio::test]
    async fn done_units_meet_threshold() {
        let mut log = Vec::new();
        for _ in 0..3 {
            log.push(row("big", "skipped", ""));
        }
        log.push(row("small", "translated", ""));
        for _ in 0..4 {
            log.push(row("bigger", "translated", ""));
        }
        let agg = aggregator(&FakeRemote::with(log), &Clock::manual(fixed_now()));

        let done = agg.units_with_at_least(3).await.unwrap();
        assert_eq!(
            done,
            vec![
                UnitCount { unit: unit("bigger"), entries: 4 },
                UnitCount { unit: unit("big"), entries: 3 },
            ]
        );
        assert!(agg.units_with_at_least(DEFAULT_DONE_THRESHOLD).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn report_rows_sorted_by_completion() {
        let remote = FakeRemote::with(vec![
            row("half", "translated", ""),
            row("half", "skipped", ""),
            row("tie-1", "skipped", ""),
            row("full", "translated", ""),
            row("tie-2", "skipped", ""),
        ]);
        let agg = aggregator(&remote, &Clock::manual(fixed_now()));

        let report = agg.render_report().await.unwrap();
        let order: Vec<&str> = report.rows.iter().map(|r| r.file_path.as_str()).collect();
        assert_eq!(order, ["full", "half", "tie-1", "tie-2"]);
    }
}
