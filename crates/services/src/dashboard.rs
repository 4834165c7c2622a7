use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use translate_core::model::{AllStats, Catalog};

use crate::aggregator::{RemoteAggregator, all_stats, catalog_stats};

/// What the dashboard shows after a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub stats: AllStats,
    /// Set when the latest refresh failed.
    pub error: Option<String>,
    /// True when `stats` is not from the latest refresh.
    pub stale: bool,
}

/// Best-effort stats display over the aggregator.
///
/// A failed refresh never surfaces as an error: the last good stats (or
/// zeroed stats before the first success) are shown with the error attached.
#[derive(Clone)]
pub struct StatsDashboard {
    aggregator: RemoteAggregator,
    catalog: Option<Catalog>,
    last_good: Arc<Mutex<Option<AllStats>>>,
}

impl StatsDashboard {
    #[must_use]
    pub fn new(aggregator: RemoteAggregator) -> Self {
        Self {
            aggregator,
            catalog: None,
            last_good: Arc::new(Mutex::new(None)),
        }
    }

    /// List every catalog unit, including untouched ones.
    #[must_use]
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Recompute from the aggregator, or fall back to the last good stats.
    pub async fn refresh(&self, force: bool) -> DashboardView {
        let fetched = self
            .aggregator
            .fetch_log(force)
            .await
            .map(|log| match &self.catalog {
                Some(catalog) => catalog_stats(catalog, &log),
                None => all_stats(&log),
            });

        let mut last_good = self.last_good.lock().unwrap_or_else(PoisonError::into_inner);
        match fetched {
            Ok(stats) => {
                *last_good = Some(stats.clone());
                DashboardView {
                    stats,
                    error: None,
                    stale: false,
                }
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    has_snapshot = last_good.is_some(),
                    "stats refresh failed, showing last known stats"
                );
                DashboardView {
                    stats: last_good.clone().unwrap_or_default(),
                    error: Some(err.to_string()),
                    stale: true,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppendError, FetchError};
    use crate::remote::RemoteStore;
    use async_trait::async_trait;
    use chrono::Duration;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicBool, Ordering};
    use translate_core::Clock;
    use translate_core::model::{OverallStats, SubmissionEntry, WorkUnitId};
    use translate_core::time::fixed_now;

    #[derive(Default)]
    struct FlakyRemote {
        down: AtomicBool,
    }

    #[async_trait]
    impl RemoteStore for FlakyRemote {
        async fn fetch_all(&self) -> Result<Vec<Value>, FetchError> {
            if self.down.load(Ordering::SeqCst) {
                Err(FetchError::Malformed("service unavailable".into()))
            } else {
                Ok(vec![
                    json!({"source": "a", "status": "translated"}),
                    json!({"source": "a", "status": "skipped"}),
                ])
            }
        }

        async fn append(&self, _entry: &SubmissionEntry) -> Result<(), AppendError> {
            Ok(())
        }
    }

    fn dashboard(remote: &Arc<FlakyRemote>) -> StatsDashboard {
        let aggregator = RemoteAggregator::new(
            remote.clone(),
            Clock::manual(fixed_now()),
            Duration::seconds(60),
        );
        StatsDashboard::new(aggregator)
    }

    #[tokio::test]
    async fn first_failure_shows_zeroed_stats() {
        let remote = Arc::new(FlakyRemote::default());
        remote.down.store(true, Ordering::SeqCst);

        let view = dashboard(&remote).refresh(false).await;
        assert!(view.stale);
        assert_eq!(view.stats.overall, OverallStats::zeroed());
        assert!(view.error.unwrap().contains("service unavailable"));
    }

    #[tokio::test]
    async fn failure_keeps_last_good_stats() {
        let remote = Arc::new(FlakyRemote::default());
        let dashboard = dashboard(&remote);

        let good = dashboard.refresh(false).await;
        assert!(!good.stale);
        assert_eq!(good.error, None);
        assert_eq!(good.stats.overall.overall_progress, 50);

        remote.down.store(true, Ordering::SeqCst);
        let degraded = dashboard.refresh(true).await;
        assert!(degraded.stale);
        assert!(degraded.error.is_some());
        assert_eq!(degraded.stats, good.stats);

        remote.down.store(false, Ordering::SeqCst);
        let recovered = dashboard.refresh(true).await;
        assert!(!recovered.stale);
        assert_eq!(recovered.error, None);
    }

    #[tokio::test]
    async fn catalog_units_are_listed() {
        let remote = Arc::new(FlakyRemote::default());
        let catalog = Catalog::new(vec![
            WorkUnitId::new("a").unwrap(),
            WorkUnitId::new("b").unwrap(),
        ])
        .unwrap();

        let view = dashboard(&remote).with_catalog(catalog).refresh(false).await;
        assert_eq!(view.stats.per_unit.len(), 2);
        assert_eq!(view.stats.overall.total_files, 2);
    }
}
