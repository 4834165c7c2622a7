use std::sync::Arc;

use storage::repository::{KeyValueStore, Storage};
use storage::LocalProgressStore;
use translate_core::model::{Catalog, WorkUnitId};

use crate::Clock;
use crate::aggregator::RemoteAggregator;
use crate::assignment::WorkAssignmentSelector;
use crate::config::AppConfig;
use crate::dashboard::StatsDashboard;
use crate::error::{ConfigError, ContextError};
use crate::remote::{HttpRemoteStore, RemoteStore};
use crate::session::TranslationSession;

/// Everything one annotator or admin session needs, built once and passed
/// explicitly.
///
/// The remote side is optional: local progress commands work without an
/// endpoint, remote ones fail with `ConfigError::MissingEndpoint`.
#[derive(Clone)]
pub struct AppContext {
    config: AppConfig,
    clock: Clock,
    progress: LocalProgressStore,
    selector: WorkAssignmentSelector,
    remote: Option<Arc<dyn RemoteStore>>,
    aggregator: Option<RemoteAggregator>,
}

impl AppContext {
    /// Build a context backed by `SQLite` at `config.db_url`, with an HTTP
    /// remote store when an endpoint is configured.
    ///
    /// # Errors
    ///
    /// Returns `ContextError` if storage cannot be opened, the endpoint is
    /// invalid, or the HTTP client cannot be built.
    pub async fn new_sqlite(config: AppConfig, clock: Clock) -> Result<Self, ContextError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        let remote: Option<Arc<dyn RemoteStore>> = match config.endpoint {
            Some(_) => {
                let settings = config.remote_settings()?;
                Some(Arc::new(HttpRemoteStore::new(settings, clock.clone())?))
            }
            None => None,
        };
        Self::from_parts(config, clock, storage.kv, remote).await
    }

    /// Build a context over explicit backends.
    ///
    /// # Errors
    ///
    /// Returns `ContextError` if the progress store cannot be initialised.
    pub async fn from_parts(
        config: AppConfig,
        clock: Clock,
        kv: Arc<dyn KeyValueStore>,
        remote: Option<Arc<dyn RemoteStore>>,
    ) -> Result<Self, ContextError> {
        let progress = LocalProgressStore::new(kv, clock.clone());
        progress.init().await?;
        let selector = WorkAssignmentSelector::new(progress.clone());
        let ttl = config.cache_ttl();
        let aggregator = remote
            .as_ref()
            .map(|remote| RemoteAggregator::new(Arc::clone(remote), clock.clone(), ttl));

        Ok(Self {
            config,
            clock,
            progress,
            selector,
            remote,
            aggregator,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    #[must_use]
    pub fn progress(&self) -> &LocalProgressStore {
        &self.progress
    }

    #[must_use]
    pub fn selector(&self) -> &WorkAssignmentSelector {
        &self.selector
    }

    /// # Errors
    ///
    /// Returns `ConfigError::MissingEndpoint` without a remote endpoint.
    pub fn remote(&self) -> Result<Arc<dyn RemoteStore>, ConfigError> {
        self.remote.clone().ok_or(ConfigError::MissingEndpoint)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::MissingEndpoint` without a remote endpoint.
    pub fn aggregator(&self) -> Result<&RemoteAggregator, ConfigError> {
        self.aggregator.as_ref().ok_or(ConfigError::MissingEndpoint)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::MissingEndpoint` without a remote endpoint.
    pub fn dashboard(&self) -> Result<StatsDashboard, ConfigError> {
        Ok(StatsDashboard::new(self.aggregator()?.clone()))
    }

    /// Read the catalog from the configured manifest file.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::Manifest` if the file cannot be read, or
    /// `ContextError::Catalog` if it is not a valid manifest.
    pub fn load_catalog(&self) -> Result<Catalog, ContextError> {
        let path = &self.config.manifest_path;
        let raw = std::fs::read_to_string(path).map_err(|source| ContextError::Manifest {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Catalog::from_manifest_json(&raw)?;
        tracing::debug!(path = %path.display(), units = catalog.len(), "loaded catalog");
        Ok(catalog)
    }

    /// Start a translation session on `unit`.
    ///
    /// # Errors
    ///
    /// Returns `ContextError` without a remote endpoint or when `sentences`
    /// is empty.
    pub fn start_session(
        &self,
        unit: WorkUnitId,
        sentences: Vec<String>,
        user_name: &str,
    ) -> Result<TranslationSession, ContextError> {
        Ok(TranslationSession::start(
            unit,
            sentences,
            user_name,
            self.remote()?,
            self.progress.clone(),
            self.clock.clone(),
        )?)
    }
}
