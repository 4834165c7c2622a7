//! Shared error types for the services crate.

use thiserror::Error;

use storage::ProgressStoreError;
use storage::sqlite::SqliteInitError;
use translate_core::model::{AnnotationError, CatalogError, RemoteSettingsError};

/// Errors reading the remote entry log.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error("remote log request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("remote log response is malformed: {0}")]
    Malformed(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors appending one entry to the remote log.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppendError {
    #[error("remote append failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by the work assignment selector.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SelectionError {
    #[error("catalog has no work units")]
    EmptyCatalog,
    #[error(transparent)]
    Progress(#[from] ProgressStoreError),
}

/// Errors emitted by translation sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no sentences available for session")]
    Empty,
    #[error("session already completed")]
    Completed,
    #[error("translation cannot be empty")]
    EmptyTranslation,
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
    #[error(transparent)]
    Progress(#[from] ProgressStoreError),
}

/// Errors reading configuration from the environment.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("remote endpoint is not configured (set TRANSLATE_API_URL or --endpoint)")]
    MissingEndpoint,
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error(transparent)]
    Remote(#[from] RemoteSettingsError),
}

/// Errors emitted while bootstrapping the app context.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContextError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Progress(#[from] ProgressStoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("failed to read manifest {path}: {source}")]
    Manifest {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
