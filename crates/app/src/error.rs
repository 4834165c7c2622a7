use std::path::PathBuf;

use thiserror::Error;

use services::{ConfigError, ContextError, FetchError, SelectionError};
use storage::ProgressStoreError;
use translate_core::model::{CatalogError, WorkUnitIdError};

/// Everything the binary can fail with. Printed once by `main`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid --db value: {raw}")]
    InvalidDbUrl { raw: String },
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Progress(#[from] ProgressStoreError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Unit(#[from] WorkUnitIdError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
