use std::env;
use std::path::PathBuf;

use translate_core::model::{
    DEFAULT_CACHE_SECS, DEFAULT_TIMEOUT_SECS, RemoteSettings, RemoteSettingsDraft,
};

use crate::error::ConfigError;

pub const API_URL_VAR: &str = "TRANSLATE_API_URL";
pub const DB_URL_VAR: &str = "TRANSLATE_DB_URL";
pub const CACHE_SECS_VAR: &str = "TRANSLATE_CACHE_SECS";
pub const MANIFEST_VAR: &str = "TRANSLATE_MANIFEST";
pub const HTTP_TIMEOUT_VAR: &str = "TRANSLATE_HTTP_TIMEOUT_SECS";

pub const DEFAULT_DB_URL: &str = "sqlite://translate-progress.sqlite3";
pub const DEFAULT_MANIFEST: &str = "manifest.json";

/// Runtime configuration, read from `TRANSLATE_*` variables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub endpoint: Option<String>,
    pub db_url: String,
    pub manifest_path: PathBuf,
    pub cache_ttl_secs: u32,
    pub timeout_secs: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            db_url: DEFAULT_DB_URL.to_owned(),
            manifest_path: PathBuf::from(DEFAULT_MANIFEST),
            cache_ttl_secs: DEFAULT_CACHE_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Read the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidNumber` if a numeric variable does not
    /// parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Read configuration through `lookup`; blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidNumber` if a numeric variable does not
    /// parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| {
            lookup(var)
                .map(|val| val.trim().to_string())
                .filter(|val| !val.is_empty())
        };
        let number = |var: &'static str, default: u32| match get(var) {
            None => Ok(default),
            Some(value) => value
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidNumber { var, value }),
        };

        let defaults = Self::default();
        Ok(Self {
            endpoint: get(API_URL_VAR),
            db_url: get(DB_URL_VAR).unwrap_or(defaults.db_url),
            manifest_path: get(MANIFEST_VAR).map_or(defaults.manifest_path, PathBuf::from),
            cache_ttl_secs: number(CACHE_SECS_VAR, DEFAULT_CACHE_SECS)?,
            timeout_secs: number(HTTP_TIMEOUT_VAR, DEFAULT_TIMEOUT_SECS)?,
        })
    }

    /// Validity window of the remote log cache. Zero disables caching.
    #[must_use]
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.cache_ttl_secs))
    }

    /// Validated remote settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEndpoint` when no endpoint is set, or
    /// `ConfigError::Remote` when it is not a usable http(s) URL.
    pub fn remote_settings(&self) -> Result<RemoteSettings, ConfigError> {
        let endpoint = self.endpoint.clone().ok_or(ConfigError::MissingEndpoint)?;
        Ok(RemoteSettingsDraft {
            endpoint: Some(endpoint),
            timeout_secs: Some(self.timeout_secs),
        }
        .validate()?)
    }
}
