use thiserror::Error;
use url::Url;

/// Default validity window of the remote log cache, in seconds.
pub const DEFAULT_CACHE_SECS: u32 = 60;

/// Default transport timeout for remote calls.
pub const DEFAULT_TIMEOUT_SECS: u32 = 30;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RemoteSettingsError {
    #[error("remote endpoint is not configured")]
    MissingEndpoint,

    #[error("invalid remote endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("request timeout must be > 0")]
    InvalidTimeout,
}

/// Validated settings for talking to the remote entry log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteSettings {
    endpoint: Url,
    timeout_secs: u32,
}

#[derive(Clone, Debug, Default)]
pub struct RemoteSettingsDraft {
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u32>,
}

impl RemoteSettingsDraft {
    /// Validate and normalize the draft.
    ///
    /// # Errors
    ///
    /// Returns `RemoteSettingsError` if the endpoint is missing, not an
    /// http(s) URL, or the timeout is zero.
    pub fn validate(self) -> Result<RemoteSettings, RemoteSettingsError> {
        let raw = self
            .endpoint
            .map(|val| val.trim().to_string())
            .filter(|val| !val.is_empty())
            .ok_or(RemoteSettingsError::MissingEndpoint)?;
        let endpoint =
            Url::parse(&raw).map_err(|_| RemoteSettingsError::InvalidEndpoint(raw.clone()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(RemoteSettingsError::InvalidEndpoint(raw));
        }

        let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(RemoteSettingsError::InvalidTimeout);
        }

        Ok(RemoteSettings {
            endpoint,
            timeout_secs,
        })
    }
}

impl RemoteSettings {
    /// Settings for `endpoint` with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns `RemoteSettingsError` if the endpoint is invalid.
    pub fn new(endpoint: &str) -> Result<Self, RemoteSettingsError> {
        RemoteSettingsDraft {
            endpoint: Some(endpoint.to_owned()),
            ..RemoteSettingsDraft::default()
        }
        .validate()
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    #[must_use]
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.timeout_secs))
    }
}
