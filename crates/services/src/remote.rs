//! Client for the remote entry log: an opaque append/query service.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use translate_core::Clock;
use translate_core::model::{EntryWire, RemoteSettings, SubmissionEntry};

use crate::error::{AppendError, FetchError};

/// Remote append-only log of submission entries.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch every entry as raw JSON. Elements are validated by the caller.
    async fn fetch_all(&self) -> Result<Vec<Value>, FetchError>;

    /// Append one entry. Delivery is best-effort; callers never block on it.
    async fn append(&self, entry: &SubmissionEntry) -> Result<(), AppendError>;
}

/// `RemoteStore` over HTTP.
///
/// Reads issue `GET {endpoint}?action=getAllData&t={millis}`, the timestamp
/// defeating intermediary caches. Writes `POST` the entry as camelCase JSON;
/// the response body is ignored.
#[derive(Clone)]
pub struct HttpRemoteStore {
    client: Client,
    settings: RemoteSettings,
    clock: Clock,
}

impl HttpRemoteStore {
    /// Build a client with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be constructed.
    pub fn new(settings: RemoteSettings, clock: Clock) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(settings.timeout()).build()?;
        Ok(Self {
            client,
            settings,
            clock,
        })
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch_all(&self) -> Result<Vec<Value>, FetchError> {
        let cache_buster = self.clock.now().timestamp_millis().to_string();
        let response = self
            .client
            .get(self.settings.endpoint().clone())
            .query(&[("action", "getAllData"), ("t", cache_buster.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| FetchError::Malformed(err.to_string()))?;
        match body {
            Value::Array(items) => {
                tracing::debug!(entries = items.len(), "fetched remote log");
                Ok(items)
            }
            other => Err(FetchError::Malformed(format!(
                "expected a JSON array, found {}",
                json_kind(&other)
            ))),
        }
    }

    async fn append(&self, entry: &SubmissionEntry) -> Result<(), AppendError> {
        let response = self
            .client
            .post(self.settings.endpoint().clone())
            .json(&EntryWire::from(entry))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppendError::HttpStatus(status));
        }
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use translate_core::model::{EntryStatus, SessionId, WorkUnitId};
    use translate_core::time::{fixed_clock, fixed_now};
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer) -> HttpRemoteStore {
        let settings = RemoteSettings::new(&format!("{}/exec", server.uri())).unwrap();
        HttpRemoteStore::new(settings, fixed_clock()).unwrap()
    }

    #[tokio::test]
    async fn fetch_sends_action_and_cache_buster() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/exec"))
            .and(query_param("action", "getAllData"))
            .and(query_param("t", "1700000000000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"source": "a.csv", "status": "translated"},
                {"source": "b.csv", "status": "skipped"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let items = store_for(&server).fetch_all().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["source"], "a.csv");
    }

    #[tokio::test]
    async fn fetch_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = store_for(&server).fetch_all().await.unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus(s) if s.as_u16() == 502));
    }

    #[tokio::test]
    async fn fetch_rejects_non_array_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "quota"})))
            .mount(&server)
            .await;

        let err = store_for(&server).fetch_all().await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed(msg) if msg.contains("an object")));
    }

    #[tokio::test]
    async fn fetch_rejects_non_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let err = store_for(&server).fetch_all().await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[tokio::test]
    async fn append_posts_camel_case_entry() {
        let server = MockServer::start().await;
        let mut entry = SubmissionEntry::new(
            &SessionId::from_start(fixed_now()),
            "Mei",
            WorkUnitId::new("inputs/a.csv").unwrap(),
            EntryStatus::NoTranslationNeeded,
            fixed_now(),
        );
        entry.sentence = "ok lor".into();
        entry.translation = "No Translation Needed".into();
        entry.particle = "lor".into();

        Mock::given(method("POST"))
            .and(path("/exec"))
            .and(body_json(json!({
                "sessionId": "2023-11-14T22-13-20-000Z",
                "userName": "Mei",
                "source": "inputs/a.csv",
                "sentence": "ok lor",
                "translation": "No Translation Needed",
                "status": "no_translation_needed",
                "particle": "lor",
                "particleMeaning": "",
                "timestamp": "2023-11-14T22:13:20.000Z"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        store_for(&server).append(&entry).await.unwrap();
    }
}
