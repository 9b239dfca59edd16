//! HTTP + JSON remote client.

use reqwest::{Method, StatusCode, Url};
use serde_json::Value;

use super::response::{
    expect_record, expect_records, is_healthy_payload, parse_api_error, unwrap_envelope,
};
use super::RemoteStore;
use crate::config::SyncSettings;
use crate::error::{Error, Result, SyncError, SyncResult};
use crate::models::{Record, RecordId};

const API_PREFIX: &str = "api";
const HEALTH_PATH: &str = "health";

/// Remote store reached over `/api/{resource}[/{id}]`.
#[derive(Clone)]
pub struct HttpRemote {
    base_url: Url,
    api_token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpRemote {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpRemote")
            .field("base_url", &self.base_url.as_str())
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpRemote {
    /// Build a client for `settings.api_url` with `settings.request_timeout`
    /// applied to every request.
    pub fn new(settings: &SyncSettings) -> Result<Self> {
        let base_url = Url::parse(&settings.api_url)
            .map_err(|error| Error::Config(format!("invalid API URL: {error}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "API URL cannot be used as a base: {}",
                settings.api_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|error| Error::Config(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            base_url,
            api_token: settings.api_token.clone(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(API_PREFIX).extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request, mapping only transport failures.
    async fn fetch(&self, builder: reqwest::RequestBuilder) -> SyncResult<(StatusCode, String)> {
        let response = builder
            .send()
            .await
            .map_err(|error| SyncError::Network(describe_transport_error(&error)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| SyncError::Network(describe_transport_error(&error)))?;
        Ok((status, body))
    }

    /// Send a request and classify the outcome.
    ///
    /// Returns the unwrapped payload for 2xx responses (`Null` for an empty
    /// body). `id` turns a 404 into `NotFound`.
    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        resource: &str,
        id: Option<&RecordId>,
    ) -> SyncResult<Value> {
        let (status, body) = self.fetch(builder).await?;

        if status == StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(SyncError::NotFound {
                    resource: resource.to_string(),
                    id: id.to_string(),
                });
            }
        }

        if !status.is_success() {
            return Err(SyncError::Server {
                status: status.as_u16(),
                message: parse_api_error(status.as_u16(), &body),
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        let value: Value = serde_json::from_str(&body).map_err(|error| {
            SyncError::MalformedResponse(format!("response is not JSON: {error}"))
        })?;
        unwrap_envelope(status.as_u16(), value)
    }
}

#[async_trait::async_trait]
impl RemoteStore for HttpRemote {
    async fn list(&self, resource: &str) -> SyncResult<Vec<Record>> {
        let url = self.endpoint(&[resource]);
        let value = self
            .send(self.request(Method::GET, url), resource, None)
            .await?;
        expect_records(value)
    }

    async fn get(&self, resource: &str, id: &RecordId) -> SyncResult<Record> {
        let url = self.endpoint(&[resource, id.as_str()]);
        let value = self
            .send(self.request(Method::GET, url), resource, Some(id))
            .await?;
        expect_record(value)
    }

    async fn create(&self, resource: &str, record: &Record) -> SyncResult<Record> {
        let url = self.endpoint(&[resource]);
        let builder = self.request(Method::POST, url).json(record);
        let value = self.send(builder, resource, None).await?;
        expect_record(value)
    }

    async fn update(&self, resource: &str, id: &RecordId, record: &Record) -> SyncResult<Record> {
        let url = self.endpoint(&[resource, id.as_str()]);
        let builder = self.request(Method::PUT, url).json(record);
        let value = self.send(builder, resource, Some(id)).await?;
        expect_record(value)
    }

    async fn delete(&self, resource: &str, id: &RecordId) -> SyncResult<()> {
        let url = self.endpoint(&[resource, id.as_str()]);
        self.send(self.request(Method::DELETE, url), resource, Some(id))
            .await?;
        Ok(())
    }

    async fn health(&self) -> bool {
        let url = self.endpoint(&[HEALTH_PATH]);
        let (status, body) = match self.fetch(self.request(Method::GET, url)).await {
            Ok(response) => response,
            Err(error) => {
                tracing::debug!(%error, "Health probe failed");
                return false;
            }
        };

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "Health probe returned non-success status");
            return false;
        }

        serde_json::from_str::<Value>(&body).is_ok_and(|payload| is_healthy_payload(&payload))
    }
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timed out: {error}")
    } else if error.is_connect() {
        format!("connection failed: {error}")
    } else {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(url: &str) -> HttpRemote {
        let settings = SyncSettings::default().with_api_url(url).unwrap();
        HttpRemote::new(&settings).unwrap()
    }

    #[test]
    fn endpoints_join_under_api_prefix() {
        let remote = remote("https://ops.example.com");
        assert_eq!(
            remote.endpoint(&["clients"]).as_str(),
            "https://ops.example.com/api/clients"
        );
        assert_eq!(
            remote.endpoint(&["clients", "42"]).as_str(),
            "https://ops.example.com/api/clients/42"
        );
        assert_eq!(
            remote.endpoint(&[HEALTH_PATH]).as_str(),
            "https://ops.example.com/api/health"
        );
    }

    #[test]
    fn endpoints_keep_base_path_and_escape_ids() {
        let remote = remote("https://ops.example.com/depot/");
        assert_eq!(
            remote.endpoint(&["trips", "a/b c"]).as_str(),
            "https://ops.example.com/depot/api/trips/a%2Fb%20c"
        );
    }

    #[test]
    fn debug_redacts_token() {
        let settings = SyncSettings {
            api_token: Some("hunter2".to_string()),
            ..SyncSettings::default()
        };
        let remote = HttpRemote::new(&settings).unwrap();
        let debug = format!("{remote:?}");
        assert!(!debug.contains("hunter2"));
    }
}
