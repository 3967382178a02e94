//! HTTP gateway to a dietsync remote store server.
//!
//! Endpoints:
//! - `GET  /v1/diet-states/{user_id}` -> `200 {state, updatedAt}` or `404`
//! - `PUT  /v1/diet-states/{user_id}` with `{state}` -> `200 {state, updatedAt}`
//! - `GET  /health`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use super::{RemoteDocument, RemoteError, RemoteStore};

const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Serialize)]
struct UpsertBody<'a> {
    state: &'a Value,
}

#[derive(Debug, Clone)]
pub struct HttpRemote {
    server_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpRemote {
    pub fn new(server_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Applies a per-request timeout to every call.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, RemoteError> {
        self.client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn build_url(&self, path: &str) -> String {
        build_http_url(&self.server_url, path)
    }

    fn state_url(&self, user_id: &str) -> String {
        self.build_url(&format!(
            "/v1/diet-states/{}",
            urlencoding::encode(user_id)
        ))
    }
}

fn build_http_url(server_url: &str, path: &str) -> String {
    let base_url = if server_url.starts_with("http://") || server_url.starts_with("https://") {
        server_url.to_string()
    } else {
        format!("http://{}", server_url)
    };
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

fn status_error(status: StatusCode) -> RemoteError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unauthorized,
        other => RemoteError::Status(other.as_u16()),
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn fetch(&self, user_id: &str) -> Result<Option<RemoteDocument>, RemoteError> {
        let response = self
            .client
            .get(self.state_url(user_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(status_error(status)),
        }
    }

    async fn upsert(&self, user_id: &str, state: &Value) -> Result<(), RemoteError> {
        let response = self
            .client
            .put(self.state_url(user_id))
            .bearer_auth(&self.api_key)
            .json(&UpsertBody { state })
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error(response.status()))
        }
    }
}

/// Returns true if the server answers its health check.
pub async fn check_server(server_url: &str) -> bool {
    let client = match reqwest::Client::builder().timeout(HEALTH_TIMEOUT).build() {
        Ok(client) => client,
        Err(_) => return false,
    };

    match client.get(build_http_url(server_url, "/health")).send().await {
        Ok(response) => response.status().is_success(),
        Err(e) => {
            tracing::debug!("Health check against {} failed: {}", server_url, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_url() {
        assert_eq!(
            build_http_url("http://localhost:8080", "/health"),
            "http://localhost:8080/health"
        );
        assert_eq!(
            build_http_url("https://sync.example.com/", "/health"),
            "https://sync.example.com/health"
        );
        assert_eq!(
            build_http_url("localhost:8080", "/health"),
            "http://localhost:8080/health"
        );
    }

    #[test]
    fn test_state_url_escapes_user_id() {
        let remote = HttpRemote::new("http://localhost:8080", "key");
        assert_eq!(
            remote.state_url("ana"),
            "http://localhost:8080/v1/diet-states/ana"
        );
        assert_eq!(
            remote.state_url("a/b c"),
            "http://localhost:8080/v1/diet-states/a%2Fb%20c"
        );
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED),
            RemoteError::Unauthorized
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR),
            RemoteError::Status(500)
        ));
    }
}
