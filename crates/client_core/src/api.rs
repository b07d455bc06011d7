use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use shared::{error::ApiError, protocol::ApiEnvelope};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::error;
use url::Url;

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("invalid base url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        source: reqwest::Error,
    },
    #[error("{method} {url} returned status {status}{}", status_detail(.message))]
    Status {
        method: Method,
        url: String,
        status: StatusCode,
        message: Option<String>,
    },
    #[error("server rejected request: {0}")]
    Api(ApiError),
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },
    #[error("response from {url} carried no data")]
    MissingData { url: String },
}

impl ApiClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            ApiClientError::Status {
                status: StatusCode::UNAUTHORIZED,
                ..
            }
        )
    }
}

fn status_detail(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

/// JSON client for the SCIP backend. Every response is expected to use the
/// `{success, data}` / `{success, error}` envelope.
#[derive(Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiClientError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ApiClientError::Transport {
                url: base_url.to_string(),
                source,
            })?;
        Self::with_http(http, base_url)
    }

    pub fn with_http(http: Client, base_url: &str) -> Result<Self, ApiClientError> {
        Url::parse(base_url).map_err(|source| ApiClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiClientError> {
        self.request_data(Method::GET, path, None::<&()>).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_data(Method::POST, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiClientError> {
        self.request_data(Method::DELETE, path, None::<&()>).await
    }

    /// Posts and only checks that the envelope reports success.
    pub async fn post_ack<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiClientError> {
        self.request::<B, serde_json::Value>(Method::POST, path, Some(body))
            .await
            .map(|_| ())
    }

    async fn request_data<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        self.request(method, path, body)
            .await?
            .ok_or(ApiClientError::MissingData { url })
    }

    async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Option<T>, ApiClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let mut builder = self.http.request(method.clone(), &url);
        if let Some(token) = self.token().await {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| ApiClientError::Transport {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ApiClientError::Transport {
                url: url.clone(),
                source,
            })?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ApiEnvelope<serde_json::Value>>(&bytes)
                .ok()
                .and_then(|envelope| envelope.error)
                .map(|err| err.message);
            error!("api: {method} {url} failed status={status}");
            return Err(ApiClientError::Status {
                method,
                url,
                status,
                message,
            });
        }

        let envelope: ApiEnvelope<T> =
            serde_json::from_slice(&bytes).map_err(|source| ApiClientError::Decode {
                url: url.clone(),
                source,
            })?;
        envelope.into_result().map_err(ApiClientError::Api)
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
