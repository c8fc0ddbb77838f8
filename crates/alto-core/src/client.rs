use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::provider::{CompletionProvider, ProviderError};

#[derive(Serialize)]
struct CompletionRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct HealthResponse {
    result: Option<String>,
}

/// Completion provider backed by a JSON-over-HTTP endpoint.
///
/// Speaks the `POST {"message": ...}` / `{"result": ...}` contract. No timeout
/// is applied unless one is configured, so the transport default governs.
#[derive(Clone)]
pub struct HttpCompletionClient {
    client: Client,
    endpoint: String,
}

impl HttpCompletionClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn with_timeout(endpoint: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn query(&self, message: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&CompletionRequest { message })
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let payload: Value = serde_json::from_slice(&body)
            .map_err(|e| ProviderError::Undecodable(e.to_string()))?;

        // A `null` body has no fields to look up at all
        if payload.is_null() {
            return Err(ProviderError::Undecodable("response body is null".to_string()));
        }

        // Any other JSON value is accepted; only a non-empty string `result` counts
        match payload.get("result").and_then(Value::as_str) {
            Some(result) if !result.is_empty() => Ok(result.to_string()),
            _ => Err(ProviderError::MissingResult),
        }
    }

    /// Health check against the root of the endpoint's origin.
    ///
    /// The backend answers `GET /` with `{"result": "success"}`.
    pub async fn ping(&self) -> Result<(), ProviderError> {
        let root = Url::parse(&self.endpoint)
            .and_then(|url| url.join("/"))
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let response = self
            .client
            .get(root)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let health: HealthResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Undecodable(e.to_string()))?;

        match health.result.as_deref() {
            Some("success") => Ok(()),
            _ => Err(ProviderError::MissingResult),
        }
    }
}

#[async_trait]
impl CompletionProvider for HttpCompletionClient {
    async fn complete(&self, message: &str) -> Result<String, ProviderError> {
        self.query(message).await
    }
}
