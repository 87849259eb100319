//! HTTP boundary with the licensing server.
//!
//! The core only ever looks at the status code and the decoded JSON body.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors raised by a [`Transport`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or no response arrived in time.
    #[error("request failed: {0}")]
    Request(String),

    /// The response body was not valid JSON.
    #[error("decode response: {0}")]
    Decode(String),

    /// The HTTP client could not be constructed.
    #[error("http client: {0}")]
    Client(String),
}

/// Status code and decoded JSON body of a server response.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Decoded body, `Value::Null` when the body was empty.
    pub body: Value,
}

impl TransportResponse {
    /// Returns true for a 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// "POST/DELETE JSON, get status plus JSON back" capability.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `body` as JSON with POST.
    async fn post(&self, url: &str, body: &Value) -> Result<TransportResponse, TransportError>;

    /// Sends `body` as JSON with DELETE.
    async fn delete(&self, url: &str, body: &Value) -> Result<TransportResponse, TransportError>;
}

/// Default user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("LicenseEdictSDK-Rust/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// `reqwest`-backed transport with a fixed timeout and user agent.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with the given timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wraps an already configured `reqwest::Client`.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: &Value,
    ) -> Result<TransportResponse, TransportError> {
        debug!("{method} {url}");
        let response = self
            .client
            .request(method, url)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Request(format!("read response: {e}")))?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))?
        };

        Ok(TransportResponse { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, url: &str, body: &Value) -> Result<TransportResponse, TransportError> {
        self.send(Method::POST, url, body).await
    }

    async fn delete(&self, url: &str, body: &Value) -> Result<TransportResponse, TransportError> {
        self.send(Method::DELETE, url, body).await
    }
}
