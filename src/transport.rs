//! The HTTP transport capability and its `reqwest` implementation.
//!
//! A [`Transport`] performs exactly one round-trip. Retries, status
//! interpretation and decoding all live above it, so a transport returns any
//! response it receives, whatever its status, and only fails for errors below
//! the HTTP layer.

use crate::auth::Authenticator;
use crate::{Error, Result};
use http::{HeaderMap, Method, StatusCode};
use std::future::Future;
use std::time::Duration;
use url::Url;

/// A fully resolved outgoing request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    /// Absolute URL, query string included.
    pub url: Url,
    pub headers: HeaderMap,
    /// Serialized JSON body.
    pub body: Option<String>,
    pub authenticator: Authenticator,
    pub timeout: Option<Duration>,
}

/// A response as received, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub content: String,
}

impl RawResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, content: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            content: content.into(),
        }
    }

    /// `true` for 2xx statuses.
    pub fn is_successful(&self) -> bool {
        self.status.is_success()
    }

    /// Returns a header value by name, if it is valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

/// Capability for sending one request.
pub trait Transport: Send + Sync {
    /// Sends `request` and returns whatever response comes back.
    ///
    /// # Errors
    ///
    /// Returns an error only when no response was received at all.
    fn send(&self, request: TransportRequest) -> impl Future<Output = Result<RawResponse>> + Send;
}

/// [`Transport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a fresh connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder().build().map_err(|e| {
            Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })?;
        Ok(Self { http_client })
    }

    /// Wraps an existing client, sharing its pool and settings.
    pub fn from_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<RawResponse> {
        let mut builder = self
            .http_client
            .request(request.method, request.url)
            .headers(request.headers);

        builder = request.authenticator.apply(builder);

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(body) = request.body {
            builder = builder
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let content = response.text().await.map_err(map_reqwest_error)?;

        Ok(RawResponse {
            status,
            headers,
            content,
        })
    }
}

fn map_reqwest_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout
    } else {
        Error::Network(error)
    }
}
