//! Transport wrapper: turns [`ClientParameters`] into a request and runs it
//! under the retry policy.
//!
//! The wrapper is split in the same three steps every call goes through:
//! [`build_client`](ClientWrapper::build_client) binds the base URL and
//! authorization, [`build_request`](ClientWrapper::build_request) resolves the
//! rest of the call, and [`execute`](ClientWrapper::execute) /
//! [`execute_as`](ClientWrapper::execute_as) send it.

use crate::auth::Authenticator;
use crate::parameters::ClientParameters;
use crate::retry::RetryPolicy;
use crate::serializer::{deserialize_as, Serializer};
use crate::transport::{RawResponse, Transport, TransportRequest};
use crate::{Error, Result};
use http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// A client bound to one service base URL and one set of credentials.
#[derive(Debug, Clone)]
pub struct RestClient {
    pub base_url: Url,
    pub authenticator: Authenticator,
    pub timeout: Option<Duration>,
}

impl RestClient {
    /// Resolves `request` against the base URL.
    ///
    /// Each path part has its `{name}` placeholders replaced from the URL
    /// segments and is then percent-encoded as a single segment.
    pub fn url_for(&self, request: &RestRequest) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                Error::ConfigurationError(format!("Base URL cannot have a path: {}", self.base_url))
            })?;
            path.pop_if_empty();
            for part in request.resource.split('/').filter(|p| !p.is_empty()) {
                path.push(&substitute_segments(part, &request.url_segments));
            }
        }

        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }
}

/// The per-call half of a request.
#[derive(Debug, Clone)]
pub struct RestRequest {
    pub method: Method,
    /// Endpoint path, possibly containing `{name}` placeholders.
    pub resource: String,
    pub headers: HeaderMap,
    pub url_segments: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    /// Body already serialized by `serializer`.
    pub body: Option<String>,
    pub serializer: Arc<dyn Serializer>,
}

/// A response with its payload decoded.
///
/// `data` is only populated for 200 responses with a non-empty body.
#[derive(Debug, Clone)]
pub struct TypedResponse<T> {
    pub response: RawResponse,
    pub data: Option<T>,
    /// Attempts made, including the first one.
    pub attempts: usize,
}

/// Builds requests from [`ClientParameters`] and executes them with retries.
#[derive(Debug, Clone)]
pub struct ClientWrapper<T> {
    transport: T,
    retry_policy: RetryPolicy,
}

impl<T: Transport> ClientWrapper<T> {
    pub fn new(transport: T, retry_policy: RetryPolicy) -> Self {
        Self {
            transport,
            retry_policy,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Binds the base URL and derives the authorization from the credentials.
    pub fn build_client(&self, parameters: &ClientParameters) -> RestClient {
        RestClient {
            base_url: parameters.base_url.clone(),
            authenticator: Authenticator::from_credentials(parameters.credentials.as_ref()),
            timeout: parameters.timeout,
        }
    }

    /// Resolves method, headers, segments, query and body for one call.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized.
    pub fn build_request(&self, parameters: &ClientParameters) -> Result<RestRequest> {
        let body = parameters
            .body
            .as_ref()
            .map(|body| parameters.serializer.serialize(body))
            .transpose()
            .map_err(|e| Error::SerializationFailed(e.to_string()))?;

        Ok(RestRequest {
            method: parameters.method.as_http(),
            resource: parameters.endpoint.clone(),
            headers: parameters.headers.clone(),
            url_segments: parameters.url_segments.clone(),
            query: parameters.query.clone().unwrap_or_default(),
            body,
            serializer: Arc::clone(&parameters.serializer),
        })
    }

    /// Executes the request without decoding the body.
    ///
    /// # Errors
    ///
    /// Returns the last transport error if every attempt failed below the
    /// HTTP layer. Any response, whatever its status, is returned as `Ok`.
    pub async fn execute(&self, client: &RestClient, request: &RestRequest) -> Result<RawResponse> {
        self.run(client, request, |_, response| Ok((response, None::<()>)))
            .await
            .map(|typed| typed.response)
    }

    /// Executes the request and decodes successful bodies as `D`.
    ///
    /// A body that fails to decode counts as a failed attempt and is retried
    /// like a transport error.
    ///
    /// # Errors
    ///
    /// Returns the last transport or decoding error once attempts run out.
    pub async fn execute_as<D: DeserializeOwned>(
        &self,
        client: &RestClient,
        request: &RestRequest,
    ) -> Result<TypedResponse<D>> {
        self.run(client, request, decode_response).await
    }

    async fn run<D, F>(
        &self,
        client: &RestClient,
        request: &RestRequest,
        decode: F,
    ) -> Result<TypedResponse<D>>
    where
        F: Fn(&RestRequest, RawResponse) -> Result<(RawResponse, Option<D>)>,
    {
        let transport_request = TransportRequest {
            method: request.method.clone(),
            url: client.url_for(request)?,
            headers: request.headers.clone(),
            body: request.body.clone(),
            authenticator: client.authenticator.clone(),
            timeout: client.timeout,
        };

        let mut attempt = 0;

        loop {
            attempt += 1;

            tracing::debug!(
                method = %transport_request.method,
                url = %transport_request.url,
                attempt = attempt,
                "Executing HTTP request"
            );

            let outcome = match self.transport.send(transport_request.clone()).await {
                Ok(response) => {
                    tracing::info!(
                        status = response.status.as_u16(),
                        attempt = attempt,
                        "Received HTTP response"
                    );
                    decode(request, response)
                }
                Err(e) => Err(e),
            };

            let delay = self
                .retry_policy
                .next_delay(outcome.as_ref().map(|(response, _)| response), attempt);

            let Some(delay) = delay else {
                return outcome.map(|(response, data)| TypedResponse {
                    response,
                    data,
                    attempts: attempt,
                });
            };

            match &outcome {
                Ok((response, _)) => tracing::warn!(
                    status = response.status.as_u16(),
                    attempt = attempt,
                    delay_ms = delay.as_millis(),
                    "Unexpected response, retrying"
                ),
                Err(e) => tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    delay_ms = delay.as_millis(),
                    "Request failed, retrying"
                ),
            }

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn decode_response<D: DeserializeOwned>(
    request: &RestRequest,
    response: RawResponse,
) -> Result<(RawResponse, Option<D>)> {
    // Other 2xx statuses are left for the error factory.
    if response.status != StatusCode::OK || response.content.trim().is_empty() {
        return Ok((response, None));
    }

    match deserialize_as::<D>(request.serializer.as_ref(), &response.content) {
        Ok(data) => Ok((response, Some(data))),
        Err(e) => {
            tracing::error!(
                error = %e,
                raw_response = %response.content,
                "Failed to deserialize response"
            );
            Err(Error::DeserializationFailed {
                raw_response: response.content,
                serde_error: e.to_string(),
                status: response.status,
            })
        }
    }
}

fn substitute_segments(part: &str, segments: &BTreeMap<String, String>) -> String {
    segments
        .iter()
        .fold(part.to_string(), |part, (name, value)| {
            part.replace(&format!("{{{name}}}"), value)
        })
}
