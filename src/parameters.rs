//! Request intent and its translation into transport-ready parameters.
//!
//! Endpoint methods describe a call with [`RequestParameters`]. The executor
//! combines those with the session [`ApiContext`] into [`ClientParameters`]
//! through the pure functions in this module; nothing here performs I/O.

use crate::auth::Credentials;
use crate::context::ApiContext;
use crate::error_factory::ErrorWrapping;
use crate::serializer::{JsonSerializer, Serializer};
use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Header identifying the SDK and its version on every request.
pub const SDK_HEADER: &str = "x-sdk";

/// Header carrying the caller's affiliate id, when one is set.
pub const AFFILIATE_HEADER: &str = "affiliateid";

/// Product name reported in [`SDK_HEADER`]. The services key on this exact
/// value.
pub const SDK_PRODUCT: &str = "EncoreTickets.SDK.NET";

/// HTTP method of an API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl RequestMethod {
    pub fn as_http(self) -> Method {
        match self {
            RequestMethod::Get => Method::GET,
            RequestMethod::Post => Method::POST,
            RequestMethod::Put => Method::PUT,
            RequestMethod::Patch => Method::PATCH,
            RequestMethod::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.as_http(), f)
    }
}

/// Everything an endpoint method says about one call.
///
/// Created fresh per call and consumed once by the executor.
///
/// ```
/// use encore_sdk::RequestParameters;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Search { page: u32, venue: Option<String> }
///
/// let parameters = RequestParameters::get("venues/{venueId}/shows")
///     .with_url_segment("venueId", "199")
///     .with_query(&Search { page: 2, venue: None })
///     .unwrap();
///
/// assert_eq!(parameters.query.unwrap().get("page").map(String::as_str), Some("2"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestParameters {
    /// Endpoint path relative to the service base URL. `{name}` placeholders
    /// are replaced from `url_segments`.
    pub endpoint: String,
    pub method: RequestMethod,
    pub body: Option<Value>,
    pub query: Option<BTreeMap<String, String>>,
    pub url_segments: BTreeMap<String, String>,
    /// `chrono` format string used for dates in both directions.
    pub date_format: Option<String>,
    /// Replaces the default JSON codec for this call.
    pub serializer: Option<Arc<dyn Serializer>>,
    /// Error envelopes to try, in order, if the call fails.
    pub error_wrappings: Vec<ErrorWrapping>,
    /// Context info codes that must be treated as errors.
    pub info_as_errors: Vec<String>,
}

impl RequestParameters {
    pub fn new(method: RequestMethod, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            error_wrappings: ErrorWrapping::DEFAULT_ORDER.to_vec(),
            ..Self::default()
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(RequestMethod::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(RequestMethod::Post, endpoint)
    }

    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(RequestMethod::Put, endpoint)
    }

    pub fn patch(endpoint: impl Into<String>) -> Self {
        Self::new(RequestMethod::Patch, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(RequestMethod::Delete, endpoint)
    }

    /// Sets the request body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be represented as JSON.
    pub fn with_body<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let value =
            serde_json::to_value(body).map_err(|e| Error::SerializationFailed(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Adds the non-null fields of `query` as query parameters.
    ///
    /// See [`flatten_query`] for how values are stringified.
    pub fn with_query<Q: Serialize + ?Sized>(self, query: &Q) -> Result<Self> {
        let flattened = flatten_query(Some(query))?;
        Ok(self.with_query_params(flattened.into_iter().flatten()))
    }

    pub fn with_query_param(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_query_params([(key.into(), value.into())])
    }

    pub fn with_query_params(mut self, params: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut params = params.into_iter().peekable();
        if params.peek().is_some() {
            self.query.get_or_insert_with(BTreeMap::new).extend(params);
        }
        self
    }

    pub fn with_url_segment(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.url_segments.insert(name.into(), value.into());
        self
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = Some(serializer);
        self
    }

    pub fn with_error_wrappings(mut self, wrappings: impl IntoIterator<Item = ErrorWrapping>) -> Self {
        self.error_wrappings = wrappings.into_iter().collect();
        self
    }

    pub fn with_info_as_errors<S: Into<String>>(mut self, codes: impl IntoIterator<Item = S>) -> Self {
        self.info_as_errors = codes.into_iter().map(Into::into).collect();
        self
    }
}

/// Transport-ready parameters derived from a context and a request.
#[derive(Debug, Clone)]
pub struct ClientParameters {
    pub base_url: Url,
    pub endpoint: String,
    pub method: RequestMethod,
    pub headers: HeaderMap,
    pub url_segments: BTreeMap<String, String>,
    pub query: Option<BTreeMap<String, String>>,
    pub body: Option<Value>,
    pub credentials: Option<Credentials>,
    pub serializer: Arc<dyn Serializer>,
    pub timeout: Option<Duration>,
}

/// Copies the authentication fields of `context`, if there is one.
pub fn build_credentials(context: Option<&ApiContext>) -> Option<Credentials> {
    let context = context?;
    Some(Credentials {
        authentication_method: context.authentication_method,
        access_token: context.access_token.clone(),
        username: context.username.clone(),
        password: context.password.clone(),
    })
}

/// Standard headers for a call: the SDK identity, plus the affiliate id when
/// the context has a non-blank one.
///
/// # Errors
///
/// Returns an error if the affiliate id is not a valid header value.
pub fn build_headers(context: Option<&ApiContext>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let sdk = format!("{SDK_PRODUCT} {}", env!("CARGO_PKG_VERSION"));
    headers.insert(
        HeaderName::from_static(SDK_HEADER),
        HeaderValue::try_from(sdk)
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?,
    );

    if let Some(affiliate) = context.and_then(ApiContext::affiliate_id) {
        headers.insert(
            HeaderName::from_static(AFFILIATE_HEADER),
            HeaderValue::try_from(affiliate)
                .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?,
        );
    }

    Ok(headers)
}

/// Flattens the top-level fields of `query` into query parameters.
///
/// Keys are lower-cased and fields serialized as `null` are skipped. Strings
/// are used as-is; any other value is rendered as compact JSON, so nested
/// structures should be flattened by the caller first. Returns `None` when
/// nothing remains, including for `None` and non-object inputs.
pub fn flatten_query<Q: Serialize + ?Sized>(
    query: Option<&Q>,
) -> Result<Option<BTreeMap<String, String>>> {
    let Some(query) = query else {
        return Ok(None);
    };

    let value =
        serde_json::to_value(query).map_err(|e| Error::SerializationFailed(e.to_string()))?;
    let Value::Object(fields) = value else {
        return Ok(None);
    };

    let flattened: BTreeMap<String, String> = fields
        .into_iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key.to_lowercase(), value)
        })
        .collect();

    Ok((!flattened.is_empty()).then_some(flattened))
}

/// Composes everything the transport needs for one call.
pub fn build_client_parameters(
    context: &ApiContext,
    base_url: &Url,
    request: RequestParameters,
) -> Result<ClientParameters> {
    let serializer = match request.serializer {
        Some(serializer) => serializer,
        None => Arc::new(JsonSerializer::new(request.date_format)),
    };

    Ok(ClientParameters {
        base_url: base_url.clone(),
        endpoint: request.endpoint,
        method: request.method,
        headers: build_headers(Some(context))?,
        url_segments: request.url_segments,
        query: request.query,
        body: request.body,
        credentials: build_credentials(Some(context)),
        serializer,
        timeout: context.timeout,
    })
}
