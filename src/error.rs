//! Error types for SDK calls.
//!
//! [`Error`] covers everything that stops the executor from producing an
//! [`ApiResult`](crate::ApiResult): transport failures that survived the retry
//! policy, bodies that could not be decoded, bad configuration, and error
//! responses whose envelope matched none of the known shapes.
//!
//! Ordinary API failures (a 4xx with a recognised error body, for example) are
//! *not* reported here. They are carried inside the returned result as an
//! [`ApiException`] and only become an `Err` when the caller asks for them via
//! [`ApiResult::data_or_exception`](crate::ApiResult::data_or_exception).

use crate::exception::ApiException;
use http::StatusCode;

/// Diagnostic attached to error bodies that no known envelope could decode.
pub const CANNOT_CONVERT_API_ERROR: &str = "Cannot convert API error correctly.";

/// The main error type for SDK calls.
///
/// # Examples
///
/// ```no_run
/// use encore_sdk::{ApiContext, ApiRequestExecutor, Environment, Error, RequestParameters};
///
/// # async fn example() -> Result<(), Error> {
/// let executor = ApiRequestExecutor::builder(ApiContext::new(Environment::Qa))
///     .service("venue", 1)
///     .build()?;
///
/// match executor
///     .execute_wrapped::<serde_json::Value>(RequestParameters::get("venues"))
///     .await
/// {
///     Ok(result) => println!("successful: {}", result.is_successful()),
///     Err(Error::UnrecognizedApiError { status, raw_response, .. }) => {
///         eprintln!("HTTP {status} with an unknown error body: {raw_response}");
///     }
///     Err(e) => eprintln!("transport failure: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error occurred (connection failed, DNS lookup failed, etc.).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request exceeded the context timeout.
    #[error("Request timed out")]
    Timeout,

    /// Failed to deserialize a response body into the expected type.
    ///
    /// Both the raw body and the serde message are preserved for debugging.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// Failed to serialize a request body or query object.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// Invalid configuration was provided, such as an unusable header value.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A failed response whose body matched none of the error envelopes tried.
    #[error("{message} (status {status}): {raw_response}")]
    UnrecognizedApiError {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body, verbatim
        raw_response: String,
        /// Diagnostic message
        message: String,
    },

    /// An authentication strategy could not produce usable credentials.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// An API-level failure that the caller chose to raise.
    #[error(transparent)]
    Api(#[from] ApiException),
}

impl Error {
    /// Builds the failure raised when no error envelope matches a response body.
    pub fn unrecognized(status: StatusCode, raw_response: impl Into<String>) -> Self {
        Error::UnrecognizedApiError {
            status,
            raw_response: raw_response.into(),
            message: CANNOT_CONVERT_API_ERROR.to_string(),
        }
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::DeserializationFailed { status, .. } => Some(*status),
            Error::UnrecognizedApiError { status, .. } => Some(*status),
            Error::Api(exception) => Some(exception.response_code()),
            Error::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            Error::UnrecognizedApiError { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }

    /// Returns `true` for failures raised below the HTTP protocol layer.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Timeout | Error::DeserializationFailed { .. }
        )
    }
}

/// A specialized `Result` type for SDK calls.
pub type Result<T> = std::result::Result<T, Error>;
