//! Builds failed results from error responses.
//!
//! Services don't say which envelope an error body uses, so the factory tries
//! each [`ErrorWrapping`] in turn and takes the first shape that parses, even
//! when that shape yields no messages. Only JSON objects are tried; each shape
//! needs its own key (`context`, `message` or `errors`). The default order is
//! `Context`, `MessageWithCode`, `Errors`; requests can narrow or reorder it.

use crate::context::ApiContext;
use crate::envelope::ResponseContext;
use crate::exception::{ApiException, RequestEcho};
use crate::result::ApiResult;
use crate::transport::RawResponse;
use crate::{Error, Result};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Known error envelope shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorWrapping {
    /// `{"context": {"errors": [{"message": ..}], "info": [..]}, "request": ..}`
    Context,
    /// `{"code": .., "message": ..}`
    MessageWithCode,
    /// `{"errors": [{"field": .., "message": ..}]}`
    Errors,
}

impl ErrorWrapping {
    /// The order shapes are tried in unless a request says otherwise.
    pub const DEFAULT_ORDER: [ErrorWrapping; 3] = [
        ErrorWrapping::Context,
        ErrorWrapping::MessageWithCode,
        ErrorWrapping::Errors,
    ];

    /// Attempts to read a JSON object body as this shape.
    pub fn try_parse(self, body: &Map<String, Value>) -> Option<ErrorShape> {
        let body = Value::Object(body.clone());
        match self {
            ErrorWrapping::Context => serde_json::from_value(body).ok().map(ErrorShape::Context),
            ErrorWrapping::MessageWithCode => serde_json::from_value(body)
                .ok()
                .map(ErrorShape::MessageWithCode),
            ErrorWrapping::Errors => serde_json::from_value(body).ok().map(ErrorShape::Errors),
        }
    }
}

/// The `Context` shape. `context` must be present and be an object; the
/// default value stands for a blank body.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ContextErrorBody {
    #[serde(default)]
    pub request: Option<Value>,
    #[serde(deserialize_with = "context_object")]
    pub context: Option<ResponseContext>,
}

fn context_object<'de, D>(deserializer: D) -> std::result::Result<Option<ResponseContext>, D::Error>
where
    D: Deserializer<'de>,
{
    let fields = Map::<String, Value>::deserialize(deserializer)?;
    serde_json::from_value(Value::Object(fields))
        .map(Some)
        .map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageWithCodeBody {
    #[serde(default)]
    pub code: Option<Value>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub field: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorsBody {
    pub errors: Vec<FieldError>,
}

/// An error body decoded as one of the known shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorShape {
    Context(ContextErrorBody),
    MessageWithCode(MessageWithCodeBody),
    Errors(ErrorsBody),
}

/// Returns the first shape in `wrappings` that `content` parses as.
///
/// A blank body reads as an empty `Context` envelope when `Context` is listed.
/// Anything other than a JSON object matches nothing.
pub fn parse_error_shape(wrappings: &[ErrorWrapping], content: &str) -> Option<ErrorShape> {
    if content.trim().is_empty() {
        return wrappings
            .contains(&ErrorWrapping::Context)
            .then(|| ErrorShape::Context(ContextErrorBody::default()));
    }

    let body: Map<String, Value> = serde_json::from_str(content).ok()?;
    wrappings
        .iter()
        .find_map(|wrapping| wrapping.try_parse(&body))
}

/// Builds the exception for a failed response.
///
/// Returns the exception together with the response `context` block, if the
/// body had one.
///
/// # Errors
///
/// Returns [`Error::UnrecognizedApiError`] with the raw body when no shape in
/// `wrappings` matches.
pub fn create_api_exception(
    wrappings: &[ErrorWrapping],
    response: &RawResponse,
    context: &ApiContext,
    request: RequestEcho,
    info_as_errors: &[String],
) -> Result<(ApiException, Option<ResponseContext>)> {
    let Some(shape) = parse_error_shape(wrappings, &response.content) else {
        tracing::error!(
            status = response.status.as_u16(),
            raw_response = %response.content,
            "Cannot convert API error"
        );
        return Err(Error::unrecognized(response.status, response.content.clone()));
    };

    let status_text = || {
        response
            .status
            .canonical_reason()
            .unwrap_or("Unknown API error")
            .to_string()
    };

    let decoded = match shape {
        ErrorShape::Context(body) => {
            let messages = body
                .context
                .as_ref()
                .map(ResponseContext::error_messages)
                .filter(|messages| !messages.is_empty())
                .unwrap_or_else(|| vec![status_text()]);
            let flagged = body
                .context
                .as_ref()
                .map(|c| c.info_matching(info_as_errors))
                .unwrap_or_default();

            let exception = ApiException::new(response.status, messages, request, context.clone())
                .with_context_info(flagged)
                .with_request_in_response(body.request);
            (exception, body.context)
        }
        ErrorShape::MessageWithCode(body) => (
            ApiException::new(response.status, vec![body.message], request, context.clone()),
            None,
        ),
        ErrorShape::Errors(body) => {
            let messages = body
                .errors
                .into_iter()
                .map(|error| match error.field {
                    Some(field) if !field.is_empty() => format!("{field}: {}", error.message),
                    _ => error.message,
                })
                .collect();
            (
                ApiException::new(response.status, messages, request, context.clone()),
                None,
            )
        }
    };

    Ok(decoded)
}

/// Builds a failed [`ApiResult`] for `response`.
///
/// # Errors
///
/// See [`create_api_exception`].
pub fn create_failed_result<T>(
    wrappings: &[ErrorWrapping],
    response: RawResponse,
    context: ApiContext,
    request: RequestEcho,
    info_as_errors: &[String],
) -> Result<ApiResult<T>> {
    let (exception, response_context) =
        create_api_exception(wrappings, &response, &context, request, info_as_errors)?;
    let request_in_response = exception.request_in_response().cloned();

    Ok(ApiResult::failure(
        context,
        response,
        response_context,
        request_in_response,
        exception,
    ))
}
