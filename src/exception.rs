//! API-level failures carried inside [`ApiResult`](crate::ApiResult).

use crate::context::ApiContext;
use crate::envelope::ContextInfo;
use crate::parameters::{ClientParameters, RequestMethod};
use http::StatusCode;
use serde_json::Value;
use std::collections::BTreeMap;

/// What was sent, echoed back on failures for diagnostics.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestEcho {
    pub method: RequestMethod,
    pub endpoint: String,
    pub query: Option<BTreeMap<String, String>>,
    pub url_segments: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl From<&ClientParameters> for RequestEcho {
    fn from(parameters: &ClientParameters) -> Self {
        Self {
            method: parameters.method,
            endpoint: parameters.endpoint.clone(),
            query: parameters.query.clone(),
            url_segments: parameters.url_segments.clone(),
            body: parameters.body.clone(),
        }
    }
}

/// A failed API call, decoded from the service's error envelope.
///
/// When the response carried a `context` block, `context_info` holds the info
/// entries the caller flagged as errors. Their messages are also appended to
/// [`errors`](Self::errors).
#[derive(thiserror::Error, Debug, Clone)]
#[error("{message}")]
pub struct ApiException {
    response_code: StatusCode,
    errors: Vec<String>,
    message: String,
    request: RequestEcho,
    context: ApiContext,
    context_info: Vec<ContextInfo>,
    request_in_response: Option<Value>,
}

impl ApiException {
    pub fn new(
        response_code: StatusCode,
        errors: Vec<String>,
        request: RequestEcho,
        context: ApiContext,
    ) -> Self {
        Self {
            response_code,
            message: compose_message(response_code, &errors),
            errors,
            request,
            context,
            context_info: Vec::new(),
            request_in_response: None,
        }
    }

    /// Adds flagged info entries from the response context.
    pub fn with_context_info(mut self, info: Vec<ContextInfo>) -> Self {
        self.errors.extend(
            info.iter()
                .filter_map(|entry| entry.message.clone().or_else(|| entry.code.clone())),
        );
        self.message = compose_message(self.response_code, &self.errors);
        self.context_info = info;
        self
    }

    /// Attaches the request block the service echoed back, if any.
    pub fn with_request_in_response(mut self, request: Option<Value>) -> Self {
        self.request_in_response = request;
        self
    }

    pub fn response_code(&self) -> StatusCode {
        self.response_code
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn request(&self) -> &RequestEcho {
        &self.request
    }

    pub fn context(&self) -> &ApiContext {
        &self.context
    }

    pub fn context_info(&self) -> &[ContextInfo] {
        &self.context_info
    }

    pub fn request_in_response(&self) -> Option<&Value> {
        self.request_in_response.as_ref()
    }

    /// `true` if this failure came with flagged context info entries.
    pub fn is_context_exception(&self) -> bool {
        !self.context_info.is_empty()
    }
}

impl PartialEq for ApiException {
    fn eq(&self, other: &Self) -> bool {
        self.response_code == other.response_code
            && self.errors == other.errors
            && self.request == other.request
            && self.context_info == other.context_info
            && self.request_in_response == other.request_in_response
    }
}

fn compose_message(response_code: StatusCode, errors: &[String]) -> String {
    if errors.is_empty() {
        response_code
            .canonical_reason()
            .unwrap_or("Unknown API error")
            .to_string()
    } else {
        errors.join("; ")
    }
}
