//! Response envelope shapes.
//!
//! The services wrap payloads in one of a few JSON layouts. Each layout is a
//! plain serde type implementing [`ResponseEnvelope`], so the executor decodes
//! the exact shape statically and extracts the payload the same way for all of
//! them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An error entry in a response `context` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextError {
    #[serde(default)]
    pub message: Option<String>,
}

/// An informational entry in a response `context` block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContextInfo {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Metadata block accompanying a payload or an error.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponseContext {
    #[serde(default)]
    pub errors: Option<Vec<ContextError>>,
    #[serde(default)]
    pub info: Option<Vec<ContextInfo>>,
}

impl ResponseContext {
    /// Messages of the error entries that have one.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .flatten()
            .filter_map(|error| error.message.clone())
            .collect()
    }

    /// Info entries whose code is one of `codes`.
    pub fn info_matching(&self, codes: &[String]) -> Vec<ContextInfo> {
        if codes.is_empty() {
            return Vec::new();
        }
        self.info
            .iter()
            .flatten()
            .filter(|info| info.code.as_ref().is_some_and(|code| codes.contains(code)))
            .cloned()
            .collect()
    }
}

/// A decoded response body and the payload it carries.
pub trait ResponseEnvelope: DeserializeOwned {
    type Data;

    /// Splits the envelope into payload, context block and request echo.
    fn into_parts(self) -> EnvelopeParts<Self::Data>;
}

/// The pieces every envelope is reduced to.
#[derive(Debug, Clone)]
pub struct EnvelopeParts<T> {
    pub data: T,
    pub context: Option<ResponseContext>,
    pub request: Option<Value>,
}

/// A body that is the payload itself.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Unwrapped<T>(pub T);

impl<T: DeserializeOwned> ResponseEnvelope for Unwrapped<T> {
    type Data = T;

    fn into_parts(self) -> EnvelopeParts<T> {
        EnvelopeParts {
            data: self.0,
            context: None,
            request: None,
        }
    }
}

/// `{ "request": ..., "response": T, "context": ... }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StandardWrapped<T> {
    #[serde(default)]
    pub request: Option<Value>,
    pub response: T,
    #[serde(default)]
    pub context: Option<ResponseContext>,
}

impl<T: DeserializeOwned> ResponseEnvelope for StandardWrapped<T> {
    type Data = T;

    fn into_parts(self) -> EnvelopeParts<T> {
        EnvelopeParts {
            data: self.response,
            context: self.context,
            request: self.request,
        }
    }
}

/// Inner block of [`ResultsBlockWrapped`]: list endpoints name the payload
/// `results`, single-item endpoints name it `result`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultsBlock<T> {
    #[serde(default = "none")]
    pub results: Option<T>,
    #[serde(default = "none")]
    pub result: Option<T>,
}

fn none<T>() -> Option<T> {
    None
}

/// `{ "request": ..., "response": { "results" | "result": T }, "context": ... }`
///
/// The payload is `results` if present, otherwise `result`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultsBlockWrapped<T> {
    #[serde(default)]
    pub request: Option<Value>,
    pub response: ResultsBlock<T>,
    #[serde(default)]
    pub context: Option<ResponseContext>,
}

impl<T: DeserializeOwned> ResponseEnvelope for ResultsBlockWrapped<T> {
    type Data = Option<T>;

    fn into_parts(self) -> EnvelopeParts<Option<T>> {
        EnvelopeParts {
            data: self.response.results.or(self.response.result),
            context: self.context,
            request: self.request,
        }
    }
}
