//! Body codec used for requests and responses.
//!
//! The executor only talks to a [`Serializer`]; [`JsonSerializer`] is the
//! default and matches what the services expect: camelCase property names and
//! dates expressed in UTC, optionally in a call-specific format.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt::{self, Write};

/// Capability for turning bodies into text and back.
///
/// Works on [`serde_json::Value`] so implementations stay object safe; use
/// [`deserialize_as`] for typed output.
pub trait Serializer: Send + Sync + fmt::Debug {
    fn serialize(&self, value: &Value) -> Result<String, serde_json::Error>;

    fn deserialize(&self, content: &str) -> Result<Value, serde_json::Error>;
}

/// Deserializes `content` into `T` through `serializer`.
pub fn deserialize_as<T: DeserializeOwned>(
    serializer: &dyn Serializer,
    content: &str,
) -> Result<T, serde_json::Error> {
    serde_json::from_value(serializer.deserialize(content)?)
}

/// JSON codec with camelCase keys and UTC dates.
///
/// On the way out, object keys are camel-cased and every RFC 3339 timestamp is
/// converted to UTC, then rendered with `date_format` if one is set. On the
/// way in, timestamps are normalised to UTC RFC 3339 so `chrono` types
/// deserialize directly; strings matching `date_format` are converted as well.
///
/// ```
/// use encore_sdk::serializer::{JsonSerializer, Serializer};
/// use serde_json::json;
///
/// let codec = JsonSerializer::default();
/// let body = codec
///     .serialize(&json!({"performance_date": "2024-05-01T19:30:00+01:00"}))
///     .unwrap();
/// assert_eq!(body, r#"{"performanceDate":"2024-05-01T18:30:00Z"}"#);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonSerializer {
    date_format: Option<String>,
}

impl JsonSerializer {
    pub fn new(date_format: Option<String>) -> Self {
        Self { date_format }
    }

    pub fn date_format(&self) -> Option<&str> {
        self.date_format.as_deref()
    }

    fn outgoing(&self, value: &Value) -> Value {
        match value {
            Value::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, value)| (camel_case(key), self.outgoing(value)))
                    .collect::<Map<_, _>>(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.outgoing(v)).collect()),
            Value::String(s) => match DateTime::parse_from_rfc3339(s) {
                Ok(date) => Value::String(self.format_date(date.with_timezone(&Utc))),
                Err(_) => value.clone(),
            },
            other => other.clone(),
        }
    }

    fn incoming(&self, value: Value) -> Value {
        match value {
            Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, self.incoming(value)))
                    .collect(),
            ),
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|v| self.incoming(v)).collect())
            }
            Value::String(s) => Value::String(self.parse_date(&s).unwrap_or(s)),
            other => other,
        }
    }

    fn format_date(&self, date: DateTime<Utc>) -> String {
        if let Some(format) = &self.date_format {
            let mut formatted = String::new();
            // An invalid format string fails here instead of panicking.
            if write!(formatted, "{}", date.format(format)).is_ok() {
                return formatted;
            }
        }
        date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    fn parse_date(&self, s: &str) -> Option<String> {
        if let Ok(date) = DateTime::parse_from_rfc3339(s) {
            return Some(rfc3339_utc(date.with_timezone(&Utc)));
        }

        let format = self.date_format.as_deref()?;
        if let Ok(date) = DateTime::parse_from_str(s, format) {
            return Some(rfc3339_utc(date.with_timezone(&Utc)));
        }
        if let Ok(date) = NaiveDateTime::parse_from_str(s, format) {
            return Some(rfc3339_utc(date.and_utc()));
        }
        NaiveDate::parse_from_str(s, format)
            .ok()
            .map(|date| date.format("%Y-%m-%d").to_string())
    }
}

impl Serializer for JsonSerializer {
    fn serialize(&self, value: &Value) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.outgoing(value))
    }

    fn deserialize(&self, content: &str) -> Result<Value, serde_json::Error> {
        let value: Value = serde_json::from_str(content)?;
        Ok(self.incoming(value))
    }
}

fn rfc3339_utc(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// `snake_case` and `PascalCase` to `camelCase`; camelCase passes through.
fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;

    for c in key.chars() {
        if c == '_' && !out.is_empty() {
            upper_next = true;
        } else if out.is_empty() {
            out.extend(c.to_lowercase());
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }

    out
}
