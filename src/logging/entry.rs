//! Log record assembly.
//!
//! # Responsibilities
//! - Lay out the reserved keys (`level`, `msg`, `trace`, `time`) first
//! - Merge base data, context and flattened call data behind a guard that
//!   never lets them overwrite a reserved key
//! - Reduce errors to `{ message, stack }`
//!
//! # Design Decisions
//! - Records are ordered maps; key order is part of the emitted line
//! - Merging an existing non-reserved key replaces its value in place

use std::any::Any;
use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::logging::level::Level;
use crate::logging::value::{Fields, LogMap, LogValue};

/// Keys owned by the record itself.
pub const RESERVED_KEYS: [&str; 4] = ["level", "msg", "time", "trace"];

pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Where call data goes in the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Under the `trace` key.
    #[default]
    Nested,
    /// As top-level keys, after the context.
    Flattened,
}

/// Request description attached to every record as `req`.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestMetadata {
    pub method: String,
    /// Request path, without query string.
    pub url: String,
    pub headers: Option<IndexMap<String, String>>,
    /// Selected platform properties.
    pub cf: Option<serde_json::Map<String, serde_json::Value>>,
}

impl RequestMetadata {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: None,
            cf: None,
        }
    }

    pub fn to_value(&self) -> LogValue {
        let mut map = LogMap::new();
        map.insert("method".into(), self.method.as_str().into());
        map.insert("url".into(), self.url.as_str().into());
        if let Some(headers) = &self.headers {
            let headers = headers
                .iter()
                .map(|(k, v)| (k.clone(), LogValue::from(v.as_str())))
                .collect();
            map.insert("headers".into(), LogValue::object(headers));
        }
        if let Some(cf) = &self.cf {
            map.insert("cf".into(), serde_json::Value::Object(cf.clone()).into());
        }
        LogValue::object(map)
    }
}

/// The part of an error that reaches the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub message: String,
    pub stack: Option<String>,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Message from `Display`; the `source()` chain, if any, becomes the stack.
    pub fn from_error(err: &(dyn std::error::Error + '_)) -> Self {
        let message = err.to_string();
        let mut cause = err.source();
        if cause.is_none() {
            return Self::new(message);
        }

        let mut stack = message.clone();
        while let Some(inner) = cause {
            let _ = write!(stack, "\n    caused by: {inner}");
            cause = inner.source();
        }
        Self::new(message).with_stack(stack)
    }

    /// Reads the message out of a panic payload.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        if let Some(message) = payload.downcast_ref::<&str>() {
            Self::new(*message)
        } else if let Some(message) = payload.downcast_ref::<String>() {
            Self::new(message.clone())
        } else {
            Self::new("panic")
        }
    }

    fn to_value(&self) -> LogValue {
        let mut map = LogMap::new();
        map.insert("message".into(), self.message.as_str().into());
        if let Some(stack) = &self.stack {
            map.insert("stack".into(), stack.as_str().into());
        }
        LogValue::object(map)
    }
}

/// ISO-8601 UTC timestamp with millisecond precision.
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Builds one record in the fixed key order.
#[derive(Debug)]
pub struct EntryBuilder {
    map: LogMap,
}

impl EntryBuilder {
    pub fn new(level: Level, msg: &str) -> Self {
        let mut map = LogMap::new();
        map.insert("level".into(), level.as_str().into());
        map.insert("msg".into(), msg.into());
        Self { map }
    }

    pub fn nested(mut self, data: &Fields) -> Self {
        self.map
            .insert("trace".into(), LogValue::Object(data.node().clone()));
        self
    }

    pub fn time(mut self, now: DateTime<Utc>) -> Self {
        self.map.insert("time".into(), timestamp(now).into());
        self
    }

    /// Copies every non-reserved key of `source` into the record.
    pub fn merge<'a, I>(mut self, source: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a LogValue)>,
    {
        for (key, value) in source {
            if is_reserved(key) {
                continue;
            }
            self.map.insert(key.clone(), value.clone());
        }
        self
    }

    pub fn error(mut self, err: &ErrorInfo) -> Self {
        self.map.insert("err".into(), err.to_value());
        self
    }

    pub fn build(self) -> LogValue {
        LogValue::object(self.map)
    }
}
