//! Configuration schema definitions.
//!
//! This module defines the middleware configuration. All types derive Serde
//! traits so a config can come from a TOML file or be built in code.

use serde::{Deserialize, Serialize};

use crate::logging::Level;

/// Header read for the trace identifier unless configured otherwise.
pub const DEFAULT_TRACE_HEADER: &str = "X-Request-Id";

/// Root configuration for the request logger middleware.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Minimum level to emit.
    pub level: Level,

    /// Header carrying the trace identifier. `cf-ray` is used when it is absent.
    pub trace_header: String,

    /// Automatic per-request record.
    pub auto_logging: AutoLogging,

    /// Platform property names copied into `req.cf` when present.
    pub include_cf_properties: Vec<String>,

    /// Keys to redact at any depth, case-insensitively.
    pub redact_keys: Vec<String>,

    /// Which request headers go into `req.headers`.
    pub header: HeaderPolicy,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            trace_header: DEFAULT_TRACE_HEADER.to_string(),
            auto_logging: AutoLogging::Silent,
            include_cf_properties: Vec::new(),
            redact_keys: Vec::new(),
            header: HeaderPolicy::Omit,
        }
    }
}

/// What the middleware logs on its own once a request finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoLogging {
    /// Nothing.
    #[default]
    Silent,
    /// One `info` record per request.
    Access,
    /// One `error` record for failures and 5xx responses.
    Error,
}

/// Request header inclusion.
///
/// Written as `false`, `true`, or a list of header names in config files.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(from = "HeaderPolicyRepr", into = "HeaderPolicyRepr")]
pub enum HeaderPolicy {
    #[default]
    Omit,
    All,
    Allow(Vec<String>),
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum HeaderPolicyRepr {
    Flag(bool),
    List(Vec<String>),
}

impl From<HeaderPolicyRepr> for HeaderPolicy {
    fn from(repr: HeaderPolicyRepr) -> Self {
        match repr {
            HeaderPolicyRepr::Flag(false) => HeaderPolicy::Omit,
            HeaderPolicyRepr::Flag(true) => HeaderPolicy::All,
            HeaderPolicyRepr::List(names) => HeaderPolicy::Allow(names),
        }
    }
}

impl From<HeaderPolicy> for HeaderPolicyRepr {
    fn from(policy: HeaderPolicy) -> Self {
        match policy {
            HeaderPolicy::Omit => HeaderPolicyRepr::Flag(false),
            HeaderPolicy::All => HeaderPolicyRepr::Flag(true),
            HeaderPolicy::Allow(names) => HeaderPolicyRepr::List(names),
        }
    }
}
