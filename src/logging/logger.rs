//! The request-scoped logger.
//!
//! # Data Flow
//! ```text
//! logger.info(msg, data) / logger.info_with(msg, data, placement)
//!     → level filter (no work below the minimum)
//!     → EntryBuilder: level, msg, [trace], time, base data, context, [flat data], [err]
//!     → redact
//!     → Sink (stdout / stderr)
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;

use crate::logging::entry::{EntryBuilder, ErrorInfo, Placement, RequestMetadata};
use crate::logging::level::Level;
use crate::logging::redact::{redact, RedactionKeys};
use crate::logging::sink::Sink;
use crate::logging::value::{IntoFields, LogMap, LogValue};

/// Construction options for a `Logger`.
#[derive(Debug, Clone, Default)]
pub struct LoggerOptions {
    /// Minimum level to emit.
    pub level: Level,
    pub trace_id: Option<String>,
    pub req: Option<RequestMetadata>,
    /// Keys to redact, compared case-insensitively.
    pub redact_keys: Vec<String>,
    pub sink: Sink,
}

/// Structured logger owned by one request.
///
/// Cloning is cheap and every clone shares the same context.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

struct Inner {
    min_level: Level,
    base: LogMap,
    context: Mutex<LogMap>,
    redact_keys: RedactionKeys,
    sink: Sink,
}

impl Logger {
    pub fn new(options: LoggerOptions) -> Self {
        let mut base = LogMap::new();
        if let Some(trace_id) = options.trace_id.filter(|id| !id.is_empty()) {
            base.insert("trace_id".into(), trace_id.into());
        }
        if let Some(req) = &options.req {
            base.insert("req".into(), req.to_value());
        }

        Self {
            inner: Arc::new(Inner {
                min_level: options.level,
                base,
                context: Mutex::new(LogMap::new()),
                redact_keys: RedactionKeys::new(&options.redact_keys),
                sink: options.sink,
            }),
        }
    }

    /// The minimum level this logger emits.
    pub fn level(&self) -> Level {
        self.inner.min_level
    }

    pub fn enabled(&self, level: Level) -> bool {
        level.is_at_or_above(self.inner.min_level)
    }

    pub fn trace_id(&self) -> Option<&str> {
        match self.inner.base.get("trace_id") {
            Some(LogValue::String(id)) => Some(id),
            _ => None,
        }
    }

    /// Merges `fields` into the context; later values win per key.
    pub fn set_context(&self, fields: impl IntoFields) {
        let Some(fields) = fields.into_fields() else {
            return;
        };
        let source = fields.node().read();
        let mut context = self.context();
        for (key, value) in source.iter() {
            context.insert(key.clone(), value.clone());
        }
    }

    /// A copy of the current context.
    pub fn context_snapshot(&self) -> LogMap {
        self.context().clone()
    }

    pub fn debug(&self, msg: &str, data: impl IntoFields) {
        self.debug_with(msg, data, Placement::Nested);
    }

    pub fn debug_with(&self, msg: &str, data: impl IntoFields, placement: Placement) {
        self.log(Level::Debug, msg, data, None, placement);
    }

    pub fn info(&self, msg: &str, data: impl IntoFields) {
        self.info_with(msg, data, Placement::Nested);
    }

    pub fn info_with(&self, msg: &str, data: impl IntoFields, placement: Placement) {
        self.log(Level::Info, msg, data, None, placement);
    }

    pub fn notice(&self, msg: &str, data: impl IntoFields) {
        self.notice_with(msg, data, Placement::Nested);
    }

    pub fn notice_with(&self, msg: &str, data: impl IntoFields, placement: Placement) {
        self.log(Level::Notice, msg, data, None, placement);
    }

    pub fn warning(&self, msg: &str, data: impl IntoFields) {
        self.warning_with(msg, data, Placement::Nested);
    }

    pub fn warning_with(&self, msg: &str, data: impl IntoFields, placement: Placement) {
        self.log(Level::Warning, msg, data, None, placement);
    }

    pub fn error(&self, msg: &str, err: Option<&dyn std::error::Error>, data: impl IntoFields) {
        self.error_with(msg, err, data, Placement::Nested);
    }

    pub fn error_with(
        &self,
        msg: &str,
        err: Option<&dyn std::error::Error>,
        data: impl IntoFields,
        placement: Placement,
    ) {
        self.log(Level::Error, msg, data, err.map(ErrorInfo::from_error), placement);
    }

    pub fn critical(&self, msg: &str, err: Option<&dyn std::error::Error>, data: impl IntoFields) {
        self.critical_with(msg, err, data, Placement::Nested);
    }

    pub fn critical_with(
        &self,
        msg: &str,
        err: Option<&dyn std::error::Error>,
        data: impl IntoFields,
        placement: Placement,
    ) {
        self.log(Level::Critical, msg, data, err.map(ErrorInfo::from_error), placement);
    }

    pub fn alert(&self, msg: &str, err: Option<&dyn std::error::Error>, data: impl IntoFields) {
        self.alert_with(msg, err, data, Placement::Nested);
    }

    pub fn alert_with(
        &self,
        msg: &str,
        err: Option<&dyn std::error::Error>,
        data: impl IntoFields,
        placement: Placement,
    ) {
        self.log(Level::Alert, msg, data, err.map(ErrorInfo::from_error), placement);
    }

    pub fn emergency(&self, msg: &str, err: Option<&dyn std::error::Error>, data: impl IntoFields) {
        self.emergency_with(msg, err, data, Placement::Nested);
    }

    pub fn emergency_with(
        &self,
        msg: &str,
        err: Option<&dyn std::error::Error>,
        data: impl IntoFields,
        placement: Placement,
    ) {
        self.log(Level::Emergency, msg, data, err.map(ErrorInfo::from_error), placement);
    }

    /// Emits one record at `level` with full control over placement.
    pub fn log(
        &self,
        level: Level,
        msg: &str,
        data: impl IntoFields,
        err: Option<ErrorInfo>,
        placement: Placement,
    ) {
        if !self.enabled(level) {
            return;
        }

        let data = data.into_fields();
        let mut entry = EntryBuilder::new(level, msg);
        if let (Some(data), Placement::Nested) = (&data, placement) {
            entry = entry.nested(data);
        }
        entry = entry.time(Utc::now()).merge(&self.inner.base);

        {
            let context = self.context();
            entry = entry.merge(context.iter());
        }

        if let (Some(data), Placement::Flattened) = (&data, placement) {
            entry = entry.merge(data.node().read().iter());
        }
        if let Some(err) = &err {
            entry = entry.error(err);
        }

        // Dropping the redacted record releases any clone redaction made.
        let entry = redact(&entry.build(), &self.inner.redact_keys);
        self.inner.sink.write(&entry);
    }

    fn context(&self) -> std::sync::MutexGuard<'_, LogMap> {
        self.inner
            .context
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.inner.min_level)
            .field("trace_id", &self.trace_id())
            .finish_non_exhaustive()
    }
}
