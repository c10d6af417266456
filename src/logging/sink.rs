//! NDJSON output.
//!
//! # Responsibilities
//! - Serialize a finished record to one newline-terminated JSON line
//! - Route records whose `level` is error-tier to stderr, everything else to
//!   stdout
//! - Replace unserializable records with a fixed fallback line
//!
//! # Design Decisions
//! - `Output` is the seam to the process streams; `MemoryOutput` captures
//!   lines for tests and embedding
//! - Writing never fails from the caller's point of view

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use crate::logging::level::Level;
use crate::logging::value::LogValue;

/// Emitted on stderr when a record cannot be serialized.
pub const FALLBACK_LINE: &str = "{\"level\":\"error\",\"msg\":\"Logger failed to serialize object\"}\n";

/// Output stream a line is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Stdout,
    Stderr,
}

impl Channel {
    pub fn for_level(level: Level) -> Self {
        if level.is_error_tier() {
            Channel::Stderr
        } else {
            Channel::Stdout
        }
    }

    /// Channel for a finished record, read from its own `level` key.
    ///
    /// A missing or unrecognised level goes to stdout.
    pub fn for_entry(entry: &LogValue) -> Self {
        let level = match entry {
            LogValue::Object(node) => match node.read().get("level") {
                Some(LogValue::String(name)) => name.parse::<Level>().ok(),
                _ => None,
            },
            _ => None,
        };
        level.map_or(Channel::Stdout, Channel::for_level)
    }
}

/// Receives finished lines, newline included.
pub trait Output: Send + Sync + 'static {
    fn emit(&self, channel: Channel, line: &str);
}

/// Writes to the process stdout/stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdOutput;

impl Output for StdOutput {
    fn emit(&self, channel: Channel, line: &str) {
        let result = match channel {
            Channel::Stdout => io::stdout().lock().write_all(line.as_bytes()),
            Channel::Stderr => io::stderr().lock().write_all(line.as_bytes()),
        };
        if let Err(error) = result {
            tracing::debug!(%error, ?channel, "Failed to write log line");
        }
    }
}

/// Keeps every line in memory, in write order.
#[derive(Debug, Clone, Default)]
pub struct MemoryOutput {
    lines: Arc<Mutex<Vec<(Channel, String)>>>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw lines written to `channel`.
    pub fn lines(&self, channel: Channel) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, line)| line.clone())
            .collect()
    }

    /// Lines written to `channel`, parsed back to JSON. Unparseable lines are skipped.
    pub fn entries(&self, channel: Channel) -> Vec<serde_json::Value> {
        self.lines(channel)
            .iter()
            .filter_map(|line| serde_json::from_str(line.trim_end()).ok())
            .collect()
    }

    pub fn stdout(&self) -> Vec<serde_json::Value> {
        self.entries(Channel::Stdout)
    }

    pub fn stderr(&self) -> Vec<serde_json::Value> {
        self.entries(Channel::Stderr)
    }

    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Output for MemoryOutput {
    fn emit(&self, channel: Channel, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((channel, line.to_string()));
    }
}

/// Serializes records and hands the lines to an `Output`.
#[derive(Clone)]
pub struct Sink {
    output: Arc<dyn Output>,
}

impl Sink {
    pub fn new(output: impl Output) -> Self {
        Self {
            output: Arc::new(output),
        }
    }

    /// A sink writing to the process stdout/stderr.
    pub fn stdio() -> Self {
        Self::new(StdOutput)
    }

    /// Writes `entry` as one line on the channel for its `level`.
    pub fn write(&self, entry: &LogValue) {
        match serde_json::to_string(entry) {
            Ok(mut line) => {
                line.push('\n');
                self.output.emit(Channel::for_entry(entry), &line);
            }
            Err(error) => {
                tracing::warn!(%error, "Log entry could not be serialized");
                self.output.emit(Channel::Stderr, FALLBACK_LINE);
            }
        }
    }
}

impl Default for Sink {
    fn default() -> Self {
        Self::stdio()
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::value::{LogMap, Shared};
    use serde_json::json;

    #[test]
    fn test_routes_by_tier() {
        let output = MemoryOutput::new();
        let sink = Sink::new(output.clone());

        for level in Level::ALL {
            sink.write(&LogValue::from(json!({"level": level.as_str()})));
        }

        let out: Vec<_> = output.stdout().iter().map(|e| e["level"].clone()).collect();
        let err: Vec<_> = output.stderr().iter().map(|e| e["level"].clone()).collect();
        assert_eq!(out, [json!("debug"), json!("info"), json!("notice"), json!("warning")]);
        assert_eq!(
            err,
            [json!("error"), json!("critical"), json!("alert"), json!("emergency")]
        );
    }

    #[test]
    fn test_line_is_newline_terminated() {
        let output = MemoryOutput::new();
        Sink::new(output.clone()).write(&LogValue::from(json!({"a": 1})));
        assert_eq!(output.lines(Channel::Stdout), ["{\"a\":1}\n"]);
    }

    #[test]
    fn test_cycle_emits_fallback_only() {
        let output = MemoryOutput::new();
        let node = Shared::new(LogMap::new());
        node.write().insert("self".into(), LogValue::Object(node.clone()));

        Sink::new(output.clone()).write(&LogValue::Object(node.clone()));

        assert!(output.lines(Channel::Stdout).is_empty());
        assert_eq!(output.lines(Channel::Stderr), [FALLBACK_LINE]);
        node.write().clear();
    }

    #[test]
    fn test_unrecognised_level_goes_to_stdout() {
        let output = MemoryOutput::new();
        let sink = Sink::new(output.clone());
        sink.write(&LogValue::from(json!({"level": "[REDACTED]", "msg": "m"})));
        sink.write(&LogValue::from(json!({"msg": "no level"})));
        assert_eq!(output.stdout().len(), 2);
        assert!(output.stderr().is_empty());
    }
}
