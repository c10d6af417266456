//! Per-request lifecycle.
//!
//! # Data Flow
//! ```text
//! INIT
//!     → begin(): start clock, trace id, req metadata, new Logger
//! IN_FLIGHT
//!     → inner service completes (status) or fails (error / panic)
//! COMPLETED | FAILED
//!     → finish(): automatic record per AutoLogging mode
//! ```
//!
//! # Design Decisions
//! - `InFlight` is consumed by `finish`, so a request is auto-logged at most once
//! - A request whose future is dropped never reaches `finish` and logs nothing

use std::time::Instant;

use axum::http::{Request, StatusCode};

use crate::config::{AutoLogging, LoggerConfig};
use crate::http::request::{request_metadata, trace_id};
use crate::logging::{ErrorInfo, Fields, Level, Logger, LoggerOptions, Placement, Sink};

/// How the inner service ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed { status: StatusCode },
    Failed { error: ErrorInfo },
}

impl Outcome {
    /// Final status; failures report 500.
    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::Completed { status } => *status,
            Outcome::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A request between `begin` and `finish`.
#[derive(Debug)]
pub struct InFlight {
    logger: Logger,
    started: Instant,
    mode: AutoLogging,
}

impl InFlight {
    /// Builds the request's logger from its method, path and headers.
    pub fn begin<B>(req: &Request<B>, config: &LoggerConfig, sink: &Sink) -> Self {
        let started = Instant::now();
        let logger = Logger::new(LoggerOptions {
            level: config.level,
            trace_id: trace_id(req.headers(), &config.trace_header),
            req: Some(request_metadata(req, config)),
            redact_keys: config.redact_keys.clone(),
            sink: sink.clone(),
        });

        Self {
            logger,
            started,
            mode: config.auto_logging,
        }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Emits the automatic record for `outcome`, if the mode asks for one.
    pub fn finish(self, outcome: &Outcome) {
        let duration_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match (self.mode, outcome) {
            (AutoLogging::Silent, _) => {}
            (AutoLogging::Access, _) => {
                let data = Fields::new()
                    .with("status", outcome.status().as_u16())
                    .with("duration_ms", duration_ms);
                self.logger
                    .log(Level::Info, "Request completed", data, None, Placement::Flattened);
            }
            (AutoLogging::Error, Outcome::Failed { error }) => {
                let data = Fields::new().with("duration_ms", duration_ms);
                self.logger.log(
                    Level::Error,
                    "Unhandled error",
                    data,
                    Some(error.clone()),
                    Placement::Flattened,
                );
            }
            (AutoLogging::Error, Outcome::Completed { status }) if status.as_u16() >= 500 => {
                let data = Fields::new()
                    .with("status", status.as_u16())
                    .with("duration_ms", duration_ms);
                self.logger
                    .log(Level::Error, "Request failed", data, None, Placement::Flattened);
            }
            (AutoLogging::Error, Outcome::Completed { .. }) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemoryOutput;
    use axum::body::Body;

    fn begin(mode: AutoLogging, output: &MemoryOutput) -> InFlight {
        let config = LoggerConfig {
            auto_logging: mode,
            ..Default::default()
        };
        let req = Request::builder()
            .uri("/orders")
            .header("x-request-id", "req-7")
            .body(Body::empty())
            .unwrap();
        InFlight::begin(&req, &config, &Sink::new(output.clone()))
    }

    #[test]
    fn test_silent_emits_nothing() {
        let output = MemoryOutput::new();
        begin(AutoLogging::Silent, &output).finish(&Outcome::Failed {
            error: ErrorInfo::new("boom"),
        });
        assert!(output.stdout().is_empty());
        assert!(output.stderr().is_empty());
    }

    #[test]
    fn test_access_record() {
        let output = MemoryOutput::new();
        begin(AutoLogging::Access, &output).finish(&Outcome::Completed {
            status: StatusCode::CREATED,
        });

        let entries = output.stdout();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry["msg"], "Request completed");
        assert_eq!(entry["level"], "info");
        assert_eq!(entry["status"], 201);
        assert!(entry["duration_ms"].is_u64());
        assert_eq!(entry["trace_id"], "req-7");
        assert_eq!(entry["req"]["url"], "/orders");
        assert!(entry.get("trace").is_none());
    }

    #[test]
    fn test_access_reports_failures_as_500() {
        let output = MemoryOutput::new();
        begin(AutoLogging::Access, &output).finish(&Outcome::Failed {
            error: ErrorInfo::new("boom"),
        });
        assert_eq!(output.stdout()[0]["status"], 500);
        assert!(output.stdout()[0].get("err").is_none());
    }

    #[test]
    fn test_error_mode_on_failure() {
        let output = MemoryOutput::new();
        begin(AutoLogging::Error, &output).finish(&Outcome::Failed {
            error: ErrorInfo::new("boom"),
        });

        let entries = output.stderr();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["msg"], "Unhandled error");
        assert_eq!(entries[0]["err"]["message"], "boom");
        assert!(entries[0]["duration_ms"].is_u64());
        assert!(entries[0].get("status").is_none());
    }

    #[test]
    fn test_error_mode_on_server_error_status() {
        let output = MemoryOutput::new();
        begin(AutoLogging::Error, &output).finish(&Outcome::Completed {
            status: StatusCode::SERVICE_UNAVAILABLE,
        });

        let entries = output.stderr();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["msg"], "Request failed");
        assert_eq!(entries[0]["status"], 503);
    }

    #[test]
    fn test_error_mode_ignores_success_and_client_errors() {
        let output = MemoryOutput::new();
        begin(AutoLogging::Error, &output).finish(&Outcome::Completed {
            status: StatusCode::OK,
        });
        begin(AutoLogging::Error, &output).finish(&Outcome::Completed {
            status: StatusCode::NOT_FOUND,
        });
        assert!(output.stdout().is_empty());
        assert!(output.stderr().is_empty());
    }
}
