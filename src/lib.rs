//! Request-scoped structured logging middleware.
//!
//! Every request gets its own [`Logger`] that writes newline-delimited JSON
//! records with severity filtering, per-request context, deep redaction of
//! sensitive keys, and automatic access/error records.
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use request_logger::{AutoLogging, Logger, LoggerConfig, RequestLoggerLayer};
//! use serde_json::json;
//!
//! async fn hello(log: Logger) -> &'static str {
//!     log.set_context(json!({"feature": "greeting"}));
//!     log.info("hello from handler", json!({"lang": "en"}));
//!     "hello"
//! }
//!
//! let config = LoggerConfig {
//!     auto_logging: AutoLogging::Access,
//!     redact_keys: vec!["authorization".into()],
//!     ..Default::default()
//! };
//! let app: Router = Router::new()
//!     .route("/", get(hello))
//!     .layer(RequestLoggerLayer::new(config));
//! ```

pub mod config;
pub mod http;
pub mod logging;

pub use config::{AutoLogging, HeaderPolicy, LoggerConfig};
pub use http::{CfProperties, RequestLoggerLayer};
pub use logging::{ErrorInfo, Fields, Level, LogValue, Logger, LoggerOptions, Placement};
