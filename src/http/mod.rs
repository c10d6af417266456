//! HTTP integration subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → middleware.rs (RequestLoggerLayer / RequestLoggerService)
//!     → request.rs (trace id, req metadata, headers, cf properties)
//!     → lifecycle.rs (InFlight: Logger in request extensions)
//!     → handler (extract.rs: `Logger` extractor)
//!     → lifecycle.rs (automatic record on completion or failure)
//! ```

pub mod extract;
pub mod lifecycle;
pub mod middleware;
pub mod request;

pub use extract::MissingLogger;
pub use lifecycle::{InFlight, Outcome};
pub use middleware::{RequestLoggerLayer, RequestLoggerService};
pub use request::{CfProperties, FALLBACK_TRACE_HEADER};
