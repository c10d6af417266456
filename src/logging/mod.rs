//! Structured logging subsystem.
//!
//! # Data Flow
//! ```text
//! Logger call
//!     → level.rs (filter against the minimum)
//!     → entry.rs (assemble record, guarded merges)
//!     → redact.rs (mask sensitive keys, cycle-safe)
//!     → sink.rs (one NDJSON line → stdout or stderr)
//! ```
//!
//! # Design Decisions
//! - One logger per request; nothing is shared across requests except the
//!   output streams
//! - Payloads are `LogValue` trees; anything unserializable is caught at the
//!   sink, which writes a fixed fallback line instead

pub mod entry;
pub mod level;
pub mod logger;
pub mod redact;
pub mod sink;
pub mod value;

pub use entry::{ErrorInfo, Placement, RequestMetadata};
pub use level::{Level, ParseLevelError};
pub use logger::{Logger, LoggerOptions};
pub use redact::{redact, Redacted, RedactionKeys, REDACTED};
pub use sink::{Channel, MemoryOutput, Output, Sink, StdOutput, FALLBACK_LINE};
pub use value::{Fields, IntoFields, LogMap, LogValue, Shared};
