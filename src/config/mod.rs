//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → LoggerConfig (validated, immutable)
//!     → shared via Arc with every request the middleware sees
//! ```
//!
//! # Design Decisions
//! - Config is immutable once handed to the middleware
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{AutoLogging, HeaderPolicy, LoggerConfig, DEFAULT_TRACE_HEADER};
pub use validation::{validate_config, ValidationError};
