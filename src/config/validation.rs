//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check header names are valid HTTP header names
//! - Reject empty redaction keys and property names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: LoggerConfig → Result<(), Vec<ValidationError>>

use axum::http::HeaderName;

use crate::config::schema::{HeaderPolicy, LoggerConfig};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("trace_header {0:?} is not a valid header name")]
    InvalidTraceHeader(String),

    #[error("header allow-list entry {0:?} is not a valid header name")]
    InvalidHeaderName(String),

    #[error("redact_keys contains an empty key")]
    EmptyRedactKey,

    #[error("include_cf_properties contains an empty property name")]
    EmptyCfProperty,
}

fn is_header_name(name: &str) -> bool {
    HeaderName::from_bytes(name.as_bytes()).is_ok()
}

/// Checks `config`, collecting every violation.
pub fn validate_config(config: &LoggerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_header_name(&config.trace_header) {
        errors.push(ValidationError::InvalidTraceHeader(config.trace_header.clone()));
    }

    if let HeaderPolicy::Allow(names) = &config.header {
        for name in names.iter().filter(|n| !is_header_name(n)) {
            errors.push(ValidationError::InvalidHeaderName(name.clone()));
        }
    }

    if config.redact_keys.iter().any(|k| k.is_empty()) {
        errors.push(ValidationError::EmptyRedactKey);
    }

    if config.include_cf_properties.iter().any(|p| p.is_empty()) {
        errors.push(ValidationError::EmptyCfProperty);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&LoggerConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let config = LoggerConfig {
            trace_header: "bad header".into(),
            header: HeaderPolicy::Allow(vec!["ok-header".into(), "also bad".into()]),
            redact_keys: vec!["password".into(), String::new()],
            include_cf_properties: vec![String::new()],
            ..Default::default()
        };

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidTraceHeader("bad header".into()),
                ValidationError::InvalidHeaderName("also bad".into()),
                ValidationError::EmptyRedactKey,
                ValidationError::EmptyCfProperty,
            ]
        );
    }

    #[test]
    fn test_mixed_case_header_names_are_valid() {
        let config = LoggerConfig {
            trace_header: "X-Trace-Id".into(),
            header: HeaderPolicy::Allow(vec!["Authorization".into()]),
            ..Default::default()
        };
        assert!(validate_config(&config).is_ok());
    }
}
