//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::LoggerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<LoggerConfig, ConfigError> {
    let config: LoggerConfig = toml::from_str(content)?;
    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            tracing::warn!(%error, "Invalid logger configuration");
        }
        return Err(ConfigError::Validation(errors));
    }
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<LoggerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;

    tracing::info!(
        path = %path.display(),
        level = %config.level,
        auto_logging = ?config.auto_logging,
        "Configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{AutoLogging, HeaderPolicy};
    use crate::logging::Level;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
            level = "debug"
            trace_header = "x-trace-id"
            auto_logging = "error"
            include_cf_properties = ["colo", "country"]
            redact_keys = ["authorization", "password"]
            header = ["x-request-id"]
            "#,
        )
        .unwrap();

        assert_eq!(config.level, Level::Debug);
        assert_eq!(config.trace_header, "x-trace-id");
        assert_eq!(config.auto_logging, AutoLogging::Error);
        assert_eq!(config.include_cf_properties, ["colo", "country"]);
        assert_eq!(config.header, HeaderPolicy::Allow(vec!["x-request-id".into()]));
    }

    #[test]
    fn test_unknown_level_is_parse_error() {
        let err = parse_config(r#"level = "verbose""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_errors_are_reported_together() {
        let err = parse_config(
            r#"
            trace_header = "not valid"
            redact_keys = [""]
            "#,
        )
        .unwrap_err();

        match &err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {other}"),
        }
        assert!(err.to_string().starts_with("Validation failed: "));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("request-logger-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "auto_logging = \"access\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.auto_logging, AutoLogging::Access);

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/request-logger.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
