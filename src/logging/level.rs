//! Severity levels.
//!
//! # Design Decisions
//! - Eight syslog-style levels with fixed priorities 0..=7
//! - `error` and above form the error tier (routed to stderr)
//! - Parsed case-insensitively, serialized lower-case

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A log severity, ordered from `Debug` (lowest) to `Emergency` (highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    #[default]
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl Level {
    /// Every level, lowest priority first.
    pub const ALL: [Level; 8] = [
        Level::Debug,
        Level::Info,
        Level::Notice,
        Level::Warning,
        Level::Error,
        Level::Critical,
        Level::Alert,
        Level::Emergency,
    ];

    /// Numeric priority, 0 for `Debug` up to 7 for `Emergency`.
    pub const fn priority(self) -> u8 {
        match self {
            Level::Debug => 0,
            Level::Info => 1,
            Level::Notice => 2,
            Level::Warning => 3,
            Level::Error => 4,
            Level::Critical => 5,
            Level::Alert => 6,
            Level::Emergency => 7,
        }
    }

    /// Returns true if this level passes a `threshold` filter.
    pub const fn is_at_or_above(self, threshold: Level) -> bool {
        self.priority() >= threshold.priority()
    }

    /// Returns true for `error` and every level above it.
    pub const fn is_error_tier(self) -> bool {
        self.is_at_or_above(Level::Error)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Notice => "notice",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Critical => "critical",
            Level::Alert => "alert",
            Level::Emergency => "emergency",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level: {0:?}")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseLevelError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priorities_follow_declaration_order() {
        for (index, level) in Level::ALL.iter().enumerate() {
            assert_eq!(level.priority() as usize, index);
        }
    }

    #[test]
    fn test_threshold_filter() {
        for level in Level::ALL {
            for threshold in Level::ALL {
                assert_eq!(
                    level.is_at_or_above(threshold),
                    level.priority() >= threshold.priority(),
                    "{level} vs {threshold}"
                );
            }
        }
        assert!(!Level::Info.is_at_or_above(Level::Warning));
        assert!(Level::Warning.is_at_or_above(Level::Warning));
    }

    #[test]
    fn test_error_tier() {
        let tier: Vec<_> = Level::ALL.into_iter().filter(|l| l.is_error_tier()).collect();
        assert_eq!(
            tier,
            vec![Level::Error, Level::Critical, Level::Alert, Level::Emergency]
        );
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("WARNING".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!(Level::Critical.to_string(), "critical");
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Level::Notice).unwrap(), "\"notice\"");
        let level: Level = serde_json::from_str("\"alert\"").unwrap();
        assert_eq!(level, Level::Alert);
    }
}
