//! Shared error types for importscope
//!
//! Only input failures and configuration problems escape to callers. Strategy
//! and cache failures are absorbed where they happen and reported through the
//! analysis result instead.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for importscope operations
#[derive(Debug, Error)]
pub enum Error {
    /// The script could not be located or read
    #[error("Input error for {path}: {message}")]
    Input {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Source could not be parsed into a syntax tree
    #[error("Parse error in {file}:{line}:{column}: {message}")]
    Parse {
        file: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Cache operation errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// Interpreter could not be resolved or queried
    #[error("Interpreter error: {0}")]
    Interpreter(String),

    /// Worker pool construction failed
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML config errors
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// Glob pattern errors
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}

impl Error {
    /// Create an input error for a script path
    pub fn input(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Input {
            path: path.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create an input error wrapping the underlying IO failure
    pub fn input_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Input {
            path: path.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a parse error with location
    pub fn parse(
        file: impl Into<PathBuf>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::Parse {
            file: file.into(),
            line,
            column,
            message: message.into(),
        }
    }

    /// Whether the caller could fix this by changing inputs or settings
    pub fn is_user_fixable(&self) -> bool {
        matches!(
            self,
            Self::Input { .. } | Self::Parse { .. } | Self::Configuration(_) | Self::Toml(_)
        )
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_includes_location() {
        let err = Error::parse("app.py", 3, 7, "unexpected indent");
        assert_eq!(
            err.to_string(),
            "Parse error in app.py:3:7: unexpected indent"
        );
    }

    #[test]
    fn test_input_io_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::input_io("missing.py", io);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.is_user_fixable());
    }

    #[test]
    fn test_cache_errors_are_not_user_fixable() {
        assert!(!Error::Cache("disk full".into()).is_user_fixable());
    }
}
