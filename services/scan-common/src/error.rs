//! Error types shared by the scanner crates.

use thiserror::Error;

/// Result type alias using the common error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for configuration and I/O failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an error with additional context.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config("max_workers must be positive".into());
        assert_eq!(
            err.to_string(),
            "Configuration error: max_workers must be positive"
        );
    }

    #[test]
    fn test_with_context_wraps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::from(io).with_context("reading config");

        assert_eq!(err.to_string(), "reading config: IO error: gone");
        match err {
            Error::WithContext { source, .. } => assert!(matches!(*source, Error::Io(_))),
            other => panic!("expected WithContext, got {:?}", other),
        }
    }
}
