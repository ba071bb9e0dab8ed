//! Error types for biograph.
//!
//! Library crates use [`BiographError`] via `thiserror`.
//! App crates (cli) wrap this with `color-eyre` for rich diagnostics.
//!
//! Upstream conditions the pipeline recovers from — a title missing from the
//! corpus, a throttled or failed knowledge-base call — are *not* errors here;
//! they are values (`FetchOutcome`, `Option<Person>`) and degrade the affected
//! signal only. This enum covers conditions that abort an operation.

use std::path::PathBuf;

/// Top-level error type for all biograph operations.
#[derive(Debug, thiserror::Error)]
pub enum BiographError {
    /// Corpus index/data files missing, truncated, or inconsistent;
    /// configuration loading or validation error. Fatal to the run.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level HTTP error (connection, timeout, malformed body).
    #[error("network error: {0}")]
    Network(String),

    /// Record or input parsing error (bad JSON line, bad groups file).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The upstream service answered, but with a failure the caller cannot
    /// recover from at this level (e.g. an edit the wiki rejected).
    #[error("service error: {0}")]
    Service(String),

    /// Publisher login/session failure. Fatal to the publish phase only.
    #[error("auth error: {0}")]
    Auth(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BiographError>;

impl BiographError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = BiographError::config("offset index missing");
        assert_eq!(err.to_string(), "config error: offset index missing");

        let err = BiographError::Auth("login rejected: WrongPass".into());
        assert!(err.to_string().contains("WrongPass"));
    }
}
