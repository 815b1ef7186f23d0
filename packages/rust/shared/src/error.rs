//! Error types for lessonpath.
//!
//! Library crates use [`LessonpathError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all lessonpath operations.
#[derive(Debug, thiserror::Error)]
pub enum LessonpathError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Input document could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Completion service setup error (HTTP client construction, headers).
    #[error("completion error: {0}")]
    Completion(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (invalid record, bad snapshot, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LessonpathError>;

impl LessonpathError {
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

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
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
        let err = LessonpathError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = LessonpathError::validation("video at index 3 has no video_id");
        assert!(err.to_string().contains("index 3"));
    }

    #[test]
    fn io_error_includes_path() {
        let err = LessonpathError::io(
            "/tmp/videos.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("videos.json"));
        assert!(msg.contains("gone"));
    }
}
