//! Error types shared by every ci-check crate.

use thiserror::Error;

/// Errors raised while searching, fetching, or fixing configuration files.
///
/// Pipeline-level variants (`SearchFailed`, `FetchFailed`) are delivered to
/// every current subscriber of the diagnostic stream. Request-level variants
/// propagate to the caller of the code action or status request.
#[derive(Error, Debug)]
pub enum CheckError {
    /// The text search gateway returned an error.
    #[error("search for files matching '{file_pattern}' failed: {message}")]
    SearchFailed {
        file_pattern: String,
        message: String,
    },

    /// A single document could not be fetched. Aborts the whole batch.
    #[error("failed to fetch document {uri}: {message}")]
    FetchFailed { uri: String, message: String },

    /// A fix was requested for a diagnostic produced by another detector.
    #[error("diagnostic code {found:?} is not handled by detector '{expected}'")]
    CodeMismatch {
        expected: String,
        found: Option<String>,
    },

    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("invalid URI: {0}")]
    InvalidUri(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CheckError {
    pub fn search_failed(file_pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SearchFailed {
            file_pattern: file_pattern.into(),
            message: message.into(),
        }
    }

    pub fn fetch_failed(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FetchFailed {
            uri: uri.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CheckError>;
