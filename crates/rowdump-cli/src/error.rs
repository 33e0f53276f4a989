//! Error types for rowdump CLI
//!
//! Errors are user-facing: each message says what went wrong and what to try
//! next.

use rowdump_export::ExportError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// The source could not be reached or answered with an error status
    #[error("Network request failed: {0}. Check the source URL and that the server is running.")]
    Http(#[from] reqwest::Error),

    /// A page failed under `--on-page-failure abort`
    #[error("Page {index} could not be fetched: {message}. Use --on-page-failure retry or skip to get past failing pages.")]
    PageFailed { index: usize, message: String },

    /// No `--total` and no `X-Total-Count` header
    #[error("The server does not report how many records it has (no X-Total-Count header). Pass --total explicitly.")]
    UnknownTotal,

    /// Ctrl-C during an export
    #[error("Export cancelled after {completed} of {total} pages. Nothing was written.")]
    Cancelled { completed: usize, total: usize },

    /// The export file could not be written
    #[error("Could not write '{name}': {message}. Check the output directory permissions and disk space.")]
    Delivery { name: String, message: String },

    /// A flag value the pipeline cannot work with
    #[error("Invalid argument: {0}. Run with --help to see accepted values.")]
    InvalidArgument(String),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your environment variables or .env file.")]
    Config(String),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Export(ExportError),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

impl From<ExportError> for CliError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Http(e) => Self::Http(e),
            ExportError::PageFetch { index, message } => Self::PageFailed { index, message },
            ExportError::UnknownTotal => Self::UnknownTotal,
            ExportError::Cancelled { completed, total } => Self::Cancelled { completed, total },
            ExportError::Delivery { name, message } => Self::Delivery { name, message },
            ExportError::InvalidArgument(msg) => Self::InvalidArgument(msg),
            ExportError::Io(e) => Self::Io(e),
            other => Self::Export(other),
        }
    }
}
