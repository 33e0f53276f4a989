//! Error types for the export pipeline

use rowdump_common::RowdumpError;
use thiserror::Error;

/// Result type alias for export operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// Everything that can stop an export
///
/// A failed page is only an error under the `abort` failure policy. Under the
/// default `skip` policy it never reaches the caller as an `ExportError`; the
/// page is replaced by an empty one and its index is listed in
/// [`ExportReport::failed_pages`](crate::job::ExportReport::failed_pages).
#[derive(Error, Debug)]
pub enum ExportError {
    /// Malformed planner or scheduler input, rejected before any fetch
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A page could not be fetched and the failure policy escalated it
    #[error("Page {index} failed: {message}")]
    PageFetch { index: usize, message: String },

    /// No total was configured and the source does not report one
    #[error("Total record count is unknown: the source does not report it")]
    UnknownTotal,

    /// `run` was called on a job that is still running
    #[error("Export is already running ({status})")]
    AlreadyRunning { status: String },

    #[error("Export cancelled after {completed} of {total} pages")]
    Cancelled { completed: usize, total: usize },

    /// The sink refused or failed to store the payload
    #[error("Delivery of '{name}' failed: {message}")]
    Delivery { name: String, message: String },

    /// The fetcher does not implement the requested operation
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Encoded payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] RowdumpError),
}

impl ExportError {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a delivery error for the given file name
    pub fn delivery(name: impl Into<String>, msg: impl std::fmt::Display) -> Self {
        Self::Delivery {
            name: name.into(),
            message: msg.to_string(),
        }
    }

    /// Create an unsupported operation error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}
