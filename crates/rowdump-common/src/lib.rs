//! rowdump Common Library
//!
//! Shared types, logging, and error handling for the rowdump workspace.
//!
//! # Overview
//!
//! This crate provides common functionality used across all rowdump workspace members:
//!
//! - **Error Handling**: Shared error type and result alias
//! - **Logging**: Centralized `tracing` subscriber configuration
//! - **Types**: The [`Record`] row type passed between fetchers and encoders
//!
//! # Example
//!
//! ```no_run
//! use rowdump_common::{Record, Result};
//!
//! fn parse_row(text: &str) -> Result<Record> {
//!     let value: serde_json::Value = serde_json::from_str(text)?;
//!     Record::from_value(value)
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, RowdumpError};
pub use types::Record;
