//! rowdump export pipeline
//!
//! Exports a dataset that is only reachable through a paged read API into one
//! delimited text payload:
//!
//! 1. [`planner`] splits the record count into page fetches
//! 2. [`scheduler`] runs them with a fixed number of concurrent workers and
//!    returns the pages in page order
//! 3. [`aggregate`] flattens the pages into one ordered record list
//! 4. [`encoder`] turns the records into CSV text
//! 5. a [`sink::ExportSink`] receives the payload and a suggested file name
//!
//! [`job::ExportJob`] wires the steps together and publishes its progress as a
//! [`status::JobStatus`].
//!
//! # Missing rows
//!
//! Under the default [`PageFailurePolicy::Skip`] a page that fails or times out
//! is replaced by an empty page and the export still succeeds. The rows of
//! that page are **silently absent** from the payload. Check
//! [`ExportReport::failed_pages`] (or [`ExportReport::is_complete`]) after every
//! run, or use [`PageFailurePolicy::Abort`] to fail the export instead.
//!
//! # Example
//!
//! ```no_run
//! use rowdump_export::{ExportConfig, ExportJob, FileSink, HttpPageFetcher};
//!
//! #[tokio::main]
//! async fn main() -> rowdump_export::Result<()> {
//!     let config = ExportConfig::new("http://localhost:3000/users").with_total(1000);
//!     let fetcher = HttpPageFetcher::from_config(&config)?;
//!
//!     let report = ExportJob::new(config, fetcher)
//!         .run(&FileSink::new("./exports"))
//!         .await?;
//!     assert!(report.is_complete());
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod aggregate;
pub mod config;
pub mod encoder;
pub mod error;
pub mod fetcher;
pub mod job;
pub mod planner;
pub mod scheduler;
pub mod sink;
pub mod status;

pub use config::{ExportConfig, PageFailurePolicy, Quoting};
pub use encoder::CsvEncoder;
pub use error::{ExportError, Result};
pub use fetcher::{HttpPageFetcher, PageFetcher};
pub use job::{ExportJob, ExportReport};
pub use planner::{plan, PageTask};
pub use scheduler::{Schedule, Scheduler};
pub use sink::{ExportSink, FileSink, MemorySink, StdoutSink};
pub use status::JobStatus;
