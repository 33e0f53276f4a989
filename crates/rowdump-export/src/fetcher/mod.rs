//! Page fetching boundary
//!
//! The pipeline only needs "give me `limit` records starting at `offset`".
//! Failures are returned as errors; the scheduler's failure policy decides
//! whether a failed page becomes an empty page or stops the export.

mod http;

pub use http::HttpPageFetcher;

use crate::error::{ExportError, Result};
use async_trait::async_trait;
use rowdump_common::Record;
use std::sync::Arc;

/// Source of paged records
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch up to `limit` records starting at record `offset`
    async fn fetch(&self, offset: u64, limit: u64) -> Result<Vec<Record>>;

    /// Total number of records available, when the source can tell
    async fn total_count(&self) -> Result<Option<u64>> {
        Ok(None)
    }

    /// Fetch the whole dataset with a single request
    async fn fetch_all(&self) -> Result<Vec<Record>> {
        Err(ExportError::unsupported(
            "this source cannot return the whole dataset in one request",
        ))
    }
}

#[async_trait]
impl<F: PageFetcher + ?Sized> PageFetcher for Arc<F> {
    async fn fetch(&self, offset: u64, limit: u64) -> Result<Vec<Record>> {
        (**self).fetch(offset, limit).await
    }

    async fn total_count(&self) -> Result<Option<u64>> {
        (**self).total_count().await
    }

    async fn fetch_all(&self) -> Result<Vec<Record>> {
        (**self).fetch_all().await
    }
}
