//! Payload delivery
//!
//! A sink receives the encoded payload together with a suggested file name and
//! either stores it or fails. Every failure surfaces as
//! [`ExportError::Delivery`]; nothing is retried.

use crate::error::{ExportError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Destination of an encoded export
#[async_trait]
pub trait ExportSink: Send + Sync {
    async fn deliver(&self, payload: &[u8], suggested_name: &str) -> Result<()>;
}

#[async_trait]
impl<S: ExportSink + ?Sized> ExportSink for Arc<S> {
    async fn deliver(&self, payload: &[u8], suggested_name: &str) -> Result<()> {
        (**self).deliver(payload, suggested_name).await
    }
}

/// Writes the payload to `<dir>/<suggested_name>`
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Target path for a suggested name
    ///
    /// Only the final component of the name is used, so a name cannot point
    /// outside the sink directory.
    pub fn target_path(&self, suggested_name: &str) -> Result<PathBuf> {
        let file_name = Path::new(suggested_name)
            .file_name()
            .ok_or_else(|| ExportError::delivery(suggested_name, "not a file name"))?;

        Ok(self.dir.join(file_name))
    }
}

#[async_trait]
impl ExportSink for FileSink {
    async fn deliver(&self, payload: &[u8], suggested_name: &str) -> Result<()> {
        let path = self.target_path(suggested_name)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ExportError::delivery(suggested_name, e))?;
        tokio::fs::write(&path, payload)
            .await
            .map_err(|e| ExportError::delivery(suggested_name, e))?;

        info!(path = %path.display(), bytes = payload.len(), "Export written");
        Ok(())
    }
}

/// Writes the payload to standard output
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

#[async_trait]
impl ExportSink for StdoutSink {
    async fn deliver(&self, payload: &[u8], suggested_name: &str) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(payload)
            .await
            .map_err(|e| ExportError::delivery(suggested_name, e))?;
        if !payload.is_empty() && payload.last() != Some(&b'\n') {
            stdout
                .write_all(b"\n")
                .await
                .map_err(|e| ExportError::delivery(suggested_name, e))?;
        }
        stdout
            .flush()
            .await
            .map_err(|e| ExportError::delivery(suggested_name, e))?;

        debug!(name = suggested_name, bytes = payload.len(), "Export written to stdout");
        Ok(())
    }
}

/// A payload captured by [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub name: String,
    pub payload: Vec<u8>,
}

impl Delivery {
    /// Payload as text, replacing invalid UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Keeps every delivery in memory
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<Delivery> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

#[async_trait]
impl ExportSink for MemorySink {
    async fn deliver(&self, payload: &[u8], suggested_name: &str) -> Result<()> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Delivery {
                name: suggested_name.to_string(),
                payload: payload.to_vec(),
            });
        Ok(())
    }
}
