//! Configuration management for rowdump CLI
//!
//! Handles settings shared by all commands: output directory and HTTP timeout.

use crate::error::{CliError, Result};
use rowdump_export::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default output directory when not specified via environment variable.
pub const DEFAULT_OUTPUT_DIR: &str = ".";

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory export files are written to
    pub output_dir: PathBuf,

    /// Timeout of a single HTTP request
    pub api_timeout: Duration,
}

impl Config {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            api_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Load config from environment variables
    ///
    /// - `ROWDUMP_OUTPUT_DIR`: output directory
    /// - `ROWDUMP_API_TIMEOUT_SECS`: HTTP request timeout in seconds
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new();

        if let Ok(dir) = std::env::var("ROWDUMP_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }

        if let Ok(secs) = std::env::var("ROWDUMP_API_TIMEOUT_SECS") {
            let secs = secs.trim().parse::<u64>().map_err(|_| {
                CliError::config(format!("ROWDUMP_API_TIMEOUT_SECS must be a number of seconds, got '{}'", secs))
            })?;
            config.api_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Get the output directory
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Set the output directory
    pub fn set_output_dir(&mut self, dir: PathBuf) {
        self.output_dir = dir;
    }

    /// Get the HTTP request timeout
    pub fn api_timeout(&self) -> Duration {
        self.api_timeout
    }

    /// Set the HTTP request timeout
    pub fn set_api_timeout(&mut self, timeout: Duration) {
        self.api_timeout = timeout;
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
