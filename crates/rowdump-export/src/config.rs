//! Export run configuration

use crate::error::{ExportError, Result};
use rowdump_common::RowdumpError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of records requested per page
pub const DEFAULT_PAGE_SIZE: u64 = 200;

/// Default number of pages fetched at the same time
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Default file name handed to the sink
pub const DEFAULT_FILE_NAME: &str = "exported_data.csv";

/// Default per-request HTTP timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Query parameter names of the json-server paging convention
pub const DEFAULT_OFFSET_PARAM: &str = "_start";
pub const DEFAULT_LIMIT_PARAM: &str = "_limit";

/// What the scheduler does when a page fetch fails or times out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum PageFailurePolicy {
    /// Substitute an empty page and keep going. Rows of the failed page are
    /// silently missing from the output; check `ExportReport::failed_pages`.
    #[default]
    Skip,
    /// Stop claiming pages after the first failure and fail the export
    Abort,
    /// Re-run the page up to `attempts` more times, then behave like `Skip`
    Retry { attempts: u32 },
}

impl PageFailurePolicy {
    /// Number of extra attempts made after a failure
    pub fn retries(self) -> u32 {
        match self {
            PageFailurePolicy::Retry { attempts } => attempts,
            PageFailurePolicy::Skip | PageFailurePolicy::Abort => 0,
        }
    }

    pub fn aborts(self) -> bool {
        matches!(self, PageFailurePolicy::Abort)
    }
}

impl std::str::FromStr for PageFailurePolicy {
    type Err = ExportError;

    /// Accepts `skip`, `abort`, `retry` (one extra attempt) and `retry:N`
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        match lower.split_once(':') {
            None => match lower.as_str() {
                "skip" => Ok(PageFailurePolicy::Skip),
                "abort" => Ok(PageFailurePolicy::Abort),
                "retry" => Ok(PageFailurePolicy::Retry { attempts: 1 }),
                _ => Err(ExportError::invalid_argument(format!(
                    "Unknown page failure policy '{}'. Use skip, abort, retry or retry:N",
                    s
                ))),
            },
            Some(("retry", n)) => n
                .parse()
                .map(|attempts| PageFailurePolicy::Retry { attempts })
                .map_err(|_| {
                    ExportError::invalid_argument(format!("Invalid retry count '{}'", n))
                }),
            Some(_) => Err(ExportError::invalid_argument(format!(
                "Unknown page failure policy '{}'",
                s
            ))),
        }
    }
}

impl std::fmt::Display for PageFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageFailurePolicy::Skip => write!(f, "skip"),
            PageFailurePolicy::Abort => write!(f, "abort"),
            PageFailurePolicy::Retry { attempts } => write!(f, "retry:{}", attempts),
        }
    }
}

/// How the encoder treats values that collide with the delimiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Quoting {
    /// Write values raw. A value containing the delimiter, a quote or a line
    /// break corrupts the row.
    #[default]
    Never,
    /// Quote only the fields that need it, doubling inner quotes (RFC 4180)
    Necessary,
}

impl std::str::FromStr for Quoting {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "never" | "none" | "raw" => Ok(Quoting::Never),
            "necessary" | "rfc4180" => Ok(Quoting::Necessary),
            _ => Err(ExportError::invalid_argument(format!(
                "Unknown quoting mode '{}'. Use never or necessary",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Quoting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quoting::Never => write!(f, "never"),
            Quoting::Necessary => write!(f, "necessary"),
        }
    }
}

/// Configuration of one export run
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Endpoint of the paged read API
    pub source_url: String,

    /// Number of records to export. `None` asks the fetcher for the count.
    pub total: Option<u64>,

    pub page_size: u64,

    /// Maximum number of pages in flight
    pub concurrency: usize,

    pub failure_policy: PageFailurePolicy,

    /// Per-page deadline; expiry counts as a page failure
    pub page_timeout: Option<Duration>,

    /// Query parameter carrying the record offset
    pub offset_param: String,

    /// Query parameter carrying the page size
    pub limit_param: String,

    /// HTTP client timeout for a single request
    pub request_timeout: Duration,

    /// Field separator, a single ASCII byte
    pub delimiter: u8,

    pub quoting: Quoting,

    /// Name suggested to the sink
    pub file_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            source_url: String::new(),
            total: None,
            page_size: DEFAULT_PAGE_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            failure_policy: PageFailurePolicy::Skip,
            page_timeout: None,
            offset_param: DEFAULT_OFFSET_PARAM.to_string(),
            limit_param: DEFAULT_LIMIT_PARAM.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            delimiter: b',',
            quoting: Quoting::Never,
            file_name: DEFAULT_FILE_NAME.to_string(),
        }
    }
}

impl ExportConfig {
    /// Create a configuration for the given endpoint with defaults
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `ROWDUMP_SOURCE_URL`: endpoint of the paged API (required)
    /// - `ROWDUMP_TOTAL`: number of records to export
    /// - `ROWDUMP_PAGE_SIZE`: records per page
    /// - `ROWDUMP_CONCURRENCY`: pages in flight
    /// - `ROWDUMP_PAGE_TIMEOUT_SECS`: per-page deadline
    /// - `ROWDUMP_ON_PAGE_FAILURE`: skip, abort, retry or retry:N
    pub fn from_env() -> Result<Self> {
        let source_url = std::env::var("ROWDUMP_SOURCE_URL")
            .map_err(|_| RowdumpError::config("ROWDUMP_SOURCE_URL is not set"))?;
        let mut config = Self::new(source_url);

        if let Some(total) = env_number("ROWDUMP_TOTAL")? {
            config.total = Some(total);
        }
        if let Some(page_size) = env_number("ROWDUMP_PAGE_SIZE")? {
            config.page_size = page_size;
        }
        if let Some(concurrency) = env_number("ROWDUMP_CONCURRENCY")? {
            config.concurrency = concurrency;
        }
        if let Some(secs) = env_number("ROWDUMP_PAGE_TIMEOUT_SECS")? {
            config.page_timeout = Some(Duration::from_secs(secs));
        }
        if let Ok(policy) = std::env::var("ROWDUMP_ON_PAGE_FAILURE") {
            config.failure_policy = policy.parse()?;
        }

        Ok(config)
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_failure_policy(mut self, policy: PageFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = Some(timeout);
        self
    }

    pub fn with_paging_params(
        mut self,
        offset_param: impl Into<String>,
        limit_param: impl Into<String>,
    ) -> Self {
        self.offset_param = offset_param.into();
        self.limit_param = limit_param.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_quoting(mut self, quoting: Quoting) -> Self {
        self.quoting = quoting;
        self
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(ExportError::invalid_argument("page size must be at least 1"));
        }
        if self.concurrency == 0 {
            return Err(ExportError::invalid_argument("concurrency must be at least 1"));
        }
        if !self.delimiter.is_ascii() || matches!(self.delimiter, b'\n' | b'\r' | b'"') {
            return Err(ExportError::invalid_argument(format!(
                "delimiter {:?} cannot separate fields",
                self.delimiter as char
            )));
        }
        if self.file_name.trim().is_empty() {
            return Err(ExportError::invalid_argument("file name must not be empty"));
        }
        Ok(())
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| RowdumpError::config(format!("{} is not a valid number: '{}'", name, raw)).into()),
        Err(_) => Ok(None),
    }
}
