//! rowdump CLI Library
//!
//! Command-line interface for exporting paged REST collections to CSV.
//!
//! # Overview
//!
//! - **Paged export**: fetch every page with bounded concurrency and write one
//!   ordered CSV file (`rowdump export`)
//! - **Single-shot export**: fetch the whole collection with one request
//!   (`rowdump export-all`)
//! - **Streaming download**: save a server-rendered CSV body as-is
//!   (`rowdump stream`)
//! - **Record count**: print what the server reports in `X-Total-Count`
//!   (`rowdump count`)

pub mod commands;
pub mod config;
pub mod error;
pub mod progress;

// Re-export commonly used types
pub use config::Config;
pub use error::{CliError, Result};

use clap::{Args, Parser, Subcommand};
use rowdump_export::config::{
    DEFAULT_CONCURRENCY, DEFAULT_LIMIT_PARAM, DEFAULT_OFFSET_PARAM, DEFAULT_PAGE_SIZE,
};
use rowdump_export::{PageFailurePolicy, Quoting};
use std::path::PathBuf;

/// Default file name of `rowdump export-all`
pub const DEFAULT_ALL_FILE_NAME: &str = "all_data.csv";

/// Default file name of `rowdump stream`
pub const DEFAULT_STREAM_FILE_NAME: &str = "stream_export.csv";

/// rowdump - export paged REST collections to CSV
#[derive(Parser, Debug)]
#[command(name = "rowdump")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print the command reference as markdown and exit
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export a paged collection to one CSV file
    Export {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        paging: PagingArgs,

        #[command(flatten)]
        format: FormatArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Export the whole collection with a single request
    ExportAll {
        #[command(flatten)]
        source: SourceArgs,

        /// What to do when the request fails: skip (empty file), abort, retry or retry:N
        #[arg(long, default_value = "abort")]
        on_failure: PageFailurePolicy,

        #[command(flatten)]
        format: FormatArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Download a server-rendered CSV body as-is
    Stream {
        #[command(flatten)]
        source: SourceArgs,

        /// Output directory (defaults to ROWDUMP_OUTPUT_DIR or the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output file name
        #[arg(short, long, default_value = DEFAULT_STREAM_FILE_NAME)]
        name: String,
    },

    /// Print the number of records the server reports
    Count {
        #[command(flatten)]
        source: SourceArgs,

        /// Query parameter carrying the record offset
        #[arg(long, default_value = DEFAULT_OFFSET_PARAM)]
        offset_param: String,

        /// Query parameter carrying the page size
        #[arg(long, default_value = DEFAULT_LIMIT_PARAM)]
        limit_param: String,
    },
}

/// Where the data comes from
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// URL of the collection endpoint (e.g. http://localhost:3000/users)
    #[arg(short, long, env = "ROWDUMP_SOURCE_URL")]
    pub url: String,

    /// HTTP request timeout in seconds (defaults to ROWDUMP_API_TIMEOUT_SECS or 300)
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

/// How the collection is split into pages
#[derive(Args, Debug, Clone)]
pub struct PagingArgs {
    /// Number of records to export (asked from the server when omitted)
    #[arg(short, long, env = "ROWDUMP_TOTAL")]
    pub total: Option<u64>,

    /// Records per page
    #[arg(short, long, env = "ROWDUMP_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u64,

    /// Pages fetched at the same time
    #[arg(short, long, env = "ROWDUMP_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// What to do when a page fails: skip (drop its rows), abort, retry or retry:N
    #[arg(long, env = "ROWDUMP_ON_PAGE_FAILURE", default_value = "skip")]
    pub on_page_failure: PageFailurePolicy,

    /// Extra attempts per page with --on-page-failure retry
    #[arg(long)]
    pub retries: Option<u32>,

    /// Give up on a page after this many seconds
    #[arg(long, env = "ROWDUMP_PAGE_TIMEOUT_SECS")]
    pub page_timeout_secs: Option<u64>,

    /// Query parameter carrying the record offset
    #[arg(long, default_value = DEFAULT_OFFSET_PARAM)]
    pub offset_param: String,

    /// Query parameter carrying the page size
    #[arg(long, default_value = DEFAULT_LIMIT_PARAM)]
    pub limit_param: String,
}

/// CSV layout
#[derive(Args, Debug, Clone)]
pub struct FormatArgs {
    /// Field separator, one ASCII character (use '\t' for tab)
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    pub delimiter: u8,

    /// Value quoting: never (raw values) or necessary (RFC 4180)
    #[arg(long, default_value = "never")]
    pub quote: Quoting,
}

/// Where the export goes
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Output directory (defaults to ROWDUMP_OUTPUT_DIR or the current directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write the CSV to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,

    /// Output file name
    #[arg(short, long)]
    pub name: Option<String>,
}

/// Parse a single-byte field separator
pub fn parse_delimiter(raw: &str) -> std::result::Result<u8, String> {
    match raw {
        "\\t" | "tab" => Ok(b'\t'),
        _ => match raw.as_bytes() {
            [byte] if byte.is_ascii() => Ok(*byte),
            _ => Err(format!("'{}' is not a single ASCII character", raw)),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(",").unwrap(), b',');
        assert_eq!(parse_delimiter(";").unwrap(), b';');
        assert_eq!(parse_delimiter("\\t").unwrap(), b'\t');
        assert!(parse_delimiter("::").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn test_export_defaults() {
        let cli = Cli::try_parse_from(["rowdump", "export", "--url", "http://localhost:3000/users"]).unwrap();
        let Some(Commands::Export { paging, format, output, .. }) = cli.command else {
            panic!("expected export command");
        };
        assert_eq!(paging.page_size, 200);
        assert_eq!(paging.concurrency, 3);
        assert_eq!(paging.on_page_failure, PageFailurePolicy::Skip);
        assert_eq!(format.delimiter, b',');
        assert_eq!(format.quote, Quoting::Never);
        assert!(!output.stdout);
    }

    #[test]
    fn test_export_all_aborts_by_default() {
        let cli = Cli::try_parse_from(["rowdump", "export-all", "--url", "http://x/items"]).unwrap();
        let Some(Commands::ExportAll { on_failure, .. }) = cli.command else {
            panic!("expected export-all command");
        };
        assert_eq!(on_failure, PageFailurePolicy::Abort);
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let result = Cli::try_parse_from([
            "rowdump",
            "export",
            "--url",
            "http://x",
            "--on-page-failure",
            "ignore",
        ]);
        assert!(result.is_err());
    }
}
