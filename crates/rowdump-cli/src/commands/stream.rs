//! `rowdump stream` command implementation
//!
//! Saves the response body of `GET <url>` unchanged, for servers that render
//! the CSV themselves.

use super::request_timeout;
use crate::config::Config;
use crate::error::Result;
use crate::progress;
use crate::SourceArgs;
use colored::Colorize;
use rowdump_export::{ExportConfig, FileSink, HttpPageFetcher};
use std::path::PathBuf;
use tracing::{info, warn};

/// Download the body of `source.url` into `<output>/<name>`
pub async fn run(source: &SourceArgs, output: Option<PathBuf>, name: &str, config: &Config) -> Result<()> {
    let export = ExportConfig::new(source.url.clone()).with_request_timeout(request_timeout(source, config));
    let fetcher = HttpPageFetcher::from_config(&export)?;

    let dir = output.unwrap_or_else(|| config.output_dir().to_path_buf());
    let path = FileSink::new(&dir).target_path(name)?;
    tokio::fs::create_dir_all(&dir).await?;
    let mut file = tokio::fs::File::create(&path).await?;

    println!("{} Downloading {}...", "↓".cyan(), source.url);
    info!(url = %source.url, path = %path.display(), "Streaming export");

    let pb = progress::create_download_progress(0, name);
    let result = fetcher
        .stream_to(&mut file, |written, total| {
            if let Some(total) = total {
                pb.set_length(total);
            }
            pb.set_position(written);
        })
        .await;
    pb.finish_and_clear();
    drop(file);

    match result {
        Ok(bytes) => {
            println!(
                "{} Saved {} ({})",
                "✓".green(),
                path.display(),
                progress::format_bytes(bytes)
            );
            Ok(())
        },
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %cleanup, "Could not remove partial download");
            }
            Err(e.into())
        },
    }
}
