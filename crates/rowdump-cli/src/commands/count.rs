//! `rowdump count` command implementation

use super::request_timeout;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::SourceArgs;
use rowdump_export::{ExportConfig, HttpPageFetcher};
use tracing::debug;

/// Print the `X-Total-Count` the source reports
pub async fn run(source: &SourceArgs, offset_param: &str, limit_param: &str, config: &Config) -> Result<()> {
    let export = ExportConfig::new(source.url.clone())
        .with_request_timeout(request_timeout(source, config))
        .with_paging_params(offset_param, limit_param);
    let fetcher = HttpPageFetcher::from_config(&export)?;

    debug!(url = %source.url, "Probing record count");
    let total = fetcher.probe_total().await?.ok_or(CliError::UnknownTotal)?;

    println!("{}", total);
    Ok(())
}
