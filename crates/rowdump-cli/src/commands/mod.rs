//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod count;
pub mod export;
pub mod stream;

use crate::config::Config;
use crate::SourceArgs;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Request timeout from `--timeout-secs`, falling back to the CLI config
pub(crate) fn request_timeout(source: &SourceArgs, config: &Config) -> Duration {
    source
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.api_timeout())
}

/// Cancel `token` on the first Ctrl-C
///
/// Pages already in flight still finish; the export then stops without
/// writing anything.
pub(crate) fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, waiting for pages in flight");
            token.cancel();
        }
    });
}
