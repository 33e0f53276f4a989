//! `rowdump export` and `rowdump export-all` command implementation
//!
//! Both run an export job against the HTTP source and write one CSV file (or
//! stdout). `export` fetches page by page; `export-all` sends one request.

use super::{cancel_on_ctrl_c, request_timeout};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::progress;
use crate::{FormatArgs, OutputArgs, PagingArgs, SourceArgs, DEFAULT_ALL_FILE_NAME};
use colored::Colorize;
use rowdump_export::config::DEFAULT_FILE_NAME;
use rowdump_export::{
    ExportConfig, ExportJob, ExportReport, ExportSink, FileSink, HttpPageFetcher,
    PageFailurePolicy, StdoutSink,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Run the paged export
pub async fn run(
    source: &SourceArgs,
    paging: &PagingArgs,
    format: &FormatArgs,
    output: &OutputArgs,
    config: &Config,
) -> Result<()> {
    let export = paged_config(source, paging, format, output, config)?;
    info!(url = %export.source_url, page_size = export.page_size, concurrency = export.concurrency, "Running paged export");

    execute(export, output, config, Mode::Paged).await
}

/// Run the single-request export
pub async fn run_all(
    source: &SourceArgs,
    on_failure: PageFailurePolicy,
    format: &FormatArgs,
    output: &OutputArgs,
    config: &Config,
) -> Result<()> {
    let export = base_config(source, format, config)
        .with_failure_policy(on_failure)
        .with_file_name(output.name.as_deref().unwrap_or(DEFAULT_ALL_FILE_NAME));
    export.validate()?;
    info!(url = %export.source_url, "Running single-request export");

    execute(export, output, config, Mode::SingleShot).await
}

/// Build the export configuration of `rowdump export`
pub fn paged_config(
    source: &SourceArgs,
    paging: &PagingArgs,
    format: &FormatArgs,
    output: &OutputArgs,
    config: &Config,
) -> Result<ExportConfig> {
    let mut export = base_config(source, format, config)
        .with_page_size(paging.page_size)
        .with_concurrency(paging.concurrency)
        .with_failure_policy(failure_policy(paging.on_page_failure, paging.retries)?)
        .with_paging_params(paging.offset_param.clone(), paging.limit_param.clone())
        .with_file_name(output.name.as_deref().unwrap_or(DEFAULT_FILE_NAME));

    if let Some(total) = paging.total {
        export = export.with_total(total);
    }
    if let Some(secs) = paging.page_timeout_secs {
        export = export.with_page_timeout(Duration::from_secs(secs));
    }

    export.validate()?;
    Ok(export)
}

/// Combine `--on-page-failure` with `--retries`
pub fn failure_policy(policy: PageFailurePolicy, retries: Option<u32>) -> Result<PageFailurePolicy> {
    match (policy, retries) {
        (policy, None) => Ok(policy),
        (PageFailurePolicy::Retry { .. }, Some(attempts)) => Ok(PageFailurePolicy::Retry { attempts }),
        (other, Some(_)) => Err(CliError::invalid_argument(format!(
            "--retries only applies with --on-page-failure retry, not {}",
            other
        ))),
    }
}

fn base_config(source: &SourceArgs, format: &FormatArgs, config: &Config) -> ExportConfig {
    ExportConfig::new(source.url.clone())
        .with_request_timeout(request_timeout(source, config))
        .with_delimiter(format.delimiter)
        .with_quoting(format.quote)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Paged,
    SingleShot,
}

async fn execute(export: ExportConfig, output: &OutputArgs, config: &Config, mode: Mode) -> Result<()> {
    let (sink, destination): (Box<dyn ExportSink>, String) = if output.stdout {
        (Box::new(StdoutSink), "stdout".to_string())
    } else {
        let dir = output
            .output
            .clone()
            .unwrap_or_else(|| config.output_dir().to_path_buf());
        let sink = FileSink::new(dir);
        let path = sink.target_path(&export.file_name)?;
        (Box::new(sink), path.display().to_string())
    };

    let fetcher = HttpPageFetcher::from_config(&export)?;
    let job = ExportJob::new(export, fetcher);
    cancel_on_ctrl_c(job.cancellation_token());

    let pb = progress::create_progress_bar(0, "Planning pages...");
    let done = CancellationToken::new();
    let run = async {
        let outcome = match mode {
            Mode::Paged => job.run(sink.as_ref()).await,
            Mode::SingleShot => job.run_single_shot(sink.as_ref()).await,
        };
        done.cancel();
        outcome
    };
    let (outcome, ()) = tokio::join!(run, progress::follow_job(job.subscribe(), pb, done.clone()));

    let report = outcome.map_err(CliError::from)?;
    print_report(&report, &destination, output.stdout);
    Ok(())
}

/// Summary lines; on stderr when the payload itself went to stdout
fn print_report(report: &ExportReport, destination: &str, to_stderr: bool) {
    let say = |line: String| {
        if to_stderr {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    };

    say(format!(
        "{} Exported {} records ({} pages) to {} ({}) in {:.1}s",
        "✓".green(),
        report.records,
        report.pages,
        destination,
        progress::format_bytes(report.bytes as u64),
        report.elapsed.as_secs_f64()
    ));

    if !report.is_complete() {
        let pages: Vec<String> = report.failed_pages.iter().map(ToString::to_string).collect();
        say(format!(
            "{} {} of {} pages failed (pages {}); their records are missing from the export",
            "⚠".yellow(),
            report.failed_pages.len(),
            report.pages,
            pages.join(", ")
        ));
    }
}
