//! Export job: planner, scheduler, aggregator, encoder and sink in one run
//!
//! A job owns its configuration, its fetcher and a status channel. Observers
//! call [`ExportJob::subscribe`] to follow [`JobStatus`] transitions; a run that
//! is already in progress rejects a second `run` with
//! [`ExportError::AlreadyRunning`].

use crate::aggregate::flatten;
use crate::config::ExportConfig;
use crate::encoder::CsvEncoder;
use crate::error::{ExportError, Result};
use crate::fetcher::PageFetcher;
use crate::planner::{plan, PageTask};
use crate::scheduler::{Schedule, Scheduler};
use crate::sink::ExportSink;
use crate::status::JobStatus;
use rowdump_common::Record;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// Failure reason of a run whose future was dropped before it finished
pub const DROPPED_REASON: &str = "cancelled";

/// Summary of a successful export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportReport {
    /// Pages planned and run
    pub pages: usize,
    /// Indices of pages whose records are missing from the payload
    pub failed_pages: Vec<usize>,
    /// Records written to the payload
    pub records: usize,
    /// Payload size in bytes
    pub bytes: usize,
    /// Name handed to the sink
    pub file_name: String,
    pub elapsed: Duration,
}

impl ExportReport {
    /// True when no page was replaced by an empty one
    pub fn is_complete(&self) -> bool {
        self.failed_pages.is_empty()
    }
}

/// One export of a paged source into a single payload
pub struct ExportJob<F> {
    config: ExportConfig,
    fetcher: F,
    status: watch::Sender<JobStatus>,
    cancel: CancellationToken,
}

impl<F: PageFetcher> ExportJob<F> {
    pub fn new(config: ExportConfig, fetcher: F) -> Self {
        let (status, _) = watch::channel(JobStatus::Idle);
        Self {
            config,
            fetcher,
            status,
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Follow status transitions of this job
    pub fn subscribe(&self) -> watch::Receiver<JobStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> JobStatus {
        self.status.borrow().clone()
    }

    /// Token that stops the job from claiming further pages
    ///
    /// A cancelled token stays cancelled; later runs of this job fail with
    /// [`ExportError::Cancelled`].
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Run the paged export and hand the payload to `sink`
    ///
    /// When the configuration has no `total`, the fetcher is asked for it
    /// first. Under the default `skip` failure policy a failed page does not
    /// fail the run: its records are missing from the payload and its index
    /// is listed in [`ExportReport::failed_pages`].
    #[instrument(skip(self, sink), fields(url = %self.config.source_url))]
    pub async fn run<S: ExportSink + ?Sized>(&self, sink: &S) -> Result<ExportReport> {
        let run = self.start()?;
        let started = Instant::now();
        let outcome = self.run_paged(sink, started).await;
        run.finish(outcome)
    }

    /// Fetch the whole dataset with one request and hand the payload to `sink`
    ///
    /// The single request runs through the same scheduler as a one-page plan,
    /// so failure policy, page timeout and cancellation apply to it.
    #[instrument(skip(self, sink), fields(url = %self.config.source_url))]
    pub async fn run_single_shot<S: ExportSink + ?Sized>(&self, sink: &S) -> Result<ExportReport> {
        let run = self.start()?;
        let started = Instant::now();
        let outcome = self.run_whole(sink, started).await;
        run.finish(outcome)
    }

    async fn run_paged<S: ExportSink + ?Sized>(&self, sink: &S, started: Instant) -> Result<ExportReport> {
        self.config.validate()?;

        let total = match self.config.total {
            Some(total) => total,
            None => self
                .fetcher
                .total_count()
                .await?
                .ok_or(ExportError::UnknownTotal)?,
        };

        let tasks = plan(total, self.config.page_size)?;
        info!(
            total,
            page_size = self.config.page_size,
            pages = tasks.len(),
            concurrency = self.config.concurrency,
            "Planned export"
        );

        let schedule = self
            .fetch_pages(&tasks, |task: PageTask| self.fetcher.fetch(task.offset(), task.limit()))
            .await?;

        self.encode_and_deliver(schedule, sink, started).await
    }

    async fn run_whole<S: ExportSink + ?Sized>(&self, sink: &S, started: Instant) -> Result<ExportReport> {
        self.config.validate()?;
        info!("Fetching whole dataset in one request");

        let schedule = self.fetch_pages(&[()], |()| self.fetcher.fetch_all()).await?;

        self.encode_and_deliver(schedule, sink, started).await
    }

    async fn fetch_pages<T, X, Fut>(&self, tasks: &[T], execute: X) -> Result<Schedule<Vec<Record>>>
    where
        T: Clone,
        X: Fn(T) -> Fut,
        Fut: Future<Output = Result<Vec<Record>>>,
    {
        let total = tasks.len();
        self.status.send_replace(JobStatus::Fetching { completed: 0, total });

        let mut scheduler = Scheduler::new(self.config.concurrency)?
            .with_policy(self.config.failure_policy)
            .with_cancellation(self.cancel.clone());
        if let Some(timeout) = self.config.page_timeout {
            scheduler = scheduler.with_task_timeout(timeout);
        }

        let completed = AtomicUsize::new(0);
        let schedule = scheduler
            .run_with_progress(tasks, execute, |_| {
                let completed = completed.fetch_add(1, Ordering::AcqRel) + 1;
                self.status.send_replace(JobStatus::Fetching { completed, total });
            })
            .await?;

        if !schedule.failed.is_empty() {
            warn!(
                failed = ?schedule.failed,
                "{} of {} pages failed; their records are missing from the export",
                schedule.failed.len(),
                total
            );
        }

        Ok(schedule)
    }

    async fn encode_and_deliver<S: ExportSink + ?Sized>(
        &self,
        schedule: Schedule<Vec<Record>>,
        sink: &S,
        started: Instant,
    ) -> Result<ExportReport> {
        let pages = schedule.results.len();
        let records = flatten(schedule.results);

        self.status.send_replace(JobStatus::Encoding);
        let payload = CsvEncoder::new()
            .with_delimiter(self.config.delimiter)
            .with_quoting(self.config.quoting)
            .encode(&records)?;

        self.status.send_replace(JobStatus::Delivering);
        let file_name = self.config.file_name.clone();
        sink.deliver(payload.as_bytes(), &file_name)
            .await
            .map_err(|e| match e {
                delivery @ ExportError::Delivery { .. } => delivery,
                other => ExportError::delivery(&file_name, other),
            })?;

        Ok(ExportReport {
            pages,
            failed_pages: schedule.failed,
            records: records.len(),
            bytes: payload.len(),
            file_name,
            elapsed: started.elapsed(),
        })
    }

    /// Move from an idle or terminal state to `Planning`
    ///
    /// The returned guard marks the job `Failed` if it is dropped before
    /// [`ActiveRun::finish`], which is what happens when the caller drops the
    /// run future.
    fn start(&self) -> Result<ActiveRun<'_>> {
        let mut current = String::new();
        let claimed = self.status.send_if_modified(|status| {
            if status.is_busy() {
                current = status.to_string();
                false
            } else {
                *status = JobStatus::Planning;
                true
            }
        });

        if claimed {
            Ok(ActiveRun {
                status: &self.status,
                finished: false,
            })
        } else {
            Err(ExportError::AlreadyRunning { status: current })
        }
    }
}

/// Busy claim on a job's status channel for the length of one run
struct ActiveRun<'a> {
    status: &'a watch::Sender<JobStatus>,
    finished: bool,
}

impl ActiveRun<'_> {
    fn finish(mut self, outcome: Result<ExportReport>) -> Result<ExportReport> {
        self.finished = true;
        match outcome {
            Ok(report) => {
                info!(
                    pages = report.pages,
                    failed_pages = report.failed_pages.len(),
                    records = report.records,
                    bytes = report.bytes,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "Export completed"
                );
                self.status.send_replace(JobStatus::Completed);
                Ok(report)
            },
            Err(e) => {
                error!(error = %e, "Export failed");
                self.status.send_replace(JobStatus::Failed {
                    reason: e.to_string(),
                });
                Err(e)
            },
        }
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Export dropped before it finished");
            self.status.send_replace(JobStatus::Failed {
                reason: DROPPED_REASON.to_string(),
            });
        }
    }
}
