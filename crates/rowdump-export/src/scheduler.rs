//! Bounded, order-preserving task scheduler
//!
//! Runs a task list with at most `concurrency` tasks in flight and returns the
//! results in task order, whatever order the tasks finish in.
//!
//! Workers are plain futures polled together on the caller's task, so the
//! tasks and the `execute` closure need not be `Send` or `'static`. Each worker
//! claims the next index from a shared atomic cursor, runs the task, and keeps
//! the outcome tagged with the claimed index. Once every worker has drained
//! the cursor the outcomes are placed into a container pre-sized to the task
//! count. The cursor is the only shared mutable state and nothing is locked
//! across an await.
//!
//! # Example
//!
//! ```rust
//! use rowdump_export::scheduler::Scheduler;
//!
//! # async fn demo() -> rowdump_export::Result<()> {
//! let pages: Vec<usize> = (0..10).collect();
//! let schedule = Scheduler::new(3)?
//!     .run(&pages, |page| async move { Ok::<_, std::io::Error>(vec![page * 100]) })
//!     .await?;
//! assert_eq!(schedule.results[4], vec![400]);
//! # Ok(())
//! # }
//! ```

use crate::config::PageFailurePolicy;
use crate::error::{ExportError, Result};
use futures::future::join_all;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Scheduler settings for one run
#[derive(Debug, Clone)]
pub struct Scheduler {
    concurrency: usize,
    policy: PageFailurePolicy,
    task_timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

/// Results of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule<R> {
    /// `results[i]` is the outcome of `tasks[i]`
    pub results: Vec<R>,
    /// Ascending indices whose slot holds an empty substitute for a failed task
    pub failed: Vec<usize>,
}

enum Outcome<R> {
    Done(R),
    Failed(String),
}

#[derive(Default)]
struct RunState {
    cursor: AtomicUsize,
    halted: AtomicBool,
}

impl Scheduler {
    /// Create a scheduler running at most `concurrency` tasks at once
    pub fn new(concurrency: usize) -> Result<Self> {
        if concurrency == 0 {
            return Err(ExportError::invalid_argument("concurrency must be at least 1"));
        }

        Ok(Self {
            concurrency,
            policy: PageFailurePolicy::Skip,
            task_timeout: None,
            cancel: None,
        })
    }

    pub fn with_policy(mut self, policy: PageFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Treat a task that runs longer than `timeout` as failed
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    /// Stop claiming tasks once `token` is cancelled
    ///
    /// Tasks already running are allowed to finish; the run then returns
    /// [`ExportError::Cancelled`].
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn policy(&self) -> PageFailurePolicy {
        self.policy
    }

    /// Run every task and return the results in task order
    pub async fn run<T, R, E, F, Fut>(&self, tasks: &[T], execute: F) -> Result<Schedule<R>>
    where
        T: Clone,
        R: Default,
        E: Display,
        F: Fn(T) -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
    {
        self.run_with_progress(tasks, execute, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_complete(index)` as each task finishes
    pub async fn run_with_progress<T, R, E, F, Fut, P>(
        &self,
        tasks: &[T],
        execute: F,
        on_complete: P,
    ) -> Result<Schedule<R>>
    where
        T: Clone,
        R: Default,
        E: Display,
        F: Fn(T) -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
        P: Fn(usize),
    {
        let total = tasks.len();
        let workers = self.concurrency.min(total);
        let state = RunState::default();

        debug!(tasks = total, workers, policy = %self.policy, "Starting scheduler run");

        let drained = join_all(
            (0..workers).map(|worker| self.drain(worker, tasks, &state, &execute, &on_complete)),
        )
        .await;

        let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();
        let mut failed = Vec::new();
        let mut first_failure: Option<(usize, String)> = None;

        for (index, outcome) in drained.into_iter().flatten() {
            debug_assert!(slots[index].is_none(), "slot {} written twice", index);
            match outcome {
                Outcome::Done(result) => slots[index] = Some(result),
                Outcome::Failed(message) => {
                    if !self.policy.aborts() {
                        warn!(task = index, error = %message, "Substituting empty result for failed task");
                    }
                    if first_failure.as_ref().is_none_or(|(first, _)| index < *first) {
                        first_failure = Some((index, message));
                    }
                    failed.push(index);
                    slots[index] = Some(R::default());
                },
            }
        }
        failed.sort_unstable();

        if self.policy.aborts() {
            if let Some((index, message)) = first_failure {
                return Err(ExportError::PageFetch { index, message });
            }
        }

        let completed = slots.iter().filter(|slot| slot.is_some()).count();
        if completed < total {
            return Err(ExportError::Cancelled { completed, total });
        }

        debug!(tasks = total, failed = failed.len(), "Scheduler run complete");

        Ok(Schedule {
            results: slots.into_iter().map(Option::unwrap_or_default).collect(),
            failed,
        })
    }

    /// One worker: claim, execute, record, until nothing is left to claim
    async fn drain<T, R, E, F, Fut, P>(
        &self,
        worker: usize,
        tasks: &[T],
        state: &RunState,
        execute: &F,
        on_complete: &P,
    ) -> Vec<(usize, Outcome<R>)>
    where
        T: Clone,
        E: Display,
        F: Fn(T) -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
        P: Fn(usize),
    {
        let mut finished = Vec::new();

        loop {
            if state.halted.load(Ordering::Acquire) {
                break;
            }
            if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
                debug!(worker, "Cancellation observed, worker stopping");
                break;
            }

            let index = state.cursor.fetch_add(1, Ordering::AcqRel);
            let Some(task) = tasks.get(index) else {
                break;
            };

            let outcome = self.execute_task(index, task, execute).await;
            if matches!(outcome, Outcome::Failed(_)) && self.policy.aborts() {
                state.halted.store(true, Ordering::Release);
            }

            on_complete(index);
            finished.push((index, outcome));
        }

        debug!(worker, tasks = finished.len(), "Worker drained");
        finished
    }

    async fn execute_task<T, R, E, F, Fut>(&self, index: usize, task: &T, execute: &F) -> Outcome<R>
    where
        T: Clone,
        E: Display,
        F: Fn(T) -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
    {
        let attempts = self.policy.retries().saturating_add(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.attempt(task.clone(), execute).await {
                Ok(result) => return Outcome::Done(result),
                Err(message) => {
                    warn!(task = index, attempt, attempts, error = %message, "Task failed");
                    last_error = message;
                },
            }
        }

        Outcome::Failed(last_error)
    }

    async fn attempt<T, R, E, F, Fut>(&self, task: T, execute: &F) -> std::result::Result<R, String>
    where
        E: Display,
        F: Fn(T) -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
    {
        let work = execute(task);
        match self.task_timeout {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(outcome) => outcome.map_err(|e| e.to_string()),
                Err(_) => Err(format!("timed out after {}ms", limit.as_millis())),
            },
            None => work.await.map_err(|e| e.to_string()),
        }
    }
}

/// Run `tasks` with at most `concurrency` in flight, skipping failures
///
/// Shorthand for `Scheduler::new(concurrency)?.run(tasks, execute)`, keeping
/// only the ordered results.
pub async fn run_ordered<T, R, E, F, Fut>(tasks: &[T], concurrency: usize, execute: F) -> Result<Vec<R>>
where
    T: Clone,
    R: Default,
    E: Display,
    F: Fn(T) -> Fut,
    Fut: Future<Output = std::result::Result<R, E>>,
{
    Ok(Scheduler::new(concurrency)?.run(tasks, execute).await?.results)
}
