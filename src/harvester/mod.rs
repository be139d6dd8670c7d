//! Core harvester implementation split into focused submodules.
//!
//! - [`tasks`] - Task enumeration and pre-run output cleanup
//! - [`fetch_task`] - Per-task fetch execution
//!
//! The [`Harvester`] struct owns the bounded worker pool: it enumerates one
//! task per (day, species group) pair, dispatches them over a fixed number
//! of concurrent workers, and aggregates per-task outcomes into a
//! [`RunSummary`]. A single task's unrecoverable failure never aborts its
//! siblings.

mod fetch_task;
pub mod tasks;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Instant;

use chrono::{Days, Local, NaiveDate};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::client::{HttpObservationApi, ObservationApi};
use crate::config::Config;
use crate::error::Result;
use crate::types::{Event, RunSummary, TaskOutcome, TaskStatus};

use fetch_task::{FetchTaskContext, run_fetch_task};

/// Main harvester instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Harvester {
    /// Configuration (wrapped in Arc for sharing across workers)
    config: Arc<Config>,
    /// Shared API transport; one instance serves every worker
    api: Arc<dyn ObservationApi>,
    /// Event broadcast channel sender (multiple subscribers supported)
    event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Cooperative cancellation for the current run
    cancel: CancellationToken,
}

impl Harvester {
    /// Create a new harvester backed by the HTTP observation API
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the configured base URL does not
    /// parse, or a network error when the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let api = Arc::new(HttpObservationApi::new(&config.api)?);
        Ok(Self::with_api(config, api))
    }

    /// Create a harvester with a custom API backend
    ///
    /// Useful for alternative transports and for exercising the pipeline
    /// against scripted backends.
    pub fn with_api(config: Config, api: Arc<dyn ObservationApi>) -> Self {
        // Buffered so slow subscribers don't stall workers
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1024);
        Self {
            config: Arc::new(config),
            api,
            event_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Subscribe to progress events
    ///
    /// Multiple subscribers are supported; each receives all events
    /// independently. A subscriber lagging more than the channel buffer
    /// receives a `RecvError::Lagged` and continues from the most recent
    /// events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Handle for cancelling the run from another task
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request cancellation: no new tasks are submitted, in-flight tasks
    /// finish their current page and abort cleanly
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Harvest the configured default window: today minus `days_back`
    /// through yesterday, inclusive
    pub async fn run(&self) -> Result<RunSummary> {
        let today = Local::now().date_naive();
        let start = today - Days::new(u64::from(self.config.harvest.days_back));
        let end = today - Days::new(1);
        self.run_window(start, end).await
    }

    /// Harvest an explicit inclusive date window
    ///
    /// Steps:
    /// 1. Ensure the output directory exists
    /// 2. Pre-run cleanup: delete prior output files matching the
    ///    harvester's naming pattern (each run refetches from scratch)
    /// 3. Enumerate tasks and dispatch them over the bounded worker pool
    /// 4. Aggregate per-task outcomes into the run summary
    ///
    /// # Errors
    ///
    /// Only setup failures (output directory, cleanup I/O) surface as
    /// errors. Individual task failures are isolated and reported through
    /// the summary instead.
    pub async fn run_window(&self, start: NaiveDate, end: NaiveDate) -> Result<RunSummary> {
        let started = Instant::now();

        tokio::fs::create_dir_all(&self.config.harvest.output_dir).await?;

        let removed = tasks::clean_previous_outputs(&self.config.harvest.output_dir)?;
        if removed > 0 {
            tracing::info!(files = removed, "Removed output files from previous runs");
        }

        let pending = tasks::enumerate_tasks(start, end, &self.config.harvest.species_groups);
        tracing::info!(
            tasks = pending.len(),
            start = %start,
            end = %end,
            concurrency = self.config.harvest.max_concurrent_tasks,
            "Starting harvest"
        );
        self.event_tx
            .send(Event::RunStarted {
                tasks: pending.len(),
            })
            .ok();

        let semaphore = Arc::new(Semaphore::new(self.config.harvest.max_concurrent_tasks.max(1)));
        let mut workers = JoinSet::new();
        let mut outcomes: Vec<TaskOutcome> = Vec::with_capacity(pending.len());

        for task in pending {
            // Wait for a free worker slot; stop submitting once cancelled
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    outcomes.push(TaskOutcome {
                        task,
                        records: 0,
                        pages: 0,
                        status: TaskStatus::Cancelled,
                        error: None,
                    });
                    continue;
                }
                permit = semaphore.clone().acquire_owned() => {
                    match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    }
                }
            };

            let ctx = FetchTaskContext {
                task,
                api: Arc::clone(&self.api),
                config: Arc::clone(&self.config),
                event_tx: self.event_tx.clone(),
                cancel: self.cancel.clone(),
            };

            workers.spawn(async move {
                let _permit = permit;
                run_fetch_task(ctx).await
            });
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(outcome) => {
                    self.event_tx
                        .send(Event::TaskFinished {
                            outcome: outcome.clone(),
                        })
                        .ok();
                    outcomes.push(outcome);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Fetch worker panicked");
                }
            }
        }

        // Completion order is nondeterministic; report in a stable order
        outcomes.sort_by_key(|o| (o.task.date, o.task.group));

        let summary = RunSummary {
            outcomes,
            elapsed: started.elapsed(),
        };

        let failed = summary.failed().len();
        self.event_tx
            .send(Event::RunFinished {
                total_records: summary.total_records(),
                failed_tasks: failed,
            })
            .ok();
        tracing::info!(
            records = summary.total_records(),
            failed_tasks = failed,
            elapsed_secs = summary.elapsed.as_secs(),
            "Harvest finished"
        );

        Ok(summary)
    }
}
