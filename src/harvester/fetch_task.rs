//! Per-task fetch execution - drives one (day, group) task to completion.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client::{ObservationApi, RawObservation};
use crate::config::Config;
use crate::retry::fetch_with_retry;
use crate::types::{Event, FetchTask, ObservationRecord, PageState, TaskOutcome, TaskStatus};
use crate::writer::ObservationWriter;

/// Everything one fetch worker needs to execute its task
pub(crate) struct FetchTaskContext {
    /// The task being executed
    pub(crate) task: FetchTask,
    /// Shared API transport (stateless, safe for concurrent use)
    pub(crate) api: Arc<dyn ObservationApi>,
    /// Run configuration
    pub(crate) config: Arc<Config>,
    /// Event channel for progress reporting
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Cooperative cancellation signal for the whole run
    pub(crate) cancel: CancellationToken,
}

/// Execute exactly one task to completion.
///
/// Phases:
/// 1. Open the task's output file (creating it with a header if new)
/// 2. Page through the remote API, each page attempt wrapped in retry
/// 3. Normalize and append each page's records as it arrives
/// 4. Report the outcome; a terminal page failure keeps everything
///    persisted so far (at-least-once, not all-or-nothing)
///
/// The worker holds no cross-task state: the pagination cursor lives on the
/// stack and dies with the task.
pub(crate) async fn run_fetch_task(ctx: FetchTaskContext) -> TaskOutcome {
    let task = ctx.task;
    let path = ctx.config.harvest.output_dir.join(task.file_name());

    ctx.event_tx.send(Event::TaskStarted { task }).ok();
    tracing::info!(group = %task.group, date = %task.date, "Fetching observations");

    let mut writer = match ObservationWriter::open(&path) {
        Ok(writer) => writer,
        Err(e) => {
            tracing::error!(group = %task.group, date = %task.date, error = %e, "Failed to open output file");
            return outcome(task, 0, 0, TaskStatus::Failed, Some(e.to_string()));
        }
    };

    let mut state = PageState::default();
    let mut records_total: u64 = 0;
    let mut pages: u32 = 0;

    while state.has_more {
        if ctx.cancel.is_cancelled() {
            writer.flush().ok();
            tracing::info!(group = %task.group, date = %task.date, "Task aborted by cancellation");
            return outcome(task, records_total, pages, TaskStatus::Cancelled, None);
        }

        let page = match fetch_with_retry(&ctx.config.retry, || {
            ctx.api.fetch_page(&task, state.offset)
        })
        .await
        {
            Ok(page) => page,
            Err(e) => {
                // Keep what was already persisted; the task is reported as
                // failed so the caller can re-run this (date, group) gap.
                writer.flush().ok();
                tracing::warn!(
                    group = %task.group,
                    date = %task.date,
                    offset = state.offset,
                    error = %e,
                    "Terminal page failure, stopping task"
                );
                return outcome(task, records_total, pages, TaskStatus::Failed, Some(e.to_string()));
            }
        };

        if page.results.is_empty() {
            break;
        }

        let returned = page.results.len();
        let next_present = page.next.is_some();
        let records: Vec<ObservationRecord> = page
            .results
            .into_iter()
            .map(RawObservation::normalize)
            .collect();

        if let Err(e) = writer.append(&records) {
            tracing::error!(group = %task.group, date = %task.date, error = %e, "Failed to append records");
            return outcome(task, records_total, pages, TaskStatus::Failed, Some(e.to_string()));
        }

        records_total += returned as u64;
        pages += 1;
        ctx.event_tx
            .send(Event::PageFetched {
                task,
                records: returned,
                offset: state.offset,
            })
            .ok();

        state.advance(returned, next_present);
    }

    if let Err(e) = writer.flush() {
        tracing::error!(group = %task.group, date = %task.date, error = %e, "Failed to flush output file");
        return outcome(task, records_total, pages, TaskStatus::Failed, Some(e.to_string()));
    }

    tracing::info!(
        group = %task.group,
        date = %task.date,
        records = records_total,
        pages = pages,
        "Task complete"
    );
    outcome(task, records_total, pages, TaskStatus::Complete, None)
}

fn outcome(
    task: FetchTask,
    records: u64,
    pages: u32,
    status: TaskStatus,
    error: Option<String>,
) -> TaskOutcome {
    TaskOutcome {
        task,
        records,
        pages,
        status,
        error,
    }
}
