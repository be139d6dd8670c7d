//! Core types for obs-harvest

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Numeric code classifying the kind of observation being harvested
/// (e.g. 4 = butterflies on waarneming.nl)
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GroupId(pub u32);

impl GroupId {
    /// Create a new GroupId
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the inner u32 value
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for GroupId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<GroupId> for u32 {
    fn from(id: GroupId) -> Self {
        id.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for GroupId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// One unit of harvesting work: all observations of one species group on one
/// calendar day. Immutable once created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchTask {
    /// The calendar day whose observations this task covers
    pub date: NaiveDate,
    /// The species group being harvested
    pub group: GroupId,
}

impl FetchTask {
    /// Create a new task for one (day, group) pair
    pub fn new(date: NaiveDate, group: GroupId) -> Self {
        Self { date, group }
    }

    /// Deterministic output filename for this task, embedding date and group
    ///
    /// The name doubles as the pattern matched by the pre-run cleanup step,
    /// so changing it is a breaking change for downstream consumers.
    pub fn file_name(&self) -> String {
        format!("observations_{}_{}.csv", self.date.format("%Y-%m-%d"), self.group)
    }
}

impl std::fmt::Display for FetchTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "group {} on {}", self.group, self.date)
    }
}

/// Normalized representation of one remote observation
///
/// Field order matches the output file column order exactly:
/// `id, common_name, scientific_name, date, time, count, longitude,
/// latitude, location, observer`. Every field the remote may omit is an
/// `Option`; a missing value is persisted as an empty cell, never
/// synthesized. `id` is unique within the remote system and is what
/// downstream consumers deduplicate on when combining files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Remote observation id
    pub id: Option<i64>,
    /// Vernacular species name
    pub common_name: Option<String>,
    /// Scientific species name
    pub scientific_name: Option<String>,
    /// Observation date as reported by the remote (YYYY-MM-DD)
    pub date: Option<String>,
    /// Observation time as reported by the remote (HH:MM)
    pub time: Option<String>,
    /// Number of individuals observed
    pub count: Option<i64>,
    /// Longitude; a missing coordinate pair stays empty
    pub longitude: Option<f64>,
    /// Latitude; a missing coordinate pair stays empty
    pub latitude: Option<f64>,
    /// Location name
    pub location: Option<String>,
    /// Observer name
    pub observer: Option<String>,
}

/// Per-task pagination cursor. Owned exclusively by the worker processing the
/// task; never shared or mutated from outside.
#[derive(Clone, Copy, Debug)]
pub struct PageState {
    /// Offset of the next page request
    pub offset: u64,
    /// Whether the API reported more pages
    pub has_more: bool,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            offset: 0,
            has_more: true,
        }
    }
}

impl PageState {
    /// Advance the cursor after a successful page: the offset grows by the
    /// number of records actually returned, `has_more` tracks the API's
    /// next-page indicator.
    pub fn advance(&mut self, records_returned: usize, next_present: bool) {
        self.offset += records_returned as u64;
        self.has_more = next_present;
    }
}

/// Final status of one task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// All pages fetched
    Complete,
    /// Pagination terminated early on an unrecoverable failure; pages
    /// persisted before the failure are retained
    Failed,
    /// The run was cancelled before or while this task was processed
    Cancelled,
}

/// Result of executing one task
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskOutcome {
    /// The task this outcome belongs to
    pub task: FetchTask,
    /// Normalized records fetched and persisted
    pub records: u64,
    /// Pages successfully fetched
    pub pages: u32,
    /// Final status
    pub status: TaskStatus,
    /// Terminal error message, present when `status` is `Failed`
    pub error: Option<String>,
}

impl TaskOutcome {
    /// Whether the task fetched all its pages
    pub fn is_complete(&self) -> bool {
        self.status == TaskStatus::Complete
    }
}

/// Aggregate report of one harvester invocation across all tasks
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    /// Per-task outcomes, one per enumerated task
    pub outcomes: Vec<TaskOutcome>,
    /// Total wall time of the run
    pub elapsed: Duration,
}

impl RunSummary {
    /// Total records fetched across all tasks
    pub fn total_records(&self) -> u64 {
        self.outcomes.iter().map(|o| o.records).sum()
    }

    /// Tasks that terminated early, so a caller can re-run specific
    /// (date, group) gaps
    pub fn failed(&self) -> Vec<&TaskOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == TaskStatus::Failed)
            .collect()
    }

    /// Tasks skipped or aborted by cancellation
    pub fn cancelled(&self) -> Vec<&TaskOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == TaskStatus::Cancelled)
            .collect()
    }

    /// True when every task completed all its pages
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(TaskOutcome::is_complete)
    }
}

/// Progress events emitted by the harvester
///
/// Subscribers receive every event independently via a broadcast channel;
/// see [`crate::Harvester::subscribe`].
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A run started with this many enumerated tasks
    RunStarted {
        /// Number of tasks enumerated for the run
        tasks: usize,
    },
    /// A worker picked up a task
    TaskStarted {
        /// The task being processed
        task: FetchTask,
    },
    /// One page was fetched and its records persisted
    PageFetched {
        /// The task the page belongs to
        task: FetchTask,
        /// Records returned by this page
        records: usize,
        /// Offset the page was requested at
        offset: u64,
    },
    /// A task finished (successfully or not)
    TaskFinished {
        /// Outcome of the task
        outcome: TaskOutcome,
    },
    /// The run finished; the summary is returned from `run` as well
    RunFinished {
        /// Total records fetched across all tasks
        total_records: u64,
        /// Number of tasks that failed terminally
        failed_tasks: usize,
    },
}
