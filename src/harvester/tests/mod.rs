//! Harvester tests built on a scripted API backend.


use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::client::{ObservationApi, RawObservation, RawPage};
use crate::config::{Config, RetryConfig};
use crate::error::{Error, Result};
use crate::types::{FetchTask, GroupId};

/// Scripted response for one (task, offset) request: a page, or an HTTP
/// status to fail with (429 maps to the rate-limit error).
type Scripted = std::result::Result<RawPage, u16>;

/// In-memory [`ObservationApi`] that replays scripted responses.
///
/// Responses are queued per (task, offset); consecutive requests for the
/// same key pop the queue, so a 429-then-success sequence is expressible.
/// Unscripted keys answer with an empty final page. The backend also tracks
/// request counts and the peak number of in-flight requests.
pub(super) struct ScriptedApi {
    scripts: Mutex<HashMap<(FetchTask, u64), Vec<Scripted>>>,
    requests: AtomicU32,
    in_flight: AtomicU32,
    peak_in_flight: AtomicU32,
}

impl ScriptedApi {
    pub(super) fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            requests: AtomicU32::new(0),
            in_flight: AtomicU32::new(0),
            peak_in_flight: AtomicU32::new(0),
        }
    }

    /// Queue a response for one (task, offset) request
    pub(super) fn script(&self, task: FetchTask, offset: u64, response: Scripted) {
        self.scripts
            .lock()
            .unwrap()
            .entry((task, offset))
            .or_default()
            .push(response);
    }

    pub(super) fn requests(&self) -> u32 {
        self.requests.load(Ordering::SeqCst)
    }

    pub(super) fn peak_in_flight(&self) -> u32 {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObservationApi for ScriptedApi {
    async fn fetch_page(&self, task: &FetchTask, offset: u64) -> Result<RawPage> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        // Hold the slot briefly so overlapping requests are observable
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(&(*task, offset)) {
                Some(queue) if !queue.is_empty() => Some(queue.remove(0)),
                _ => None,
            }
        };

        match scripted {
            Some(Ok(page)) => Ok(page),
            Some(Err(429)) => Err(Error::RateLimited),
            Some(Err(status)) => Err(Error::UnexpectedStatus { status }),
            // Unscripted request: final empty page
            None => Ok(RawPage {
                results: vec![],
                next: None,
            }),
        }
    }
}

/// A page of `count` records with sequential ids starting at `first_id`
pub(super) fn page(first_id: i64, count: usize, next: bool) -> RawPage {
    RawPage {
        results: (0..count)
            .map(|i| RawObservation {
                id: Some(first_id + i as i64),
                date: Some("2025-07-01".to_string()),
                number: Some(1),
                ..Default::default()
            })
            .collect(),
        next: next.then(|| "https://remote.example/next".to_string()),
    }
}

/// Config pointed at a temp output dir, with near-instant retry delays
pub(super) fn test_config(output_dir: &std::path::Path, groups: Vec<GroupId>) -> Config {
    let mut config = Config::default();
    config.harvest.output_dir = output_dir.to_path_buf();
    config.harvest.species_groups = groups;
    config.retry = RetryConfig {
        max_attempts: 3,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(50),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    config
}

pub(super) fn date(s: &str) -> chrono::NaiveDate {
    s.parse().unwrap()
}

/// Number of non-empty lines in a task's output file
pub(super) fn file_lines(dir: &std::path::Path, task: &FetchTask) -> usize {
    std::fs::read_to_string(dir.join(task.file_name()))
        .unwrap()
        .lines()
        .count()
}
