//! Configuration types for obs-harvest

use crate::types::GroupId;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Remote API configuration (endpoint, page size, request timeout)
///
/// Groups settings describing how the remote observation endpoint is
/// queried. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the paginated observations endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Records requested per page (default: 100)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Per-request timeout; bounds total attempt time for a page together
    /// with the retry cap (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Harvest behavior configuration (output directory, window, concurrency)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Directory per-task output files are written to (default: "./observations")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Maximum tasks processed concurrently (default: 7)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_tasks: usize,

    /// Days before today the harvest window starts at; the window runs from
    /// today minus `days_back` through yesterday, inclusive (default: 30)
    #[serde(default = "default_days_back")]
    pub days_back: u32,

    /// Species groups to harvest, in enumeration order
    #[serde(default = "crate::groups::insect_groups")]
    pub species_groups: Vec<GroupId>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_concurrent_tasks: default_max_concurrent(),
            days_back: default_days_back(),
            species_groups: crate::groups::insect_groups(),
        }
    }
}

/// Retry configuration for rate-limited page requests
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per page request, including the first (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false, keeping the backoff
    /// sequence deterministic)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// Main configuration for the harvester
///
/// Fields are organized into logical sub-configs:
/// - [`api`](ApiConfig) - remote endpoint, page size, request timeout
/// - [`harvest`](HarvestConfig) - output directory, window, concurrency
/// - [`retry`](RetryConfig) - backoff behavior for rate-limited requests
///
/// Sub-config fields are flattened for serialization, so the JSON format
/// stays a single flat object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API settings
    #[serde(flatten)]
    pub api: ApiConfig,

    /// Harvest behavior settings
    #[serde(flatten)]
    pub harvest: HarvestConfig,

    /// Retry behavior for rate-limited page requests
    #[serde(default)]
    pub retry: RetryConfig,
}

// Convenience accessors for the most commonly used settings.
impl Config {
    /// Output directory
    pub fn output_dir(&self) -> &PathBuf {
        &self.harvest.output_dir
    }

    /// Page size used for every request
    pub fn page_size(&self) -> usize {
        self.api.page_size
    }
}

fn default_base_url() -> String {
    "https://waarneming.nl/api/v1/observations/".to_string()
}

fn default_page_size() -> usize {
    100
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./observations")
}

fn default_max_concurrent() -> usize {
    7
}

fn default_days_back() -> u32 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
