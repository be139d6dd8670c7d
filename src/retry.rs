//! Retry logic with exponential backoff
//!
//! This module decides whether a failed page request gets another attempt.
//! The policy is deliberately narrow: only rate-limit responses (HTTP 429)
//! are transient-retryable - the remote resolves them by itself if the
//! client backs off. Every other failure (network error, unexpected status,
//! malformed body) aborts the page immediately and is surfaced to the
//! pagination loop.
//!
//! # Example
//!
//! ```no_run
//! use obs_harvest::retry::fetch_with_retry;
//! use obs_harvest::config::RetryConfig;
//! use obs_harvest::error::Error;
//!
//! # async fn example() -> Result<(), Error> {
//! let config = RetryConfig::default();
//! let result = fetch_with_retry(&config, || async {
//!     // Your page request here
//!     Ok::<_, Error>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (the remote asking us to slow down) should return
/// `true`. Permanent failures (bad parameters, server errors, garbled
/// responses) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

/// Implementation of IsRetryable for our Error type
///
/// Only [`Error::RateLimited`] qualifies. Plain network timeouts arguably
/// deserve the same backoff treatment, but retrying them has historically
/// masked persistent problems (bad parameters, dead endpoints) and wasted
/// run time, so they abort the page instead.
impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimited)
    }
}

/// Execute an async page fetch with exponential backoff retry logic
///
/// # Arguments
///
/// * `config` - Retry configuration (attempt cap, delays, backoff multiplier, jitter)
/// * `operation` - Async closure returning `Result<T, E>` where `E` implements [`IsRetryable`]
///
/// # Returns
///
/// The successful result, or the last error once `config.max_attempts` total
/// attempts (including the first) are exhausted or a non-retryable error
/// occurs. Backoff delays grow by `backoff_multiplier` per retry, capped at
/// `max_delay`.
pub async fn fetch_with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt: u32 = 1;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Request succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "Request failed, retrying"
                );

                let jittered_delay = if config.jitter { add_jitter(delay) } else { delay };

                tokio::time::sleep(jittered_delay).await;

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Request failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(error = %e, "Request failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// actual delay lands between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
