//! Error types for obs-harvest
//!
//! A single [`Error`] enum covers the whole crate:
//! - Configuration problems (bad base URL, zero page size, ...)
//! - Request-level failures from the remote observation API
//! - Persistence failures while appending to output files
//!
//! The split between rate-limit responses ([`Error::RateLimited`]) and every
//! other request failure matters: retry classification in [`crate::retry`]
//! hangs off it.

use thiserror::Error;

/// Result type alias for obs-harvest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for obs-harvest
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "base_url")
        key: Option<String>,
    },

    /// Network-level failure (connect error, timeout, TLS, ...)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The remote API answered with HTTP 429
    #[error("rate limited by remote API (HTTP 429)")]
    RateLimited,

    /// The remote API answered with a non-success, non-429 status
    #[error("unexpected HTTP status {status} from remote API")]
    UnexpectedStatus {
        /// The HTTP status code that was returned
        status: u16,
    },

    /// The response body could not be decoded as the expected JSON shape
    #[error("malformed response body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    /// I/O error (output directory, file handling)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization or write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
