//! # obs-harvest
//!
//! Concurrent harvester for paginated wildlife observation APIs.
//!
//! The harvester pulls observation records from a remote REST endpoint
//! across a two-dimensional key space (calendar day x species group),
//! tolerates rate limiting with exponential backoff, and persists results
//! incrementally to per-task CSV files so partial progress survives a crash
//! or restart. Downstream consumers (geographic filtering, statistics,
//! maps) read the output files; they are not part of this crate.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Sensible defaults** - Works out of the box against waarneming.nl
//! - **Event-driven** - Consumers subscribe to progress events, no polling
//! - **Failure isolation** - One task's terminal failure never aborts its
//!   siblings; the run summary names the gaps to re-fetch
//!
//! ## Quick Start
//!
//! ```no_run
//! use obs_harvest::{Config, Harvester};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let harvester = Harvester::new(Config::default())?;
//!
//!     // Subscribe to progress events
//!     let mut events = harvester.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = harvester.run().await?;
//!     println!(
//!         "{} records, {} failed tasks",
//!         summary.total_records(),
//!         summary.failed().len()
//!     );
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Remote observation API client
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Species-group catalog
pub mod groups;
/// Core harvester implementation (decomposed into focused submodules)
pub mod harvester;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types and events
pub mod types;
/// Append-only CSV persistence
pub mod writer;

// Re-export commonly used types
pub use client::{HttpObservationApi, ObservationApi, RawObservation, RawPage};
pub use config::{ApiConfig, Config, HarvestConfig, RetryConfig};
pub use error::{Error, Result};
pub use harvester::Harvester;
pub use types::{
    Event, FetchTask, GroupId, ObservationRecord, RunSummary, TaskOutcome, TaskStatus,
};

/// Helper function to run the harvester with graceful signal handling.
///
/// Starts the configured harvest and cancels it when a termination signal
/// arrives: submission of new tasks stops and in-flight tasks abort cleanly,
/// leaving their partially-written files intact.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal
///   registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use obs_harvest::{Config, Harvester, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let harvester = Harvester::new(Config::default())?;
///     let summary = run_with_shutdown(harvester).await?;
///     println!("fetched {} records", summary.total_records());
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(harvester: Harvester) -> Result<RunSummary> {
    let cancel = harvester.cancellation_token();
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Cancelling harvest, letting in-flight tasks wind down");
        cancel.cancel();
    });

    harvester.run().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
