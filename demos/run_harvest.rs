//! Harvest the default window and print a gap report
//!
//! This demo runs the harvester with default settings:
//! - the waarneming.nl observation API
//! - all nine insect species groups
//! - the last 30 days, 7 tasks at a time
//!
//! Press Ctrl+C to cancel; in-flight tasks abort cleanly and already
//! written files are kept.

use obs_harvest::{Config, Event, Harvester, groups, run_with_shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let harvester = Harvester::new(Config::default())?;

    // Print page-level progress as it happens
    let mut events = harvester.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let Event::PageFetched {
                task,
                records,
                offset,
            } = event
            {
                println!(
                    "  {} [{}]: +{} records at offset {}",
                    task,
                    groups::label(task.group).unwrap_or("unknown group"),
                    records,
                    offset
                );
            }
        }
    });

    let summary = run_with_shutdown(harvester).await?;

    println!(
        "\nFetched {} records in {:.1}s",
        summary.total_records(),
        summary.elapsed.as_secs_f64()
    );
    for outcome in &summary.outcomes {
        println!(
            "  {}: {} records ({:?})",
            outcome.task, outcome.records, outcome.status
        );
    }

    let failed = summary.failed();
    if !failed.is_empty() {
        println!("\n{} task(s) terminated early, re-run these gaps:", failed.len());
        for outcome in failed {
            println!(
                "  {} - {}",
                outcome.task,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}
