//! Task enumeration and pre-run output cleanup

use chrono::NaiveDate;
use std::path::Path;

use crate::error::Result;
use crate::types::{FetchTask, GroupId};

/// Build the full task set for an inclusive date span crossed with an
/// ordered set of species groups
///
/// Order is deterministic: date-major, then group order as configured.
/// Execution order is not guaranteed - the worker pool interleaves tasks.
/// An empty span (start after end) yields an empty set.
pub fn enumerate_tasks(start: NaiveDate, end: NaiveDate, groups: &[GroupId]) -> Vec<FetchTask> {
    let mut tasks = Vec::new();
    let mut day = start;
    while day <= end {
        for &group in groups {
            tasks.push(FetchTask::new(day, group));
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    tasks
}

/// Delete output files left behind by prior runs
///
/// Each invocation refetches its whole window from scratch, so files
/// matching the harvester's own naming pattern are removed up front.
/// Files with other names (combined outputs, downstream artifacts) are
/// left alone. Returns the number of files removed.
pub fn clean_previous_outputs(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if is_harvest_output(name) {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Whether a filename matches `observations_<date>_<group>.csv`
fn is_harvest_output(name: &str) -> bool {
    let Some(rest) = name.strip_prefix("observations_") else {
        return false;
    };
    let Some(stem) = rest.strip_suffix(".csv") else {
        return false;
    };
    let Some((date, group)) = stem.split_once('_') else {
        return false;
    };
    date.parse::<NaiveDate>().is_ok() && group.parse::<u32>().is_ok()
}
