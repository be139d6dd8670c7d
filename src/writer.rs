//! Append-only CSV persistence for per-task output files
//!
//! Each task owns exactly one output file, named after its date and group.
//! Writes are append-only so a re-run against an already-partially-populated
//! file resumes by appending. The header row is written exactly once, when
//! the file is created; nothing is deduplicated at write time (combining
//! files and deduplicating on `id` is a downstream concern).

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::Result;
use crate::types::ObservationRecord;

/// Output file column names, in contract order
const COLUMNS: [&str; 10] = [
    "id",
    "common_name",
    "scientific_name",
    "date",
    "time",
    "count",
    "longitude",
    "latitude",
    "location",
    "observer",
];

/// Appends normalized records to one task's output file
pub struct ObservationWriter {
    writer: csv::Writer<std::fs::File>,
}

impl ObservationWriter {
    /// Open the output file for appending, creating it if needed
    ///
    /// The header row is emitted if and only if the file did not already
    /// hold data when the task began, which keeps the header unique across
    /// any number of append calls and re-runs.
    pub fn open(path: &Path) -> Result<Self> {
        let needs_header = match std::fs::metadata(path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(COLUMNS)?;
        }

        Ok(Self { writer })
    }

    /// Append a batch of records
    pub fn append(&mut self, records: &[ObservationRecord]) -> Result<()> {
        for record in records {
            self.writer.serialize(record)?;
        }
        Ok(())
    }

    /// Flush buffered rows to disk
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
