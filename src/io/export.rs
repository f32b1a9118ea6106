//! CSV export of the event log
//!
//! Exports are written as `simulator_<timestamp>.csv` with the fixed column
//! order `timestamp,imei,x,y`, header row first.

use crate::domain::SimulationEvent;
use chrono::Utc;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const CSV_HEADER: &str = "timestamp,imei,x,y";

/// Serialize the full ordered event sequence to CSV
pub fn csv_string(events: &[SimulationEvent]) -> String {
    let mut out = String::with_capacity(64 + events.len() * 48);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for event in events {
        let _ = writeln!(out, "{},{},{},{}", event.timestamp, event.imei, event.x, event.y);
    }
    out
}

/// Export writer for the event log
pub struct CsvExporter {
    dir: PathBuf,
}

impl CsvExporter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    /// Write the event log to a timestamp-named CSV file in the export
    /// directory, creating the directory if needed. Returns the path.
    pub fn export(&self, events: &[SimulationEvent]) -> std::io::Result<PathBuf> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }

        let name = format!("simulator_{}.csv", Utc::now().format("%Y-%m-%dT%H-%M-%S%.3f"));
        let path = self.dir.join(name);

        match fs::write(&path, csv_string(events)) {
            Ok(()) => {
                info!(path = %path.display(), rows = events.len(), "log_exported");
                Ok(path)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "log_export_failed");
                Err(e)
            }
        }
    }
}
