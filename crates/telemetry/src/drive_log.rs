//! Drive log: one row per control tick

use std::fs::File;
use std::path::{Path, PathBuf};

use contracts::{TelemetryRecord, LOG_TIMESTAMP_FORMAT};
use csv::Writer;
use tracing::{debug, instrument};

use crate::error::{Result, TelemetryError};

/// File name inside the session directory
pub const DRIVE_LOG_FILE: &str = "drive_log.csv";

/// Header row
pub const DRIVE_LOG_HEADER: [&str; 5] = ["Driver", "Timestamp", "Speed_kmh", "Throttle", "Brake"];

/// Append-only drive log
///
/// Rows go through a buffered writer owned by the control loop; the buffer is
/// flushed on `close` and on drop.
pub struct DriveLog {
    path: PathBuf,
    writer: Writer<File>,
    rows: u64,
}

impl DriveLog {
    /// Create the file and write the header row
    pub fn create(path: &Path) -> Result<Self> {
        let mut writer = Writer::from_path(path).map_err(|source| TelemetryError::LogOpen {
            path: path.to_path_buf(),
            source,
        })?;
        writer
            .write_record(DRIVE_LOG_HEADER)
            .map_err(|e| TelemetryError::write("drive", e))?;
        debug!(path = %path.display(), "drive log opened");

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            rows: 0,
        })
    }

    /// Append one row
    pub fn append(&mut self, record: &TelemetryRecord) -> Result<()> {
        self.writer
            .write_record([
                record.driver.clone(),
                record.timestamp.format(LOG_TIMESTAMP_FORMAT).to_string(),
                format!("{:.2}", record.speed_kmh),
                format!("{:.2}", record.throttle),
                format!("{:.2}", record.brake),
            ])
            .map_err(|e| TelemetryError::write("drive", e))?;
        self.rows += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Rows written so far (header excluded)
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and close, returning the row count
    #[instrument(name = "drive_log_close", skip(self), fields(path = %self.path.display()))]
    pub fn close(mut self) -> Result<u64> {
        self.writer.flush()?;
        debug!(rows = self.rows, "drive log closed");
        Ok(self.rows)
    }
}
