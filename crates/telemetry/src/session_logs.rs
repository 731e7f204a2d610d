//! The two log files of one session

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::{DateTime, Local};
use contracts::TelemetryRecord;
use metrics::counter;
use tracing::{info, instrument, warn};

use crate::collision_log::{CollisionLogHandle, CollisionLogger, COLLISION_LOG_FILE};
use crate::drive_log::{DriveLog, DRIVE_LOG_FILE};
use crate::error::Result;
use crate::session_dir::create_session_dir;

/// Row counts of a closed session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogSummary {
    pub drive_rows: u64,
    pub collision_rows: u64,
    pub collisions_dropped: u64,
}

/// Session directory plus drive and collision logs
pub struct SessionLogs {
    dir: PathBuf,
    driver: String,
    drive: DriveLog,
    collisions: CollisionLogger,
}

impl SessionLogs {
    /// Create the session directory and open both logs
    #[instrument(name = "session_logs_create", skip(output_dir, ego_alive), fields(driver = %driver))]
    pub fn create(
        output_dir: &Path,
        driver: &str,
        started: DateTime<Local>,
        ego_alive: Arc<AtomicBool>,
    ) -> Result<Self> {
        let dir = create_session_dir(output_dir, started)?;
        let drive = DriveLog::create(&dir.join(DRIVE_LOG_FILE))?;
        let collisions = CollisionLogger::open(&dir.join(COLLISION_LOG_FILE), driver, ego_alive)?;

        Ok(Self {
            dir,
            driver: driver.to_string(),
            drive,
            collisions,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// Append one drive-log row stamped now
    ///
    /// Write failures are logged, not returned; the control loop never stops
    /// on a log append.
    pub fn log_tick(&mut self, speed_kmh: f64, throttle: f64, brake: f64) {
        let record = TelemetryRecord {
            driver: self.driver.clone(),
            timestamp: Local::now(),
            speed_kmh,
            throttle,
            brake,
        };
        if let Err(e) = self.drive.append(&record) {
            counter!("carla_cockpit_drive_log_errors_total").increment(1);
            warn!(error = %e, "drive log append failed");
        }
    }

    /// Handle for the collision sensor callback
    pub fn collision_handle(&self) -> CollisionLogHandle {
        self.collisions.handle()
    }

    pub fn drive_rows(&self) -> u64 {
        self.drive.rows()
    }

    /// Flush and close both logs
    #[instrument(name = "session_logs_close", skip(self), fields(dir = %self.dir.display()))]
    pub fn close(self) -> LogSummary {
        let collisions_dropped = self.collisions.stats().dropped();
        let drive_rows = match self.drive.close() {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "drive log close failed");
                0
            }
        };
        let collision_rows = self.collisions.close();

        let summary = LogSummary {
            drive_rows,
            collision_rows,
            collisions_dropped,
        };
        info!(
            drive_rows,
            collision_rows, collisions_dropped, "session logs closed"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{CollisionEvent, Location};

    #[test]
    fn test_session_logs_layout() {
        let root = tempfile::tempdir().unwrap();
        let alive = Arc::new(AtomicBool::new(true));
        let mut logs = SessionLogs::create(root.path(), "Lee", Local::now(), alive).unwrap();

        logs.log_tick(12.3, 0.5, 0.0);
        logs.log_tick(12.9, 0.5, 0.0);
        logs.collision_handle().on_event(&CollisionEvent {
            other_actor_id: None,
            other_actor_type_id: "static.pole".to_string(),
            ego_location: Some(Location::new(10.0, 5.0, 0.0)),
        });

        let dir = logs.dir().to_path_buf();
        let summary = logs.close();
        assert_eq!(summary.drive_rows, 2);
        assert_eq!(summary.collision_rows, 1);
        assert!(dir.join(DRIVE_LOG_FILE).is_file());
        assert!(dir.join(COLLISION_LOG_FILE).is_file());
    }
}
