//! # Telemetry
//!
//! Per-session output: a timestamped session directory holding the drive log
//! (one row per control tick) and the collision log (one row per collision
//! event, appended by a dedicated writer thread).

mod collision_log;
mod drive_log;
mod error;
mod session_dir;
mod session_logs;

pub use collision_log::{
    CollisionLogHandle, CollisionLogger, CollisionStats, COLLISION_LOG_FILE, COLLISION_LOG_HEADER,
};
pub use drive_log::{DriveLog, DRIVE_LOG_FILE, DRIVE_LOG_HEADER};
pub use error::{Result, TelemetryError};
pub use session_dir::{create_session_dir, SESSION_DIR_FORMAT};
pub use session_logs::{LogSummary, SessionLogs};
