//! Per-session output directory

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::error::{Result, TelemetryError};

/// Directory name format, from the session start time
pub const SESSION_DIR_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Create `<output_dir>/<YYYYmmdd_HHMMSS>` for a session started at `started`
///
/// Two sessions started within the same second get `_1`, `_2`, ... suffixes.
pub fn create_session_dir(output_dir: &Path, started: DateTime<Local>) -> Result<PathBuf> {
    fs::create_dir_all(output_dir).map_err(|source| TelemetryError::SessionDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let base = started.format(SESSION_DIR_FORMAT).to_string();
    let mut suffix = 0u32;
    loop {
        let name = match suffix {
            0 => base.clone(),
            n => format!("{base}_{n}"),
        };
        let path = output_dir.join(name);
        match fs::create_dir(&path) {
            Ok(()) => {
                info!(path = %path.display(), "session directory created");
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => suffix += 1,
            Err(source) => return Err(TelemetryError::SessionDir { path, source }),
        }
    }
}
