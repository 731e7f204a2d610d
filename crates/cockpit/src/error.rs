//! Cockpit error types

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Input, HUD and display errors
#[derive(Debug, Error)]
pub enum CockpitError {
    /// No input device is available
    #[error("no input device detected")]
    NoInputDevice,

    /// Input script could not be read or parsed
    #[error("invalid input script {path}: {message}")]
    Script { path: PathBuf, message: String },

    /// Input device stopped responding
    #[error("input device '{device}' failed: {message}")]
    Device { device: String, message: String },

    /// Snapshot could not be written
    #[error("failed to write snapshot {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl CockpitError {
    /// Create script error
    pub fn script(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Script {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, CockpitError>;
