//! Telemetry error types

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Session log error
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Session directory could not be created
    #[error("failed to create session directory {path}: {source}")]
    SessionDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Log file could not be opened
    #[error("failed to open log {path}: {source}")]
    LogOpen {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Row could not be written
    #[error("failed to write {log} row: {source}")]
    Write {
        log: &'static str,
        #[source]
        source: csv::Error,
    },

    /// Collision writer thread is gone
    #[error("collision log writer is closed")]
    WriterClosed,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl TelemetryError {
    pub(crate) fn write(log: &'static str, source: csv::Error) -> Self {
        Self::Write { log, source }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, TelemetryError>;
