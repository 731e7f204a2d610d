//! Error types for a drive run.

use cockpit::CockpitError;
use session::{SessionError, Severity};
use thiserror::Error;

/// Errors that end a drive run
#[derive(Error, Debug)]
pub enum DriveError {
    /// Input device or display surface failure
    #[error("cockpit: {0}")]
    Cockpit(#[from] CockpitError),

    /// Simulator connection or world session failure
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl DriveError {
    /// Whether the run failed before any world resource was created
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Cockpit(CockpitError::NoInputDevice) => true,
            Self::Session(e) => e.severity() == Severity::Fatal,
            _ => false,
        }
    }
}

/// Result type alias for drive runs
pub type Result<T> = std::result::Result<T, DriveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(DriveError::from(CockpitError::NoInputDevice).is_fatal());

        let unreachable = SessionError::Connectivity {
            host: "localhost".to_string(),
            port: 2000,
            message: "refused".to_string(),
        };
        assert!(DriveError::from(unreachable).is_fatal());

        let leaked = SessionError::LeakedActors { count: 2 };
        assert!(!DriveError::from(leaked).is_fatal());
    }
}
