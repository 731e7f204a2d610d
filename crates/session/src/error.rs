//! Session error types

use actor_factory::ActorFactoryError;
use capture::CaptureError;
use contracts::ContractError;
use telemetry::TelemetryError;
use thiserror::Error;

/// How far an error propagates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Process cannot start; nothing was created
    Fatal,
    /// The current session is lost; torn-down resources stay torn down
    SessionFatal,
}

/// World session error
#[derive(Debug, Error)]
pub enum SessionError {
    /// Simulator did not answer within the connect timeout
    #[error("cannot reach simulator at {host}:{port}: {message}")]
    Connectivity {
        host: String,
        port: u16,
        message: String,
    },

    /// Map could not be loaded
    #[error("failed to load map '{map}': {source}")]
    MapLoad {
        map: String,
        #[source]
        source: ActorFactoryError,
    },

    /// Every ego spawn point was occupied
    #[error("ego spawn exhausted on '{map}': {attempts} spawn points tried")]
    SpawnExhaustion { map: String, attempts: usize },

    /// Actors of the previous session survived teardown
    #[error("{count} actors survived teardown before respawn")]
    LeakedActors { count: usize },

    /// No session is loaded
    #[error("no world session is loaded")]
    NoSession,

    /// Town index outside the configured town list
    #[error("town index {index} out of range ({towns} towns)")]
    UnknownTown { index: usize, towns: usize },

    /// Actor factory error
    #[error(transparent)]
    ActorFactory(#[from] ActorFactoryError),

    /// Capture pipeline error
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Session log error
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl SessionError {
    /// Propagation class
    pub fn severity(&self) -> Severity {
        match self {
            SessionError::Connectivity { .. } => Severity::Fatal,
            _ => Severity::SessionFatal,
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity() {
        let connect = SessionError::Connectivity {
            host: "localhost".to_string(),
            port: 2000,
            message: "timed out".to_string(),
        };
        assert_eq!(connect.severity(), Severity::Fatal);

        let spawn = SessionError::SpawnExhaustion {
            map: "Town02".to_string(),
            attempts: 3,
        };
        assert_eq!(spawn.severity(), Severity::SessionFatal);
        assert_eq!(
            SessionError::LeakedActors { count: 2 }.severity(),
            Severity::SessionFatal
        );
    }
}
