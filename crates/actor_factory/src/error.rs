//! Actor Factory error types

use contracts::{ActorId, ContractError};
use thiserror::Error;

/// Actor Factory specific error
#[derive(Debug, Error)]
pub enum ActorFactoryError {
    /// CARLA connection error
    #[error("failed to connect to CARLA: {message}")]
    ConnectionFailed { message: String },

    /// Map load error
    #[error("failed to load map '{map}': {message}")]
    MapLoadFailed { map: String, message: String },

    /// No blueprint matched
    #[error("no blueprint matches '{filter}'")]
    BlueprintNotFound { filter: String },

    /// Every candidate spawn point was occupied
    #[error("spawn exhausted for '{blueprint}': {attempts} spawn points tried, all occupied")]
    SpawnExhausted { blueprint: String, attempts: usize },

    /// Sensor spawn error
    #[error("failed to spawn sensor '{sensor_id}': {message}")]
    SensorSpawnFailed { sensor_id: String, message: String },

    /// Actor not found
    #[error("actor {actor_id} not found")]
    ActorNotFound { actor_id: ActorId },

    /// Walker controller error
    #[error("walker controller {actor_id} failed: {message}")]
    ControllerFailed { actor_id: ActorId, message: String },

    /// Destroy error
    #[error("failed to destroy actor {actor_id}: {message}")]
    DestroyFailed { actor_id: ActorId, message: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl ActorFactoryError {
    /// Create map load error
    pub fn map_load(map: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MapLoadFailed {
            map: map.into(),
            message: message.into(),
        }
    }

    /// Create sensor spawn error
    pub fn sensor_spawn(sensor_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SensorSpawnFailed {
            sensor_id: sensor_id.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ActorFactoryError>;
