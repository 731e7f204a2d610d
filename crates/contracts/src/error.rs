//! Layered error definitions
//!
//! Categorized by source: config / simulator / sensor / recording

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Simulator Errors =====
    /// Simulator connection error
    #[error("simulator connection error: {message}")]
    SimulatorConnection { message: String },

    /// Spawn error
    #[error("spawn error for '{blueprint}': {message}")]
    Spawn { blueprint: String, message: String },

    /// Actor not found
    #[error("actor not found: {actor_id}")]
    ActorNotFound { actor_id: u32 },

    // ===== Sensor Errors =====
    /// Sensor payload could not be decoded
    #[error("payload decode error for sensor '{sensor_id}': {message}")]
    PayloadDecode { sensor_id: String, message: String },

    // ===== Recording Errors =====
    /// Log or video write error
    #[error("recording '{target}' write error: {message}")]
    RecordingWrite { target: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create spawn error
    pub fn spawn(blueprint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Spawn {
            blueprint: blueprint.into(),
            message: message.into(),
        }
    }

    /// Create payload decode error
    pub fn payload_decode(sensor_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PayloadDecode {
            sensor_id: sensor_id.into(),
            message: message.into(),
        }
    }

    /// Create recording write error
    pub fn recording_write(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RecordingWrite {
            target: target.into(),
            message: message.into(),
        }
    }
}
