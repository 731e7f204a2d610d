//! Capture error types

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Capture pipeline error
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Raw camera buffer could not be decoded
    #[error("failed to decode frame from camera '{camera}': {message}")]
    Decode { camera: String, message: String },

    /// Video file could not be opened
    #[error("failed to open video file {path}: {source}")]
    EncoderOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Camera index has no frame slot
    #[error("camera index {index} out of range ({slots} slots)")]
    SlotOutOfRange { index: usize, slots: usize },

    /// Encoder already closed
    #[error("encoder for camera '{camera}' is closed")]
    EncoderClosed { camera: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl CaptureError {
    /// Create decode error
    pub fn decode(camera: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            camera: camera.into(),
            message: message.into(),
        }
    }

}

/// Result alias
pub type Result<T> = std::result::Result<T, CaptureError>;
