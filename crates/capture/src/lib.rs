//! # Capture
//!
//! Camera capture pipeline: decodes simulator camera buffers, keeps the latest
//! frame of every camera in a frame slot and streams recorded cameras to
//! per-camera video files.
//!
//! ```ignore
//! let mut pipeline = CapturePipeline::new(cameras.len(), recording);
//! for (index, (config, source)) in cameras.iter().zip(sources).enumerate() {
//!     pipeline.attach_camera(index, config, source)?;
//! }
//! // ... HUD reads pipeline.slots() every tick ...
//! pipeline.stop_all();
//! let report = pipeline.finalize();
//! ```

mod decode;
mod encoder;
mod error;
mod frame_slot;
mod pipeline;

pub use decode::{bgra_to_rgb, decode_image, RgbFrame};
pub use encoder::{frame_rate_ratio, EncoderHandle, EncoderStats, Y4mWriter};
pub use error::{CaptureError, Result};
pub use frame_slot::{FrameSlot, FrameSlots};
pub use pipeline::{
    CameraHandle, CameraReport, CameraStats, CameraStatsSnapshot, CaptureReport,
    CapturePipeline, RecordingOptions,
};
