//! Camera capture pipeline
//!
//! Each attached camera gets a callback that decodes the raw buffer, stores it
//! in the camera's frame slot and, when recording, queues the same frame for
//! that camera's encoder.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_channel::Sender;
use contracts::{CameraConfig, SensorPacket, SensorPayload, SensorSource};
use metrics::counter;
use tracing::{debug, info, instrument, trace, warn};

use crate::decode::{decode_image, RgbFrame};
use crate::encoder::{EncoderHandle, EncoderStats};
use crate::error::{CaptureError, Result};
use crate::frame_slot::FrameSlots;

/// Recording settings of one session
#[derive(Debug, Clone)]
pub struct RecordingOptions {
    /// Global recording switch
    pub enabled: bool,
    /// Directory receiving `camera_<index>.y4m`; `None` disables recording
    pub session_dir: Option<PathBuf>,
    /// Container frame rate
    pub frame_rate: f64,
    /// Encoder queue capacity (frames)
    pub queue_capacity: usize,
}

impl RecordingOptions {
    /// Recording switched off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            session_dir: None,
            frame_rate: 20.0,
            queue_capacity: 8,
        }
    }
}

/// Per-camera delivery counters
#[derive(Debug, Default)]
pub struct CameraStats {
    pub frames_delivered: AtomicU64,
    pub decode_errors: AtomicU64,
    pub frames_queued: AtomicU64,
    pub frames_rejected: AtomicU64,
}

impl CameraStats {
    pub fn snapshot(&self) -> CameraStatsSnapshot {
        CameraStatsSnapshot {
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            frames_queued: self.frames_queued.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Camera counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraStatsSnapshot {
    /// Frames decoded and stored in the slot
    pub frames_delivered: u64,
    /// Buffers that failed to decode
    pub decode_errors: u64,
    /// Frames handed to the encoder
    pub frames_queued: u64,
    /// Frames refused by a closed encoder
    pub frames_rejected: u64,
}

/// Result of attaching one camera
#[derive(Debug, Clone, PartialEq)]
pub struct CameraHandle {
    pub index: usize,
    pub camera_id: String,
    /// Whether an encoder is running for this camera
    pub recording: bool,
    pub video_path: Option<PathBuf>,
}

/// Per-camera summary produced by [`CapturePipeline::finalize`]
#[derive(Debug, Clone)]
pub struct CameraReport {
    pub index: usize,
    pub camera_id: String,
    pub video_path: Option<PathBuf>,
    pub stats: CameraStatsSnapshot,
    pub encoder: Option<EncoderStats>,
}

/// Capture summary of one session
#[derive(Debug, Clone, Default)]
pub struct CaptureReport {
    pub cameras: Vec<CameraReport>,
}

impl CaptureReport {
    pub fn frames_delivered(&self) -> u64 {
        self.cameras.iter().map(|c| c.stats.frames_delivered).sum()
    }

    pub fn frames_encoded(&self) -> u64 {
        self.cameras
            .iter()
            .filter_map(|c| c.encoder)
            .map(|e| e.frames_written)
            .sum()
    }
}

struct AttachedCamera {
    handle: CameraHandle,
    source: Box<dyn SensorSource>,
    encoder: Option<EncoderHandle>,
    stats: Arc<CameraStats>,
}

/// Capture pipeline of one session
pub struct CapturePipeline {
    slots: FrameSlots,
    cameras: Vec<AttachedCamera>,
    recording: RecordingOptions,
}

impl CapturePipeline {
    /// Create a pipeline with `slot_count` empty frame slots
    pub fn new(slot_count: usize, recording: RecordingOptions) -> Self {
        Self {
            slots: FrameSlots::new(slot_count),
            cameras: Vec::with_capacity(slot_count),
            recording,
        }
    }

    /// Attach a camera source to slot `index` and start listening
    ///
    /// An encoder that cannot be opened disables recording for this camera
    /// only; the camera is still displayed.
    ///
    /// # Errors
    /// `SlotOutOfRange` if `index` has no frame slot.
    #[instrument(
        name = "capture_attach_camera",
        skip(self, config, source),
        fields(camera = %config.id, index)
    )]
    pub fn attach_camera(
        &mut self,
        index: usize,
        config: &CameraConfig,
        source: Box<dyn SensorSource>,
    ) -> Result<CameraHandle> {
        if index >= self.slots.len() {
            return Err(CaptureError::SlotOutOfRange {
                index,
                slots: self.slots.len(),
            });
        }

        let encoder = self.open_encoder(index, config);
        let handle = CameraHandle {
            index,
            camera_id: config.id.clone(),
            recording: encoder.is_some(),
            video_path: encoder.as_ref().map(|e| e.path().to_path_buf()),
        };

        let stats = Arc::new(CameraStats::default());
        let callback = frame_callback(
            config.id.clone(),
            index,
            self.slots.clone(),
            encoder.as_ref().map(EncoderHandle::sender),
            stats.clone(),
        );
        source.listen(Arc::new(callback));

        info!(
            recording = handle.recording,
            width = config.width,
            height = config.height,
            "camera attached"
        );
        self.cameras.push(AttachedCamera {
            handle: handle.clone(),
            source,
            encoder,
            stats,
        });
        Ok(handle)
    }

    fn open_encoder(&self, index: usize, config: &CameraConfig) -> Option<EncoderHandle> {
        if !self.recording.enabled || !config.record {
            return None;
        }
        let dir = self.recording.session_dir.as_ref()?;
        let path = dir.join(format!("camera_{index}.y4m"));

        match EncoderHandle::open(
            &config.id,
            &path,
            config.width,
            config.height,
            self.recording.frame_rate,
            self.recording.queue_capacity,
        ) {
            Ok(encoder) => Some(encoder),
            Err(e) => {
                counter!("carla_cockpit_encoder_open_failed_total", "camera" => config.id.clone())
                    .increment(1);
                warn!(camera = %config.id, error = %e, "recording disabled for camera");
                None
            }
        }
    }

    /// Stop every camera callback; returns once no callback is running
    #[instrument(name = "capture_stop_all", skip(self))]
    pub fn stop_all(&self) {
        for camera in &self.cameras {
            if camera.source.is_listening() {
                debug!(camera = %camera.handle.camera_id, "stopping camera");
                camera.source.stop();
            }
        }
    }

    /// Stop cameras, close every encoder and empty the frame slots
    #[instrument(name = "capture_finalize", skip(self))]
    pub fn finalize(&mut self) -> CaptureReport {
        self.stop_all();

        let cameras = self
            .cameras
            .drain(..)
            .map(|mut camera| CameraReport {
                encoder: camera.encoder.take().map(EncoderHandle::finish),
                index: camera.handle.index,
                camera_id: camera.handle.camera_id,
                video_path: camera.handle.video_path,
                stats: camera.stats.snapshot(),
            })
            .collect();
        self.slots.reset();

        let report = CaptureReport { cameras };
        info!(
            frames_delivered = report.frames_delivered(),
            frames_encoded = report.frames_encoded(),
            "capture finalized"
        );
        report
    }

    /// Frame slots read by the HUD
    pub fn slots(&self) -> &FrameSlots {
        &self.slots
    }

    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    /// Attached camera handles, in attach order
    pub fn handles(&self) -> impl Iterator<Item = &CameraHandle> {
        self.cameras.iter().map(|c| &c.handle)
    }

    /// Counters of the camera attached to slot `index`
    pub fn camera_stats(&self, index: usize) -> Option<CameraStatsSnapshot> {
        self.cameras
            .iter()
            .find(|c| c.handle.index == index)
            .map(|c| c.stats.snapshot())
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}

fn frame_callback(
    camera: String,
    index: usize,
    slots: FrameSlots,
    encoder: Option<Sender<Arc<RgbFrame>>>,
    stats: Arc<CameraStats>,
) -> impl Fn(SensorPacket) + Send + Sync + 'static {
    move |packet: SensorPacket| {
        let SensorPayload::Image(image) = &packet.payload else {
            trace!(camera = %camera, "ignoring non-image packet");
            return;
        };

        let frame = match decode_image(&camera, image) {
            Ok(frame) => Arc::new(frame),
            Err(e) => {
                stats.decode_errors.fetch_add(1, Ordering::Relaxed);
                warn!(camera = %camera, error = %e, "dropping undecodable frame");
                return;
            }
        };

        if let Some(slot) = slots.get(index) {
            slot.store(frame.clone());
        }
        stats.frames_delivered.fetch_add(1, Ordering::Relaxed);
        counter!("carla_cockpit_frames_delivered_total", "camera" => camera.clone()).increment(1);

        if let Some(tx) = &encoder {
            if tx.send_blocking(frame).is_ok() {
                stats.frames_queued.fetch_add(1, Ordering::Relaxed);
            } else {
                stats.frames_rejected.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actor_factory::{MockSensor, MockSensorConfig};
    use bytes::Bytes;
    use contracts::{ImageData, ImageFormat, SensorKind};

    fn camera(id: &str, width: u32, height: u32, record: bool) -> CameraConfig {
        CameraConfig {
            id: id.to_string(),
            width,
            height,
            record,
            ..CameraConfig::default_rig()[0].clone()
        }
    }

    fn manual_sensor(id: &str) -> (Box<dyn SensorSource>, contracts::CallbackGate) {
        let sensor = MockSensor::new(
            id.to_string(),
            SensorKind::Camera,
            MockSensorConfig {
                frequency_hz: None,
                ..Default::default()
            },
        );
        let gate = sensor.gate();
        (Box::new(sensor), gate)
    }

    fn image_packet(id: &str, width: u32, height: u32, frame: u64) -> SensorPacket {
        SensorPacket {
            sensor_id: id.to_string(),
            sensor_kind: SensorKind::Camera,
            timestamp: frame as f64 * 0.05,
            frame_id: Some(frame),
            payload: SensorPayload::Image(MockSensor::generate_image(width, height, frame)),
        }
    }

    fn recording(dir: &std::path::Path) -> RecordingOptions {
        RecordingOptions {
            enabled: true,
            session_dir: Some(dir.to_path_buf()),
            frame_rate: 20.0,
            queue_capacity: 4,
        }
    }

    #[test]
    fn test_delivered_frame_reaches_slot_and_encoder() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = CapturePipeline::new(1, recording(dir.path()));
        let (source, gate) = manual_sensor("front");

        let handle = pipeline
            .attach_camera(0, &camera("front", 4, 2, true), source)
            .unwrap();
        assert!(handle.recording);

        for frame in 0..3 {
            assert!(gate.deliver(image_packet("front", 4, 2, frame)));
        }
        let latest = pipeline.slots().latest(0).unwrap();
        // BGRA [frame, y, x, 255] decodes to RGB [x, y, frame]
        assert_eq!(latest.pixel(3, 1), Some([3, 1, 2]));

        let report = pipeline.finalize();
        assert_eq!(report.frames_delivered(), 3);
        assert_eq!(report.frames_encoded(), 3);
        assert!(dir.path().join("camera_0.y4m").exists());
        assert_eq!(pipeline.slots().filled(), 0);
    }

    #[test]
    fn test_recording_disabled_camera_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = CapturePipeline::new(2, recording(dir.path()));
        let (front, front_gate) = manual_sensor("front");
        let (rear, rear_gate) = manual_sensor("rear");

        pipeline
            .attach_camera(0, &camera("front", 2, 2, true), front)
            .unwrap();
        let rear_handle = pipeline
            .attach_camera(1, &camera("rear", 2, 2, false), rear)
            .unwrap();
        assert!(!rear_handle.recording);
        assert!(rear_handle.video_path.is_none());

        front_gate.deliver(image_packet("front", 2, 2, 0));
        rear_gate.deliver(image_packet("rear", 2, 2, 0));
        assert_eq!(pipeline.slots().get(1).unwrap().sequence(), 1);
        rear_gate.deliver(image_packet("rear", 2, 2, 1));
        assert_eq!(pipeline.slots().get(1).unwrap().sequence(), 2);

        pipeline.finalize();
        assert!(dir.path().join("camera_0.y4m").exists());
        assert!(!dir.path().join("camera_1.y4m").exists());
    }

    #[test]
    fn test_encoder_open_failure_keeps_display() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not_created");
        let mut pipeline = CapturePipeline::new(1, recording(&missing));
        let (source, gate) = manual_sensor("front");

        let handle = pipeline
            .attach_camera(0, &camera("front", 2, 2, true), source)
            .unwrap();
        assert!(!handle.recording);

        gate.deliver(image_packet("front", 2, 2, 0));
        assert!(pipeline.slots().latest(0).is_some());
        assert_eq!(pipeline.camera_stats(0).unwrap().frames_delivered, 1);
    }

    #[test]
    fn test_bad_buffer_counts_decode_error() {
        let mut pipeline = CapturePipeline::new(1, RecordingOptions::disabled());
        let (source, gate) = manual_sensor("front");
        pipeline
            .attach_camera(0, &camera("front", 2, 2, false), source)
            .unwrap();

        let mut packet = image_packet("front", 2, 2, 0);
        packet.payload = SensorPayload::Image(ImageData {
            width: 2,
            height: 2,
            format: ImageFormat::Bgra8,
            data: Bytes::from_static(&[0; 5]),
        });
        gate.deliver(packet);

        let stats = pipeline.camera_stats(0).unwrap();
        assert_eq!(stats.decode_errors, 1);
        assert_eq!(stats.frames_delivered, 0);
        assert!(pipeline.slots().latest(0).is_none());
    }

    #[test]
    fn test_stop_all_silences_callbacks() {
        let mut pipeline = CapturePipeline::new(1, RecordingOptions::disabled());
        let (source, gate) = manual_sensor("front");
        pipeline
            .attach_camera(0, &camera("front", 2, 2, false), source)
            .unwrap();

        pipeline.stop_all();
        assert!(!gate.deliver(image_packet("front", 2, 2, 0)));
        assert!(pipeline.slots().latest(0).is_none());
    }

    #[test]
    fn test_attach_out_of_range() {
        let mut pipeline = CapturePipeline::new(1, RecordingOptions::disabled());
        let (source, _gate) = manual_sensor("extra");
        let result = pipeline.attach_camera(3, &camera("extra", 2, 2, false), source);
        assert!(matches!(
            result,
            Err(CaptureError::SlotOutOfRange { index: 3, slots: 1 })
        ));
    }
}
