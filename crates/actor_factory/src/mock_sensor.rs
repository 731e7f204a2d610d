//! Mock sensor implementation
//!
//! Implements `SensorSource` trait, generates simulated sensor data.
//! Used for testing and development without CARLA environment.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use contracts::{
    CallbackGate, ImageData, ImageFormat, SensorDataCallback, SensorKind, SensorPacket,
    SensorPayload, SensorSource,
};
use tracing::{debug, trace};

/// Mock sensor configuration
#[derive(Debug, Clone)]
pub struct MockSensorConfig {
    /// Send frequency (Hz). `None` disables the background generator; packets
    /// then arrive only through the owning gate.
    pub frequency_hz: Option<f64>,
    /// Image width (Camera only)
    pub image_width: u32,
    /// Image height (Camera only)
    pub image_height: u32,
}

impl Default for MockSensorConfig {
    fn default() -> Self {
        Self {
            frequency_hz: Some(20.0),
            image_width: 800,
            image_height: 600,
        }
    }
}

/// Hook invoked once when a listening sensor is stopped
pub type StopHook = Arc<dyn Fn() + Send + Sync>;

/// Mock sensor
///
/// Implements `SensorSource` trait. Camera sensors with a frequency generate
/// BGRA test frames in a background thread; every packet, generated or
/// injected, is delivered through the sensor's `CallbackGate`, consistent
/// with real CARLA sensor behavior.
pub struct MockSensor {
    sensor_id: String,
    kind: SensorKind,
    config: MockSensorConfig,
    gate: CallbackGate,
    running: Arc<AtomicBool>,
    on_stop: Option<StopHook>,
}

impl MockSensor {
    /// Create new Mock sensor
    pub fn new(sensor_id: String, kind: SensorKind, config: MockSensorConfig) -> Self {
        Self::with_gate(sensor_id, kind, config, CallbackGate::new())
    }

    /// Create Mock sensor with default configuration
    pub fn with_defaults(sensor_id: String, kind: SensorKind) -> Self {
        Self::new(sensor_id, kind, MockSensorConfig::default())
    }

    /// Create Mock sensor delivering through an externally owned gate
    pub fn with_gate(
        sensor_id: String,
        kind: SensorKind,
        config: MockSensorConfig,
        gate: CallbackGate,
    ) -> Self {
        Self {
            sensor_id,
            kind,
            config,
            gate,
            running: Arc::new(AtomicBool::new(false)),
            on_stop: None,
        }
    }

    /// Register a hook run when the sensor is stopped
    pub fn with_stop_hook(mut self, hook: StopHook) -> Self {
        self.on_stop = Some(hook);
        self
    }

    /// Gate shared with whoever injects packets
    pub fn gate(&self) -> CallbackGate {
        self.gate.clone()
    }

    /// Generate a BGRA test frame whose blue channel encodes the frame number
    pub fn generate_image(width: u32, height: u32, frame_id: u64) -> ImageData {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[(frame_id % 256) as u8, (y % 256) as u8, (x % 256) as u8, 255]);
            }
        }
        ImageData {
            width,
            height,
            format: ImageFormat::Bgra8,
            data: Bytes::from(data),
        }
    }

    fn spawn_generator(&self, frequency_hz: f64) {
        let sensor_id = self.sensor_id.clone();
        let kind = self.kind;
        let (width, height) = (self.config.image_width, self.config.image_height);
        let gate = self.gate.clone();
        let running = self.running.clone();
        let interval = Duration::from_secs_f64(1.0 / frequency_hz);

        thread::spawn(move || {
            let mut frame_id: u64 = 0;
            let start_time = std::time::Instant::now();

            debug!(sensor_id = %sensor_id, frequency_hz, "mock sensor started");

            while running.load(Ordering::Relaxed) {
                frame_id += 1;
                let packet = SensorPacket {
                    sensor_id: sensor_id.clone(),
                    sensor_kind: kind,
                    timestamp: start_time.elapsed().as_secs_f64(),
                    frame_id: Some(frame_id),
                    payload: SensorPayload::Image(Self::generate_image(width, height, frame_id)),
                };

                if !gate.deliver(packet) {
                    break;
                }
                trace!(sensor_id = %sensor_id, frame_id, "mock packet sent");

                thread::sleep(interval);
            }

            debug!(sensor_id = %sensor_id, "mock sensor stopped");
        });
    }
}

impl SensorSource for MockSensor {
    fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    fn sensor_kind(&self) -> SensorKind {
        self.kind
    }

    fn listen(&self, callback: SensorDataCallback) {
        // Idempotent: if already listening, don't start again
        if !self.gate.open(callback) {
            return;
        }
        self.running.store(true, Ordering::SeqCst);

        if let (SensorKind::Camera, Some(frequency_hz)) = (self.kind, self.config.frequency_hz) {
            if frequency_hz > 0.0 {
                self.spawn_generator(frequency_hz);
            }
        }
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if self.gate.close() {
            if let Some(hook) = &self.on_stop {
                hook();
            }
        }
    }

    fn is_listening(&self) -> bool {
        self.gate.is_open()
    }
}
