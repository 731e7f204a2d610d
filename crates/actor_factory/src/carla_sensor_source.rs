//! CARLA Sensor SensorSource wrapper
//!
//! Wraps CARLA native Sensor as a type implementing `SensorSource` trait.
//! Only compiled when `real-carla` feature is enabled.

use carla::client::Sensor;
use contracts::{CallbackGate, SensorDataCallback, SensorKind, SensorSource};
use tracing::{debug, trace, warn};

use crate::sensor_data_converter::convert_sensor_data;

/// CARLA Sensor wrapper
///
/// Wraps CARLA native `Sensor` as `SensorSource`,
/// allowing the capture pipeline to handle real sensors and Mock sensors uniformly.
pub struct CarlaSensorSource {
    sensor_id: String,
    kind: SensorKind,
    sensor: Sensor,
    gate: CallbackGate,
}

impl CarlaSensorSource {
    /// Create new CARLA sensor source
    pub fn new(sensor_id: String, kind: SensorKind, sensor: Sensor) -> Self {
        Self {
            sensor_id,
            kind,
            sensor,
            gate: CallbackGate::new(),
        }
    }
}

impl SensorSource for CarlaSensorSource {
    fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    fn sensor_kind(&self) -> SensorKind {
        self.kind
    }

    fn listen(&self, callback: SensorDataCallback) {
        // Idempotent: if already listening, don't register again
        if !self.gate.open(callback) {
            warn!(sensor_id = %self.sensor_id, "sensor already listening");
            return;
        }

        let sensor_id = self.sensor_id.clone();
        let kind = self.kind;
        let gate = self.gate.clone();

        debug!(sensor_id = %sensor_id, kind = ?kind, "starting CARLA sensor");

        self.sensor.listen(move |sensor_data| {
            match convert_sensor_data(&sensor_id, kind, &sensor_data) {
                Some(packet) => {
                    trace!(sensor_id = %sensor_id, frame_id = packet.frame_id, "CARLA sensor data received");
                    gate.deliver(packet);
                }
                None => {
                    trace!(sensor_id = %sensor_id, "failed to convert sensor data");
                }
            }
        });
    }

    fn stop(&self) {
        // Closing the gate first guarantees no callback runs after return,
        // even if the server delivers one more measurement.
        if self.gate.close() {
            debug!(sensor_id = %self.sensor_id, "stopping CARLA sensor");
            self.sensor.stop();
        }
    }

    fn is_listening(&self) -> bool {
        self.gate.is_open()
    }
}
