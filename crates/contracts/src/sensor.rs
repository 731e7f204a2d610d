//! SensorPacket - sensor callback output
//!
//! Raw sensor data delivered by the simulator's callback threads.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{ActorId, Location};

/// Sensor data packet
///
/// Raw data received from a simulator sensor callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorPacket {
    /// Sensor ID (configuration id, e.g. "front")
    pub sensor_id: String,

    /// Sensor kind
    pub sensor_kind: SensorKind,

    /// Simulation timestamp (seconds)
    pub timestamp: f64,

    /// Simulator frame number (ordering/diagnostics)
    pub frame_id: Option<u64>,

    /// Data payload (zero-copy)
    pub payload: SensorPayload,
}

/// Sensor kinds mounted on the ego vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Camera,
    Collision,
}

impl SensorKind {
    /// CARLA blueprint id for this sensor kind
    pub fn blueprint(self) -> &'static str {
        match self {
            SensorKind::Camera => "sensor.camera.rgb",
            SensorKind::Collision => "sensor.other.collision",
        }
    }
}

/// Sensor data payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SensorPayload {
    /// Camera image
    Image(ImageData),

    /// Collision event
    Collision(CollisionEvent),
}

/// Image data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    /// Image width
    pub width: u32,

    /// Image height
    pub height: u32,

    /// Pixel format
    pub format: ImageFormat,

    /// Raw pixel data
    pub data: Bytes,
}

impl ImageData {
    /// Expected byte length for the declared geometry and format
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// Image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    /// CARLA raw camera output: B, G, R, A per pixel
    Bgra8,
    Rgb8,
}

impl ImageFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            ImageFormat::Bgra8 => 4,
            ImageFormat::Rgb8 => 3,
        }
    }
}

/// Collision event
///
/// `ego_location` is sampled by the sensor callback itself, so it reflects the
/// controlled vehicle's position at the moment of impact. It is `None` when the
/// parent vehicle is no longer alive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionEvent {
    /// Other actor handle, if it still exists
    pub other_actor_id: Option<ActorId>,

    /// Other actor type id (e.g. "static.pole", "vehicle.audi.a2")
    pub other_actor_type_id: String,

    /// Ego vehicle location at callback time
    pub ego_location: Option<Location>,
}

/// 3D vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_norm() {
        assert!((Vector3::new(3.0, 4.0, 0.0).norm() - 5.0).abs() < 1e-12);
        assert_eq!(Vector3::default().norm(), 0.0);
    }

    #[test]
    fn test_expected_len() {
        let image = ImageData {
            width: 4,
            height: 2,
            format: ImageFormat::Bgra8,
            data: Bytes::new(),
        };
        assert_eq!(image.expected_len(), 32);
    }
}
