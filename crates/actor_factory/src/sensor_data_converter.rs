//! CARLA sensor data conversion
//!
//! Converts CARLA native sensor data into `SensorPacket`.
//! Only compiled when `real-carla` feature is enabled.

use bytes::Bytes;
use carla::client::ActorBase;
use carla::sensor::data::{CollisionEvent as CarlaCollisionEvent, Image};
use carla::sensor::{SensorData, SensorDataBase};
use contracts::{
    CollisionEvent, ImageData, ImageFormat, Location, SensorKind, SensorPacket, SensorPayload,
};

/// Convert CARLA Image into SensorPayload (raw BGRA bytes)
fn image_to_payload(image: &Image) -> SensorPayload {
    SensorPayload::Image(ImageData {
        width: image.width() as u32,
        height: image.height() as u32,
        format: ImageFormat::Bgra8,
        data: Bytes::copy_from_slice(image.as_raw_bytes()),
    })
}

/// Convert CARLA CollisionEvent into SensorPayload
///
/// The ego location is read from the event's parent actor inside the callback.
fn collision_to_payload(event: &CarlaCollisionEvent) -> SensorPayload {
    let other = event.other_actor();
    let ego = event.actor();
    let l = ego.location();
    SensorPayload::Collision(CollisionEvent {
        other_actor_id: other.as_ref().map(|a| a.id()),
        other_actor_type_id: other
            .map(|a| a.type_id())
            .unwrap_or_else(|| "unknown".to_string()),
        ego_location: ego
            .is_alive()
            .then(|| Location::new(l.x as f64, l.y as f64, l.z as f64)),
    })
}

/// Convert CARLA sensor data into SensorPacket
///
/// Returns None if the data type does not match the sensor kind.
pub fn convert_sensor_data(
    sensor_id: &str,
    kind: SensorKind,
    data: &SensorData,
) -> Option<SensorPacket> {
    let timestamp = data.timestamp();
    let frame_id = data.frame() as u64;

    let payload = match kind {
        SensorKind::Camera => {
            let image = Image::try_from(data.clone()).ok()?;
            image_to_payload(&image)
        }
        SensorKind::Collision => {
            let event = CarlaCollisionEvent::try_from(data.clone()).ok()?;
            collision_to_payload(&event)
        }
    };

    Some(SensorPacket {
        sensor_id: sensor_id.to_string(),
        sensor_kind: kind,
        timestamp,
        frame_id: Some(frame_id),
        payload,
    })
}
