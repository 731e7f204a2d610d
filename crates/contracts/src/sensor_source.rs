//! SensorSource trait - Sensor data source abstraction
//!
//! Defines a unified interface for sensor data sources, decoupling the capture
//! pipeline and collision logger from concrete sensor implementations.
//! Supports unified handling of real CARLA sensors and Mock sensors.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{SensorKind, SensorPacket};

/// Sensor data callback type
///
/// When a sensor produces data, it sends `SensorPacket` through this callback.
/// Uses `Arc` to allow callback sharing across multiple contexts.
pub type SensorDataCallback = Arc<dyn Fn(SensorPacket) + Send + Sync>;

/// Sensor data source trait
///
/// Abstracts the common behavior of real CARLA sensors and Mock sensors.
///
/// # Example
///
/// ```ignore
/// let sensor: Box<dyn SensorSource> = client.get_sensor_source(actor_id, id, kind)?;
/// sensor.listen(Arc::new(|packet| {
///     println!("Received packet: {:?}", packet.sensor_id);
/// }));
/// // ... use sensor ...
/// sensor.stop();
/// ```
pub trait SensorSource: Send + Sync {
    /// Get sensor ID
    fn sensor_id(&self) -> &str;

    /// Get sensor kind
    fn sensor_kind(&self) -> SensorKind;

    /// Register data callback
    ///
    /// If already listening, repeated calls are ignored (the first callback
    /// stays registered).
    fn listen(&self, callback: SensorDataCallback);

    /// Stop listening
    ///
    /// Synchronous: once this returns, the callback is neither running nor
    /// invoked again.
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}

/// Callback gate shared between a sensor handle and its delivery thread
///
/// Deliveries run while holding the gate lock, and `close` takes the same lock,
/// so `close` returns only after any in-flight delivery has finished and no
/// later delivery can start. Each sensor owns its own gate, so cameras never
/// serialize against each other.
#[derive(Clone, Default)]
pub struct CallbackGate {
    slot: Arc<Mutex<Option<SensorDataCallback>>>,
}

impl CallbackGate {
    /// Create a closed gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a callback. Returns `false` if one is already installed.
    pub fn open(&self, callback: SensorDataCallback) -> bool {
        let mut slot = self.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(callback);
        true
    }

    /// Deliver a packet to the installed callback. Returns `false` when closed.
    pub fn deliver(&self, packet: SensorPacket) -> bool {
        let slot = self.lock();
        match slot.as_ref() {
            Some(callback) => {
                callback(packet);
                true
            }
            None => false,
        }
    }

    /// Remove the callback. Returns `false` if the gate was already closed.
    pub fn close(&self) -> bool {
        self.lock().take().is_some()
    }

    /// Whether a callback is installed
    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<SensorDataCallback>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CollisionEvent, SensorPayload};
    use std::sync::atomic::{AtomicU64, Ordering};

    fn packet() -> SensorPacket {
        SensorPacket {
            sensor_id: "collision".to_string(),
            sensor_kind: SensorKind::Collision,
            timestamp: 0.0,
            frame_id: None,
            payload: SensorPayload::Collision(CollisionEvent {
                other_actor_id: None,
                other_actor_type_id: "static.pole".to_string(),
                ego_location: None,
            }),
        }
    }

    #[test]
    fn test_gate_delivers_only_while_open() {
        let gate = CallbackGate::new();
        let count = Arc::new(AtomicU64::new(0));
        let counter = count.clone();

        assert!(!gate.deliver(packet()));
        assert!(gate.open(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })));
        assert!(gate.deliver(packet()));
        assert!(gate.close());
        assert!(!gate.deliver(packet()));
        assert!(!gate.close());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_gate_rejects_second_callback() {
        let gate = CallbackGate::new();
        assert!(gate.open(Arc::new(|_| {})));
        assert!(!gate.open(Arc::new(|_| {})));
        assert!(gate.is_open());
    }
}
