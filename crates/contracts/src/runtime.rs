//! ActorRegistry - Actor Factory output
//!
//! Owned handles of every actor spawned for one world session.

use crate::{ContractError, Location, SensorKind};

/// CARLA actor handle type
pub type ActorId = u32;

/// A sensor attached to the ego vehicle
#[derive(Debug, Clone, PartialEq)]
pub struct SensorEntry {
    /// Configuration id ("front", "collision", ...)
    pub sensor_id: String,
    pub actor_id: ActorId,
    pub kind: SensorKind,
}

/// A pedestrian and the AI controller driving it
#[derive(Debug, Clone, PartialEq)]
pub struct PedestrianEntry {
    pub walker: ActorId,
    /// `None` when the controller failed to spawn; the walker is still tracked
    pub controller: Option<ActorId>,
    pub origin: Location,
}

/// Runtime actor registry
///
/// Tracks every live actor of the active session so teardown can destroy them
/// in dependency order: sensors, pedestrian controllers, pedestrians,
/// background vehicles, ego vehicle.
#[derive(Debug, Clone, Default)]
pub struct ActorRegistry {
    ego: Option<ActorId>,
    sensors: Vec<SensorEntry>,
    background_vehicles: Vec<ActorId>,
    pedestrians: Vec<PedestrianEntry>,
}

impl ActorRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the controlled vehicle. At most one may be live.
    pub fn register_ego(&mut self, actor_id: ActorId) -> Result<(), ContractError> {
        if let Some(existing) = self.ego {
            return Err(ContractError::Other(format!(
                "controlled vehicle {existing} already registered, refusing {actor_id}"
            )));
        }
        self.ego = Some(actor_id);
        Ok(())
    }

    /// Register sensor
    pub fn register_sensor(&mut self, sensor_id: impl Into<String>, actor_id: ActorId, kind: SensorKind) {
        self.sensors.push(SensorEntry {
            sensor_id: sensor_id.into(),
            actor_id,
            kind,
        });
    }

    /// Register background vehicle
    pub fn register_background_vehicle(&mut self, actor_id: ActorId) {
        self.background_vehicles.push(actor_id);
    }

    /// Register pedestrian (with or without controller)
    pub fn register_pedestrian(&mut self, entry: PedestrianEntry) {
        self.pedestrians.push(entry);
    }

    pub fn ego(&self) -> Option<ActorId> {
        self.ego
    }

    pub fn sensors(&self) -> &[SensorEntry] {
        &self.sensors
    }

    pub fn background_vehicles(&self) -> &[ActorId] {
        &self.background_vehicles
    }

    pub fn pedestrians(&self) -> &[PedestrianEntry] {
        &self.pedestrians
    }

    /// Remove and return all sensors
    pub fn take_sensors(&mut self) -> Vec<SensorEntry> {
        std::mem::take(&mut self.sensors)
    }

    /// Remove and return all pedestrians
    pub fn take_pedestrians(&mut self) -> Vec<PedestrianEntry> {
        std::mem::take(&mut self.pedestrians)
    }

    /// Remove and return all background vehicles
    pub fn take_background_vehicles(&mut self) -> Vec<ActorId> {
        std::mem::take(&mut self.background_vehicles)
    }

    /// Remove and return the ego vehicle
    pub fn take_ego(&mut self) -> Option<ActorId> {
        self.ego.take()
    }

    /// Number of live actors, controllers included
    pub fn live_count(&self) -> usize {
        self.ego.iter().count()
            + self.sensors.len()
            + self.background_vehicles.len()
            + self.pedestrians.len()
            + self
                .pedestrians
                .iter()
                .filter(|p| p.controller.is_some())
                .count()
    }

    pub fn is_empty(&self) -> bool {
        self.live_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_ego() {
        let mut registry = ActorRegistry::new();
        registry.register_ego(1).unwrap();
        assert!(registry.register_ego(2).is_err());
        assert_eq!(registry.take_ego(), Some(1));
        registry.register_ego(2).unwrap();
    }

    #[test]
    fn test_live_count_includes_controllers() {
        let mut registry = ActorRegistry::new();
        registry.register_ego(1).unwrap();
        registry.register_sensor("front", 2, SensorKind::Camera);
        registry.register_background_vehicle(3);
        registry.register_pedestrian(PedestrianEntry {
            walker: 4,
            controller: Some(5),
            origin: Location::default(),
        });
        registry.register_pedestrian(PedestrianEntry {
            walker: 6,
            controller: None,
            origin: Location::default(),
        });

        assert_eq!(registry.live_count(), 6);

        registry.take_sensors();
        registry.take_pedestrians();
        registry.take_background_vehicles();
        registry.take_ego();
        assert!(registry.is_empty());
    }
}
