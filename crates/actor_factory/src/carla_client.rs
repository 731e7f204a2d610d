//! Real CARLA client implementation
//!
//! Connects to CARLA server using carla-rust crate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use carla::client::{ActorBase, Client, Sensor, Vehicle, Walker, WalkerAIController, World};
use carla::geom::{Location as CarlaLocation, Rotation as CarlaRotation, Transform as CarlaTransform};
use carla::rpc::VehicleControl as CarlaVehicleControl;
use contracts::{
    ActorId, Location, SensorKind, SensorSource, Transform, Vector3, VehicleControl, WeatherParams,
};
use tracing::{debug, info, instrument, warn};

use crate::carla_sensor_source::CarlaSensorSource;
use crate::client::{Attributes, CarlaClient};
use crate::error::{ActorFactoryError, Result};

/// Real CARLA client
///
/// Wraps carla-rust's Client, implements CarlaClient trait.
/// Uses Mutex for interior mutability, allowing `&self` methods to modify World.
#[derive(Default, Clone)]
pub struct RealCarlaClient {
    /// CARLA client
    client: Arc<Mutex<Option<Client>>>,
    /// World reference (uses Mutex for interior mutability)
    world: Arc<Mutex<Option<World>>>,
    /// Created actors list (for teardown)
    actors: Arc<Mutex<HashMap<ActorId, ActorType>>>,
}

/// Actor type enumeration
#[derive(Clone)]
enum ActorType {
    Vehicle(Vehicle),
    Sensor(Sensor),
    Walker(Walker),
    Controller(WalkerAIController),
}

impl RealCarlaClient {
    /// Create new client (disconnected state)
    pub fn new() -> Self {
        Self::default()
    }

    /// Access World with mutable reference, ensuring connected
    fn with_world_mut<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut World) -> Result<R>,
    {
        let mut world_guard = lock(&self.world);
        let world = world_guard
            .as_mut()
            .ok_or_else(|| ActorFactoryError::ConnectionFailed {
                message: "not connected to CARLA server".into(),
            })?;
        f(world)
    }

    /// Save actor to registry for teardown
    fn store_actor(&self, actor_id: ActorId, actor: ActorType) {
        lock(&self.actors).insert(actor_id, actor);
    }

    fn actor(&self, actor_id: ActorId) -> Result<ActorType> {
        lock(&self.actors)
            .get(&actor_id)
            .cloned()
            .ok_or(ActorFactoryError::ActorNotFound { actor_id })
    }

    fn vehicle(&self, actor_id: ActorId) -> Result<Vehicle> {
        match self.actor(actor_id)? {
            ActorType::Vehicle(vehicle) => Ok(vehicle),
            _ => Err(ActorFactoryError::ActorNotFound { actor_id }),
        }
    }

    fn controller(&self, actor_id: ActorId) -> Result<WalkerAIController> {
        match self.actor(actor_id)? {
            ActorType::Controller(controller) => Ok(controller),
            _ => Err(ActorFactoryError::ActorNotFound { actor_id }),
        }
    }

    fn classify(actor: carla::client::Actor) -> Option<ActorType> {
        let actor = match Vehicle::try_from(actor) {
            Ok(vehicle) => return Some(ActorType::Vehicle(vehicle)),
            Err(actor) => actor,
        };
        let actor = match Sensor::try_from(actor) {
            Ok(sensor) => return Some(ActorType::Sensor(sensor)),
            Err(actor) => actor,
        };
        let actor = match Walker::try_from(actor) {
            Ok(walker) => return Some(ActorType::Walker(walker)),
            Err(actor) => actor,
        };
        WalkerAIController::try_from(actor)
            .ok()
            .map(ActorType::Controller)
    }

    fn actor_id_of(actor: &ActorType) -> ActorId {
        match actor {
            ActorType::Vehicle(a) => a.id(),
            ActorType::Sensor(a) => a.id(),
            ActorType::Walker(a) => a.id(),
            ActorType::Controller(a) => a.id(),
        }
    }

    fn destroy(actor: ActorType, actor_id: ActorId) {
        let destroyed = match actor {
            ActorType::Vehicle(v) => v.destroy(),
            ActorType::Sensor(s) => {
                if s.is_listening() {
                    s.stop();
                }
                s.destroy()
            }
            ActorType::Walker(w) => w.destroy(),
            ActorType::Controller(c) => c.destroy(),
        };
        if !destroyed {
            warn!(actor_id, "destroy returned false");
        }
    }

    /// Convert internal Transform to CARLA Transform
    fn to_carla_transform(transform: Transform) -> CarlaTransform {
        CarlaTransform {
            location: Self::to_carla_location(transform.location),
            rotation: CarlaRotation {
                pitch: transform.rotation.pitch as f32,
                yaw: transform.rotation.yaw as f32,
                roll: transform.rotation.roll as f32,
            },
        }
    }

    fn to_carla_location(location: Location) -> CarlaLocation {
        CarlaLocation {
            x: location.x as f32,
            y: location.y as f32,
            z: location.z as f32,
        }
    }

    fn from_carla_transform(transform: &CarlaTransform) -> Transform {
        Transform::new(
            Location::new(
                transform.location.x as f64,
                transform.location.y as f64,
                transform.location.z as f64,
            ),
            contracts::Rotation::new(
                transform.rotation.pitch as f64,
                transform.rotation.yaw as f64,
                transform.rotation.roll as f64,
            ),
        )
    }

    /// Get underlying CARLA Sensor object
    pub fn get_sensor(&self, actor_id: ActorId) -> Option<Sensor> {
        match lock(&self.actors).get(&actor_id) {
            Some(ActorType::Sensor(sensor)) => Some(sensor.clone()),
            _ => None,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CarlaClient for RealCarlaClient {
    #[instrument(name = "real_carla_connect", skip(self), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        let host = host.to_string();
        let handshake = tokio::task::spawn_blocking(move || {
            let mut client = Client::connect(&host, port, None);
            client.set_timeout(timeout);
            let world = client.world();
            (client, world)
        });

        let (client, world) = tokio::time::timeout(timeout, handshake)
            .await
            .map_err(|_| ActorFactoryError::ConnectionFailed {
                message: format!("no answer within {timeout:?}"),
            })?
            .map_err(|e| ActorFactoryError::ConnectionFailed {
                message: e.to_string(),
            })?;

        info!(map = %world.map().name(), "connected to CARLA server");

        *lock(&self.client) = Some(client);
        *lock(&self.world) = Some(world);

        Ok(())
    }

    #[instrument(name = "real_carla_load_map", skip(self), fields(map = %map))]
    async fn load_map(&self, map: &str) -> Result<()> {
        let mut client_guard = lock(&self.client);
        let client = client_guard
            .as_mut()
            .ok_or_else(|| ActorFactoryError::ConnectionFailed {
                message: "not connected to CARLA server".into(),
            })?;

        let available = client.available_maps();
        if !available.iter().any(|m| m.ends_with(map)) {
            return Err(ActorFactoryError::map_load(map, "map not available on server"));
        }

        let world = client.load_world(map);
        lock(&self.actors).clear();
        *lock(&self.world) = Some(world);
        info!(map, "map loaded");
        Ok(())
    }

    async fn spawn_points(&self) -> Result<Vec<Transform>> {
        self.with_world_mut(|world| {
            Ok(world
                .map()
                .recommended_spawn_points()
                .iter()
                .map(Self::from_carla_transform)
                .collect())
        })
    }

    async fn blueprints(&self, filter: &str) -> Result<Vec<String>> {
        self.with_world_mut(|world| {
            Ok(world
                .blueprint_library()
                .filter(filter)
                .iter()
                .map(|bp| bp.id().to_string())
                .collect())
        })
    }

    #[instrument(
        name = "real_carla_spawn_actor",
        skip(self, transform, attributes),
        fields(blueprint = %blueprint, parent = ?parent)
    )]
    async fn try_spawn_actor(
        &self,
        blueprint: &str,
        transform: Transform,
        attributes: &Attributes,
        parent: Option<ActorId>,
    ) -> Result<Option<ActorId>> {
        let parent_actor = match parent {
            Some(parent_id) => Some(self.actor(parent_id)?),
            None => None,
        };

        let spawned = self.with_world_mut(|world| {
            let mut bp = world
                .blueprint_library()
                .find(blueprint)
                .ok_or_else(|| ActorFactoryError::BlueprintNotFound {
                    filter: blueprint.to_string(),
                })?;

            for (key, value) in attributes {
                if !bp.set_attribute(key, value) {
                    warn!(key, value, "failed to set blueprint attribute");
                }
            }

            let carla_transform = Self::to_carla_transform(transform);
            let result = match &parent_actor {
                Some(ActorType::Vehicle(v)) => world.spawn_actor_attached(&bp, &carla_transform, v, None),
                Some(ActorType::Walker(w)) => world.spawn_actor_attached(&bp, &carla_transform, w, None),
                Some(_) => {
                    return Err(ActorFactoryError::sensor_spawn(blueprint, "parent cannot carry attachments"))
                }
                None => world.spawn_actor(&bp, &carla_transform),
            };
            Ok(result.ok())
        })?;

        let Some(actor) = spawned else {
            debug!(blueprint, "spawn location occupied");
            return Ok(None);
        };
        let actor = Self::classify(actor).ok_or_else(|| {
            ActorFactoryError::sensor_spawn(blueprint, "spawned actor has unsupported type")
        })?;
        let actor_id = Self::actor_id_of(&actor);
        self.store_actor(actor_id, actor);
        debug!(actor_id, blueprint, "actor spawned");
        Ok(Some(actor_id))
    }

    #[instrument(name = "real_carla_destroy_actor", skip(self), fields(actor_id))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<()> {
        let removed = lock(&self.actors).remove(&actor_id);
        // Idempotent: return Ok even if not exists
        if let Some(actor) = removed {
            Self::destroy(actor, actor_id);
            debug!(actor_id, "actor destroyed");
        }
        Ok(())
    }

    async fn set_autopilot(&self, actor_id: ActorId, enabled: bool) -> Result<()> {
        self.vehicle(actor_id)?.set_autopilot(enabled);
        Ok(())
    }

    async fn apply_control(&self, actor_id: ActorId, control: VehicleControl) -> Result<()> {
        self.vehicle(actor_id)?.apply_control(&CarlaVehicleControl {
            throttle: control.throttle as f32,
            steer: control.steer as f32,
            brake: control.brake as f32,
            hand_brake: control.hand_brake,
            reverse: control.reverse,
            manual_gear_shift: false,
            gear: 0,
        });
        Ok(())
    }

    async fn velocity(&self, actor_id: ActorId) -> Result<Vector3> {
        let v = self.vehicle(actor_id)?.velocity();
        Ok(Vector3::new(v.x as f64, v.y as f64, v.z as f64))
    }

    async fn location(&self, actor_id: ActorId) -> Result<Location> {
        let l = self.vehicle(actor_id)?.location();
        Ok(Location::new(l.x as f64, l.y as f64, l.z as f64))
    }

    async fn set_weather(&self, weather: WeatherParams) -> Result<()> {
        self.with_world_mut(|world| {
            let mut params = world.weather();
            params.cloudiness = weather.cloudiness;
            params.precipitation = weather.precipitation;
            params.precipitation_deposits = weather.precipitation_deposits;
            params.wetness = weather.wetness;
            params.sun_altitude_angle = weather.sun_altitude_angle;
            world.set_weather(&params);
            Ok(())
        })
    }

    async fn random_navigable_location(&self) -> Result<Option<Location>> {
        self.with_world_mut(|world| {
            Ok(world
                .random_location_from_navigation()
                .map(|l| Location::new(l.x as f64, l.y as f64, l.z as f64)))
        })
    }

    async fn start_walker_controller(
        &self,
        controller: ActorId,
        target: Location,
        max_speed: f64,
    ) -> Result<()> {
        let controller = self.controller(controller)?;
        controller.start();
        controller.go_to_location(&Self::to_carla_location(target));
        controller.set_max_speed(max_speed as f32);
        Ok(())
    }

    async fn stop_walker_controller(&self, controller: ActorId) -> Result<()> {
        self.controller(controller)?.stop();
        Ok(())
    }

    fn get_sensor_source(
        &self,
        actor_id: ActorId,
        sensor_id: String,
        kind: SensorKind,
    ) -> Option<Box<dyn SensorSource>> {
        let sensor = self.get_sensor(actor_id)?;
        Some(Box::new(CarlaSensorSource::new(sensor_id, kind, sensor)))
    }
}

#[cfg(test)]
mod tests {
    // Real client tests require CARLA server running
    // These tests are marked as ignore, only run when server is available

    use super::*;

    #[tokio::test]
    #[ignore = "requires CARLA server"]
    async fn test_real_client_connect() {
        let mut client = RealCarlaClient::new();
        client
            .connect("localhost", 2000, Duration::from_secs(5))
            .await
            .unwrap();
    }
}
