//! Mock CARLA client
//!
//! In-process simulator stand-in for tests and development. Supports failure
//! injection (unreachable host, unknown maps, occupied spawn points,
//! navigation misses, controller failures, dropped spawn calls, autopilot
//! and destroy failures) and records every world-changing
//! call in a journal so tests can assert ordering.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{
    ActorId, CallbackGate, CollisionEvent, ImageData, Location, SensorKind, SensorPacket,
    SensorPayload, SensorSource, Transform, Vector3, VehicleControl, WeatherParams,
};
use tracing::{debug, instrument};

use crate::client::{matches_filter, Attributes, CarlaClient};
use crate::error::{ActorFactoryError, Result};
use crate::mock_sensor::{MockSensor, MockSensorConfig};

/// Mock client configuration
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Refuse every connection attempt
    pub unreachable: bool,
    /// Loadable maps; empty accepts any name
    pub maps: Vec<String>,
    /// Spawn points generated per map
    pub spawn_point_count: usize,
    /// Spawn point indices permanently occupied by scenery
    pub blocked_spawn_points: Vec<usize>,
    /// Vehicle blueprint library
    pub vehicle_blueprints: Vec<String>,
    /// Pedestrian blueprint library
    pub walker_blueprints: Vec<String>,
    /// Every n-th navigation sample yields no location
    pub navigation_miss_every: Option<usize>,
    /// Walker controllers refuse to spawn
    pub fail_controllers: bool,
    /// Actor IDs whose destroy fails
    pub fail_destroy: Vec<ActorId>,
    /// Unparented spawns beyond this many fail with a connection error
    pub fail_spawns_after: Option<usize>,
    /// Enabling autopilot fails
    pub fail_autopilot: bool,
    /// Camera auto-emission rate; `None` delivers only injected frames
    pub camera_frequency_hz: Option<f64>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            unreachable: false,
            maps: Vec::new(),
            spawn_point_count: 50,
            blocked_spawn_points: Vec::new(),
            vehicle_blueprints: vec![
                "vehicle.tesla.model3".to_string(),
                "vehicle.audi.a2".to_string(),
                "vehicle.lincoln.mkz_2020".to_string(),
            ],
            walker_blueprints: vec![
                "walker.pedestrian.0001".to_string(),
                "walker.pedestrian.0002".to_string(),
            ],
            navigation_miss_every: None,
            fail_controllers: false,
            fail_destroy: Vec::new(),
            fail_spawns_after: None,
            fail_autopilot: false,
            camera_frequency_hz: None,
        }
    }
}

/// World-changing call recorded by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum MockEvent {
    Connected { host: String, port: u16 },
    /// `leaked` counts actors still alive when the map was replaced
    MapLoaded { map: String, leaked: usize },
    Spawned { actor_id: ActorId, blueprint: String, parent: Option<ActorId> },
    AutopilotSet { actor_id: ActorId, enabled: bool },
    ControllerStarted { actor_id: ActorId, max_speed: f64 },
    ControllerStopped { actor_id: ActorId },
    SensorStopped { actor_id: ActorId },
    WeatherSet(WeatherParams),
    Destroyed { actor_id: ActorId, blueprint: String },
}

#[derive(Debug, Clone)]
struct MockActor {
    blueprint: String,
    location: Location,
    parent: Option<ActorId>,
    velocity: Vector3,
    attributes: Attributes,
}

#[derive(Default)]
struct MockWorld {
    connected: bool,
    map: Option<String>,
    actors: HashMap<ActorId, MockActor>,
    gates: HashMap<ActorId, CallbackGate>,
    sensor_names: HashMap<ActorId, String>,
    controllers: HashMap<ActorId, bool>,
    weather: Option<WeatherParams>,
    navigation_calls: usize,
    free_spawns: usize,
    journal: Vec<MockEvent>,
}

/// Mock CARLA client
///
/// Cheap to clone; clones share one simulated world so a test can keep a
/// handle for inspection and fault injection while the session owns another.
#[derive(Clone)]
pub struct MockCarlaClient {
    /// Configuration (failure scenarios can be injected)
    config: Arc<MockConfig>,
    /// Actor ID counter
    next_actor_id: Arc<AtomicU32>,
    world: Arc<Mutex<MockWorld>>,
}

impl MockCarlaClient {
    /// Create default mock client
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Create mock client with configuration
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config: Arc::new(config),
            // Start from 1000 for easy identification
            next_actor_id: Arc::new(AtomicU32::new(1000)),
            world: Arc::new(Mutex::new(MockWorld::default())),
        }
    }

    /// Number of live actors (controllers included)
    pub fn actor_count(&self) -> usize {
        self.world().actors.len()
    }

    /// IDs of live actors whose blueprint matches `filter`
    pub fn actors_matching(&self, filter: &str) -> Vec<ActorId> {
        let world = self.world();
        let mut ids: Vec<_> = world
            .actors
            .iter()
            .filter(|(_, a)| matches_filter(filter, &a.blueprint))
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Blueprint of a live actor
    pub fn blueprint_of(&self, actor_id: ActorId) -> Option<String> {
        self.world().actors.get(&actor_id).map(|a| a.blueprint.clone())
    }

    /// Attribute a live actor was spawned with
    pub fn attribute_of(&self, actor_id: ActorId, key: &str) -> Option<String> {
        self.world()
            .actors
            .get(&actor_id)
            .and_then(|a| a.attributes.get(key).cloned())
    }

    /// Currently loaded map
    pub fn current_map(&self) -> Option<String> {
        self.world().map.clone()
    }

    /// Last weather applied
    pub fn current_weather(&self) -> Option<WeatherParams> {
        self.world().weather
    }

    /// Snapshot of the call journal
    pub fn journal(&self) -> Vec<MockEvent> {
        self.world().journal.clone()
    }

    /// Move an actor
    pub fn set_actor_location(&self, actor_id: ActorId, location: Location) {
        if let Some(actor) = self.world().actors.get_mut(&actor_id) {
            actor.location = location;
        }
    }

    /// Deliver a camera frame through a sensor's callback
    ///
    /// Returns `false` if the sensor is not listening.
    pub fn emit_image(&self, sensor: ActorId, image: ImageData) -> bool {
        let Some((sensor_id, gate)) = self.sensor_gate(sensor) else {
            return false;
        };
        gate.deliver(SensorPacket {
            sensor_id,
            sensor_kind: SensorKind::Camera,
            timestamp: 0.0,
            frame_id: None,
            payload: SensorPayload::Image(image),
        })
    }

    /// Fire a collision event on a collision sensor
    ///
    /// The ego location is sampled now, from the sensor's parent; it is `None`
    /// when the parent no longer exists.
    pub fn emit_collision(&self, sensor: ActorId, other_actor_type_id: &str) -> bool {
        let ego_location = {
            let world = self.world();
            world
                .actors
                .get(&sensor)
                .and_then(|s| s.parent)
                .and_then(|parent| world.actors.get(&parent))
                .map(|parent| parent.location)
        };
        let Some((sensor_id, gate)) = self.sensor_gate(sensor) else {
            return false;
        };
        gate.deliver(SensorPacket {
            sensor_id,
            sensor_kind: SensorKind::Collision,
            timestamp: 0.0,
            frame_id: None,
            payload: SensorPayload::Collision(CollisionEvent {
                other_actor_id: None,
                other_actor_type_id: other_actor_type_id.to_string(),
                ego_location,
            }),
        })
    }

    fn sensor_gate(&self, sensor: ActorId) -> Option<(String, CallbackGate)> {
        let world = self.world();
        let gate = world.gates.get(&sensor)?.clone();
        let sensor_id = world
            .sensor_names
            .get(&sensor)
            .cloned()
            .unwrap_or_else(|| sensor.to_string());
        Some((sensor_id, gate))
    }

    fn world(&self) -> MutexGuard<'_, MockWorld> {
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate_actor_id(&self) -> ActorId {
        self.next_actor_id.fetch_add(1, Ordering::SeqCst)
    }

    fn ensure_connected(world: &MockWorld) -> Result<()> {
        if world.connected {
            Ok(())
        } else {
            Err(ActorFactoryError::ConnectionFailed {
                message: "not connected".into(),
            })
        }
    }

    fn generated_spawn_point(index: usize) -> Transform {
        Transform::at(Location::new(index as f64 * 10.0, 0.0, 0.5))
    }

    fn is_blocked(&self, transform: &Transform) -> bool {
        self.config
            .blocked_spawn_points
            .iter()
            .any(|&i| Self::generated_spawn_point(i).location == transform.location)
    }

    fn blueprint_known(&self, blueprint: &str) -> bool {
        blueprint.starts_with("sensor.")
            || blueprint == "controller.ai.walker"
            || self.config.vehicle_blueprints.iter().any(|b| b == blueprint)
            || self.config.walker_blueprints.iter().any(|b| b == blueprint)
    }

    fn ensure_actor(world: &MockWorld, actor_id: ActorId) -> Result<&MockActor> {
        world
            .actors
            .get(&actor_id)
            .ok_or(ActorFactoryError::ActorNotFound { actor_id })
    }
}

impl Default for MockCarlaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CarlaClient for MockCarlaClient {
    #[instrument(name = "mock_carla_connect", skip(self), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        if self.config.unreachable {
            return Err(ActorFactoryError::ConnectionFailed {
                message: format!("{host}:{port} unreachable after {timeout:?}"),
            });
        }
        let mut world = self.world();
        world.connected = true;
        world.journal.push(MockEvent::Connected {
            host: host.to_string(),
            port,
        });
        Ok(())
    }

    #[instrument(name = "mock_carla_load_map", skip(self), fields(map = %map))]
    async fn load_map(&self, map: &str) -> Result<()> {
        let mut world = self.world();
        Self::ensure_connected(&world)?;
        if !self.config.maps.is_empty() && !self.config.maps.iter().any(|m| m == map) {
            return Err(ActorFactoryError::map_load(map, "map not available"));
        }

        // Loading a map destroys whatever is still alive
        let leaked = world.actors.len();
        world.actors.clear();
        for gate in world.gates.values() {
            gate.close();
        }
        world.gates.clear();
        world.sensor_names.clear();
        world.controllers.clear();
        world.map = Some(map.to_string());
        world.journal.push(MockEvent::MapLoaded {
            map: map.to_string(),
            leaked,
        });
        Ok(())
    }

    async fn spawn_points(&self) -> Result<Vec<Transform>> {
        Self::ensure_connected(&self.world())?;
        Ok((0..self.config.spawn_point_count)
            .map(Self::generated_spawn_point)
            .collect())
    }

    async fn blueprints(&self, filter: &str) -> Result<Vec<String>> {
        Self::ensure_connected(&self.world())?;
        Ok(self
            .config
            .vehicle_blueprints
            .iter()
            .chain(&self.config.walker_blueprints)
            .filter(|b| matches_filter(filter, b))
            .cloned()
            .collect())
    }

    #[instrument(
        name = "mock_carla_spawn_actor",
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
        let mut world = self.world();
        Self::ensure_connected(&world)?;

        if !self.blueprint_known(blueprint) {
            return Err(ActorFactoryError::BlueprintNotFound {
                filter: blueprint.to_string(),
            });
        }

        if blueprint == "controller.ai.walker" && self.config.fail_controllers {
            return Err(ActorFactoryError::ControllerFailed {
                actor_id: parent.unwrap_or_default(),
                message: "mock controller failure".into(),
            });
        }

        let location = match parent {
            Some(parent_id) => {
                let parent_actor = Self::ensure_actor(&world, parent_id)?;
                parent_actor.location
            }
            None => {
                if self
                    .config
                    .fail_spawns_after
                    .is_some_and(|limit| world.free_spawns >= limit)
                {
                    return Err(ActorFactoryError::ConnectionFailed {
                        message: "mock connection dropped during spawn".into(),
                    });
                }
                let occupied = world
                    .actors
                    .values()
                    .any(|a| a.parent.is_none() && a.location == transform.location);
                if occupied || self.is_blocked(&transform) {
                    debug!(blueprint, "spawn point occupied");
                    return Ok(None);
                }
                world.free_spawns += 1;
                transform.location
            }
        };

        let actor_id = self.allocate_actor_id();
        world.actors.insert(
            actor_id,
            MockActor {
                blueprint: blueprint.to_string(),
                location,
                parent,
                velocity: Vector3::default(),
                attributes: attributes.clone(),
            },
        );
        if blueprint.starts_with("sensor.") {
            world.gates.insert(actor_id, CallbackGate::new());
        }
        world.journal.push(MockEvent::Spawned {
            actor_id,
            blueprint: blueprint.to_string(),
            parent,
        });
        Ok(Some(actor_id))
    }

    #[instrument(name = "mock_carla_destroy_actor", skip(self), fields(actor_id))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<()> {
        if self.config.fail_destroy.contains(&actor_id) {
            return Err(ActorFactoryError::DestroyFailed {
                actor_id,
                message: "mock failure".into(),
            });
        }

        let mut world = self.world();
        // Idempotent: return Ok even if not exists
        if let Some(actor) = world.actors.remove(&actor_id) {
            if let Some(gate) = world.gates.remove(&actor_id) {
                gate.close();
            }
            world.sensor_names.remove(&actor_id);
            world.controllers.remove(&actor_id);
            world.journal.push(MockEvent::Destroyed {
                actor_id,
                blueprint: actor.blueprint,
            });
        }
        Ok(())
    }

    async fn set_autopilot(&self, actor_id: ActorId, enabled: bool) -> Result<()> {
        let mut world = self.world();
        Self::ensure_actor(&world, actor_id)?;
        if enabled && self.config.fail_autopilot {
            return Err(ActorFactoryError::ControllerFailed {
                actor_id,
                message: "mock autopilot failure".into(),
            });
        }
        world
            .journal
            .push(MockEvent::AutopilotSet { actor_id, enabled });
        Ok(())
    }

    async fn apply_control(&self, actor_id: ActorId, control: VehicleControl) -> Result<()> {
        let mut world = self.world();
        let actor = world
            .actors
            .get_mut(&actor_id)
            .ok_or(ActorFactoryError::ActorNotFound { actor_id })?;

        // First-order stand-in for vehicle dynamics: speed follows the pedals
        let direction = if control.reverse { -1.0 } else { 1.0 };
        let speed = (control.throttle - control.brake).max(0.0) * 20.0;
        actor.velocity = Vector3::new(direction * speed, 0.0, 0.0);
        Ok(())
    }

    async fn velocity(&self, actor_id: ActorId) -> Result<Vector3> {
        let world = self.world();
        Ok(Self::ensure_actor(&world, actor_id)?.velocity)
    }

    async fn location(&self, actor_id: ActorId) -> Result<Location> {
        let world = self.world();
        Ok(Self::ensure_actor(&world, actor_id)?.location)
    }

    async fn set_weather(&self, weather: WeatherParams) -> Result<()> {
        let mut world = self.world();
        Self::ensure_connected(&world)?;
        world.weather = Some(weather);
        world.journal.push(MockEvent::WeatherSet(weather));
        Ok(())
    }

    async fn random_navigable_location(&self) -> Result<Option<Location>> {
        let mut world = self.world();
        Self::ensure_connected(&world)?;
        world.navigation_calls += 1;
        let n = world.navigation_calls;

        if let Some(every) = self.config.navigation_miss_every {
            if every > 0 && n % every == 0 {
                return Ok(None);
            }
        }
        Ok(Some(Location::new(n as f64 * 3.0, 100.0 + n as f64, 1.0)))
    }

    async fn start_walker_controller(
        &self,
        controller: ActorId,
        target: Location,
        max_speed: f64,
    ) -> Result<()> {
        let mut world = self.world();
        Self::ensure_actor(&world, controller)?;
        debug!(controller, ?target, max_speed, "mock walker controller started");
        world.controllers.insert(controller, true);
        world.journal.push(MockEvent::ControllerStarted {
            actor_id: controller,
            max_speed,
        });
        Ok(())
    }

    async fn stop_walker_controller(&self, controller: ActorId) -> Result<()> {
        let mut world = self.world();
        if world.controllers.insert(controller, false) == Some(true) {
            world
                .journal
                .push(MockEvent::ControllerStopped { actor_id: controller });
        }
        Ok(())
    }

    fn get_sensor_source(
        &self,
        actor_id: ActorId,
        sensor_id: String,
        kind: SensorKind,
    ) -> Option<Box<dyn SensorSource>> {
        let (gate, config) = {
            let mut world = self.world();
            let gate = world.gates.get(&actor_id)?.clone();
            let actor = world.actors.get(&actor_id)?;
            let dimension = |key: &str, default: u32| {
                actor
                    .attributes
                    .get(key)
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(default)
            };
            let config = MockSensorConfig {
                frequency_hz: self.config.camera_frequency_hz,
                image_width: dimension("image_size_x", 800),
                image_height: dimension("image_size_y", 600),
            };
            world.sensor_names.insert(actor_id, sensor_id.clone());
            (gate, config)
        };

        let world = self.world.clone();
        let sensor = MockSensor::with_gate(sensor_id, kind, config, gate).with_stop_hook(Arc::new(
            move || {
                world
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .journal
                    .push(MockEvent::SensorStopped { actor_id });
            },
        ));
        Some(Box::new(sensor))
    }
}
