//! ActorFactory core implementation
//!
//! Spawns the ego vehicle, its sensors and the background population of a
//! session, and tears them down in dependency order.

use contracts::{
    ActorId, ActorRegistry, CameraConfig, EgoConfig, PedestrianEntry, SensorEntry, SensorKind,
    TrafficConfig, Transform,
};
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use tracing::{debug, error, info, instrument, warn};

use crate::client::{Attributes, CarlaClient};
use crate::error::{ActorFactoryError, Result};

/// Background vehicle blueprint filter
pub const VEHICLE_FILTER: &str = "vehicle.*";
/// Pedestrian blueprint filter
pub const WALKER_FILTER: &str = "walker.pedestrian.*";
/// Walker AI controller blueprint
pub const WALKER_CONTROLLER: &str = "controller.ai.walker";

/// Outcome of a best-effort bulk spawn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpawnReport {
    /// Slots attempted
    pub requested: usize,
    /// Actors created
    pub spawned: usize,
    /// Slots skipped (occupied point or no navigable location)
    pub skipped: usize,
    /// Pedestrians left without a controller
    pub uncontrolled: usize,
}

/// Outcome of a teardown pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub destroyed: usize,
    pub failed: usize,
    /// Actors whose destroy call failed; still alive in the world
    pub survivors: Vec<ActorId>,
}

impl TeardownReport {
    /// True when every actor handed to the pass was destroyed
    pub fn is_clean(&self) -> bool {
        self.survivors.is_empty()
    }
}

impl std::ops::AddAssign for TeardownReport {
    fn add_assign(&mut self, rhs: Self) {
        self.destroyed += rhs.destroyed;
        self.failed += rhs.failed;
        self.survivors.extend(rhs.survivors);
    }
}

/// Actor Factory
///
/// Spawns session actors into an `ActorRegistry` and provides ordered
/// teardown: sensors, pedestrian controllers, pedestrians, background
/// vehicles, ego vehicle.
pub struct ActorFactory<C: CarlaClient> {
    client: C,
}

impl<C: CarlaClient> ActorFactory<C> {
    /// Create new ActorFactory
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Underlying simulator client
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Spawn the controlled vehicle
    ///
    /// Spawn points are tried in order; the first free one wins. Autopilot is
    /// explicitly disabled.
    ///
    /// # Errors
    /// - `BlueprintNotFound` if neither the preferred blueprint nor the fallback filter resolve
    /// - `SpawnExhausted` if every spawn point is occupied
    #[instrument(
        name = "actor_factory_spawn_ego",
        skip(self, config, spawn_points, registry),
        fields(blueprint = %config.blueprint, candidates = spawn_points.len())
    )]
    pub async fn spawn_ego(
        &self,
        config: &EgoConfig,
        spawn_points: &[Transform],
        registry: &mut ActorRegistry,
    ) -> Result<ActorId> {
        let blueprint = self.resolve_ego_blueprint(config).await?;

        for (index, point) in spawn_points.iter().enumerate() {
            let spawned = self
                .client
                .try_spawn_actor(&blueprint, *point, &Attributes::new(), None)
                .await?;
            if let Some(actor_id) = spawned {
                registry.register_ego(actor_id)?;
                self.client.set_autopilot(actor_id, false).await?;
                info!(actor_id, blueprint = %blueprint, spawn_index = index, "ego vehicle spawned");
                return Ok(actor_id);
            }
            debug!(spawn_index = index, "spawn point occupied, trying next");
        }

        Err(ActorFactoryError::SpawnExhausted {
            blueprint,
            attempts: spawn_points.len(),
        })
    }

    /// Spawn an RGB camera attached to the ego vehicle
    #[instrument(
        name = "actor_factory_spawn_camera",
        skip(self, camera, registry),
        fields(sensor_id = %camera.id, width = camera.width, height = camera.height)
    )]
    pub async fn spawn_camera(
        &self,
        ego: ActorId,
        camera: &CameraConfig,
        registry: &mut ActorRegistry,
    ) -> Result<ActorId> {
        let attributes: Attributes = [
            ("image_size_x", camera.width.to_string()),
            ("image_size_y", camera.height.to_string()),
            ("fov", camera.fov.to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        self.spawn_sensor(ego, &camera.id, SensorKind::Camera, camera.transform, &attributes, registry)
            .await
    }

    /// Spawn the collision sensor attached to the ego vehicle
    pub async fn spawn_collision_sensor(
        &self,
        ego: ActorId,
        registry: &mut ActorRegistry,
    ) -> Result<ActorId> {
        self.spawn_sensor(
            ego,
            "collision",
            SensorKind::Collision,
            Transform::default(),
            &Attributes::new(),
            registry,
        )
        .await
    }

    async fn spawn_sensor(
        &self,
        ego: ActorId,
        sensor_id: &str,
        kind: SensorKind,
        transform: Transform,
        attributes: &Attributes,
        registry: &mut ActorRegistry,
    ) -> Result<ActorId> {
        let actor_id = self
            .client
            .try_spawn_actor(kind.blueprint(), transform, attributes, Some(ego))
            .await
            .map_err(|e| ActorFactoryError::sensor_spawn(sensor_id, e.to_string()))?
            .ok_or_else(|| ActorFactoryError::sensor_spawn(sensor_id, "attachment refused"))?;

        registry.register_sensor(sensor_id, actor_id, kind);
        info!(sensor_id, actor_id, blueprint = kind.blueprint(), "sensor spawned and attached");
        Ok(actor_id)
    }

    /// Spawn autopilot background vehicles
    ///
    /// Uses every spawn point except the first (reserved for the ego), shuffled
    /// and capped at `count`. Occupied points and per-vehicle simulator errors
    /// are skipped, never raised. A vehicle is registered as soon as it exists,
    /// so one whose autopilot call fails is still torn down with the session.
    #[instrument(
        name = "actor_factory_spawn_background",
        skip(self, spawn_points, rng, registry),
        fields(requested = count)
    )]
    pub async fn spawn_background_vehicles(
        &self,
        spawn_points: &[Transform],
        count: usize,
        rng: &mut StdRng,
        registry: &mut ActorRegistry,
    ) -> Result<SpawnReport> {
        let mut candidates: Vec<Transform> = spawn_points.get(1..).unwrap_or_default().to_vec();
        candidates.shuffle(rng);
        candidates.truncate(count);

        let mut report = SpawnReport {
            requested: candidates.len(),
            ..Default::default()
        };
        if candidates.is_empty() {
            return Ok(report);
        }

        let blueprints = self.client.blueprints(VEHICLE_FILTER).await?;
        if blueprints.is_empty() {
            return Err(ActorFactoryError::BlueprintNotFound {
                filter: VEHICLE_FILTER.to_string(),
            });
        }

        for point in candidates {
            let Some(blueprint) = blueprints.choose(rng) else {
                break;
            };
            match self
                .client
                .try_spawn_actor(blueprint, point, &Attributes::new(), None)
                .await
            {
                Ok(Some(actor_id)) => {
                    registry.register_background_vehicle(actor_id);
                    report.spawned += 1;
                    if let Err(e) = self.client.set_autopilot(actor_id, true).await {
                        warn!(actor_id, error = %e, "autopilot not enabled, vehicle left parked");
                    }
                }
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    warn!(blueprint = %blueprint, error = %e, "background vehicle spawn failed");
                    report.skipped += 1;
                }
            }
        }

        info!(
            spawned = report.spawned,
            skipped = report.skipped,
            "background vehicles spawned"
        );
        Ok(report)
    }

    /// Spawn pedestrians with AI controllers
    ///
    /// Two phases: bodies at sampled navigable locations (a miss skips the
    /// slot), then one controller per body, started towards a second sampled
    /// location at a speed drawn from the configured range. A body whose
    /// controller fails stays alive and tracked. Simulator errors on a single
    /// slot skip that slot; bodies already spawned always reach the registry.
    #[instrument(
        name = "actor_factory_spawn_pedestrians",
        skip(self, traffic, rng, registry),
        fields(requested = traffic.pedestrians)
    )]
    pub async fn spawn_pedestrians(
        &self,
        traffic: &TrafficConfig,
        rng: &mut StdRng,
        registry: &mut ActorRegistry,
    ) -> Result<SpawnReport> {
        let mut report = SpawnReport {
            requested: traffic.pedestrians,
            ..Default::default()
        };
        if traffic.pedestrians == 0 {
            return Ok(report);
        }

        let blueprints = self.client.blueprints(WALKER_FILTER).await?;
        if blueprints.is_empty() {
            return Err(ActorFactoryError::BlueprintNotFound {
                filter: WALKER_FILTER.to_string(),
            });
        }
        let walker_attributes: Attributes =
            [("is_invincible".to_string(), "false".to_string())].into();

        // Phase 1: bodies
        let mut walkers = Vec::with_capacity(traffic.pedestrians);
        for _ in 0..traffic.pedestrians {
            let origin = match self.client.random_navigable_location().await {
                Ok(Some(origin)) => origin,
                Ok(None) => {
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "navigable location query failed");
                    report.skipped += 1;
                    continue;
                }
            };
            let Some(blueprint) = blueprints.choose(rng) else {
                break;
            };
            match self
                .client
                .try_spawn_actor(blueprint, Transform::at(origin), &walker_attributes, None)
                .await
            {
                Ok(Some(walker)) => walkers.push((walker, origin)),
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    warn!(blueprint = %blueprint, error = %e, "pedestrian spawn failed");
                    report.skipped += 1;
                }
            }
        }

        // Phase 2: controllers
        for (walker, origin) in walkers {
            let controller = self.spawn_walker_controller(walker, traffic, rng).await;
            if controller.is_none() {
                report.uncontrolled += 1;
            }
            registry.register_pedestrian(PedestrianEntry {
                walker,
                controller,
                origin,
            });
            report.spawned += 1;
        }

        info!(
            spawned = report.spawned,
            skipped = report.skipped,
            uncontrolled = report.uncontrolled,
            "pedestrians spawned"
        );
        Ok(report)
    }

    async fn spawn_walker_controller(
        &self,
        walker: ActorId,
        traffic: &TrafficConfig,
        rng: &mut StdRng,
    ) -> Option<ActorId> {
        let spawned = self
            .client
            .try_spawn_actor(
                WALKER_CONTROLLER,
                Transform::default(),
                &Attributes::new(),
                Some(walker),
            )
            .await;
        let controller = match spawned {
            Ok(Some(controller)) => controller,
            Ok(None) => {
                warn!(walker, "walker controller refused, pedestrian left uncontrolled");
                return None;
            }
            Err(e) => {
                warn!(walker, error = %e, "walker controller failed, pedestrian left uncontrolled");
                return None;
            }
        };

        let speed = if traffic.pedestrian_speed_max > traffic.pedestrian_speed_min {
            rng.random_range(traffic.pedestrian_speed_min..traffic.pedestrian_speed_max)
        } else {
            traffic.pedestrian_speed_min
        };

        let started = match self.client.random_navigable_location().await {
            Ok(Some(target)) => self
                .client
                .start_walker_controller(controller, target, speed)
                .await
                .map_err(|e| e.to_string()),
            Ok(None) => Err("no navigable target".to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(message) = started {
            // An idle controller still has to be torn down with its walker
            warn!(walker, controller, %message, "walker controller not started");
        }
        Some(controller)
    }

    /// Destroy sensor actors
    ///
    /// Callers stop the matching sensor sources first.
    #[instrument(name = "actor_factory_destroy_sensors", skip(self, sensors), fields(count = sensors.len()))]
    pub async fn destroy_sensors(&self, sensors: Vec<SensorEntry>) -> TeardownReport {
        let mut report = TeardownReport::default();
        for sensor in sensors {
            report += self.destroy_actor_safe(sensor.actor_id, &sensor.sensor_id).await;
        }
        report
    }

    /// Stop and destroy every controller, then destroy every pedestrian
    #[instrument(name = "actor_factory_destroy_pedestrians", skip(self, pedestrians), fields(count = pedestrians.len()))]
    pub async fn destroy_pedestrians(&self, pedestrians: Vec<PedestrianEntry>) -> TeardownReport {
        let mut report = TeardownReport::default();
        for controller in pedestrians.iter().filter_map(|p| p.controller) {
            if let Err(e) = self.client.stop_walker_controller(controller).await {
                error!(controller, error = %e, "failed to stop walker controller");
            }
            report += self.destroy_actor_safe(controller, WALKER_CONTROLLER).await;
        }
        for pedestrian in &pedestrians {
            report += self.destroy_actor_safe(pedestrian.walker, "pedestrian").await;
        }
        report
    }

    /// Destroy background vehicles
    pub async fn destroy_background_vehicles(&self, vehicles: Vec<ActorId>) -> TeardownReport {
        let mut report = TeardownReport::default();
        for actor_id in vehicles {
            report += self.destroy_actor_safe(actor_id, "background_vehicle").await;
        }
        report
    }

    /// Destroy the ego vehicle if present
    pub async fn destroy_ego(&self, ego: Option<ActorId>) -> TeardownReport {
        match ego {
            Some(actor_id) => self.destroy_actor_safe(actor_id, "ego").await,
            None => TeardownReport::default(),
        }
    }

    /// Destroy every actor in the registry, in dependency order
    ///
    /// # Idempotency
    /// Safe to call repeatedly; the registry is drained.
    #[instrument(
        name = "actor_factory_teardown",
        skip(self, registry),
        fields(live = registry.live_count())
    )]
    pub async fn teardown(&self, registry: &mut ActorRegistry) -> TeardownReport {
        info!("starting teardown");
        let mut report = self.destroy_sensors(registry.take_sensors()).await;
        report += self.destroy_pedestrians(registry.take_pedestrians()).await;
        report += self
            .destroy_background_vehicles(registry.take_background_vehicles())
            .await;
        report += self.destroy_ego(registry.take_ego()).await;
        if report.is_clean() {
            info!(destroyed = report.destroyed, "teardown completed");
        } else {
            error!(
                destroyed = report.destroyed,
                failed = report.failed,
                survivors = ?report.survivors,
                "teardown left actors alive"
            );
        }
        report
    }

    /// Destroy an actor, logging instead of propagating failure
    async fn destroy_actor_safe(&self, actor_id: ActorId, role: &str) -> TeardownReport {
        debug!(actor_id, role, "destroying actor");

        match self.client.destroy_actor(actor_id).await {
            Ok(()) => TeardownReport {
                destroyed: 1,
                ..Default::default()
            },
            Err(e) => {
                error!(actor_id, role, error = %e, "failed to destroy actor");
                TeardownReport {
                    destroyed: 0,
                    failed: 1,
                    survivors: vec![actor_id],
                }
            }
        }
    }

    /// Preferred blueprint, else the first blueprint matching the fallback filter
    async fn resolve_ego_blueprint(&self, config: &EgoConfig) -> Result<String> {
        let exact = self.client.blueprints(&config.blueprint).await?;
        if exact.iter().any(|b| b == &config.blueprint) {
            return Ok(config.blueprint.clone());
        }

        let fallback = self.client.blueprints(&config.fallback_filter).await?;
        let blueprint = fallback
            .into_iter()
            .next()
            .ok_or_else(|| ActorFactoryError::BlueprintNotFound {
                filter: config.fallback_filter.clone(),
            })?;
        warn!(
            preferred = %config.blueprint,
            fallback = %blueprint,
            "preferred ego blueprint missing, using fallback"
        );
        Ok(blueprint)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::mock_client::{MockCarlaClient, MockConfig, MockEvent};
    use rand::SeedableRng;

    async fn factory(config: MockConfig) -> (ActorFactory<MockCarlaClient>, MockCarlaClient) {
        let mut client = MockCarlaClient::with_config(config);
        client
            .connect("localhost", 2000, Duration::from_secs(1))
            .await
            .unwrap();
        client.load_map("Town02").await.unwrap();
        (ActorFactory::new(client.clone()), client)
    }

    fn traffic(pedestrians: usize) -> TrafficConfig {
        TrafficConfig {
            pedestrians,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_ego_skips_occupied_points() {
        let (factory, client) = factory(MockConfig {
            blocked_spawn_points: vec![0, 1],
            ..Default::default()
        })
        .await;
        let points = client.spawn_points().await.unwrap();
        let mut registry = ActorRegistry::new();

        let ego = factory
            .spawn_ego(&EgoConfig::default(), &points, &mut registry)
            .await
            .unwrap();
        assert_eq!(registry.ego(), Some(ego));
        assert_eq!(
            client.location(ego).await.unwrap(),
            points[2].location
        );
        assert!(client.journal().contains(&MockEvent::AutopilotSet {
            actor_id: ego,
            enabled: false
        }));
    }

    #[tokio::test]
    async fn test_ego_spawn_exhausted() {
        let (factory, client) = factory(MockConfig {
            spawn_point_count: 2,
            blocked_spawn_points: vec![0, 1],
            ..Default::default()
        })
        .await;
        let points = client.spawn_points().await.unwrap();
        let mut registry = ActorRegistry::new();

        let result = factory
            .spawn_ego(&EgoConfig::default(), &points, &mut registry)
            .await;
        assert!(matches!(
            result,
            Err(ActorFactoryError::SpawnExhausted { attempts: 2, .. })
        ));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_ego_blueprint_fallback() {
        let (factory, client) = factory(MockConfig {
            vehicle_blueprints: vec!["vehicle.audi.a2".into()],
            ..Default::default()
        })
        .await;
        let points = client.spawn_points().await.unwrap();
        let mut registry = ActorRegistry::new();

        let ego = factory
            .spawn_ego(&EgoConfig::default(), &points, &mut registry)
            .await
            .unwrap();
        assert_eq!(client.blueprint_of(ego).as_deref(), Some("vehicle.audi.a2"));
    }

    #[tokio::test]
    async fn test_camera_attributes() {
        let (factory, client) = factory(MockConfig::default()).await;
        let points = client.spawn_points().await.unwrap();
        let mut registry = ActorRegistry::new();
        let ego = factory
            .spawn_ego(&EgoConfig::default(), &points, &mut registry)
            .await
            .unwrap();

        let camera = &CameraConfig::default_rig()[1];
        let sensor = factory.spawn_camera(ego, camera, &mut registry).await.unwrap();
        assert_eq!(client.attribute_of(sensor, "image_size_x").as_deref(), Some("400"));
        assert_eq!(client.attribute_of(sensor, "fov").as_deref(), Some("90"));
        assert_eq!(registry.sensors()[0].sensor_id, "rear");
    }

    #[tokio::test]
    async fn test_background_vehicles_skip_ego_point_and_occupied() {
        let (factory, client) = factory(MockConfig {
            spawn_point_count: 6,
            blocked_spawn_points: vec![3],
            ..Default::default()
        })
        .await;
        let points = client.spawn_points().await.unwrap();
        let mut registry = ActorRegistry::new();
        let mut rng = StdRng::seed_from_u64(7);

        let report = factory
            .spawn_background_vehicles(&points, 30, &mut rng, &mut registry)
            .await
            .unwrap();
        assert_eq!(report.requested, 5);
        assert_eq!(report.spawned, 4);
        assert_eq!(report.skipped, 1);

        for actor_id in registry.background_vehicles() {
            let location = client.location(*actor_id).await.unwrap();
            assert_ne!(location, points[0].location);
        }
    }

    #[tokio::test]
    async fn test_pedestrians_with_navigation_misses() {
        let (factory, _client) = factory(MockConfig {
            navigation_miss_every: Some(3),
            ..Default::default()
        })
        .await;
        let mut registry = ActorRegistry::new();
        let mut rng = StdRng::seed_from_u64(1);

        let report = factory
            .spawn_pedestrians(&traffic(4), &mut rng, &mut registry)
            .await
            .unwrap();
        assert_eq!(report.requested, 4);
        assert_eq!(report.spawned + report.skipped, 4);
        assert!(report.skipped >= 1);
        assert_eq!(registry.pedestrians().len(), report.spawned);
    }

    #[tokio::test]
    async fn test_controller_failure_keeps_pedestrian() {
        let (factory, client) = factory(MockConfig {
            fail_controllers: true,
            ..Default::default()
        })
        .await;
        let mut registry = ActorRegistry::new();
        let mut rng = StdRng::seed_from_u64(1);

        let report = factory
            .spawn_pedestrians(&traffic(3), &mut rng, &mut registry)
            .await
            .unwrap();
        assert_eq!(report.spawned, 3);
        assert_eq!(report.uncontrolled, 3);
        assert!(registry.pedestrians().iter().all(|p| p.controller.is_none()));

        factory.teardown(&mut registry).await;
        assert_eq!(client.actor_count(), 0);
    }

    #[tokio::test]
    async fn test_controller_speed_in_range() {
        let (factory, client) = factory(MockConfig::default()).await;
        let mut registry = ActorRegistry::new();
        let mut rng = StdRng::seed_from_u64(99);

        factory
            .spawn_pedestrians(&traffic(5), &mut rng, &mut registry)
            .await
            .unwrap();
        let speeds: Vec<f64> = client
            .journal()
            .into_iter()
            .filter_map(|e| match e {
                MockEvent::ControllerStarted { max_speed, .. } => Some(max_speed),
                _ => None,
            })
            .collect();
        assert_eq!(speeds.len(), 5);
        assert!(speeds.iter().all(|s| (1.0..2.0).contains(s)));
    }

    #[tokio::test]
    async fn test_teardown_stops_controllers_before_walkers() {
        let (factory, client) = factory(MockConfig::default()).await;
        let points = client.spawn_points().await.unwrap();
        let mut registry = ActorRegistry::new();
        let mut rng = StdRng::seed_from_u64(3);

        let ego = factory
            .spawn_ego(&EgoConfig::default(), &points, &mut registry)
            .await
            .unwrap();
        factory.spawn_collision_sensor(ego, &mut registry).await.unwrap();
        factory
            .spawn_background_vehicles(&points, 3, &mut rng, &mut registry)
            .await
            .unwrap();
        factory
            .spawn_pedestrians(&traffic(3), &mut rng, &mut registry)
            .await
            .unwrap();
        let pedestrians = registry.pedestrians().to_vec();

        let report = factory.teardown(&mut registry).await;
        assert_eq!(report.failed, 0);
        assert!(registry.is_empty());
        assert_eq!(client.actor_count(), 0);

        let journal = client.journal();
        let position = |wanted: &MockEvent| journal.iter().position(|e| e == wanted);
        let destroyed_at = |actor_id: ActorId| {
            journal.iter().position(
                |e| matches!(e, MockEvent::Destroyed { actor_id: id, .. } if *id == actor_id),
            )
        };

        for pedestrian in pedestrians {
            let controller = pedestrian.controller.unwrap();
            let stopped = position(&MockEvent::ControllerStopped { actor_id: controller }).unwrap();
            let walker_destroyed = destroyed_at(pedestrian.walker).unwrap();
            assert!(stopped < walker_destroyed);
        }
        assert_eq!(destroyed_at(ego), Some(journal.len() - 1));
    }

    #[tokio::test]
    async fn test_teardown_idempotent() {
        let (factory, client) = factory(MockConfig::default()).await;
        let points = client.spawn_points().await.unwrap();
        let mut registry = ActorRegistry::new();
        factory
            .spawn_ego(&EgoConfig::default(), &points, &mut registry)
            .await
            .unwrap();

        let first = factory.teardown(&mut registry).await;
        let second = factory.teardown(&mut registry).await;
        assert_eq!(first.destroyed, 1);
        assert_eq!(second, TeardownReport::default());
    }

    #[tokio::test]
    async fn test_destroy_failure_is_counted() {
        let (factory, client) = factory(MockConfig {
            fail_destroy: vec![1000],
            ..Default::default()
        })
        .await;
        let points = client.spawn_points().await.unwrap();
        let mut registry = ActorRegistry::new();
        factory
            .spawn_ego(&EgoConfig::default(), &points, &mut registry)
            .await
            .unwrap();

        let report = factory.teardown(&mut registry).await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.survivors, vec![1000]);
        assert!(!report.is_clean());
        assert!(registry.is_empty());
        assert_eq!(client.actor_count(), 1);
    }

    #[tokio::test]
    async fn test_pedestrian_spawn_error_keeps_spawned_bodies() {
        let (factory, client) = factory(MockConfig {
            fail_spawns_after: Some(2),
            ..Default::default()
        })
        .await;
        let mut registry = ActorRegistry::new();
        let mut rng = StdRng::seed_from_u64(5);

        let report = factory
            .spawn_pedestrians(&traffic(4), &mut rng, &mut registry)
            .await
            .unwrap();
        assert_eq!(report.spawned, 2);
        assert_eq!(report.skipped, 2);
        assert_eq!(registry.pedestrians().len(), 2);
        // every body and controller in the world is tracked
        assert_eq!(client.actor_count(), registry.live_count());

        factory.teardown(&mut registry).await;
        assert_eq!(client.actor_count(), 0);
    }

    #[tokio::test]
    async fn test_background_spawn_error_skips_slot() {
        let (factory, client) = factory(MockConfig {
            fail_spawns_after: Some(1),
            ..Default::default()
        })
        .await;
        let points = client.spawn_points().await.unwrap();
        let mut registry = ActorRegistry::new();
        let mut rng = StdRng::seed_from_u64(2);

        let report = factory
            .spawn_background_vehicles(&points, 3, &mut rng, &mut registry)
            .await
            .unwrap();
        assert_eq!(report.spawned, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(client.actor_count(), registry.live_count());
    }

    #[tokio::test]
    async fn test_autopilot_failure_keeps_vehicle_tracked() {
        let (factory, client) = factory(MockConfig {
            fail_autopilot: true,
            ..Default::default()
        })
        .await;
        let points = client.spawn_points().await.unwrap();
        let mut registry = ActorRegistry::new();
        let mut rng = StdRng::seed_from_u64(4);

        let report = factory
            .spawn_background_vehicles(&points, 3, &mut rng, &mut registry)
            .await
            .unwrap();
        assert_eq!(report.spawned, 3);
        assert_eq!(registry.background_vehicles().len(), 3);
        assert_eq!(client.actor_count(), 3);

        let teardown = factory.teardown(&mut registry).await;
        assert!(teardown.is_clean());
        assert_eq!(client.actor_count(), 0);
    }
}
