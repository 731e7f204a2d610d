//! World session manager
//!
//! Connects to the simulator, builds sessions and rebuilds them on town
//! changes. A reload tears the previous session down completely, in
//! dependency order, before the next map is requested:
//!
//! 1. stop and destroy cameras and the collision sensor
//! 2. close the video encoders
//! 3. stop and destroy walker controllers, then destroy pedestrians
//! 4. destroy background vehicles
//! 5. destroy the controlled vehicle
//! 6. load the new map, spawn the controlled vehicle, attach sensors, spawn
//!    traffic

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use actor_factory::{ActorFactory, ActorFactoryError, CarlaClient, SpawnReport};
use capture::{CapturePipeline, RecordingOptions};
use chrono::Local;
use contracts::{
    ActorId, ActorRegistry, CockpitBlueprint, SensorKind, Transform, VehicleControl,
    WeatherPreset, MPS_TO_KMH,
};
use metrics::{counter, gauge};
use rand::rngs::StdRng;
use rand::SeedableRng;
use telemetry::SessionLogs;
use tracing::{debug, error, info, instrument, warn};

use crate::cursor::Cursor;
use crate::error::{Result, SessionError};
use crate::session::{Session, SessionSummary, TrafficReport};

/// Per-run settings that do not come from the blueprint
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Driver name written into every log row
    pub driver: String,
    /// Root of the per-session output directories
    pub output_dir: PathBuf,
    /// Video recording switch (AND-ed with the blueprint's)
    pub record: bool,
    /// Print collisions on stdout
    pub echo_collisions: bool,
}

/// Outcome of one control tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickSample {
    pub control: VehicleControl,
    pub speed_kmh: f64,
}

/// Owner of the simulator connection and of the live [`Session`]
pub struct SessionManager<C: CarlaClient> {
    factory: ActorFactory<C>,
    blueprint: CockpitBlueprint,
    options: SessionOptions,
    towns: Cursor,
    weather: Cursor,
    rng: StdRng,
    ego_alive: Arc<AtomicBool>,
    session: Option<Session>,
    history: Vec<SessionSummary>,
    reloads: u64,
}

impl<C: CarlaClient> SessionManager<C> {
    /// Connect to the simulator
    ///
    /// # Errors
    /// `Connectivity` (fatal) if the host does not answer within the
    /// configured timeout.
    #[instrument(
        name = "session_connect",
        skip(client, blueprint, options),
        fields(host = %blueprint.simulator.host, port = blueprint.simulator.port)
    )]
    pub async fn connect(
        mut client: C,
        blueprint: CockpitBlueprint,
        options: SessionOptions,
    ) -> Result<Self> {
        let simulator = &blueprint.simulator;
        let timeout =
            Duration::try_from_secs_f64(simulator.timeout_secs).unwrap_or(Duration::from_secs(10));
        let connectivity = |message: String| SessionError::Connectivity {
            host: simulator.host.clone(),
            port: simulator.port,
            message,
        };

        match tokio::time::timeout(
            timeout,
            client.connect(&simulator.host, simulator.port, timeout),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(connectivity(e.to_string())),
            Err(_) => return Err(connectivity(format!("no answer within {timeout:?}"))),
        }
        info!("connected to simulator");

        let rng = match blueprint.traffic.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let world = &blueprint.world;
        let towns = Cursor::new(world.start_town_index, world.towns.len());
        let weather = Cursor::new(world.start_weather_index, world.weather_presets.len());

        Ok(Self {
            factory: ActorFactory::new(client),
            blueprint,
            options,
            towns,
            weather,
            rng,
            ego_alive: Arc::new(AtomicBool::new(false)),
            session: None,
            history: Vec::new(),
            reloads: 0,
        })
    }

    /// Build the first session on the configured start town
    pub async fn load_session(&mut self) -> Result<()> {
        self.reload(self.towns.index()).await
    }

    /// Tear down the current session (if any) and build one on `town_index`
    ///
    /// # Errors
    /// - `LeakedActors` if the previous session did not tear down cleanly
    /// - `MapLoad` if the simulator refuses the map
    /// - `SpawnExhaustion` if every ego spawn point is occupied
    ///
    /// On error no session is left half-registered: either nothing was
    /// spawned, or the partial session is stored and released by `shutdown`.
    #[instrument(name = "session_reload", skip(self))]
    pub async fn reload(&mut self, town_index: usize) -> Result<()> {
        let towns = &self.blueprint.world.towns;
        let map = towns
            .get(town_index)
            .cloned()
            .ok_or(SessionError::UnknownTown {
                index: town_index,
                towns: towns.len(),
            })?;

        if let Some(previous) = self.session.take() {
            let summary = self.teardown(previous).await;
            let leaked = summary.leaked;
            let survivors = summary.teardown.survivors.clone();
            self.history.push(summary);
            if leaked > 0 {
                error!(leaked, ?survivors, "actors survived teardown, map not replaced");
                return Err(SessionError::LeakedActors { count: leaked });
            }
        }
        self.towns.set(town_index);

        let client = self.factory.client();
        client
            .load_map(&map)
            .await
            .map_err(|source| SessionError::MapLoad {
                map: map.clone(),
                source,
            })?;
        let spawn_points = client.spawn_points().await?;
        info!(map = %map, spawn_points = spawn_points.len(), "map loaded");

        let started_at = Local::now();
        let logs = SessionLogs::create(
            &self.options.output_dir,
            &self.options.driver,
            started_at,
            self.ego_alive.clone(),
        )?;

        let mut registry = ActorRegistry::new();
        let ego = match self
            .factory
            .spawn_ego(&self.blueprint.ego, &spawn_points, &mut registry)
            .await
        {
            Ok(ego) => ego,
            Err(e) => {
                logs.close();
                return Err(match e {
                    ActorFactoryError::SpawnExhausted { attempts, .. } => {
                        SessionError::SpawnExhaustion { map, attempts }
                    }
                    other => other.into(),
                });
            }
        };
        self.ego_alive.store(true, Ordering::Release);

        let recording = RecordingOptions {
            enabled: self.options.record && self.blueprint.recording.enabled,
            session_dir: Some(logs.dir().to_path_buf()),
            frame_rate: self.blueprint.recording.frame_rate,
            queue_capacity: self.blueprint.recording.encoder_queue,
        };
        self.session = Some(Session {
            map,
            town_index,
            weather: self.current_weather(),
            started_at,
            registry,
            capture: CapturePipeline::new(self.blueprint.cameras.len(), recording),
            cameras: Vec::with_capacity(self.blueprint.cameras.len()),
            collision_source: None,
            logs,
            traffic: TrafficReport::default(),
        });

        self.populate(ego, &spawn_points).await?;
        self.reloads += 1;
        counter!("carla_cockpit_sessions_total").increment(1);
        if let Some(session) = &self.session {
            gauge!("carla_cockpit_live_actors").set(session.registry.live_count() as f64);
            info!(
                map = %session.map,
                ego,
                live_actors = session.registry.live_count(),
                dir = %session.dir().display(),
                "session ready"
            );
        }
        Ok(())
    }

    /// Attach sensors, apply weather and spawn traffic for the stored session
    async fn populate(&mut self, ego: ActorId, spawn_points: &[Transform]) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Err(SessionError::NoSession);
        };
        let client = self.factory.client();

        for (index, camera) in self.blueprint.cameras.iter().enumerate() {
            let actor = self
                .factory
                .spawn_camera(ego, camera, &mut session.registry)
                .await?;
            let source = client
                .get_sensor_source(actor, camera.id.clone(), SensorKind::Camera)
                .ok_or_else(|| ActorFactoryError::sensor_spawn(&camera.id, "no sensor source"))?;
            let handle = session.capture.attach_camera(index, camera, source)?;
            session.cameras.push(handle);
        }

        if self.blueprint.collision.enabled {
            let actor = self
                .factory
                .spawn_collision_sensor(ego, &mut session.registry)
                .await?;
            let source = client
                .get_sensor_source(actor, "collision".to_string(), SensorKind::Collision)
                .ok_or_else(|| ActorFactoryError::sensor_spawn("collision", "no sensor source"))?;
            source.listen(
                session
                    .logs
                    .collision_handle()
                    .with_console_echo(self.options.echo_collisions)
                    .callback(),
            );
            session.collision_source = Some(source);
        }

        client.set_weather(session.weather.parameters()).await?;

        let traffic = &self.blueprint.traffic;
        let vehicles = match self
            .factory
            .spawn_background_vehicles(
                spawn_points,
                traffic.vehicles,
                &mut self.rng,
                &mut session.registry,
            )
            .await
        {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "background traffic unavailable");
                skipped_report(traffic.vehicles)
            }
        };
        let pedestrians = match self
            .factory
            .spawn_pedestrians(traffic, &mut self.rng, &mut session.registry)
            .await
        {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "pedestrians unavailable");
                skipped_report(traffic.pedestrians)
            }
        };
        record_spawn_report("vehicle", vehicles);
        record_spawn_report("pedestrian", pedestrians);
        session.traffic = TrafficReport {
            vehicles,
            pedestrians,
        };
        Ok(())
    }

    /// Release every resource of `session` in dependency order
    #[instrument(name = "session_teardown", skip(self, session), fields(map = %session.map))]
    async fn teardown(&mut self, mut session: Session) -> SessionSummary {
        info!(live_actors = session.registry.live_count(), "tearing down session");

        // sensors: no callback runs once stop() returns
        session.capture.stop_all();
        if let Some(source) = session.collision_source.take() {
            source.stop();
        }
        let mut teardown = self
            .factory
            .destroy_sensors(session.registry.take_sensors())
            .await;

        let capture = session.capture.finalize();

        teardown += self
            .factory
            .destroy_pedestrians(session.registry.take_pedestrians())
            .await;
        teardown += self
            .factory
            .destroy_background_vehicles(session.registry.take_background_vehicles())
            .await;

        self.ego_alive.store(false, Ordering::Release);
        teardown += self.factory.destroy_ego(session.registry.take_ego()).await;

        // failed destroys are still in the world even though the registry is drained
        let leaked = teardown.survivors.len() + session.registry.live_count();
        let dir = session.logs.dir().to_path_buf();
        let logs = session.logs.close();
        gauge!("carla_cockpit_live_actors").set(leaked as f64);
        info!(
            destroyed = teardown.destroyed,
            failed = teardown.failed,
            leaked,
            "session torn down"
        );

        SessionSummary {
            map: session.map,
            town_index: session.town_index,
            dir,
            traffic: session.traffic,
            capture,
            logs,
            teardown,
            leaked,
        }
    }

    /// Advance the town cursor one step and reload
    ///
    /// Returns the new map, or `None` when town cycling is disabled.
    pub async fn advance_town(&mut self) -> Result<Option<String>> {
        if !self.blueprint.world.town_cycling {
            info!("town cycling disabled, ignoring advance");
            return Ok(None);
        }
        let index = self.towns.advance();
        let map = self.blueprint.world.towns[index].clone();
        info!(town = %map, index, "[Town] Changing town");
        counter!("carla_cockpit_reloads_total").increment(1);
        self.reload(index).await?;
        Ok(Some(map))
    }

    /// Advance the weather cursor one step; no actor is touched
    pub async fn advance_weather(&mut self) -> Result<WeatherPreset> {
        self.weather.advance();
        let preset = self.current_weather();
        self.factory
            .client()
            .set_weather(preset.parameters())
            .await?;
        if let Some(session) = self.session.as_mut() {
            session.weather = preset;
        }
        counter!("carla_cockpit_weather_changes_total").increment(1);
        info!(weather = ?preset, index = self.weather.index(), "[Weather] Changed preset");
        Ok(preset)
    }

    /// Apply a control record to the controlled vehicle
    pub async fn apply_control(&self, control: VehicleControl) -> Result<()> {
        let ego = self.require_ego()?;
        self.factory.client().apply_control(ego, control).await?;
        Ok(())
    }

    /// Controlled vehicle speed in km/h
    pub async fn ego_speed_kmh(&self) -> Result<f64> {
        let ego = self.require_ego()?;
        let velocity = self.factory.client().velocity(ego).await?;
        Ok(velocity.norm() * MPS_TO_KMH)
    }

    /// Append one drive-log row for the current session
    pub fn log_tick(&mut self, speed_kmh: f64, throttle: f64, brake: f64) -> Result<()> {
        let session = self.session.as_mut().ok_or(SessionError::NoSession)?;
        session.logs.log_tick(speed_kmh, throttle, brake);
        Ok(())
    }

    /// One control tick: apply the control, sample speed, log the row
    pub async fn tick(&mut self, control: VehicleControl) -> Result<TickSample> {
        self.apply_control(control).await?;
        let speed_kmh = self.ego_speed_kmh().await?;
        self.log_tick(speed_kmh, control.throttle, control.brake)?;
        gauge!("carla_cockpit_speed_kmh").set(speed_kmh);
        Ok(TickSample { control, speed_kmh })
    }

    /// Tear down the current session without loading another map
    #[instrument(name = "session_shutdown", skip(self))]
    pub async fn shutdown(&mut self) -> Option<SessionSummary> {
        let session = self.session.take()?;
        let summary = self.teardown(session).await;
        self.history.push(summary.clone());
        Some(summary)
    }

    fn require_ego(&self) -> Result<ActorId> {
        self.session
            .as_ref()
            .and_then(Session::ego)
            .ok_or(SessionError::NoSession)
    }

    fn current_weather(&self) -> WeatherPreset {
        self.blueprint
            .world
            .weather_presets
            .get(self.weather.index())
            .copied()
            .unwrap_or(WeatherPreset::ClearNoon)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn blueprint(&self) -> &CockpitBlueprint {
        &self.blueprint
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn client(&self) -> &C {
        self.factory.client()
    }

    pub fn town_index(&self) -> usize {
        self.towns.index()
    }

    pub fn weather_index(&self) -> usize {
        self.weather.index()
    }

    /// Whether a controlled vehicle is currently alive
    pub fn ego_alive(&self) -> bool {
        self.ego_alive.load(Ordering::Acquire)
    }

    /// Sessions built so far, including the current one
    pub fn reloads(&self) -> u64 {
        self.reloads
    }

    /// Summaries of torn-down sessions, oldest first
    pub fn history(&self) -> &[SessionSummary] {
        &self.history
    }
}

impl<C: CarlaClient> Drop for SessionManager<C> {
    fn drop(&mut self) {
        if let Some(session) = &self.session {
            warn!(
                map = %session.map,
                live_actors = session.registry.live_count(),
                "session manager dropped without shutdown"
            );
        }
    }
}

fn skipped_report(requested: usize) -> SpawnReport {
    SpawnReport {
        requested,
        skipped: requested,
        ..Default::default()
    }
}

fn record_spawn_report(kind: &'static str, report: SpawnReport) {
    counter!("carla_cockpit_actors_spawned_total", "kind" => kind).increment(report.spawned as u64);
    counter!("carla_cockpit_actors_skipped_total", "kind" => kind).increment(report.skipped as u64);
    debug!(
        kind,
        requested = report.requested,
        spawned = report.spawned,
        skipped = report.skipped,
        uncontrolled = report.uncontrolled,
        "traffic spawned"
    );
}
