//! Drive orchestrator - runs the fixed-rate control loop.
//!
//! Each tick, in order:
//! 1. poll the input device and map it to a control record
//! 2. apply the control, sample speed, append the drive-log row
//! 3. handle the tick's discrete actions (gear, horn, weather, town)
//! 4. compose the HUD from the frame slots and present it; after a town
//!    change the speed shown is sampled from the new ego
//!
//! A town change rebuilds the session inside the tick, so no input is read
//! and no row is logged while a reload is in progress. Whatever ends the
//! loop (quit, tick limit, signal, error), the session is shut down in
//! dependency order before `run` returns.

use std::future::Future;
use std::time::{Duration, Instant};

use actor_factory::CarlaClient;
use cockpit::{Action, ControlMapper, DisplaySurface, Horn, HudComposer, HudStatus, InputDevice};
use contracts::{CameraConfig, CockpitBlueprint};
use observability::metrics::{
    record_frame_presented, record_gear_change, record_horn, record_tick, record_tick_overrun,
    record_town_change,
};
use session::{SessionManager, SessionOptions};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::DriveStats;
use crate::error::Result;

/// Drive configuration
#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// The cockpit blueprint
    pub blueprint: CockpitBlueprint,

    /// Driver, output directory and recording switches
    pub options: SessionOptions,

    /// Stop after this many ticks (None = until quit)
    pub max_ticks: Option<u64>,
}

/// Main drive orchestrator
pub struct Drive<C: CarlaClient> {
    config: DriveConfig,
    client: C,
    input: Box<dyn InputDevice>,
    display: Box<dyn DisplaySurface>,
    horn: Box<dyn Horn>,
}

impl<C: CarlaClient> Drive<C> {
    pub fn new(
        config: DriveConfig,
        client: C,
        input: Box<dyn InputDevice>,
        display: Box<dyn DisplaySurface>,
        horn: Box<dyn Horn>,
    ) -> Self {
        Self {
            config,
            client,
            input,
            display,
            horn,
        }
    }

    /// Connect, build the first session and drive until quit or `shutdown`
    ///
    /// # Errors
    /// - connection failure (fatal, nothing was created)
    /// - session-fatal failures on the initial load or a town change; the
    ///   session is shut down before the error is returned
    pub async fn run<F>(self, shutdown: F) -> Result<DriveStats>
    where
        F: Future<Output = ()>,
    {
        let started = Instant::now();
        let Drive {
            config,
            client,
            input,
            display,
            horn,
        } = self;

        let tick_hz = config.blueprint.controls.tick_hz;
        let period = Duration::from_secs_f64(1.0 / tick_hz);
        let mapper = ControlMapper::new(config.blueprint.controls.deadzone);
        let composer = HudComposer::new(&config.blueprint.hud);
        let cameras = config.blueprint.cameras.clone();
        let driver = config.options.driver.clone();

        info!(
            host = %config.blueprint.simulator.host,
            port = config.blueprint.simulator.port,
            driver = %driver,
            input = input.name(),
            "Connecting to simulator..."
        );
        let mut manager =
            SessionManager::connect(client, config.blueprint, config.options).await?;

        let mut drive_loop = DriveLoop {
            mapper,
            composer,
            cameras,
            driver,
            input,
            display,
            horn,
            period,
            hud_speed_kmh: 0.0,
            stats: DriveStats::default(),
        };

        let outcome = match manager.load_session().await {
            Ok(()) => {
                info!(tick_hz, max_ticks = ?config.max_ticks, "Drive loop running");
                drive_loop
                    .drive(&mut manager, config.max_ticks, shutdown)
                    .await
            }
            Err(e) => Err(e.into()),
        };

        info!("Shutting down session...");
        manager.shutdown().await;

        let mut stats = drive_loop.stats;
        stats.sessions = manager.reloads();
        stats.absorb(manager.history());
        stats.frames_presented = drive_loop.display.frames_presented();
        stats.horns_sounded = drive_loop.horn.times_sounded();
        stats.duration = started.elapsed();

        match outcome {
            Ok(()) => {
                info!(
                    ticks = stats.ticks(),
                    sessions = stats.sessions,
                    duration_secs = stats.duration.as_secs_f64(),
                    "Drive finished"
                );
                Ok(stats)
            }
            Err(e) => {
                error!(error = %e, ticks = stats.ticks(), "Drive aborted");
                Err(e)
            }
        }
    }
}

/// Per-run loop state owned by the control loop
struct DriveLoop {
    mapper: ControlMapper,
    composer: HudComposer,
    cameras: Vec<CameraConfig>,
    driver: String,
    input: Box<dyn InputDevice>,
    display: Box<dyn DisplaySurface>,
    horn: Box<dyn Horn>,
    period: Duration,
    /// Speed shown by the last composed HUD
    hud_speed_kmh: f64,
    stats: DriveStats,
}

impl DriveLoop {
    async fn drive<C, F>(
        &mut self,
        manager: &mut SessionManager<C>,
        max_ticks: Option<u64>,
        shutdown: F,
    ) -> Result<()>
    where
        C: CarlaClient,
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping drive loop...");
                    return Ok(());
                }
                _ = interval.tick() => {}
            }

            if !self.step(manager).await? {
                return Ok(());
            }

            if let Some(max) = max_ticks {
                if self.stats.ticks() >= max {
                    info!(ticks = max, "Reached max ticks limit");
                    return Ok(());
                }
            }
        }
    }

    /// One control tick; `false` ends the loop
    async fn step<C: CarlaClient>(&mut self, manager: &mut SessionManager<C>) -> Result<bool> {
        let tick_started = Instant::now();

        let frame = self.input.poll()?;
        let tick = self.mapper.map(&frame);
        if tick.wants_quit() {
            info!("Quit requested");
            return Ok(false);
        }

        let sample = manager.tick(tick.control).await?;
        self.hud_speed_kmh = sample.speed_kmh;

        for action in &tick.actions {
            match *action {
                Action::GearChanged(gear) => {
                    info!(gear = %gear, "[Gear] Toggled");
                    record_gear_change(gear);
                    self.stats.drive_metrics.record_gear_change();
                }
                Action::Honk => {
                    if let Err(e) = self.horn.sound() {
                        warn!(error = %e, "Failed to sound horn");
                    }
                    record_horn();
                    self.stats.drive_metrics.record_horn();
                }
                Action::AdvanceWeather => {
                    manager.advance_weather().await?;
                    self.stats.weather_changes += 1;
                }
                Action::AdvanceTown => {
                    if self.change_town(manager).await? {
                        // the sampled speed belonged to the destroyed ego
                        self.hud_speed_kmh = manager.ego_speed_kmh().await?;
                    }
                }
                Action::Quit => {}
            }
        }

        if let Some(session) = manager.session() {
            let status = HudStatus {
                gear: self.mapper.gear(),
                speed_kmh: self.hud_speed_kmh,
                driver: &self.driver,
            };
            let hud = self.composer.compose(session.slots(), &self.cameras, status);
            if let Err(e) = self.display.present(hud) {
                warn!(error = %e, "Failed to present HUD frame");
            }
            record_frame_presented(hud.cameras_drawn);
        }

        let elapsed = tick_started.elapsed();
        record_tick(&sample.control, sample.speed_kmh, elapsed);
        self.stats
            .drive_metrics
            .update(&sample.control, sample.speed_kmh, elapsed);
        if let Some(overrun) = elapsed.checked_sub(self.period).filter(|d| !d.is_zero()) {
            debug!(overrun_ms = overrun.as_secs_f64() * 1000.0, "Tick overran its period");
            record_tick_overrun(overrun);
            self.stats.drive_metrics.record_overrun();
        }

        Ok(true)
    }

    /// Advance the town; `true` when a new session was loaded
    async fn change_town<C: CarlaClient>(&mut self, manager: &mut SessionManager<C>) -> Result<bool> {
        match manager.advance_town().await {
            Ok(Some(map)) => {
                record_town_change(&map, true);
                self.stats.drive_metrics.record_town_change(&map);
                self.stats.town_changes += 1;
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => {
                let map = manager
                    .blueprint()
                    .world
                    .towns
                    .get(manager.town_index())
                    .cloned()
                    .unwrap_or_default();
                record_town_change(&map, false);
                Err(e.into())
            }
        }
    }
}
