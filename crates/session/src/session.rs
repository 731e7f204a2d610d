//! Session aggregate
//!
//! Everything one world instantiation owns: the actor registry, the capture
//! pipeline with its frame slots, the collision sensor source and the session
//! logs. Owned by the [`SessionManager`](crate::SessionManager) and torn down
//! as a unit.

use std::path::{Path, PathBuf};

use actor_factory::{SpawnReport, TeardownReport};
use capture::{CameraHandle, CapturePipeline, CaptureReport, FrameSlots};
use chrono::{DateTime, Local};
use contracts::{ActorId, ActorRegistry, SensorSource, WeatherPreset};
use telemetry::{LogSummary, SessionLogs};

/// Traffic spawned for a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrafficReport {
    pub vehicles: SpawnReport,
    pub pedestrians: SpawnReport,
}

/// One live world session
pub struct Session {
    pub(crate) map: String,
    pub(crate) town_index: usize,
    pub(crate) weather: WeatherPreset,
    pub(crate) started_at: DateTime<Local>,
    pub(crate) registry: ActorRegistry,
    pub(crate) capture: CapturePipeline,
    pub(crate) cameras: Vec<CameraHandle>,
    pub(crate) collision_source: Option<Box<dyn SensorSource>>,
    pub(crate) logs: SessionLogs,
    pub(crate) traffic: TrafficReport,
}

impl Session {
    pub fn map(&self) -> &str {
        &self.map
    }

    pub fn town_index(&self) -> usize {
        self.town_index
    }

    pub fn weather(&self) -> WeatherPreset {
        self.weather
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn ego(&self) -> Option<ActorId> {
        self.registry.ego()
    }

    pub fn registry(&self) -> &ActorRegistry {
        &self.registry
    }

    /// Frame slots, one per configured camera
    pub fn slots(&self) -> &FrameSlots {
        self.capture.slots()
    }

    pub fn cameras(&self) -> &[CameraHandle] {
        &self.cameras
    }

    pub fn traffic(&self) -> TrafficReport {
        self.traffic
    }

    /// Session output directory
    pub fn dir(&self) -> &Path {
        self.logs.dir()
    }

    /// Drive-log rows written so far
    pub fn ticks_logged(&self) -> u64 {
        self.logs.drive_rows()
    }
}

/// What a torn-down session left behind
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub map: String,
    pub town_index: usize,
    pub dir: PathBuf,
    pub traffic: TrafficReport,
    pub capture: CaptureReport,
    pub logs: LogSummary,
    pub teardown: TeardownReport,
    /// Actors still alive after teardown
    pub leaked: usize,
}
