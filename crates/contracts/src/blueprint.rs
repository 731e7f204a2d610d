//! CockpitBlueprint - Config Loader output
//!
//! Describes a complete cockpit run: simulator endpoint, town and weather
//! tables, ego vehicle, camera rig, background traffic, controls, recording
//! and HUD geometry. Every section has defaults matching the stock five-camera
//! cockpit, so an empty document is a valid blueprint.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete cockpit configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CockpitBlueprint {
    /// Configuration version
    pub version: ConfigVersion,

    /// Simulator endpoint
    #[validate(nested)]
    pub simulator: SimulatorConfig,

    /// Town and weather tables
    #[validate(nested)]
    pub world: WorldConfig,

    /// Controlled vehicle
    #[validate(nested)]
    pub ego: EgoConfig,

    /// Camera rig mounted on the ego vehicle
    #[validate(nested)]
    pub cameras: Vec<CameraConfig>,

    /// Collision sensor
    pub collision: CollisionConfig,

    /// Background vehicles and pedestrians
    #[validate(nested)]
    pub traffic: TrafficConfig,

    /// Input mapping and loop rate
    #[validate(nested)]
    pub controls: ControlsConfig,

    /// Video and log output
    #[validate(nested)]
    pub recording: RecordingConfig,

    /// Display geometry
    #[validate(nested)]
    pub hud: HudConfig,
}

impl Default for CockpitBlueprint {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            simulator: SimulatorConfig::default(),
            world: WorldConfig::default(),
            ego: EgoConfig::default(),
            cameras: CameraConfig::default_rig(),
            collision: CollisionConfig::default(),
            traffic: TrafficConfig::default(),
            controls: ControlsConfig::default(),
            recording: RecordingConfig::default(),
            hud: HudConfig::default(),
        }
    }
}

/// Simulator endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SimulatorConfig {
    /// CARLA server host
    #[validate(length(min = 1))]
    pub host: String,

    /// CARLA server port
    #[validate(range(min = 1))]
    pub port: u16,

    /// Initial connection timeout (seconds)
    #[validate(range(exclusive_min = 0.0))]
    pub timeout_secs: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 2000,
            timeout_secs: 10.0,
        }
    }
}

/// Town and weather tables
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WorldConfig {
    /// Towns visited by the town-cycling command, in order
    #[validate(length(min = 1))]
    pub towns: Vec<String>,

    /// Index into `towns` loaded at startup
    pub start_town_index: usize,

    /// Whether the advance-town command is honoured
    pub town_cycling: bool,

    /// Weather presets visited by the advance-weather command, in order
    #[validate(length(min = 1))]
    pub weather_presets: Vec<WeatherPreset>,

    /// Index into `weather_presets` applied at startup
    pub start_weather_index: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            towns: ["Town01", "Town02", "Town03", "Town04", "Town05"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            start_town_index: 1,
            town_cycling: true,
            weather_presets: WeatherPreset::CYCLE.to_vec(),
            start_weather_index: 0,
        }
    }
}

/// Weather preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherPreset {
    ClearNoon,
    CloudyNoon,
    WetNoon,
    MidRainyNoon,
    SoftRainNoon,
    ClearSunset,
}

impl WeatherPreset {
    /// Default weather cycle
    pub const CYCLE: [WeatherPreset; 6] = [
        WeatherPreset::ClearNoon,
        WeatherPreset::CloudyNoon,
        WeatherPreset::WetNoon,
        WeatherPreset::MidRainyNoon,
        WeatherPreset::SoftRainNoon,
        WeatherPreset::ClearSunset,
    ];

    /// Numeric weather parameters for this preset
    pub fn parameters(self) -> WeatherParams {
        let (cloudiness, precipitation, precipitation_deposits, wetness, sun_altitude_angle) =
            match self {
                WeatherPreset::ClearNoon => (5.0, 0.0, 0.0, 0.0, 45.0),
                WeatherPreset::CloudyNoon => (60.0, 0.0, 0.0, 0.0, 45.0),
                WeatherPreset::WetNoon => (5.0, 0.0, 50.0, 50.0, 45.0),
                WeatherPreset::MidRainyNoon => (60.0, 60.0, 60.0, 60.0, 45.0),
                WeatherPreset::SoftRainNoon => (20.0, 30.0, 50.0, 30.0, 45.0),
                WeatherPreset::ClearSunset => (5.0, 0.0, 0.0, 0.0, 15.0),
            };
        WeatherParams {
            cloudiness,
            precipitation,
            precipitation_deposits,
            wetness,
            sun_altitude_angle,
        }
    }
}

/// Numeric weather parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherParams {
    pub cloudiness: f32,
    pub precipitation: f32,
    pub precipitation_deposits: f32,
    pub wetness: f32,
    pub sun_altitude_angle: f32,
}

/// Controlled vehicle configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EgoConfig {
    /// Preferred blueprint
    #[validate(length(min = 1))]
    pub blueprint: String,

    /// Blueprint filter used when the preferred blueprint is missing
    #[validate(length(min = 1))]
    pub fallback_filter: String,
}

impl Default for EgoConfig {
    fn default() -> Self {
        Self {
            blueprint: "vehicle.tesla.model3".to_string(),
            fallback_filter: "vehicle.*".to_string(),
        }
    }
}

/// 3D transform: location + rotation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    /// Location (x, y, z) in meters
    pub location: Location,

    /// Rotation (pitch, yaw, roll) in degrees
    pub rotation: Rotation,
}

impl Transform {
    /// Transform at `location` with no rotation
    pub fn at(location: Location) -> Self {
        Self {
            location,
            rotation: Rotation::default(),
        }
    }

    /// Transform from a location and a rotation
    pub fn new(location: Location, rotation: Rotation) -> Self {
        Self { location, rotation }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rotation {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl Rotation {
    pub fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }
}

/// Camera configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct CameraConfig {
    /// Unique identifier
    #[validate(length(min = 1))]
    pub id: String,

    /// HUD label drawn next to the camera region
    #[serde(default)]
    pub label: String,

    /// Mount pose relative to the ego vehicle
    #[serde(default)]
    pub transform: Transform,

    /// Image width (pixels)
    #[validate(range(min = 1, max = 8192))]
    pub width: u32,

    /// Image height (pixels)
    #[validate(range(min = 1, max = 8192))]
    pub height: u32,

    /// Horizontal field of view (degrees)
    #[serde(default = "default_fov")]
    #[validate(range(exclusive_min = 0.0, max = 180.0))]
    pub fov: f64,

    /// Whether delivered frames are written to a video file
    #[serde(default = "default_record")]
    pub record: bool,

    /// Screen placement on the HUD
    #[serde(default)]
    pub screen: ScreenPlacement,
}

fn default_fov() -> f64 {
    90.0
}

fn default_record() -> bool {
    true
}

impl CameraConfig {
    /// Stock five-camera rig: front, rear, left, right, bird's-eye
    pub fn default_rig() -> Vec<CameraConfig> {
        let camera = |id: &str,
                      label: &str,
                      location: Location,
                      rotation: Rotation,
                      (width, height): (u32, u32),
                      screen: ScreenPlacement| CameraConfig {
            id: id.to_string(),
            label: label.to_string(),
            transform: Transform::new(location, rotation),
            width,
            height,
            fov: default_fov(),
            record: true,
            screen,
        };

        vec![
            camera(
                "front",
                "Front Camera",
                Location::new(1.5, 0.0, 1.5),
                Rotation::default(),
                (800, 600),
                ScreenPlacement::new(0, 0, 300, 10),
            ),
            camera(
                "rear",
                "Rear Camera",
                Location::new(-2.5, 0.0, 1.5),
                Rotation::new(0.0, 180.0, 0.0),
                (400, 300),
                ScreenPlacement::new(800, 0, 1000, 10),
            ),
            camera(
                "left",
                "Left Camera",
                Location::new(0.0, -1.5, 1.5),
                Rotation::new(0.0, -90.0, 0.0),
                (400, 300),
                ScreenPlacement::new(800, 300, 1000, 310),
            ),
            camera(
                "right",
                "Right Camera",
                Location::new(0.0, 1.5, 1.5),
                Rotation::new(0.0, 90.0, 0.0),
                (400, 300),
                ScreenPlacement::new(800, 600, 1000, 610),
            ),
            camera(
                "bev",
                "BEV Camera",
                Location::new(0.0, 0.0, 50.0),
                Rotation::new(-90.0, 0.0, 0.0),
                (400, 300),
                ScreenPlacement::new(0, 600, 300, 610),
            ),
        ]
    }
}

/// Pixel offsets of a camera region and its label on the HUD
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenPlacement {
    pub x: u32,
    pub y: u32,
    pub label_x: u32,
    pub label_y: u32,
}

impl ScreenPlacement {
    pub fn new(x: u32, y: u32, label_x: u32, label_y: u32) -> Self {
        Self {
            x,
            y,
            label_x,
            label_y,
        }
    }
}

/// Collision sensor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub enabled: bool,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Background traffic configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TrafficConfig {
    /// Background vehicles requested per session
    #[validate(range(max = 500))]
    pub vehicles: usize,

    /// Pedestrians requested per session
    #[validate(range(max = 500))]
    pub pedestrians: usize,

    /// Lower bound of a pedestrian controller's max speed
    #[validate(range(min = 0.0))]
    pub pedestrian_speed_min: f64,

    /// Upper bound of a pedestrian controller's max speed
    #[validate(range(min = 0.0))]
    pub pedestrian_speed_max: f64,

    /// RNG seed for spawn sampling (None = OS entropy)
    pub seed: Option<u64>,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            vehicles: 30,
            pedestrians: 10,
            pedestrian_speed_min: 1.0,
            pedestrian_speed_max: 2.0,
            seed: None,
        }
    }
}

/// Input mapping and control loop rate
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ControlsConfig {
    /// Axis magnitude below which the mapped value is forced to zero
    #[validate(range(min = 0.0, max = 1.0))]
    pub deadzone: f64,

    /// Control loop rate (Hz)
    #[validate(range(min = 1.0, max = 1000.0))]
    pub tick_hz: f64,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            deadzone: 0.1,
            tick_hz: 60.0,
        }
    }
}

/// Video and log output
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RecordingConfig {
    /// Master switch for video recording (logs are always written)
    pub enabled: bool,

    /// Base directory; each session creates a timestamped subdirectory
    #[validate(length(min = 1))]
    pub output_dir: String,

    /// Container frame rate written into each video header
    #[validate(range(min = 1.0, max = 240.0))]
    pub frame_rate: f64,

    /// Frames buffered between a camera callback and its encoder thread
    #[validate(range(min = 1, max = 4096))]
    pub encoder_queue: usize,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_dir: "recordings".to_string(),
            frame_rate: 20.0,
            encoder_queue: 64,
        }
    }
}

/// Display geometry
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct HudConfig {
    #[validate(range(min = 1, max = 16384))]
    pub width: u32,

    #[validate(range(min = 1, max = 16384))]
    pub height: u32,
}

impl Default for HudConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 900,
        }
    }
}
