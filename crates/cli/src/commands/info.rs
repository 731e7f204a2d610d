//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{CockpitBlueprint, WeatherPreset};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    simulator: SimulatorInfo,
    world: WorldInfo,
    ego_blueprint: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cameras: Vec<CameraInfo>,
    traffic: TrafficInfo,
    recording: RecordingInfo,
}

#[derive(Serialize)]
struct SimulatorInfo {
    host: String,
    port: u16,
    timeout_secs: f64,
}

#[derive(Serialize)]
struct WorldInfo {
    towns: Vec<String>,
    start_town: String,
    town_cycling: bool,
    weather_presets: Vec<WeatherPreset>,
}

#[derive(Serialize)]
struct CameraInfo {
    id: String,
    label: String,
    width: u32,
    height: u32,
    fov: f64,
    record: bool,
    screen: (u32, u32),
}

#[derive(Serialize)]
struct TrafficInfo {
    vehicles: usize,
    pedestrians: usize,
    pedestrian_speed: (f64, f64),
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

#[derive(Serialize)]
struct RecordingInfo {
    enabled: bool,
    output_dir: String,
    frame_rate: f64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &CockpitBlueprint, args: &InfoArgs) -> ConfigInfo {
    let cameras = if args.cameras {
        blueprint
            .cameras
            .iter()
            .map(|c| CameraInfo {
                id: c.id.clone(),
                label: c.label.clone(),
                width: c.width,
                height: c.height,
                fov: c.fov,
                record: c.record,
                screen: (c.screen.x, c.screen.y),
            })
            .collect()
    } else {
        Vec::new()
    };

    let world = &blueprint.world;
    let traffic = &blueprint.traffic;
    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        simulator: SimulatorInfo {
            host: blueprint.simulator.host.clone(),
            port: blueprint.simulator.port,
            timeout_secs: blueprint.simulator.timeout_secs,
        },
        world: WorldInfo {
            towns: world.towns.clone(),
            start_town: world.towns[world.start_town_index].clone(),
            town_cycling: world.town_cycling,
            weather_presets: world.weather_presets.clone(),
        },
        ego_blueprint: blueprint.ego.blueprint.clone(),
        cameras,
        traffic: TrafficInfo {
            vehicles: traffic.vehicles,
            pedestrians: traffic.pedestrians,
            pedestrian_speed: (traffic.pedestrian_speed_min, traffic.pedestrian_speed_max),
            seed: traffic.seed,
        },
        recording: RecordingInfo {
            enabled: blueprint.recording.enabled,
            output_dir: blueprint.recording.output_dir.clone(),
            frame_rate: blueprint.recording.frame_rate,
        },
    }
}

fn print_config_info(blueprint: &CockpitBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               CARLA Cockpit Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let world = &blueprint.world;
    println!("📍 World");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!(
        "   ├─ CARLA Server: {}:{}",
        blueprint.simulator.host, blueprint.simulator.port
    );
    println!("   ├─ Towns: {}", world.towns.join(", "));
    println!(
        "   ├─ Start town: {}{}",
        world.towns[world.start_town_index],
        if world.town_cycling { "" } else { " (cycling off)" }
    );
    println!("   └─ Weather: {:?}", world.weather_presets);

    println!("\n🚗 Ego vehicle");
    println!("   └─ {} (fallback {})", blueprint.ego.blueprint, blueprint.ego.fallback_filter);

    println!("\n📷 Cameras ({})", blueprint.cameras.len());
    for (i, camera) in blueprint.cameras.iter().enumerate() {
        let prefix = if i == blueprint.cameras.len() - 1 { "└─" } else { "├─" };
        if args.cameras {
            println!(
                "   {} {} \"{}\" {}x{} fov={} at ({}, {}){}",
                prefix,
                camera.id,
                camera.label,
                camera.width,
                camera.height,
                camera.fov,
                camera.screen.x,
                camera.screen.y,
                if camera.record { " [rec]" } else { "" }
            );
        } else {
            println!("   {} {}", prefix, camera.id);
        }
    }

    let traffic = &blueprint.traffic;
    println!("\n🚦 Traffic");
    println!("   ├─ Background vehicles: {}", traffic.vehicles);
    println!(
        "   └─ Pedestrians: {} ({:.1}-{:.1} m/s)",
        traffic.pedestrians, traffic.pedestrian_speed_min, traffic.pedestrian_speed_max
    );

    let recording = &blueprint.recording;
    println!("\n🎥 Recording");
    println!("   ├─ Enabled: {}", recording.enabled);
    println!("   ├─ Output: {}", recording.output_dir);
    println!("   └─ Frame rate: {}", recording.frame_rate);

    println!();
}
