//! `run` command implementation.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use carla_cockpit::{Drive, DriveConfig};
use cockpit::{DisplaySurface, HeadlessDisplay, HeadlessHorn, SnapshotOptions};
use config_loader::ConfigLoader;
use contracts::CockpitBlueprint;
use session::SessionOptions;
use tracing::{info, warn};

use crate::cli::RunArgs;

/// Execute the `run` command
pub async fn run_drive(args: &RunArgs) -> Result<()> {
    let blueprint = load_blueprint(args)?;

    info!(
        host = %blueprint.simulator.host,
        port = blueprint.simulator.port,
        town = %blueprint.world.towns[blueprint.world.start_town_index],
        cameras = blueprint.cameras.len(),
        vehicles = blueprint.traffic.vehicles,
        pedestrians = blueprint.traffic.pedestrians,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    // Everything below the input device touches the simulator or the disk
    let driver = resolve_driver(args)?;
    let input = cockpit::open_input_device(args.input_script.as_deref())
        .context("No input device available (pass --input-script)")?;
    let display = build_display(args)?;

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&blueprint.recording.output_dir));
    let config = DriveConfig {
        options: SessionOptions {
            driver,
            output_dir,
            record: !args.no_record,
            echo_collisions: !args.no_collision_echo,
        },
        max_ticks: (args.max_ticks != 0).then_some(args.max_ticks),
        blueprint,
    };

    let client = simulator_client(args);
    let horn = Box::new(HeadlessHorn::new());
    let stats = Drive::new(config, client, input, display, horn)
        .run(shutdown_signal())
        .await
        .context("Drive failed")?;

    stats.print_summary();
    info!("CARLA Cockpit finished");
    Ok(())
}

/// Load the blueprint and apply CLI overrides
fn load_blueprint(args: &RunArgs) -> Result<CockpitBlueprint> {
    let mut blueprint = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "Loading configuration");
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => {
            info!("No configuration file given, using built-in defaults");
            CockpitBlueprint::default()
        }
    };

    if let Some(ref host) = args.host {
        info!(host = %host, "Overriding CARLA host from CLI");
        blueprint.simulator.host = host.clone();
    }
    if let Some(port) = args.port {
        info!(port = %port, "Overriding CARLA port from CLI");
        blueprint.simulator.port = port;
    }
    if let Some(seed) = args.seed {
        blueprint.traffic.seed = Some(seed);
    }

    ConfigLoader::validate(&blueprint).context("Invalid configuration after CLI overrides")?;
    Ok(blueprint)
}

/// Driver name from the CLI, or prompted on stdin
fn resolve_driver(args: &RunArgs) -> Result<String> {
    if let Some(driver) = args.driver.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        return Ok(driver.to_string());
    }

    let stdin = io::stdin();
    prompt_driver(&mut stdin.lock(), &mut io::stdout())
}

fn prompt_driver(input: &mut impl BufRead, output: &mut impl Write) -> Result<String> {
    write!(output, "Enter driver name: ")?;
    output.flush()?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read driver name")?;
    let driver = line.trim();
    if driver.is_empty() {
        anyhow::bail!("A driver name is required");
    }
    Ok(driver.to_string())
}

fn build_display(args: &RunArgs) -> Result<Box<dyn DisplaySurface>> {
    let display = HeadlessDisplay::new();
    let display = match &args.snapshot_dir {
        Some(dir) => display
            .with_snapshots(SnapshotOptions {
                dir: dir.clone(),
                every: args.snapshot_every,
            })
            .with_context(|| format!("Failed to prepare snapshot dir {}", dir.display()))?,
        None => display,
    };
    Ok(Box::new(display))
}

#[cfg(feature = "real-carla")]
fn simulator_client(_args: &RunArgs) -> actor_factory::RealCarlaClient {
    info!("Using CARLA server");
    actor_factory::RealCarlaClient::new()
}

#[cfg(not(feature = "real-carla"))]
fn simulator_client(args: &RunArgs) -> actor_factory::MockCarlaClient {
    use actor_factory::{MockCarlaClient, MockConfig};

    info!(
        camera_hz = args.mock_camera_hz,
        "Running in MOCK mode (no CARLA server required)"
    );
    MockCarlaClient::with_config(MockConfig {
        camera_frequency_hz: Some(args.mock_camera_hz),
        ..Default::default()
    })
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &CockpitBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Simulator:");
    println!(
        "  CARLA: {}:{} (timeout {}s)",
        blueprint.simulator.host, blueprint.simulator.port, blueprint.simulator.timeout_secs
    );
    println!("\nWorld:");
    println!("  Towns: {}", blueprint.world.towns.join(", "));
    println!(
        "  Start town: {}",
        blueprint.world.towns[blueprint.world.start_town_index]
    );
    println!("  Town cycling: {}", blueprint.world.town_cycling);
    println!("  Weather presets: {}", blueprint.world.weather_presets.len());

    println!("\nCameras ({}):", blueprint.cameras.len());
    for camera in &blueprint.cameras {
        println!(
            "  - {} {}x{} fov={} record={}",
            camera.id, camera.width, camera.height, camera.fov, camera.record
        );
    }

    println!("\nTraffic:");
    println!("  Vehicles: {}", blueprint.traffic.vehicles);
    println!("  Pedestrians: {}", blueprint.traffic.pedestrians);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_prompt_driver() {
        let mut input = Cursor::new("  Alice \n");
        let mut output = Vec::new();
        let driver = prompt_driver(&mut input, &mut output).unwrap();
        assert_eq!(driver, "Alice");
        assert_eq!(String::from_utf8(output).unwrap(), "Enter driver name: ");
    }

    #[test]
    fn test_prompt_driver_empty() {
        let mut input = Cursor::new("\n");
        let mut output = Vec::new();
        assert!(prompt_driver(&mut input, &mut output).is_err());
    }
}
