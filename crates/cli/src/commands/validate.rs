//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::CockpitBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    start_town: String,
    town_count: usize,
    camera_count: usize,
    recorded_cameras: usize,
    vehicles: usize,
    pedestrians: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    start_town: blueprint.world.towns[blueprint.world.start_town_index].clone(),
                    town_count: blueprint.world.towns.len(),
                    camera_count: blueprint.cameras.len(),
                    recorded_cameras: blueprint.cameras.iter().filter(|c| c.record).count(),
                    vehicles: blueprint.traffic.vehicles,
                    pedestrians: blueprint.traffic.pedestrians,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &CockpitBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.cameras.is_empty() {
        warnings.push("No cameras configured - the HUD will only show text".to_string());
    }

    if blueprint.recording.enabled && blueprint.cameras.iter().all(|c| !c.record) {
        warnings.push("Recording enabled but no camera has record = true".to_string());
    }

    if !blueprint.collision.enabled {
        warnings.push("Collision sensor disabled - collision log will stay empty".to_string());
    }

    if !blueprint.world.town_cycling && blueprint.world.towns.len() > 1 {
        warnings.push("Town cycling disabled - only the start town will be used".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!(
                "  Start town: {} (of {})",
                summary.start_town, summary.town_count
            );
            println!(
                "  Cameras: {} ({} recorded)",
                summary.camera_count, summary.recorded_cameras
            );
            println!("  Vehicles: {}", summary.vehicles);
            println!("  Pedestrians: {}", summary.pedestrians);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
