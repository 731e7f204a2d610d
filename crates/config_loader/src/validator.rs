//! Configuration validation
//!
//! Rules:
//! - field ranges (derived `Validate` on the blueprint)
//! - camera ids unique
//! - start town / weather indices inside their tables
//! - pedestrian speed range ordered
//! - every camera region fits on the HUD

use std::collections::HashSet;

use contracts::{CockpitBlueprint, ContractError};
use validator::{Validate, ValidationErrors};

/// Validate a CockpitBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &CockpitBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(from_validation_errors)?;
    validate_camera_ids(blueprint)?;
    validate_start_indices(blueprint)?;
    validate_pedestrian_speed(blueprint)?;
    validate_camera_placement(blueprint)?;
    Ok(())
}

/// Flatten derived-validator output into the first failing field
fn from_validation_errors(errors: ValidationErrors) -> ContractError {
    let message = errors.to_string();
    let field = message
        .split(':')
        .next()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .unwrap_or("blueprint")
        .to_string();
    ContractError::config_validation(field, message)
}

/// Camera ids must be unique
fn validate_camera_ids(blueprint: &CockpitBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for camera in &blueprint.cameras {
        if !seen.insert(camera.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("cameras[id={}]", camera.id),
                "duplicate camera id",
            ));
        }
    }
    Ok(())
}

/// Start indices must address an entry of their table
fn validate_start_indices(blueprint: &CockpitBlueprint) -> Result<(), ContractError> {
    let world = &blueprint.world;
    if world.start_town_index >= world.towns.len() {
        return Err(ContractError::config_validation(
            "world.start_town_index",
            format!(
                "index {} out of range for {} towns",
                world.start_town_index,
                world.towns.len()
            ),
        ));
    }
    if world.start_weather_index >= world.weather_presets.len() {
        return Err(ContractError::config_validation(
            "world.start_weather_index",
            format!(
                "index {} out of range for {} weather presets",
                world.start_weather_index,
                world.weather_presets.len()
            ),
        ));
    }
    Ok(())
}

fn validate_pedestrian_speed(blueprint: &CockpitBlueprint) -> Result<(), ContractError> {
    let traffic = &blueprint.traffic;
    if traffic.pedestrian_speed_min > traffic.pedestrian_speed_max {
        return Err(ContractError::config_validation(
            "traffic.pedestrian_speed_min / traffic.pedestrian_speed_max",
            format!(
                "pedestrian_speed_min ({}) must be <= pedestrian_speed_max ({})",
                traffic.pedestrian_speed_min, traffic.pedestrian_speed_max
            ),
        ));
    }
    Ok(())
}

/// A camera region must start inside the HUD; overflow past the edge is clipped
fn validate_camera_placement(blueprint: &CockpitBlueprint) -> Result<(), ContractError> {
    let hud = &blueprint.hud;
    for camera in &blueprint.cameras {
        if camera.screen.x >= hud.width || camera.screen.y >= hud.height {
            return Err(ContractError::config_validation(
                format!("cameras[{}].screen", camera.id),
                format!(
                    "origin ({}, {}) outside the {}x{} display",
                    camera.screen.x, camera.screen.y, hud.width, hud.height
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&CockpitBlueprint::default()).is_ok());
    }

    #[test]
    fn test_duplicate_camera_id() {
        let mut bp = CockpitBlueprint::default();
        bp.cameras.push(bp.cameras[0].clone());
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("duplicate camera id"), "got: {err}");
    }

    #[test]
    fn test_start_weather_out_of_range() {
        let mut bp = CockpitBlueprint::default();
        bp.world.start_weather_index = bp.world.weather_presets.len();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("start_weather_index"), "got: {err}");
    }

    #[test]
    fn test_pedestrian_speed_inverted() {
        let mut bp = CockpitBlueprint::default();
        bp.traffic.pedestrian_speed_min = 3.0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("pedestrian_speed_min"), "got: {err}");
    }

    #[test]
    fn test_derived_range_rules_apply() {
        let mut bp = CockpitBlueprint::default();
        bp.controls.deadzone = 1.5;
        let err = validate(&bp).unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
    }

    #[test]
    fn test_empty_town_table() {
        let mut bp = CockpitBlueprint::default();
        bp.world.towns.clear();
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_camera_outside_display() {
        let mut bp = CockpitBlueprint::default();
        bp.cameras[1].screen.x = bp.hud.width;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("outside"), "got: {err}");
    }
}
