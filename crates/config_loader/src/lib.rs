//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Generate `CockpitBlueprint`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("cockpit.toml")).unwrap();
//! println!("Towns: {:?}", blueprint.world.towns);
//! ```

mod parser;
mod validator;

pub use contracts::CockpitBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<CockpitBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<CockpitBlueprint, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Validate an already-built blueprint (e.g. defaults with CLI overrides)
    pub fn validate(blueprint: &CockpitBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    /// Serialize CockpitBlueprint to TOML string
    pub fn to_toml(blueprint: &CockpitBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize CockpitBlueprint to JSON string
    pub fn to_json(blueprint: &CockpitBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<CockpitBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_TOML: &str = r#"
[simulator]
host = "127.0.0.1"
port = 2000

[world]
towns = ["Town01", "Town02", "Town03"]
start_town_index = 1

[traffic]
vehicles = 5
pedestrians = 2
seed = 7

[[cameras]]
id = "front"
label = "Front Camera"
width = 800
height = 600
[cameras.transform.location]
x = 1.5
z = 1.5
[cameras.screen]
label_x = 300
label_y = 10
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.world.towns[1], "Town02");
        assert_eq!(bp.cameras.len(), 1);
        assert_eq!(bp.traffic.seed, Some(7));
        assert!(bp.cameras[0].record);
    }

    #[test]
    fn test_round_trip_json() {
        let bp = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(bp.world.towns, bp2.world.towns);
        assert_eq!(bp.cameras[0].id, bp2.cameras[0].id);
    }

    #[test]
    fn test_default_blueprint_serializes_and_reloads() {
        let toml = ConfigLoader::to_toml(&CockpitBlueprint::default()).unwrap();
        let bp = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.cameras.len(), 5);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[world]
towns = ["Town01"]
start_town_index = 3
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("start_town_index"));
    }

    #[test]
    fn test_load_from_path_detects_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cockpit.toml");
        std::fs::write(&path, MINIMAL_TOML).unwrap();
        assert!(ConfigLoader::load_from_path(&path).is_ok());

        let bad = dir.path().join("cockpit.yaml");
        std::fs::write(&bad, MINIMAL_TOML).unwrap();
        let err = ConfigLoader::load_from_path(&bad).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }
}
