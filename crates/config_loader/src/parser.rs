//! Configuration parsing
//!
//! TOML (primary) and JSON formats.

use contracts::{CockpitBlueprint, ContractError};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    Json,
}

impl ConfigFormat {
    /// Infer format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML configuration
pub fn parse_toml(content: &str) -> Result<CockpitBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON configuration
pub fn parse_json(content: &str) -> Result<CockpitBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse configuration in the given format
pub fn parse(content: &str, format: ConfigFormat) -> Result<CockpitBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_partial_sections() {
        let content = r#"
[controls]
deadzone = 0.2

[recording]
enabled = false
"#;
        let bp = parse_toml(content).unwrap();
        assert!((bp.controls.deadzone - 0.2).abs() < f64::EPSILON);
        assert!(!bp.recording.enabled);
        assert_eq!(bp.simulator.host, "localhost");
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "simulator": { "host": "carla", "port": 3000 },
            "world": { "weather_presets": ["clear_noon", "wet_noon"] },
            "cameras": [{ "id": "front", "width": 640, "height": 480 }]
        }"#;
        let bp = parse_json(content).unwrap();
        assert_eq!(bp.simulator.port, 3000);
        assert_eq!(bp.world.weather_presets.len(), 2);
        assert!((bp.cameras[0].fov - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_unknown_weather_preset_rejected() {
        let result = parse_json(r#"{ "world": { "weather_presets": ["blizzard"] } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
