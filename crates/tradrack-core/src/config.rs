//! Rack configuration loading.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};
use tradrack_types::{ConfigError, RackConfig};
use validator::Validate;

/// Load and validate a JSON rack configuration.
pub fn load_config(path: &Path) -> Result<RackConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound { path: path.display().to_string() });
    }

    let content = fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    let config = parse_config(&content)?;
    debug!(path = %path.display(), lanes = config.lane_count, "Loaded rack config");
    Ok(config)
}

/// Parse and validate a JSON rack configuration.
pub fn parse_config(content: &str) -> Result<RackConfig, ConfigError> {
    let config: RackConfig =
        serde_json::from_str(content).map_err(|e| ConfigError::from_json_error(&e))?;

    if let Err(errors) = config.validate() {
        let err = ConfigError::from_validation_errors(&errors);
        warn!(error = %err, "Rejected rack config");
        return Err(err);
    }

    Ok(config)
}

/// Save a rack configuration.
pub fn save_config(config: &RackConfig, path: &Path) -> Result<(), ConfigError> {
    let temp_path = path.with_extension("json.tmp");

    let content = serde_json::to_string_pretty(config).map_err(|e| ConfigError::WriteError {
        message: format!("Failed to serialize config: {}", e),
    })?;

    // Atomic write
    fs::write(&temp_path, content).map_err(|e| ConfigError::from_io_error(&e))?;
    fs::rename(&temp_path, path).map_err(|e| ConfigError::from_io_error(&e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "lane_count": 3,
        "lane_spacing": 17.0,
        "bowden_length": 900.0,
        "selector_unload_length": 20.0,
        "extruder_load_length": 30.0,
        "hotend_load_length": 20.0,
        "servo_down_angle": 0.0,
        "servo_up_angle": 140.0
    }"#;

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_parse_reports_bad_json() {
        let err = parse_config("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_parse_reports_invalid_field() {
        let content = MINIMAL.replace("\"lane_count\": 3", "\"lane_count\": 1");
        match parse_config(&content).unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "lane_count"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trad_rack.json");
        let config = parse_config(MINIMAL).unwrap();

        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();

        assert_eq!(loaded, config);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
