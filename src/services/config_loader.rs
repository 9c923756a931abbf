use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::models::TimestampUnit;
use crate::services::photo::DEFAULT_MAX_PHOTO_DIMENSION;

#[derive(Debug, Clone, Deserialize)]
pub struct PresentationConfig {
    #[serde(default = "default_max_photo_dimension")]
    pub max_photo_dimension: u32,
    #[serde(default = "default_grid_columns")]
    pub grid_columns: usize,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            max_photo_dimension: default_max_photo_dimension(),
            grid_columns: default_grid_columns(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContestViewConfig {
    /// Unit of the integer instants the backend sends.
    #[serde(default)]
    pub timestamp_unit: TimestampUnit,
    /// Identity the local provider signs in as.
    #[serde(default = "default_principal")]
    pub principal: String,
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,
    #[serde(default)]
    pub presentation: PresentationConfig,
}

impl Default for ContestViewConfig {
    fn default() -> Self {
        Self {
            timestamp_unit: TimestampUnit::default(),
            principal: default_principal(),
            snapshot_file: default_snapshot_file(),
            presentation: PresentationConfig::default(),
        }
    }
}

fn default_max_photo_dimension() -> u32 {
    DEFAULT_MAX_PHOTO_DIMENSION
}

fn default_grid_columns() -> usize {
    3
}

fn default_principal() -> String {
    "anonymous".to_string()
}

fn default_snapshot_file() -> String {
    "snapshot.json".to_string()
}

pub fn load_config(data_folder: &str) -> Result<ContestViewConfig, String> {
    let config_path = Path::new(data_folder).join("config.toml");
    if !config_path.exists() {
        info!(
            "config.toml not found in data folder, using defaults: {}",
            config_path.display()
        );
        return Ok(ContestViewConfig::default());
    }

    let raw = fs::read_to_string(&config_path).map_err(|err| {
        format!(
            "Failed to read config.toml at {}: {}",
            config_path.display(),
            err
        )
    })?;

    toml::from_str::<ContestViewConfig>(&raw).map_err(|err| {
        format!(
            "Failed to parse config.toml at {}: {}",
            config_path.display(),
            err
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder_str(dir: &tempfile::TempDir) -> String {
        dir.path().display().to_string()
    }

    #[test]
    fn missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&folder_str(&dir)).unwrap();
        assert_eq!(config.timestamp_unit, TimestampUnit::Nanoseconds);
        assert_eq!(config.principal, "anonymous");
        assert_eq!(config.snapshot_file, "snapshot.json");
        assert_eq!(config.presentation.max_photo_dimension, 512);
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.toml"),
            "timestamp_unit = \"milliseconds\"\nprincipal = \"2vxsx-fae\"\n\n[presentation]\ngrid_columns = 4\n",
        )
        .unwrap();

        let config = load_config(&folder_str(&dir)).unwrap();
        assert_eq!(config.timestamp_unit, TimestampUnit::Milliseconds);
        assert_eq!(config.principal, "2vxsx-fae");
        assert_eq!(config.presentation.grid_columns, 4);
        assert_eq!(config.presentation.max_photo_dimension, 512);
    }

    #[test]
    fn invalid_unit_is_reported_with_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.toml"), "timestamp_unit = \"ticks\"\n").unwrap();

        let err = load_config(&folder_str(&dir)).unwrap_err();
        assert!(err.starts_with("Failed to parse config.toml"));
        assert!(err.contains("config.toml"));
    }
}
