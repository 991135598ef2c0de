//! Device Configuration
//!
//! Layered configuration: built-in defaults, then an optional TOML file,
//! then `DUALSTAT_` environment variables (`__` separates nested keys, e.g.
//! `DUALSTAT_POWER__TOLERANCE=1.5`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use hvac_runtime::{EntityId, HvacMode};
use serde::{Deserialize, Serialize};

use crate::environment::Environment;
use crate::position::{PositionTable, PositionTableError};
use crate::power::PowerConfig;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "DUALSTAT_";

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Failed to load configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("Invalid position table: {0}")]
    Positions(#[from] PositionTableError),

    #[error("Invalid power settings: {0}")]
    Power(String),

    #[error("Invalid tolerance: {0}")]
    Tolerance(String),

    #[error("Failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Figment(Box::new(e))
    }
}

/// Valve + fan device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub name: String,
    pub valve_entity_id: Option<EntityId>,
    pub fan_entity_id: Option<EntityId>,
    pub min_cycle_duration_secs: u64,
    pub initial_hvac_mode: HvacMode,
    /// Track the low end of a heat/cool range instead of a single setpoint
    pub range_mode: bool,
    pub cold_tolerance: f64,
    pub hot_tolerance: f64,
    pub target_temp: Option<f64>,
    pub target_temp_low: Option<f64>,
    pub power: PowerConfig,
    pub positions: PositionTable,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "valve_fan".to_string(),
            valve_entity_id: None,
            fan_entity_id: None,
            min_cycle_duration_secs: 0,
            initial_hvac_mode: HvacMode::Off,
            range_mode: false,
            cold_tolerance: 0.3,
            hot_tolerance: 0.3,
            target_temp: None,
            target_temp_low: None,
            power: PowerConfig::default(),
            positions: PositionTable::default(),
        }
    }
}

impl DeviceConfig {
    /// Defaults, the optional TOML file, then environment overrides
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(DeviceConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate the configuration
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::PathNotFound(path.to_path_buf()));
            }
            tracing::info!("Loading configuration from: {}", path.display());
        }

        let config: DeviceConfig = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document on top of the defaults (no environment)
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: DeviceConfig = Figment::from(Serialized::defaults(DeviceConfig::default()))
            .merge(Toml::string(content))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.positions.validate()?;

        if self.power.min_percent > self.power.max_percent || self.power.max_percent > 100 {
            return Err(ConfigError::Power(format!(
                "min_percent {} / max_percent {} must satisfy min <= max <= 100",
                self.power.min_percent, self.power.max_percent
            )));
        }
        if self.power.tolerance.is_nan() || self.power.tolerance < 0.0 {
            return Err(ConfigError::Power(format!(
                "tolerance {} must be >= 0",
                self.power.tolerance
            )));
        }
        if self.power.levels == Some(0) {
            return Err(ConfigError::Power("levels must be at least 1".to_string()));
        }

        for (name, value) in [
            ("cold_tolerance", self.cold_tolerance),
            ("hot_tolerance", self.hot_tolerance),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::Tolerance(format!("{name} = {value} must be >= 0")));
            }
        }

        if self.valve_entity_id.is_none() || self.fan_entity_id.is_none() {
            tracing::warn!(
                valve = ?self.valve_entity_id,
                fan = ?self.fan_entity_id,
                "Valve or fan entity not configured, the device will never turn on"
            );
        }

        Ok(())
    }

    pub fn min_cycle_duration(&self) -> Duration {
        Duration::from_secs(self.min_cycle_duration_secs)
    }

    /// Initial environment (no current temperature until the first reading)
    pub fn environment(&self) -> Environment {
        Environment {
            target_temp: self.target_temp,
            target_temp_low: self.target_temp_low,
            ..Environment::new(self.cold_tolerance, self.hot_tolerance)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::PositionBand;
    use tempfile::TempDir;
    use tokio::fs;

    const DEVICE_TOML: &str = r#"
name = "living_room"
valve_entity_id = "valve.living_room"
fan_entity_id = "fan.living_room"
min_cycle_duration_secs = 120
initial_hvac_mode = "heat"
target_temp = 21.5

[power]
tolerance = 1.5
levels = 5

[positions]
off = 55
cool = { min_demand = 45, max_demand = 15 }
"#;

    #[tokio::test]
    async fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("device.toml");
        fs::write(&path, DEVICE_TOML).await.unwrap();

        let config = DeviceConfig::load(Some(&path)).unwrap();

        assert_eq!(config.name, "living_room");
        assert_eq!(config.valve_entity_id, Some(EntityId::from("valve.living_room")));
        assert_eq!(config.fan_entity_id, Some(EntityId::from("fan.living_room")));
        assert_eq!(config.min_cycle_duration(), Duration::from_secs(120));
        assert_eq!(config.initial_hvac_mode, HvacMode::Heat);
        assert_eq!(config.target_temp, Some(21.5));
        assert_eq!(config.power.levels, Some(5));
        assert_eq!(config.power.max_percent, 100);
        assert_eq!(config.positions.cool, PositionBand::new(45, 15));
        // Unset fields keep their defaults
        assert_eq!(config.positions.heat, PositionTable::HEAT_BAND);
        assert_eq!(config.cold_tolerance, 0.3);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(matches!(
            DeviceConfig::load(Some(&path)),
            Err(ConfigError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_rejects_overlapping_bands() {
        let result = DeviceConfig::from_toml_str(
            r#"
[positions]
off = 10
heat = { min_demand = 40, max_demand = 100 }
"#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::Positions(PositionTableError::Overlap))
        ));
    }

    #[test]
    fn test_rejects_bad_power_settings() {
        let result = DeviceConfig::from_toml_str(
            r#"
[power]
min_percent = 80
max_percent = 40
"#,
        );
        assert!(matches!(result, Err(ConfigError::Power(_))));
    }

    #[test]
    fn test_rejects_unknown_mode() {
        let result = DeviceConfig::from_toml_str(r#"initial_hvac_mode = "auto""#);
        assert!(matches!(result, Err(ConfigError::Figment(_))));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = DeviceConfig::from_toml_str(DEVICE_TOML).unwrap();
        let rendered = config.to_toml_string().unwrap();
        let reparsed = DeviceConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(reparsed.positions, config.positions);
        assert_eq!(reparsed.fan_entity_id, config.fan_entity_id);
    }

    #[test]
    fn test_environment_from_config() {
        let config = DeviceConfig::from_toml_str(DEVICE_TOML).unwrap();
        let env = config.environment();
        assert_eq!(env.cur_temp, None);
        assert_eq!(env.target_temp, Some(21.5));
        assert_eq!(env.cold_tolerance, 0.3);
    }
}
