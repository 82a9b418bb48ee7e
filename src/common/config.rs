//! Configuration management for fairroll
//!
//! TOML file, then environment overrides, then validation.

use crate::errors::{ConfigurationError, FairRollResult};
use crate::games::types::DEFAULT_HOUSE_EDGE;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Smallest seed accepted for either side of a pair
pub const MIN_SEED_BYTES: usize = 8;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FairRollConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub seeds: SeedConfig,
}

/// Limits applied by the betting-configuration layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Percentage taken from fair odds, constant per game instance
    pub house_edge: f64,
    pub min_target: f64,
    pub max_target: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_stake: Option<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            house_edge: DEFAULT_HOUSE_EDGE,
            min_target: 0.01,
            max_target: 99.99,
            max_stake: None,
        }
    }
}

/// Seed generation parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SeedConfig {
    pub client_seed_bytes: usize,
    pub server_seed_bytes: usize,
    /// First nonce consumed by a fresh pair
    pub starting_nonce: u64,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            client_seed_bytes: 8,
            server_seed_bytes: 32,
            starting_nonce: 0,
        }
    }
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Configuration loader with environment variable support
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> FairRollResult<FairRollConfig> {
        let mut config = match self.config_path {
            Some(ref path) => self.load_from_file(path)?,
            None => FairRollConfig::default(),
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;

        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> FairRollResult<FairRollConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn apply_env_overrides(&self, config: &mut FairRollConfig) -> FairRollResult<()> {
        if let Ok(edge) = env::var("FAIRROLL_HOUSE_EDGE") {
            config.engine.house_edge = edge
                .parse()
                .map_err(|_| invalid("FAIRROLL_HOUSE_EDGE", &edge, "Invalid number"))?;
        }
        if let Ok(nonce) = env::var("FAIRROLL_STARTING_NONCE") {
            config.seeds.starting_nonce = nonce
                .parse()
                .map_err(|_| invalid("FAIRROLL_STARTING_NONCE", &nonce, "Invalid nonce"))?;
        }
        if let Ok(bytes) = env::var("FAIRROLL_SERVER_SEED_BYTES") {
            config.seeds.server_seed_bytes = bytes
                .parse()
                .map_err(|_| invalid("FAIRROLL_SERVER_SEED_BYTES", &bytes, "Invalid byte count"))?;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self, config: &FairRollConfig) -> FairRollResult<()> {
        let engine = &config.engine;
        if !engine.house_edge.is_finite() || !(0.0..100.0).contains(&engine.house_edge) {
            return Err(invalid("engine.house_edge", engine.house_edge, "House edge must be within [0, 100)").into());
        }
        if !(engine.min_target > 0.0 && engine.min_target < engine.max_target && engine.max_target < 100.0) {
            return Err(invalid(
                "engine.min_target",
                format!("{}..{}", engine.min_target, engine.max_target),
                "Target bounds must satisfy 0 < min < max < 100",
            )
            .into());
        }
        if let Some(max) = engine.max_stake {
            if !max.is_finite() || max <= 0.0 {
                return Err(invalid("engine.max_stake", max, "Max stake must be positive").into());
            }
        }

        let seeds = &config.seeds;
        if seeds.client_seed_bytes < MIN_SEED_BYTES {
            return Err(invalid("seeds.client_seed_bytes", seeds.client_seed_bytes, "Seed too short").into());
        }
        if seeds.server_seed_bytes < MIN_SEED_BYTES {
            return Err(invalid("seeds.server_seed_bytes", seeds.server_seed_bytes, "Seed too short").into());
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &FairRollConfig, path: &str) -> FairRollResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

/// Builder pattern for creating configurations
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: FairRollConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn house_edge(mut self, house_edge: f64) -> Self {
        self.config.engine.house_edge = house_edge;
        self
    }

    pub fn max_stake(mut self, max_stake: f64) -> Self {
        self.config.engine.max_stake = Some(max_stake);
        self
    }

    pub fn starting_nonce(mut self, nonce: u64) -> Self {
        self.config.seeds.starting_nonce = nonce;
        self
    }

    pub fn seeds(mut self, seeds: SeedConfig) -> Self {
        self.config.seeds = seeds;
        self
    }

    pub fn build(self) -> FairRollConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = FairRollConfig::default();
        assert_eq!(config.engine.house_edge, 1.0);
        assert_eq!(config.seeds.server_seed_bytes, 32);
        assert_eq!(config.seeds.starting_nonce, 0);
        assert!(ConfigLoader::new().validate(&config).is_ok());
    }

    #[test]
    fn test_config_validation() {
        let loader = ConfigLoader::new();

        let bad_edge = ConfigBuilder::new().house_edge(100.0).build();
        assert!(loader.validate(&bad_edge).is_err());

        let mut bad_targets = FairRollConfig::default();
        bad_targets.engine.min_target = 60.0;
        bad_targets.engine.max_target = 40.0;
        assert!(loader.validate(&bad_targets).is_err());

        let mut short_seed = FairRollConfig::default();
        short_seed.seeds.server_seed_bytes = 4;
        assert!(loader.validate(&short_seed).is_err());

        let bad_stake = ConfigBuilder::new().max_stake(0.0).build();
        assert!(loader.validate(&bad_stake).is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .house_edge(2.0)
            .max_stake(500.0)
            .starting_nonce(1)
            .build();

        assert_eq!(config.engine.house_edge, 2.0);
        assert_eq!(config.engine.max_stake, Some(500.0));
        assert_eq!(config.seeds.starting_nonce, 1);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: FairRollConfig = toml::from_str("[engine]\nhouse_edge = 2.5\n").unwrap();
        assert_eq!(config.engine.house_edge, 2.5);
        assert_eq!(config.engine.max_target, 99.99);
        assert_eq!(config.seeds, SeedConfig::default());
    }

    #[test]
    fn test_save_and_load_config() -> FairRollResult<()> {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        let original = ConfigBuilder::new().house_edge(1.5).max_stake(250.0).build();
        ConfigLoader::new().save(&original, path)?;

        let loaded = ConfigLoader::new().with_path(path).load_from_file(path)?;
        assert_eq!(loaded, original);

        Ok(())
    }

    #[test]
    fn test_missing_file_fails() {
        let result = ConfigLoader::new().with_path("/nonexistent/fairroll.toml").load();
        assert!(result.is_err());
    }
}
