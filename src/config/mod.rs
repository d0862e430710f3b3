pub mod helper;
pub mod monitor_config;
pub mod resources_config;
pub mod server_config;

use crate::config::monitor_config::{ConditionOverride, MonitorConfig};
use crate::config::resources_config::ResourcesConfig;
use crate::config::server_config::ServerConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::convert::TryFrom;
use std::path::Path;

/// Configuration file used when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Main configuration structure matching config.yaml format
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub resources: ResourcesConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl Config {
    /// Load configuration from YAML file
    pub fn from_file(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse YAML config {}", config_path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an empty map
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Load the given file, or the default file when it exists, or defaults
    pub fn load_or_default(config_path: Option<&Path>) -> Result<Self> {
        match config_path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH),
            None => Ok(Self::default()),
        }
    }

    /// Parse condition overrides from config
    pub fn parse_overrides(&self) -> Result<Vec<ConditionOverride>> {
        let mut overrides = Vec::new();
        for override_config in &self.monitor.conditions {
            let parsed = ConditionOverride::try_from(override_config.clone())?;
            overrides.push(parsed);
        }
        Ok(overrides)
    }
}
