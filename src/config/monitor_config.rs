use crate::config::helper::parse_duration;
use crate::monitor::{Condition, Severity};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::convert::TryFrom;
use std::time::Duration;

/// Interval of conditions generated from `component_health`
pub const COMPONENT_HEALTH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default = "default_true")]
    pub default_conditions: bool,
    #[serde(default)]
    pub conditions: Vec<ConditionOverrideConfig>,
    /// Components whose health check becomes a condition
    #[serde(default)]
    pub component_health: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            default_conditions: default_true(),
            conditions: Vec::new(),
            component_health: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

// YAML structure for a per-condition override
#[derive(Debug, Deserialize, Clone)]
pub struct ConditionOverrideConfig {
    pub name: String,
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub severity: Option<String>,
}

// Parsed and validated override
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionOverride {
    pub name: String,
    pub interval: Option<Duration>,
    pub enabled: Option<bool>,
    pub severity: Option<Severity>,
}

impl TryFrom<ConditionOverrideConfig> for ConditionOverride {
    type Error = anyhow::Error;

    fn try_from(config: ConditionOverrideConfig) -> Result<Self> {
        let interval = config
            .interval
            .as_deref()
            .map(parse_duration)
            .transpose()
            .with_context(|| format!("Invalid interval for condition '{}'", config.name))?;

        let severity = config
            .severity
            .as_deref()
            .map(str::parse::<Severity>)
            .transpose()
            .with_context(|| format!("Invalid severity for condition '{}'", config.name))?;

        Ok(Self {
            name: config.name,
            interval,
            enabled: config.enabled,
            severity,
        })
    }
}

impl ConditionOverride {
    pub fn apply(&self, mut condition: Condition) -> Condition {
        if let Some(interval) = self.interval {
            condition = condition.with_interval(interval);
        }
        if let Some(enabled) = self.enabled {
            condition = condition.with_enabled(enabled);
        }
        if let Some(severity) = self.severity {
            condition.severity = severity;
        }
        condition
    }
}
