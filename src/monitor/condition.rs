use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::alert::Severity;

/// Interval used when a condition does not set one
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Shortest interval a scheduling loop will sleep for
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(10);

/// Value produced by a condition probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Reading {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Reading::Int(v) => Some(*v as f64),
            Reading::Float(v) => Some(*v),
            Reading::Bool(_) | Reading::Text(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Reading::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reading::Bool(v) => write!(f, "{}", v),
            Reading::Int(v) => write!(f, "{}", v),
            Reading::Float(v) => write!(f, "{}", v),
            Reading::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for Reading {
    fn from(value: bool) -> Self {
        Reading::Bool(value)
    }
}

impl From<i64> for Reading {
    fn from(value: i64) -> Self {
        Reading::Int(value)
    }
}

impl From<i32> for Reading {
    fn from(value: i32) -> Self {
        Reading::Int(value.into())
    }
}

impl From<u64> for Reading {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(v) => Reading::Int(v),
            Err(_) => Reading::Float(value as f64),
        }
    }
}

impl From<f64> for Reading {
    fn from(value: f64) -> Self {
        Reading::Float(value)
    }
}

impl From<f32> for Reading {
    fn from(value: f32) -> Self {
        Reading::Float(value.into())
    }
}

impl From<String> for Reading {
    fn from(value: String) -> Self {
        Reading::Text(value)
    }
}

impl From<&str> for Reading {
    fn from(value: &str) -> Self {
        Reading::Text(value.to_string())
    }
}

/// Zero-argument check producing the current value. May block.
pub type Probe = Arc<dyn Fn() -> Result<Reading> + Send + Sync>;

/// Predicate deciding whether a probed value is acceptable
pub type Validator = Arc<dyn Fn(&Reading) -> bool + Send + Sync>;

/// A named, periodically evaluated check
#[derive(Clone)]
pub struct Condition {
    pub name: String,
    pub description: String,
    pub probe: Probe,
    pub validator: Validator,
    pub severity: Severity,
    pub interval: Duration,
    pub enabled: bool,
}

impl std::fmt::Debug for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Condition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("probe", &"<probe>")
            .field("validator", &"<validator>")
            .field("severity", &self.severity)
            .field("interval", &self.interval)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Outcome of a single evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Passed,
    Failed(Reading),
    Errored(String),
}

impl Condition {
    pub fn new<P, V>(
        name: impl Into<String>,
        description: impl Into<String>,
        probe: P,
        validator: V,
        severity: Severity,
    ) -> Self
    where
        P: Fn() -> Result<Reading> + Send + Sync + 'static,
        V: Fn(&Reading) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            probe: Arc::new(probe),
            validator: Arc::new(validator),
            severity,
            interval: DEFAULT_CHECK_INTERVAL,
            enabled: true,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_CHECK_INTERVAL);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Run the probe and the validator once
    pub fn evaluate(&self) -> Evaluation {
        match (self.probe)() {
            Ok(value) => {
                if (self.validator)(&value) {
                    Evaluation::Passed
                } else {
                    Evaluation::Failed(value)
                }
            }
            Err(e) => Evaluation::Errored(format!("{:#}", e)),
        }
    }

    pub fn info(&self) -> ConditionInfo {
        ConditionInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            enabled: self.enabled,
            severity: self.severity,
            check_interval: self.interval.as_secs_f64(),
        }
    }
}

/// Externally observable metadata of a condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionInfo {
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub severity: Severity,
    /// Seconds between evaluations
    pub check_interval: f64,
}
