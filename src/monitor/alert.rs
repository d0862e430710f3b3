use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::condition::{Condition, Reading};

/// Marker stored as the current value when a probe fails
pub const ERROR_VALUE: &str = "ERROR";

/// Expected range recorded for probe failures
pub const NOT_APPLICABLE: &str = "N/A";

/// Expected range recorded for validation failures (validators are opaque)
pub const VALIDATOR_RANGE: &str = "according to configured validator";

/// Condition name used by synthetic alerts
pub const TEST_CONDITION: &str = "test_condition";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Error)]
#[error("Unknown severity: {0}")]
pub struct UnknownSeverity(pub String);

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" => Ok(Severity::Critical),
            _ => Err(UnknownSeverity(s.to_string())),
        }
    }
}

/// What produced an alert; also the prefix of its id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    ValidationFailure,
    ProbeFailure,
    Synthetic,
}

impl AlertKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            AlertKind::ValidationFailure => "alert",
            AlertKind::ProbeFailure => "error",
            AlertKind::Synthetic => "test_alert",
        }
    }
}

/// Immutable record of one failed validation or probe error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub condition_name: String,
    pub current_value: Reading,
    pub expected_range: String,
}

impl Alert {
    /// Alert for a probe value the validator rejected
    pub fn validation_failure(condition: &Condition, value: Reading, sequence: u64) -> Self {
        let timestamp = Utc::now();
        Self {
            id: alert_id(AlertKind::ValidationFailure, &condition.name, timestamp, sequence),
            severity: condition.severity,
            message: format!(
                "Condition '{}' failed: {}",
                condition.name, condition.description
            ),
            timestamp,
            condition_name: condition.name.clone(),
            current_value: value,
            expected_range: VALIDATOR_RANGE.to_string(),
        }
    }

    /// Alert for a probe that failed to produce a value. Always `Severity::Error`.
    pub fn probe_failure(condition_name: &str, error: &str, sequence: u64) -> Self {
        let timestamp = Utc::now();
        Self {
            id: alert_id(AlertKind::ProbeFailure, condition_name, timestamp, sequence),
            severity: Severity::Error,
            message: format!("Error checking condition '{}': {}", condition_name, error),
            timestamp,
            condition_name: condition_name.to_string(),
            current_value: Reading::Text(ERROR_VALUE.to_string()),
            expected_range: NOT_APPLICABLE.to_string(),
        }
    }

    /// Fabricated alert used to exercise the append path
    pub fn synthetic(sequence: u64) -> Self {
        let timestamp = Utc::now();
        Self {
            id: alert_id(AlertKind::Synthetic, TEST_CONDITION, timestamp, sequence),
            severity: Severity::Warning,
            message: "Test alert generated manually".to_string(),
            timestamp,
            condition_name: TEST_CONDITION.to_string(),
            current_value: Reading::Text("test_value".to_string()),
            expected_range: "test_range".to_string(),
        }
    }
}

fn alert_id(kind: AlertKind, condition_name: &str, timestamp: DateTime<Utc>, sequence: u64) -> String {
    format!(
        "{}_{}_{}_{}",
        kind.prefix(),
        condition_name,
        timestamp.timestamp_millis(),
        sequence
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn test_severity_from_str_is_case_insensitive() {
        assert_eq!(Severity::from_str("WARNING").unwrap(), Severity::Warning);
        assert_eq!(Severity::from_str(" critical ").unwrap(), Severity::Critical);
        assert!(Severity::from_str("fatal").is_err());
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }

    #[test]
    fn test_probe_failure_alert_overrides_severity() {
        let alert = Alert::probe_failure("disk", "device missing", 7);
        assert_eq!(alert.severity, Severity::Error);
        assert_eq!(alert.current_value.to_string(), ERROR_VALUE);
        assert_eq!(alert.expected_range, NOT_APPLICABLE);
        assert!(alert.id.starts_with("error_disk_"));
        assert!(alert.id.ends_with("_7"));
        assert!(alert.message.contains("device missing"));
    }

    #[test]
    fn test_validation_failure_alert_copies_condition() {
        let condition = Condition::new(
            "queue_depth",
            "Queue depth must stay below 10",
            || Ok(Reading::Int(42)),
            |value| value.as_f64().is_some_and(|v| v < 10.0),
            Severity::Critical,
        );

        let alert = Alert::validation_failure(&condition, Reading::Int(42), 1);
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.condition_name, "queue_depth");
        assert_eq!(alert.current_value.to_string(), "42");
        assert_eq!(alert.expected_range, VALIDATOR_RANGE);
        assert!(alert.id.starts_with("alert_queue_depth_"));
        assert!(alert.message.contains("Queue depth must stay below 10"));
    }

    #[test]
    fn test_alert_ids_differ_by_sequence() {
        let first = Alert::synthetic(1);
        let second = Alert::synthetic(2);
        assert_ne!(first.id, second.id);
        assert!(first.id.starts_with("test_alert_test_condition_"));
    }
}
