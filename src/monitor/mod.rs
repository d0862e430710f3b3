//! Condition monitoring engine.
//!
//! A [`ConditionMonitor`] owns a registry of [`Condition`]s and an append-only
//! log of [`Alert`]s. While started it runs one independent scheduling loop per
//! condition; each loop probes, validates and records an alert on failure.

pub mod alert;
pub mod condition;
pub mod defaults;
pub mod engine;
mod scheduler;

pub use alert::{Alert, AlertKind, Severity, UnknownSeverity};
pub use condition::{Condition, ConditionInfo, Evaluation, Probe, Reading, Validator};
pub use defaults::{component_health_condition, default_conditions, Thresholds};
pub use engine::{ConditionMonitor, MonitorStatus, DEFAULT_ALERT_LIMIT, RECENT_ALERT_WINDOW};

/// Shared monitor instance
pub type SharedMonitor = std::sync::Arc<ConditionMonitor>;
