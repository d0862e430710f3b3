use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::{Component, ComponentInfo, ComponentResult, ComponentState};
use crate::monitor::{Reading, Severity};

/// Lifecycle bookkeeping shared by the built-in components
#[derive(Debug, Clone)]
pub struct ComponentCore {
    pub name: String,
    pub state: ComponentState,
    pub start_time: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl ComponentCore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: ComponentState::Stopped,
            start_time: None,
            error_message: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.state = ComponentState::Running;
        self.start_time = Some(Utc::now());
        self.error_message = None;
    }

    pub fn mark_stopped(&mut self) {
        self.state = ComponentState::Stopped;
    }

    pub fn mark_failed(&mut self, reason: &str) {
        self.state = ComponentState::Error;
        self.error_message = Some(reason.to_string());
    }

    pub fn is_running(&self) -> bool {
        self.state == ComponentState::Running
    }

    pub fn info(&self, class_name: &str) -> ComponentInfo {
        ComponentInfo {
            name: self.name.clone(),
            state: self.state,
            start_time: self.start_time,
            error_message: self.error_message.clone(),
            class_name: class_name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
}

/// Keeps an in-memory log of what happened to it
#[derive(Debug)]
pub struct LoggingComponent {
    core: ComponentCore,
    entries: Vec<LogEntry>,
}

impl LoggingComponent {
    pub const TYPE_NAME: &'static str = "logging";

    pub fn new(name: &str) -> Self {
        Self {
            core: ComponentCore::new(name),
            entries: Vec::new(),
        }
    }

    pub fn log(&mut self, message: &str, level: &str) {
        info!("[{}] {}: {}", self.core.name, level, message);
        self.entries.push(LogEntry {
            timestamp: Utc::now(),
            level: level.to_string(),
            message: message.to_string(),
        });
    }

    /// Most recent `limit` entries, oldest first
    pub fn logs(&self, limit: usize) -> &[LogEntry] {
        let start = self.entries.len().saturating_sub(limit);
        &self.entries[start..]
    }
}

#[async_trait]
impl Component for LoggingComponent {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn state(&self) -> ComponentState {
        self.core.state
    }

    async fn start(&mut self) -> ComponentResult<()> {
        self.core.state = ComponentState::Starting;
        self.core.mark_running();
        self.log("Logging component started", "INFO");
        Ok(())
    }

    async fn stop(&mut self) -> ComponentResult<()> {
        self.core.state = ComponentState::Stopping;
        self.log("Logging component stopped", "INFO");
        self.core.mark_stopped();
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.core.is_running()
    }

    fn info(&self) -> ComponentInfo {
        self.core.info("LoggingComponent")
    }
}

/// Counts the alerts routed through it
#[derive(Debug)]
pub struct AlertingComponent {
    core: ComponentCore,
    alert_count: usize,
}

impl AlertingComponent {
    pub const TYPE_NAME: &'static str = "alerting";

    pub fn new(name: &str) -> Self {
        Self {
            core: ComponentCore::new(name),
            alert_count: 0,
        }
    }

    pub fn send_alert(&mut self, message: &str, severity: Severity) {
        self.alert_count += 1;
        warn!("[{}] ALERT [{}]: {}", self.core.name, severity, message);
    }

    pub fn alert_count(&self) -> usize {
        self.alert_count
    }
}

#[async_trait]
impl Component for AlertingComponent {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn state(&self) -> ComponentState {
        self.core.state
    }

    async fn start(&mut self) -> ComponentResult<()> {
        self.core.state = ComponentState::Starting;
        self.core.mark_running();
        Ok(())
    }

    async fn stop(&mut self) -> ComponentResult<()> {
        self.core.state = ComponentState::Stopping;
        self.core.mark_stopped();
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.core.is_running()
    }

    fn info(&self) -> ComponentInfo {
        self.core.info("AlertingComponent")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub value: Reading,
    pub timestamp: DateTime<Utc>,
}

/// Holds the latest sample of each named metric
#[derive(Debug)]
pub struct MonitoringComponent {
    core: ComponentCore,
    metrics: HashMap<String, MetricSample>,
}

impl MonitoringComponent {
    pub const TYPE_NAME: &'static str = "monitoring";

    pub fn new(name: &str) -> Self {
        Self {
            core: ComponentCore::new(name),
            metrics: HashMap::new(),
        }
    }

    pub fn update_metric(&mut self, name: &str, value: Reading) {
        self.metrics.insert(
            name.to_string(),
            MetricSample {
                value,
                timestamp: Utc::now(),
            },
        );
    }

    pub fn metric(&self, name: &str) -> Option<&MetricSample> {
        self.metrics.get(name)
    }
}

#[async_trait]
impl Component for MonitoringComponent {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn state(&self) -> ComponentState {
        self.core.state
    }

    async fn start(&mut self) -> ComponentResult<()> {
        self.core.state = ComponentState::Starting;
        self.core.mark_running();
        Ok(())
    }

    async fn stop(&mut self) -> ComponentResult<()> {
        self.core.state = ComponentState::Stopping;
        self.core.mark_stopped();
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.core.is_running()
    }

    fn info(&self) -> ComponentInfo {
        self.core.info("MonitoringComponent")
    }
}
