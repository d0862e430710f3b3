//! Replaceable stateful components.
//!
//! Components are created from named factories, started and stopped by
//! instance name, and can be swapped for an instance of another type while the
//! process keeps running.

pub mod builtin;
pub mod registry;

pub use builtin::{AlertingComponent, ComponentCore, LoggingComponent, MonitoringComponent};
pub use registry::{ComponentFactory, ComponentRegistry, SharedComponent};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Error,
}

impl ComponentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentState::Stopped => "stopped",
            ComponentState::Starting => "starting",
            ComponentState::Running => "running",
            ComponentState::Stopping => "stopping",
            ComponentState::Error => "error",
        }
    }
}

impl std::fmt::Display for ComponentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("Unknown component: {0}")]
    UnknownComponent(String),
    #[error("Unknown component type: {0}")]
    UnknownType(String),
    #[error("Component already exists: {0}")]
    AlreadyExists(String),
    #[error("Component {name} failed to start: {reason}")]
    StartFailure { name: String, reason: String },
    #[error("Component {name} failed to stop: {reason}")]
    StopFailure { name: String, reason: String },
}

pub type ComponentResult<T> = Result<T, ComponentError>;

/// Externally visible description of a component instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub name: String,
    pub state: ComponentState,
    pub start_time: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub class_name: String,
}

#[async_trait]
pub trait Component: Send + Sync {
    fn name(&self) -> &str;

    fn state(&self) -> ComponentState;

    async fn start(&mut self) -> ComponentResult<()>;

    async fn stop(&mut self) -> ComponentResult<()>;

    async fn health_check(&self) -> bool;

    fn info(&self) -> ComponentInfo;
}
