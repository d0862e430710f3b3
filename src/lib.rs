pub mod components;
pub mod config;
pub mod monitor;
pub mod resources;
pub mod service;
pub mod web_server;

// Public API
pub use components::{Component, ComponentError, ComponentRegistry, ComponentState};
pub use config::Config;
pub use monitor::{Alert, Condition, ConditionMonitor, MonitorStatus, Reading, Severity};
pub use resources::{ResourceManager, ResourceProvider};
pub use service::MonitoringService;
pub use web_server::WebServer;
