//! Wires the monitor, the resource manager and the component registry
//! together from a [`Config`].

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::components::ComponentRegistry;
use crate::config::monitor_config::{ConditionOverride, COMPONENT_HEALTH_INTERVAL};
use crate::config::Config;
use crate::monitor::{component_health_condition, default_conditions, Condition, ConditionMonitor, Thresholds};
use crate::resources::ResourceManager;

pub struct MonitoringService {
    pub config: Config,
    pub monitor: Arc<ConditionMonitor>,
    pub resources: Arc<ResourceManager>,
    pub components: Arc<ComponentRegistry>,
}

impl MonitoringService {
    /// Load resources and components and register the configured
    /// conditions. Nothing is scheduled until [`start`](Self::start).
    pub async fn initialize(config: Config) -> Result<Self> {
        let resources = Arc::new(ResourceManager::new(config.resources.directory.clone()));
        let loaded = resources
            .load_resources(config.resources.create_defaults)
            .await
            .context("Failed to load resources")?;
        info!(
            "📦 Loaded {} resources from {}",
            loaded,
            resources.resource_dir().display()
        );

        let components = Arc::new(ComponentRegistry::new());
        components
            .load_components()
            .await
            .context("Failed to load components")?;

        let service = Self {
            monitor: Arc::new(ConditionMonitor::new()),
            resources,
            components,
            config,
        };
        service.install_conditions().await?;
        Ok(service)
    }

    async fn install_conditions(&self) -> Result<()> {
        let overrides = self.config.parse_overrides()?;
        let conditions = self.build_conditions().await;

        for override_rule in &overrides {
            if !conditions.iter().any(|c| c.name == override_rule.name) {
                warn!(
                    "⚠️ Override for unknown condition '{}' ignored",
                    override_rule.name
                );
            }
        }

        for condition in conditions {
            let condition = apply_overrides(condition, &overrides);
            self.monitor.add_condition(condition).await;
        }
        Ok(())
    }

    async fn build_conditions(&self) -> Vec<Condition> {
        let mut conditions = Vec::new();
        if self.config.monitor.default_conditions {
            let thresholds = Thresholds::from_provider(self.resources.as_ref()).await;
            conditions.extend(default_conditions(&thresholds));
        }
        for component in &self.config.monitor.component_health {
            conditions.push(component_health_condition(
                Arc::clone(&self.components),
                component,
                COMPONENT_HEALTH_INTERVAL,
            ));
        }
        conditions
    }

    /// Start watching resources and scheduling conditions
    pub async fn start(&self) -> Result<()> {
        if self.config.resources.watch {
            self.resources
                .watch()
                .await
                .context("Failed to watch resource directory")?;
            info!("👀 Watching {} for changes", self.resources.resource_dir().display());
        }
        self.monitor.start().await;
        Ok(())
    }

    pub async fn shutdown(&self) {
        self.monitor.stop().await;
        self.resources.stop_watcher().await;
        info!("🧹 Monitoring service stopped");
    }
}

fn apply_overrides(mut condition: Condition, overrides: &[ConditionOverride]) -> Condition {
    for override_rule in overrides {
        if override_rule.name == condition.name {
            condition = override_rule.apply(condition);
        }
    }
    condition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::defaults::{CPU_USAGE, NETWORK_CONNECTIVITY};
    use crate::monitor::Severity;
    use tempfile::TempDir;

    fn config_for(dir: &TempDir, monitor_yaml: &str) -> Config {
        let yaml = format!(
            "resources:\n  directory: {}\n  watch: false\nmonitor:\n{}",
            dir.path().join("resources").display(),
            monitor_yaml
        );
        Config::from_yaml(&yaml).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_installs_defaults_with_overrides() {
        let dir = TempDir::new().unwrap();
        let config = config_for(
            &dir,
            "  conditions:\n    - name: cpu_usage\n      interval: 1m\n      severity: critical\n    - name: network_connectivity\n      enabled: false\n    - name: no_such_condition\n      enabled: false\n",
        );

        let service = MonitoringService::initialize(config).await.unwrap();
        let conditions = service.monitor.get_conditions().await;

        assert_eq!(conditions.len(), 4);
        assert_eq!(conditions[CPU_USAGE].check_interval, 60.0);
        assert_eq!(conditions[CPU_USAGE].severity, Severity::Critical);
        assert!(!conditions[NETWORK_CONNECTIVITY].enabled);

        // Default resource files were written and loaded
        assert_eq!(service.resources.get_resource_count().await, 4);
        assert_eq!(service.components.get_component_count().await, 3);
        assert!(!service.monitor.is_running());
    }

    #[tokio::test]
    async fn test_component_health_conditions_only() {
        let dir = TempDir::new().unwrap();
        let config = config_for(
            &dir,
            "  default_conditions: false\n  component_health: [logging, alerting]\n",
        );

        let service = MonitoringService::initialize(config).await.unwrap();
        let names: Vec<String> = service.monitor.get_conditions().await.into_keys().collect();
        assert_eq!(names, vec!["component_alerting", "component_logging"]);
    }

    #[tokio::test]
    async fn test_invalid_override_fails_initialize() {
        let dir = TempDir::new().unwrap();
        let config = config_for(
            &dir,
            "  conditions:\n    - name: cpu_usage\n      severity: loud\n",
        );
        assert!(MonitoringService::initialize(config).await.is_err());
    }

    #[test]
    fn test_later_overrides_win() {
        let condition = Condition::new(
            "disk",
            "disk",
            || Ok(crate::monitor::Reading::Int(1)),
            |_| true,
            Severity::Info,
        );
        let overrides = vec![
            ConditionOverride {
                name: "disk".to_string(),
                interval: Some(std::time::Duration::from_secs(3)),
                enabled: None,
                severity: Some(Severity::Error),
            },
            ConditionOverride {
                name: "other".to_string(),
                interval: Some(std::time::Duration::from_secs(9)),
                enabled: Some(false),
                severity: None,
            },
            ConditionOverride {
                name: "disk".to_string(),
                interval: None,
                enabled: None,
                severity: Some(Severity::Critical),
            },
        ];

        let updated = apply_overrides(condition, &overrides);
        assert_eq!(updated.interval, std::time::Duration::from_secs(3));
        assert_eq!(updated.severity, Severity::Critical);
        assert!(updated.enabled);
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir, "  default_conditions: false\n");

        let service = MonitoringService::initialize(config).await.unwrap();
        service.start().await.unwrap();
        assert!(service.monitor.is_running());

        service.shutdown().await;
        assert!(!service.monitor.is_running());
        assert!(!service.resources.is_watching().await);
    }
}
