use serde_json::{json, Value};

/// Resource holding the thresholds used by the built-in conditions
pub const MONITORING_THRESHOLDS: &str = "monitoring_thresholds";

/// Files written into an empty resource directory, as (file name, content)
pub fn default_resource_files() -> Vec<(&'static str, Value)> {
    vec![
        (
            "app_config.json",
            json!({
                "app_name": "Condition Monitor",
                "version": "1.0.0",
                "debug": true,
                "max_alerts": 1000,
                "default_check_interval": 10,
                "alert_retention_days": 30
            }),
        ),
        (
            "monitoring_thresholds.yaml",
            json!({
                "cpu_max_percentage": 80,
                "memory_min_mb": 100,
                "temperature_min": 20,
                "temperature_max": 80,
                "disk_min_free_gb": 1
            }),
        ),
        (
            "alert_messages.json",
            json!({
                "cpu_high": "High CPU usage detected",
                "memory_low": "Available memory is low",
                "temperature_out_of_range": "Temperature outside the normal range",
                "disk_space_low": "Disk space is low",
                "network_down": "Network connectivity lost"
            }),
        ),
        (
            "component_config.yaml",
            json!({
                "enabled_components": ["monitoring", "alerting", "logging"],
                "component_timeout": 30,
                "auto_restart": true,
                "max_retries": 3
            }),
        ),
    ]
}
