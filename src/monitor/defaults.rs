//! Built-in conditions sampling process and host metrics.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rand::Rng;
use sysinfo::{Networks, System};
use tokio::runtime::Handle;

use super::alert::Severity;
use super::condition::{Condition, Reading};
use super::engine::ConditionMonitor;
use crate::components::ComponentRegistry;
use crate::resources::defaults::MONITORING_THRESHOLDS;
use crate::resources::ResourceProvider;

pub const CPU_USAGE: &str = "cpu_usage";
pub const MEMORY_AVAILABLE: &str = "memory_available";
pub const TEMPERATURE_SENSOR: &str = "temperature_sensor";
pub const NETWORK_CONNECTIVITY: &str = "network_connectivity";

/// Window over which CPU usage is sampled
const CPU_SAMPLE_WINDOW: Duration = Duration::from_secs(1);

/// Limits used by the built-in conditions
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    pub cpu_max_percentage: f64,
    pub memory_min_mb: f64,
    pub temperature_min: f64,
    pub temperature_max: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_max_percentage: 80.0,
            memory_min_mb: 100.0,
            temperature_min: 20.0,
            temperature_max: 80.0,
        }
    }
}

impl Thresholds {
    /// Read thresholds from the `monitoring_thresholds` resource, keeping
    /// the built-in value for every missing key
    pub async fn from_provider(provider: &dyn ResourceProvider) -> Self {
        let defaults = Self::default();
        let lookup = move |key: &'static str, fallback: f64| async move {
            provider
                .lookup_f64(MONITORING_THRESHOLDS, key)
                .await
                .unwrap_or(fallback)
        };

        Self {
            cpu_max_percentage: lookup("cpu_max_percentage", defaults.cpu_max_percentage).await,
            memory_min_mb: lookup("memory_min_mb", defaults.memory_min_mb).await,
            temperature_min: lookup("temperature_min", defaults.temperature_min).await,
            temperature_max: lookup("temperature_max", defaults.temperature_max).await,
        }
    }
}

fn below(limit: f64) -> impl Fn(&Reading) -> bool + Send + Sync + 'static {
    move |value| value.as_f64().is_some_and(|v| v < limit)
}

fn above(limit: f64) -> impl Fn(&Reading) -> bool + Send + Sync + 'static {
    move |value| value.as_f64().is_some_and(|v| v > limit)
}

fn within(min: f64, max: f64) -> impl Fn(&Reading) -> bool + Send + Sync + 'static {
    move |value| value.as_f64().is_some_and(|v| (min..=max).contains(&v))
}

fn sample_cpu_usage() -> anyhow::Result<Reading> {
    let mut system = System::new();
    system.refresh_cpu_usage();
    std::thread::sleep(CPU_SAMPLE_WINDOW.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL));
    system.refresh_cpu_usage();
    Ok(Reading::Float(f64::from(system.global_cpu_usage())))
}

fn sample_available_memory_mb() -> anyhow::Result<Reading> {
    let mut system = System::new();
    system.refresh_memory();
    Ok(Reading::Float(system.available_memory() as f64 / 1024.0 / 1024.0))
}

fn sample_temperature() -> anyhow::Result<Reading> {
    // Simulated sensor
    Ok(Reading::Float(rand::thread_rng().gen_range(15.0..=85.0)))
}

fn sample_network_bytes() -> anyhow::Result<Reading> {
    let networks = Networks::new_with_refreshed_list();
    let total: u64 = networks
        .iter()
        .map(|(_, data)| data.total_received() + data.total_transmitted())
        .sum();
    Ok(Reading::from(total))
}

/// The four conditions installed by a default service
pub fn default_conditions(thresholds: &Thresholds) -> Vec<Condition> {
    vec![
        Condition::new(
            CPU_USAGE,
            format!("CPU usage must stay below {}%", thresholds.cpu_max_percentage),
            sample_cpu_usage,
            below(thresholds.cpu_max_percentage),
            Severity::Warning,
        )
        .with_interval(Duration::from_secs(10)),
        Condition::new(
            MEMORY_AVAILABLE,
            format!("Available memory must exceed {}MB", thresholds.memory_min_mb),
            sample_available_memory_mb,
            above(thresholds.memory_min_mb),
            Severity::Error,
        )
        .with_interval(Duration::from_secs(15)),
        Condition::new(
            TEMPERATURE_SENSOR,
            format!(
                "Sensor temperature must stay between {}-{}°C",
                thresholds.temperature_min, thresholds.temperature_max
            ),
            sample_temperature,
            within(thresholds.temperature_min, thresholds.temperature_max),
            Severity::Critical,
        )
        .with_interval(Duration::from_secs(5)),
        Condition::new(
            NETWORK_CONNECTIVITY,
            "There must be network activity",
            sample_network_bytes,
            above(0.0),
            Severity::Warning,
        )
        .with_interval(Duration::from_secs(20)),
    ]
}

/// Condition that fails while `component` reports itself unhealthy.
/// A missing component counts as a probe failure.
pub fn component_health_condition(
    registry: Arc<ComponentRegistry>,
    component: &str,
    interval: Duration,
) -> Condition {
    let target = component.to_string();
    Condition::new(
        format!("component_{}", component),
        format!("Component '{}' must pass its health check", component),
        move || {
            let runtime = Handle::try_current().context("component health probe needs a tokio runtime")?;
            let healthy = runtime.block_on(registry.health_check(&target))?;
            Ok(Reading::Bool(healthy))
        },
        |value| value.as_bool().unwrap_or(false),
        Severity::Error,
    )
    .with_interval(interval)
}

impl ConditionMonitor {
    /// Register the built-in conditions, returning their names
    pub async fn install_default_conditions(&self, thresholds: &Thresholds) -> Vec<String> {
        let mut names = Vec::new();
        for condition in default_conditions(thresholds) {
            names.push(condition.name.clone());
            self.add_condition(condition).await;
        }
        names
    }
}
