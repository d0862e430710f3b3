use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::alert::{Alert, Severity};
use super::condition::{Condition, ConditionInfo};
use super::scheduler::run_condition_loop;

/// Default number of alerts returned by `get_alerts`
pub const DEFAULT_ALERT_LIMIT: usize = 100;

/// Size of the "recent" window reported by `status`
pub const RECENT_ALERT_WINDOW: usize = 10;

/// State shared between the engine and its scheduling loops
pub(crate) struct MonitorState {
    conditions: RwLock<HashMap<String, Condition>>,
    alerts: RwLock<Vec<Alert>>,
    running: AtomicBool,
    sequence: AtomicU64,
}

impl MonitorState {
    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) async fn condition(&self, name: &str) -> Option<Condition> {
        self.conditions.read().await.get(name).cloned()
    }

    pub(crate) fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) async fn record(&self, alert: Alert) {
        warn!(
            "🚨 ALERT {}: {} (value: {})",
            alert.severity.as_str().to_uppercase(),
            alert.message,
            alert.current_value
        );
        self.alerts.write().await.push(alert);
    }
}

struct ScheduledLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct RunState {
    root: CancellationToken,
    loops: HashMap<String, ScheduledLoop>,
}

/// Aggregate view of the engine for status reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorStatus {
    pub is_running: bool,
    pub total_conditions: usize,
    pub enabled_conditions: usize,
    pub total_alerts: usize,
    pub recent_alerts: usize,
    pub alert_levels: BTreeMap<Severity, usize>,
}

/// Owns the condition registry and the alert log, and runs one scheduling
/// loop per condition while started.
///
/// Conditions added while the engine is running are not scheduled until the
/// next `stop()`/`start()` cycle.
///
/// `is_running()` reports whether the engine has been started, not whether
/// any loop is alive. Starting with an empty registry, or removing every
/// condition, leaves it running with zero loops until `stop()`.
pub struct ConditionMonitor {
    state: Arc<MonitorState>,
    run: Mutex<Option<RunState>>,
}

impl Default for ConditionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionMonitor {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MonitorState {
                conditions: RwLock::new(HashMap::new()),
                alerts: RwLock::new(Vec::new()),
                running: AtomicBool::new(false),
                sequence: AtomicU64::new(0),
            }),
            run: Mutex::new(None),
        }
    }

    /// Spawn one loop per registered condition. No-op when already running.
    pub async fn start(&self) {
        let mut run = self.run.lock().await;
        if run.is_some() {
            debug!("Condition monitor already running, start ignored");
            return;
        }

        let root = CancellationToken::new();
        self.state.running.store(true, Ordering::SeqCst);

        let names: Vec<String> = self.state.conditions.read().await.keys().cloned().collect();
        let mut loops = HashMap::with_capacity(names.len());
        for name in names {
            let cancel = root.child_token();
            let handle = tokio::spawn(run_condition_loop(
                Arc::clone(&self.state),
                name.clone(),
                cancel.clone(),
            ));
            loops.insert(name, ScheduledLoop { cancel, handle });
        }

        info!("🎯 Condition monitor started with {} loops", loops.len());
        *run = Some(RunState { root, loops });
    }

    /// Cancel every loop and wait for all of them to finish
    pub async fn stop(&self) {
        let mut run = self.run.lock().await;
        let Some(state) = run.take() else {
            return;
        };

        self.state.running.store(false, Ordering::SeqCst);
        state.root.cancel();

        let handles = state.loops.into_values().map(|l| l.handle);
        for result in join_all(handles).await {
            if let Err(e) = result {
                if !e.is_cancelled() {
                    warn!("Scheduling loop ended abnormally: {}", e);
                }
            }
        }

        info!("🛑 Condition monitor stopped");
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Number of scheduling loops spawned by the current run
    pub async fn active_loops(&self) -> usize {
        self.run
            .lock()
            .await
            .as_ref()
            .map(|r| r.loops.values().filter(|l| !l.handle.is_finished()).count())
            .unwrap_or(0)
    }

    /// Insert or replace a condition by name
    pub async fn add_condition(&self, condition: Condition) {
        debug!(
            "Registering condition '{}' ({}, every {:?})",
            condition.name, condition.severity, condition.interval
        );
        self.state
            .conditions
            .write()
            .await
            .insert(condition.name.clone(), condition);
    }

    /// Remove a condition and cancel its loop. Returns false for unknown names.
    pub async fn remove_condition(&self, name: &str) -> bool {
        if self.state.conditions.write().await.remove(name).is_none() {
            return false;
        }

        if let Some(run) = self.run.lock().await.as_mut() {
            if let Some(scheduled) = run.loops.remove(name) {
                scheduled.cancel.cancel();
            }
        }

        info!("Removed condition: {}", name);
        true
    }

    /// Toggle a condition. Returns false for unknown names.
    pub async fn enable_condition(&self, name: &str, enabled: bool) -> bool {
        match self.state.conditions.write().await.get_mut(name) {
            Some(condition) => {
                condition.enabled = enabled;
                info!(
                    "Condition '{}' {}",
                    name,
                    if enabled { "enabled" } else { "disabled" }
                );
                true
            }
            None => false,
        }
    }

    /// Snapshot of alerts, newest first, optionally restricted to one severity
    pub async fn get_alerts(&self, severity: Option<Severity>, limit: usize) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = {
            let log = self.state.alerts.read().await;
            log.iter()
                .rev()
                .filter(|a| severity.map_or(true, |s| a.severity == s))
                .cloned()
                .collect()
        };
        // Stable sort keeps later appends first among equal timestamps.
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        alerts.truncate(limit);
        alerts
    }

    /// Empty the alert log, returning how many alerts were dropped
    pub async fn clear_alerts(&self) -> usize {
        let mut log = self.state.alerts.write().await;
        let cleared = log.len();
        log.clear();
        info!("Cleared {} alerts", cleared);
        cleared
    }

    pub async fn alert_count(&self) -> usize {
        self.state.alerts.read().await.len()
    }

    pub async fn get_conditions(&self) -> BTreeMap<String, ConditionInfo> {
        self.state
            .conditions
            .read()
            .await
            .iter()
            .map(|(name, condition)| (name.clone(), condition.info()))
            .collect()
    }

    /// Append a fabricated alert without waiting for a condition cycle
    pub async fn create_test_alert(&self) -> Alert {
        let alert = Alert::synthetic(self.state.next_sequence());
        self.state.record(alert.clone()).await;
        alert
    }

    pub async fn status(&self) -> MonitorStatus {
        let conditions = self.get_conditions().await;
        let recent = self.get_alerts(None, RECENT_ALERT_WINDOW).await;

        let mut alert_levels: BTreeMap<Severity, usize> =
            Severity::ALL.iter().map(|s| (*s, 0)).collect();
        for alert in &recent {
            *alert_levels.entry(alert.severity).or_default() += 1;
        }

        MonitorStatus {
            is_running: self.is_running(),
            total_conditions: conditions.len(),
            enabled_conditions: conditions.values().filter(|c| c.enabled).count(),
            total_alerts: self.alert_count().await,
            recent_alerts: recent.len(),
            alert_levels,
        }
    }
}

impl Drop for ConditionMonitor {
    fn drop(&mut self) {
        if let Some(run) = self.run.get_mut().take() {
            self.state.running.store(false, Ordering::SeqCst);
            run.root.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::condition::Reading;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::time::sleep;

    fn failing_condition(name: &str, severity: Severity, interval_ms: u64) -> Condition {
        Condition::new(
            name,
            "Value must exceed 10",
            || Ok(Reading::Int(0)),
            |value| value.as_f64().is_some_and(|v| v > 10.0),
            severity,
        )
        .with_interval(Duration::from_millis(interval_ms))
    }

    fn counting_condition(name: &str, calls: Arc<AtomicUsize>, interval_ms: u64) -> Condition {
        Condition::new(
            name,
            "Counts probe invocations",
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Reading::Int(0))
            },
            |_| false,
            Severity::Info,
        )
        .with_interval(Duration::from_millis(interval_ms))
    }

    async fn alerts_for(monitor: &ConditionMonitor, name: &str) -> Vec<Alert> {
        monitor
            .get_alerts(None, usize::MAX)
            .await
            .into_iter()
            .filter(|a| a.condition_name == name)
            .collect()
    }

    #[tokio::test]
    async fn test_new_monitor_is_idle() {
        let monitor = ConditionMonitor::new();
        assert!(!monitor.is_running());
        assert!(monitor.get_conditions().await.is_empty());
        assert!(monitor.get_alerts(None, DEFAULT_ALERT_LIMIT).await.is_empty());
        assert_eq!(monitor.active_loops().await, 0);
    }

    #[tokio::test]
    async fn test_failing_condition_raises_alerts() {
        let monitor = ConditionMonitor::new();
        monitor
            .add_condition(failing_condition("always_fail", Severity::Critical, 100))
            .await;
        monitor.start().await;

        sleep(Duration::from_millis(500)).await;
        monitor.stop().await;

        let alerts = alerts_for(&monitor, "always_fail").await;
        assert!(alerts.len() >= 3, "expected >= 3 alerts, got {}", alerts.len());
        assert!(alerts.iter().all(|a| a.severity == Severity::Critical));
        assert!(alerts.iter().all(|a| a.current_value == Reading::Int(0)));
    }

    #[tokio::test]
    async fn test_first_check_waits_one_interval() {
        let monitor = ConditionMonitor::new();
        monitor
            .add_condition(failing_condition("slow", Severity::Warning, 300))
            .await;
        monitor.start().await;

        sleep(Duration::from_millis(100)).await;
        assert!(alerts_for(&monitor, "slow").await.is_empty());
        monitor.stop().await;
    }

    #[tokio::test]
    async fn test_disabled_condition_never_probes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let monitor = ConditionMonitor::new();
        monitor
            .add_condition(counting_condition("quiet", Arc::clone(&calls), 20).with_enabled(false))
            .await;
        monitor.start().await;

        sleep(Duration::from_millis(200)).await;
        monitor.stop().await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(alerts_for(&monitor, "quiet").await.is_empty());
    }

    #[tokio::test]
    async fn test_probe_error_raises_error_alert() {
        let monitor = ConditionMonitor::new();
        let condition = Condition::new(
            "broken_probe",
            "Probe always fails",
            || Err(anyhow::anyhow!("sensor unreachable")),
            |_| true,
            Severity::Critical,
        )
        .with_interval(Duration::from_millis(50));
        monitor.add_condition(condition).await;
        monitor.start().await;

        sleep(Duration::from_millis(200)).await;
        monitor.stop().await;

        let alerts = alerts_for(&monitor, "broken_probe").await;
        assert!(!alerts.is_empty());
        for alert in alerts {
            assert_eq!(alert.severity, Severity::Error);
            assert_eq!(alert.current_value.to_string(), "ERROR");
            assert_eq!(alert.expected_range, "N/A");
            assert!(alert.message.contains("sensor unreachable"));
        }
    }

    #[tokio::test]
    async fn test_panicking_probe_is_contained() {
        let monitor = ConditionMonitor::new();
        let condition = Condition::new(
            "panicky",
            "Probe panics",
            || -> anyhow::Result<Reading> { panic!("boom") },
            |_| true,
            Severity::Info,
        )
        .with_interval(Duration::from_millis(50));
        monitor.add_condition(condition).await;
        monitor.start().await;

        sleep(Duration::from_millis(250)).await;
        assert_eq!(monitor.active_loops().await, 1);
        monitor.stop().await;

        let alerts = alerts_for(&monitor, "panicky").await;
        assert!(alerts.len() >= 2);
        assert!(alerts.iter().all(|a| a.severity == Severity::Error));
    }

    #[tokio::test]
    async fn test_stop_is_prompt_and_final() {
        let monitor = ConditionMonitor::new();
        monitor
            .add_condition(failing_condition("long_sleep", Severity::Warning, 10_000))
            .await;
        monitor
            .add_condition(failing_condition("fast", Severity::Warning, 20))
            .await;
        monitor.start().await;
        sleep(Duration::from_millis(100)).await;

        let started = std::time::Instant::now();
        monitor.stop().await;
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!monitor.is_running());

        let count = monitor.alert_count().await;
        sleep(Duration::from_millis(150)).await;
        assert_eq!(monitor.alert_count().await, count);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let monitor = ConditionMonitor::new();
        monitor
            .add_condition(counting_condition("once", Arc::clone(&calls), 100))
            .await;

        monitor.start().await;
        monitor.start().await;
        assert_eq!(monitor.active_loops().await, 1);

        sleep(Duration::from_millis(350)).await;
        monitor.stop().await;

        // A duplicate loop would double the probe count.
        let probes = calls.load(Ordering::SeqCst);
        assert!((2..=4).contains(&probes), "unexpected probe count {}", probes);
    }

    #[tokio::test]
    async fn test_running_with_empty_registry() {
        let monitor = ConditionMonitor::new();
        monitor.start().await;
        assert!(monitor.is_running());
        assert_eq!(monitor.active_loops().await, 0);
        assert!(monitor.status().await.is_running);

        monitor.stop().await;
        assert!(!monitor.is_running());
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let monitor = ConditionMonitor::new();
        monitor
            .add_condition(failing_condition("cycle", Severity::Info, 50))
            .await;

        monitor.start().await;
        monitor.stop().await;
        monitor.start().await;
        assert!(monitor.is_running());
        assert_eq!(monitor.active_loops().await, 1);
        monitor.stop().await;
        assert!(!monitor.is_running());
    }

    #[tokio::test]
    async fn test_remove_condition_terminates_loop() {
        let monitor = ConditionMonitor::new();
        monitor
            .add_condition(failing_condition("doomed", Severity::Warning, 30))
            .await;
        monitor.start().await;
        sleep(Duration::from_millis(100)).await;

        assert!(monitor.remove_condition("doomed").await);
        sleep(Duration::from_millis(20)).await;
        assert_eq!(monitor.active_loops().await, 0);

        let count = alerts_for(&monitor, "doomed").await.len();
        assert!(count > 0);
        sleep(Duration::from_millis(150)).await;
        assert_eq!(alerts_for(&monitor, "doomed").await.len(), count);
        assert!(monitor.get_conditions().await.is_empty());
        monitor.stop().await;
    }

    #[tokio::test]
    async fn test_unknown_condition_mutations_return_false() {
        let monitor = ConditionMonitor::new();
        assert!(!monitor.remove_condition("missing").await);
        assert!(!monitor.enable_condition("missing", true).await);
    }

    #[tokio::test]
    async fn test_add_condition_while_running_is_not_scheduled() {
        let monitor = ConditionMonitor::new();
        monitor.start().await;
        monitor
            .add_condition(failing_condition("late", Severity::Warning, 20))
            .await;

        sleep(Duration::from_millis(150)).await;
        assert!(alerts_for(&monitor, "late").await.is_empty());
        assert_eq!(monitor.active_loops().await, 0);

        monitor.stop().await;
        monitor.start().await;
        sleep(Duration::from_millis(150)).await;
        monitor.stop().await;
        assert!(!alerts_for(&monitor, "late").await.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_definition_for_running_loop() {
        let monitor = ConditionMonitor::new();
        monitor
            .add_condition(failing_condition("swap", Severity::Info, 30))
            .await;
        monitor.start().await;
        sleep(Duration::from_millis(100)).await;

        monitor
            .add_condition(failing_condition("swap", Severity::Critical, 30))
            .await;
        sleep(Duration::from_millis(10)).await;
        monitor.clear_alerts().await;
        sleep(Duration::from_millis(150)).await;
        monitor.stop().await;

        let alerts = alerts_for(&monitor, "swap").await;
        assert!(!alerts.is_empty());
        assert!(alerts.iter().all(|a| a.severity == Severity::Critical));
        assert_eq!(monitor.get_conditions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_disable_while_running_stops_alerts() {
        let monitor = ConditionMonitor::new();
        monitor
            .add_condition(failing_condition("toggle", Severity::Warning, 30))
            .await;
        monitor.start().await;
        sleep(Duration::from_millis(100)).await;

        assert!(monitor.enable_condition("toggle", false).await);
        sleep(Duration::from_millis(50)).await;
        let count = monitor.alert_count().await;
        sleep(Duration::from_millis(150)).await;
        assert_eq!(monitor.alert_count().await, count);
        monitor.stop().await;
    }

    #[tokio::test]
    async fn test_enable_condition_is_idempotent() {
        let monitor = ConditionMonitor::new();
        monitor
            .add_condition(failing_condition("flag", Severity::Warning, 1000).with_enabled(false))
            .await;

        assert!(monitor.enable_condition("flag", true).await);
        let once = monitor.get_conditions().await;
        assert!(monitor.enable_condition("flag", true).await);
        assert_eq!(monitor.get_conditions().await, once);
        assert!(once["flag"].enabled);
    }

    #[tokio::test]
    async fn test_get_alerts_filters_and_orders() {
        let monitor = ConditionMonitor::new();
        monitor
            .add_condition(failing_condition("warn", Severity::Warning, 20))
            .await;
        monitor
            .add_condition(failing_condition("crit", Severity::Critical, 30))
            .await;
        monitor.start().await;
        sleep(Duration::from_millis(200)).await;
        monitor.stop().await;

        let all = monitor.get_alerts(None, usize::MAX).await;
        assert!(all.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

        let critical = monitor.get_alerts(Some(Severity::Critical), usize::MAX).await;
        assert!(!critical.is_empty());
        assert!(critical.iter().all(|a| a.severity == Severity::Critical));
        let expected: Vec<&Alert> = all
            .iter()
            .filter(|a| a.severity == Severity::Critical)
            .collect();
        assert_eq!(critical.iter().collect::<Vec<_>>(), expected);

        let limited = monitor.get_alerts(None, 2).await;
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0], all[0]);
    }

    #[tokio::test]
    async fn test_clear_alerts_then_new_alerts_visible() {
        let monitor = ConditionMonitor::new();
        monitor
            .add_condition(failing_condition("noisy", Severity::Info, 20))
            .await;
        monitor.start().await;
        sleep(Duration::from_millis(100)).await;

        monitor.clear_alerts().await;
        let after_clear = monitor.get_alerts(None, usize::MAX).await;
        let cleared_at = chrono::Utc::now();
        assert!(after_clear.len() <= 1);

        sleep(Duration::from_millis(100)).await;
        monitor.stop().await;
        let later = monitor.get_alerts(None, usize::MAX).await;
        assert!(later.iter().any(|a| a.timestamp > cleared_at));
    }

    #[tokio::test]
    async fn test_clear_alerts_on_idle_monitor() {
        let monitor = ConditionMonitor::new();
        monitor.create_test_alert().await;
        monitor.create_test_alert().await;

        assert_eq!(monitor.clear_alerts().await, 2);
        assert!(monitor.get_alerts(None, DEFAULT_ALERT_LIMIT).await.is_empty());
    }

    #[tokio::test]
    async fn test_create_test_alert_is_most_recent() {
        let monitor = ConditionMonitor::new();
        monitor
            .add_condition(failing_condition("background", Severity::Info, 20))
            .await;
        monitor.start().await;
        sleep(Duration::from_millis(80)).await;
        monitor.stop().await;

        let before = monitor.get_alerts(None, 1000).await.len();
        let alert = monitor.create_test_alert().await;
        let after = monitor.get_alerts(None, 1000).await;

        assert_eq!(after.len(), before + 1);
        assert_eq!(after[0].id, alert.id);
        assert_eq!(after[0].severity, Severity::Warning);
        assert_eq!(after[0].condition_name, "test_condition");
    }

    #[tokio::test]
    async fn test_status_counts() {
        let monitor = ConditionMonitor::new();
        monitor
            .add_condition(failing_condition("a", Severity::Warning, 1000))
            .await;
        monitor
            .add_condition(failing_condition("b", Severity::Warning, 1000).with_enabled(false))
            .await;
        for _ in 0..12 {
            monitor.create_test_alert().await;
        }

        let status = monitor.status().await;
        assert!(!status.is_running);
        assert_eq!(status.total_conditions, 2);
        assert_eq!(status.enabled_conditions, 1);
        assert_eq!(status.total_alerts, 12);
        assert_eq!(status.recent_alerts, RECENT_ALERT_WINDOW);
        assert_eq!(status.alert_levels[&Severity::Warning], RECENT_ALERT_WINDOW);
        assert_eq!(status.alert_levels[&Severity::Critical], 0);
        assert_eq!(status.alert_levels.len(), Severity::ALL.len());
    }
}
