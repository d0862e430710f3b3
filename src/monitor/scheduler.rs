//! Per-condition scheduling loop.
//!
//! Each registered condition gets one task that sleeps for the condition's
//! interval, re-reads the condition from the registry, evaluates it on the
//! blocking pool and appends an alert on failure. Loops never share a tick.

use std::sync::Arc;

use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::alert::Alert;
use super::condition::Evaluation;
use super::engine::MonitorState;

pub(crate) async fn run_condition_loop(
    state: Arc<MonitorState>,
    name: String,
    cancel: CancellationToken,
) {
    let Some(mut interval) = state.condition(&name).await.map(|c| c.interval) else {
        debug!("Condition '{}' vanished before its loop started", name);
        return;
    };

    debug!("⏱️ Scheduling loop started for condition: {}", name);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }

        if !state.is_running() {
            break;
        }

        let Some(condition) = state.condition(&name).await else {
            debug!("Condition '{}' was removed, ending its loop", name);
            break;
        };
        interval = condition.interval;

        if !condition.enabled {
            trace!("⏸️ Skipping disabled condition: {}", name);
            continue;
        }

        let target = condition.clone();
        let evaluation = tokio::select! {
            _ = cancel.cancelled() => break,
            result = tokio::task::spawn_blocking(move || target.evaluate()) => {
                result.unwrap_or_else(|e| Evaluation::Errored(describe_join_error(e)))
            }
        };

        // An evaluation that raced with cancellation is dropped, never recorded.
        if cancel.is_cancelled() {
            break;
        }

        match evaluation {
            Evaluation::Passed => trace!("✅ Condition '{}' passed", name),
            Evaluation::Failed(value) => {
                let alert = Alert::validation_failure(&condition, value, state.next_sequence());
                state.record(alert).await;
            }
            Evaluation::Errored(error) => {
                let alert = Alert::probe_failure(&name, &error, state.next_sequence());
                state.record(alert).await;
            }
        }
    }

    debug!("🛑 Scheduling loop ended for condition: {}", name);
}

fn describe_join_error(error: JoinError) -> String {
    if !error.is_panic() {
        return format!("evaluation aborted: {}", error);
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("probe panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("probe panicked: {}", message)
    } else {
        "probe panicked".to_string()
    }
}
