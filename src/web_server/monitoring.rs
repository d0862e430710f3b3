use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{ApiResult, AppState};
use crate::monitor::{Alert, ConditionInfo, MonitorStatus, Severity, DEFAULT_ALERT_LIMIT};

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    pub level: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct EnableQuery {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/alerts", get(get_alerts))
        .route("/alerts", delete(clear_alerts))
        .route("/conditions", get(get_conditions))
        .route("/conditions/:name/enable", post(enable_condition))
        .route("/status", get(get_status))
        .route("/test-alert", post(create_test_alert))
}

async fn get_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> ApiResult<Json<Vec<Alert>>> {
    let severity = query
        .level
        .as_deref()
        .filter(|level| !level.is_empty())
        .map(str::parse::<Severity>)
        .transpose()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let alerts = state
        .monitor
        .get_alerts(severity, query.limit.unwrap_or(DEFAULT_ALERT_LIMIT))
        .await;
    Ok(Json(alerts))
}

async fn get_conditions(State(state): State<AppState>) -> Json<Vec<ConditionInfo>> {
    Json(state.monitor.get_conditions().await.into_values().collect())
}

async fn enable_condition(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<EnableQuery>,
) -> ApiResult<Json<Value>> {
    if !state.monitor.enable_condition(&name, query.enabled).await {
        return Err((
            StatusCode::NOT_FOUND,
            format!("Condition '{}' not found", name),
        ));
    }

    Ok(Json(json!({
        "message": format!(
            "Condition '{}' {}",
            name,
            if query.enabled { "enabled" } else { "disabled" }
        ),
        "condition_name": name,
        "enabled": query.enabled,
    })))
}

async fn clear_alerts(State(state): State<AppState>) -> Json<Value> {
    let cleared = state.monitor.clear_alerts().await;
    Json(json!({
        "message": "All alerts have been cleared",
        "cleared": cleared,
    }))
}

async fn get_status(State(state): State<AppState>) -> Json<MonitorStatus> {
    Json(state.monitor.status().await)
}

async fn create_test_alert(State(state): State<AppState>) -> Json<Value> {
    let alert = state.monitor.create_test_alert().await;
    info!("🧪 Test alert {} created", alert.id);
    Json(json!({
        "message": "Test alert created",
        "alert_id": alert.id,
    }))
}
