use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tracing::error;

use super::{ApiResult, AppState};
use crate::resources::ResourceInfo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_all_resources))
        .route("/:name", get(get_resource))
        .route("/reload", post(reload_all_resources))
        .route("/info/summary", get(get_resource_summary))
        .route("/files/list", get(list_resource_files))
}

/// JSON type name of a resource value
fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn describe(name: &str, value: Value) -> Value {
    json!({
        "name": name,
        "type": value_type(&value),
        "value": value,
    })
}

async fn get_all_resources(State(state): State<AppState>) -> Json<Vec<Value>> {
    let resources = state.resources.get_all_resources().await;
    Json(
        resources
            .into_iter()
            .map(|(name, value)| describe(&name, value))
            .collect(),
    )
}

async fn get_resource(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    match state.resources.get_resource(&name).await {
        Some(value) => Ok(Json(describe(&name, value))),
        None => Err((
            StatusCode::NOT_FOUND,
            format!("Resource '{}' not found", name),
        )),
    }
}

async fn reload_all_resources(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let loaded = state.resources.reload_all_resources().await.map_err(|e| {
        error!("❌ Failed to reload resources: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(json!({
        "message": "All resources have been reloaded",
        "resources_loaded": loaded,
    })))
}

async fn get_resource_summary(State(state): State<AppState>) -> Json<ResourceInfo> {
    Json(state.resources.get_resource_info().await)
}

async fn list_resource_files(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let files = state
        .resources
        .list_files()
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(json!({
        "directory": state.resources.resource_dir().display().to_string(),
        "total_files": files.len(),
        "files": files,
    })))
}
