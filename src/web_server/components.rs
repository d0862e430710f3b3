use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiError, ApiResult, AppState};
use crate::components::{ComponentError, ComponentInfo};

#[derive(Debug, Deserialize)]
pub struct CreateQuery {
    pub component_type: String,
    pub instance_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceQuery {
    pub new_component_type: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_components))
        .route("/types", get(list_component_types))
        .route("/create", post(create_component))
        .route("/health/all", get(health_check_all))
        .route("/:name", delete(remove_component))
        .route("/:name/start", post(start_component))
        .route("/:name/stop", post(stop_component))
        .route("/:name/restart", post(restart_component))
        .route("/:name/replace", put(replace_component))
}

fn to_api_error(e: ComponentError) -> ApiError {
    let status = match e {
        ComponentError::UnknownComponent(_) => StatusCode::NOT_FOUND,
        ComponentError::UnknownType(_) | ComponentError::AlreadyExists(_) => {
            StatusCode::BAD_REQUEST
        }
        ComponentError::StartFailure { .. } | ComponentError::StopFailure { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}

fn action_response(name: &str, action: &str) -> Json<Value> {
    Json(json!({
        "message": format!("Component '{}' {} succeeded", name, action),
        "component_name": name,
        "action": action,
    }))
}

async fn list_components(State(state): State<AppState>) -> Json<Vec<ComponentInfo>> {
    Json(state.components.list_components().await)
}

async fn list_component_types(State(state): State<AppState>) -> Json<Value> {
    let types = state.components.list_component_types().await;
    Json(json!({
        "total_types": types.len(),
        "available_types": types,
    }))
}

async fn start_component(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .components
        .start_component(&name)
        .await
        .map_err(to_api_error)?;
    Ok(action_response(&name, "start"))
}

async fn stop_component(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .components
        .stop_component(&name)
        .await
        .map_err(to_api_error)?;
    Ok(action_response(&name, "stop"))
}

async fn restart_component(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .components
        .restart_component(&name)
        .await
        .map_err(to_api_error)?;
    Ok(action_response(&name, "restart"))
}

async fn create_component(
    State(state): State<AppState>,
    Query(query): Query<CreateQuery>,
) -> ApiResult<Json<Value>> {
    state
        .components
        .create_component(&query.component_type, &query.instance_name)
        .await
        .map_err(to_api_error)?;

    Ok(Json(json!({
        "message": format!(
            "Component '{}' of type '{}' created",
            query.instance_name, query.component_type
        ),
        "component_name": query.instance_name,
        "component_type": query.component_type,
        "action": "create",
    })))
}

async fn replace_component(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ReplaceQuery>,
) -> ApiResult<Json<Value>> {
    state
        .components
        .replace_component(&name, &query.new_component_type)
        .await
        .map_err(to_api_error)?;

    Ok(Json(json!({
        "message": format!(
            "Component '{}' replaced with type '{}'",
            name, query.new_component_type
        ),
        "component_name": name,
        "new_type": query.new_component_type,
        "action": "replace",
    })))
}

async fn remove_component(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .components
        .remove_component(&name)
        .await
        .map_err(to_api_error)?;
    Ok(action_response(&name, "remove"))
}

async fn health_check_all(State(state): State<AppState>) -> Json<Vec<Value>> {
    let health = state.components.health_check_all().await;
    Json(
        health
            .into_iter()
            .map(|(name, healthy)| json!({ "component_name": name, "healthy": healthy }))
            .collect(),
    )
}
