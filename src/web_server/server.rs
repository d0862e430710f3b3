use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;

use super::{components, monitoring, resources};
use crate::components::ComponentRegistry;
use crate::monitor::ConditionMonitor;
use crate::resources::ResourceManager;
use crate::service::MonitoringService;

/// Handles shared by every route
#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<ConditionMonitor>,
    pub resources: Arc<ResourceManager>,
    pub components: Arc<ComponentRegistry>,
}

impl From<&MonitoringService> for AppState {
    fn from(service: &MonitoringService) -> Self {
        Self {
            monitor: Arc::clone(&service.monitor),
            resources: Arc::clone(&service.resources),
            components: Arc::clone(&service.components),
        }
    }
}

#[derive(Clone)]
pub struct WebServer {
    pub port: u16,
    pub host: String,
    pub state: AppState,
}

impl WebServer {
    pub fn new(port: u16, host: String, state: AppState) -> Self {
        Self { port, host, state }
    }

    /// Serve until `shutdown` is cancelled
    pub async fn start(&self, shutdown: CancellationToken) -> Result<()> {
        let app = create_app(self.state.clone());
        // Convert localhost to 127.0.0.1 for proper parsing
        let host = if self.host == "localhost" {
            "127.0.0.1"
        } else {
            &self.host
        };
        let addr: SocketAddr = format!("{}:{}", host, self.port).parse()?;

        let listener = TcpListener::bind(addr).await?;
        info!(
            "🚀 Web server ready and listening on http://{}:{}",
            self.host, self.port
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        Ok(())
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/monitoring", monitoring::router())
        .nest("/api/resources", resources::router())
        .nest("/api/components", components::router())
        .with_state(state)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
}

async fn root() -> Json<Value> {
    Json(json!({
        "message": "Condition monitoring and component management service",
        "endpoints": {
            "monitoring": "/api/monitoring",
            "resources": "/api/resources",
            "components": "/api/components",
        }
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "monitoring": state.monitor.is_running(),
        "resources_loaded": state.resources.get_resource_count().await,
        "components_loaded": state.components.get_component_count().await,
    }))
}
