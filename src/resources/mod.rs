//! External resource files that can be edited without rebuilding.
//!
//! Resources live as individual JSON, YAML or plain-text files in a single
//! directory. Each file is loaded under its file stem and reloaded when it
//! changes on disk.

pub mod defaults;
pub mod hot_reload;
pub mod manager;

pub use hot_reload::ResourceWatcher;
pub use manager::{ResourceFile, ResourceInfo, ResourceManager};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("File watcher error: {0}")]
    Watcher(#[from] notify::Error),
    #[error("No async runtime available for the file watcher: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}

pub type ResourceResult<T> = Result<T, ResourceError>;

/// Read-only lookup of configuration values
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    async fn get_resource(&self, name: &str) -> Option<Value>;

    /// Numeric value stored under `key` inside the resource `resource`
    async fn lookup_f64(&self, resource: &str, key: &str) -> Option<f64> {
        self.get_resource(resource)
            .await
            .and_then(|value| value.get(key).and_then(Value::as_f64))
    }
}
