use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use super::defaults::default_resource_files;
use super::hot_reload::ResourceWatcher;
use super::{ResourceError, ResourceProvider, ResourceResult};

/// Loaded resources plus bookkeeping for change detection
#[derive(Debug, Default)]
pub(crate) struct ResourceStore {
    resources: HashMap<String, Value>,
    file_timestamps: HashMap<String, SystemTime>,
    watched_files: BTreeSet<String>,
}

impl ResourceStore {
    /// Copy what was loaded from `path` into `target`
    fn carry_over(&self, target: &mut ResourceStore, path: &Path) {
        let (file_name, resource_name) = resource_names(path);
        if let Some(value) = self.resources.get(&resource_name) {
            target.resources.insert(resource_name, value.clone());
        }
        if let Some(loaded) = self.file_timestamps.get(&file_name) {
            target.file_timestamps.insert(file_name.clone(), *loaded);
            target.watched_files.insert(file_name);
        }
    }
}

pub(crate) type SharedResourceStore = Arc<RwLock<ResourceStore>>;

/// Summary of what is loaded and from where
#[derive(Debug, Clone, Serialize)]
pub struct ResourceInfo {
    pub total_resources: usize,
    pub resource_directory: String,
    pub watched_files: Vec<String>,
    pub last_loaded: BTreeMap<String, String>,
}

/// A file found in the resource directory
#[derive(Debug, Clone, Serialize)]
pub struct ResourceFile {
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub extension: String,
}

pub struct ResourceManager {
    resource_dir: PathBuf,
    store: SharedResourceStore,
    watcher: Mutex<Option<ResourceWatcher>>,
}

impl std::fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceManager")
            .field("resource_dir", &self.resource_dir)
            .field("store", &"<resources>")
            .field("watcher", &"<watcher>")
            .finish()
    }
}

impl ResourceManager {
    pub fn new(resource_dir: impl Into<PathBuf>) -> Self {
        Self {
            resource_dir: resource_dir.into(),
            store: Arc::new(RwLock::new(ResourceStore::default())),
            watcher: Mutex::new(None),
        }
    }

    pub fn resource_dir(&self) -> &Path {
        &self.resource_dir
    }

    /// Create the directory (and missing default files when asked), then load every file
    pub async fn load_resources(&self, create_defaults: bool) -> ResourceResult<usize> {
        fs::create_dir_all(&self.resource_dir)
            .await
            .map_err(|e| io_error(&self.resource_dir, e))?;

        if create_defaults {
            self.create_default_resources().await?;
        }

        self.load_all_resource_files().await
    }

    async fn create_default_resources(&self) -> ResourceResult<()> {
        for (file_name, value) in default_resource_files() {
            let path = self.resource_dir.join(file_name);
            if fs::try_exists(&path).await.unwrap_or(false) {
                continue;
            }
            save_value(&path, &value).await?;
            info!("📝 Created default resource file {}", path.display());
        }
        Ok(())
    }

    async fn resource_paths(&self) -> ResourceResult<Vec<PathBuf>> {
        let mut entries = fs::read_dir(&self.resource_dir)
            .await
            .map_err(|e| io_error(&self.resource_dir, e))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&self.resource_dir, e))?
        {
            let path = entry.path();
            if is_resource_file(&path) {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    async fn load_all_resource_files(&self) -> ResourceResult<usize> {
        for path in self.resource_paths().await? {
            if let Err(e) = reload_into(&self.store, &path).await {
                error!("❌ Failed to load resource {}: {}", path.display(), e);
            }
        }

        Ok(self.get_resource_count().await)
    }

    /// Reload one file. Returns false when the file has not changed since the last load.
    pub async fn reload_resource(&self, path: &Path) -> ResourceResult<bool> {
        reload_into(&self.store, path).await
    }

    /// Load the directory again into a fresh store and swap it in at once.
    /// Files that fail to parse keep their previous value; files gone from
    /// disk are dropped.
    pub async fn reload_all_resources(&self) -> ResourceResult<usize> {
        let fresh = RwLock::new(ResourceStore::default());
        for path in self.resource_paths().await? {
            if let Err(e) = reload_into(&fresh, &path).await {
                error!("❌ Failed to reload resource: {}", e);
                warn!("   Keeping existing value for {}", path.display());
                let current = self.store.read().await;
                current.carry_over(&mut *fresh.write().await, &path);
            }
        }

        let fresh = fresh.into_inner();
        let count = fresh.resources.len();
        *self.store.write().await = fresh;
        Ok(count)
    }

    pub async fn get_resource(&self, name: &str) -> Option<Value> {
        self.store.read().await.resources.get(name).cloned()
    }

    /// Set a resource in memory, optionally persisting it as `<name>.json`
    pub async fn set_resource(&self, name: &str, value: Value, save_to_file: bool) -> ResourceResult<()> {
        if save_to_file {
            let path = self.resource_dir.join(format!("{}.json", name));
            save_value(&path, &value).await?;
        }
        self.store
            .write()
            .await
            .resources
            .insert(name.to_string(), value);
        Ok(())
    }

    pub async fn get_all_resources(&self) -> BTreeMap<String, Value> {
        self.store
            .read()
            .await
            .resources
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    pub async fn get_resource_count(&self) -> usize {
        self.store.read().await.resources.len()
    }

    pub async fn get_resource_info(&self) -> ResourceInfo {
        let store = self.store.read().await;
        ResourceInfo {
            total_resources: store.resources.len(),
            resource_directory: self.resource_dir.display().to_string(),
            watched_files: store.watched_files.iter().cloned().collect(),
            last_loaded: store
                .file_timestamps
                .iter()
                .map(|(file, time)| (file.clone(), DateTime::<Utc>::from(*time).to_rfc3339()))
                .collect(),
        }
    }

    /// Regular files currently present in the resource directory
    pub async fn list_files(&self) -> ResourceResult<Vec<ResourceFile>> {
        let mut files = Vec::new();
        let mut entries = match fs::read_dir(&self.resource_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(io_error(&self.resource_dir, e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&self.resource_dir, e))?
        {
            let path = entry.path();
            let metadata = entry.metadata().await.map_err(|e| io_error(&path, e))?;
            if !metadata.is_file() {
                continue;
            }
            files.push(ResourceFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: metadata.len(),
                modified: metadata
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now()),
                extension: path
                    .extension()
                    .map(|ext| format!(".{}", ext.to_string_lossy()))
                    .unwrap_or_default(),
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Start reloading files as they change on disk. Replaces any previous watcher.
    pub async fn watch(&self) -> ResourceResult<()> {
        let watcher = ResourceWatcher::new(&self.resource_dir, Arc::clone(&self.store))?;
        *self.watcher.lock().await = Some(watcher);
        info!("👀 Watching resource directory {}", self.resource_dir.display());
        Ok(())
    }

    pub async fn stop_watcher(&self) {
        if self.watcher.lock().await.take().is_some() {
            info!("Stopped watching resource directory {}", self.resource_dir.display());
        }
    }

    pub async fn is_watching(&self) -> bool {
        self.watcher.lock().await.is_some()
    }
}

#[async_trait]
impl ResourceProvider for ResourceManager {
    async fn get_resource(&self, name: &str) -> Option<Value> {
        ResourceManager::get_resource(self, name).await
    }
}

/// Load `path` into `store` under its file stem unless its mtime is unchanged
pub(crate) async fn reload_into(store: &RwLock<ResourceStore>, path: &Path) -> ResourceResult<bool> {
    let (file_name, resource_name) = resource_names(path);

    let modified = fs::metadata(path)
        .await
        .and_then(|metadata| metadata.modified())
        .map_err(|e| io_error(path, e))?;

    let unchanged = store
        .read()
        .await
        .file_timestamps
        .get(&file_name)
        .is_some_and(|loaded| *loaded >= modified);
    if unchanged {
        return Ok(false);
    }

    let content = fs::read_to_string(path).await.map_err(|e| io_error(path, e))?;
    let value = parse_resource(path, &content)?;

    let mut store = store.write().await;
    store.resources.insert(resource_name.clone(), value);
    store.file_timestamps.insert(file_name.clone(), modified);
    store.watched_files.insert(file_name.clone());
    info!("📦 Resource '{}' loaded from {}", resource_name, file_name);

    Ok(true)
}

/// File name and resource name (the file stem) for `path`
fn resource_names(path: &Path) -> (String, String) {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let resource_name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    (file_name, resource_name)
}

pub(crate) fn is_resource_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(true);
    !hidden && path.is_file()
}

fn parse_resource(path: &Path, content: &str) -> ResourceResult<Value> {
    let display = path.display().to_string();
    match extension(path).as_str() {
        "json" => serde_json::from_str(content).map_err(|source| ResourceError::Json {
            path: display,
            source,
        }),
        "yaml" | "yml" => serde_yaml::from_str(content).map_err(|source| ResourceError::Yaml {
            path: display,
            source,
        }),
        _ => Ok(Value::String(content.to_string())),
    }
}

async fn save_value(path: &Path, value: &Value) -> ResourceResult<()> {
    let display = path.display().to_string();
    let content = match extension(path).as_str() {
        "yaml" | "yml" => serde_yaml::to_string(value).map_err(|source| ResourceError::Yaml {
            path: display,
            source,
        })?,
        "json" => serde_json::to_string_pretty(value).map_err(|source| ResourceError::Json {
            path: display,
            source,
        })?,
        _ => match value {
            Value::String(text) => text.clone(),
            other => {
                warn!("Saving non-text resource {} as JSON", path.display());
                other.to_string()
            }
        },
    };

    fs::write(path, content).await.map_err(|e| io_error(path, e))
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn io_error(path: &Path, source: std::io::Error) -> ResourceError {
    ResourceError::Io {
        path: path.display().to_string(),
        source,
    }
}
