use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Result as NotifyResult, Watcher};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use super::manager::{is_resource_file, reload_into, SharedResourceStore};
use super::ResourceResult;

/// Wait for editors to finish writing before reloading
const DEBOUNCE: Duration = Duration::from_millis(250);

/// Reloads resources when files in the watched directory change.
/// Watching stops when this is dropped.
pub struct ResourceWatcher {
    _watcher: RecommendedWatcher,
}

impl std::fmt::Debug for ResourceWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceWatcher")
            .field("_watcher", &"<watcher>")
            .finish()
    }
}

impl ResourceWatcher {
    pub(crate) fn new(resource_dir: &Path, store: SharedResourceStore) -> ResourceResult<Self> {
        // notify calls back on its own thread, so capture the runtime here.
        let runtime = Handle::try_current()?;

        let mut watcher = notify::recommended_watcher(move |res: NotifyResult<Event>| match res {
            Ok(event) if is_content_change(&event.kind) => {
                for path in event.paths {
                    if is_resource_file(&path) {
                        runtime.spawn(reload_after_debounce(store.clone(), path));
                    }
                }
            }
            Ok(_) => {}
            Err(e) => error!("❌ Resource watcher error: {}", e),
        })?;

        watcher.watch(resource_dir, RecursiveMode::NonRecursive)?;

        Ok(ResourceWatcher { _watcher: watcher })
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

async fn reload_after_debounce(store: SharedResourceStore, path: PathBuf) {
    tokio::time::sleep(DEBOUNCE).await;

    match reload_into(&store, &path).await {
        Ok(true) => info!("✅ Resource reloaded from {}", path.display()),
        Ok(false) => debug!("Resource {} unchanged, skipping reload", path.display()),
        Err(e) => {
            error!("❌ Failed to reload resource: {}", e);
            warn!("   Keeping existing value for {}", path.display());
        }
    }
}
