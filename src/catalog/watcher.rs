//! Catalog file watcher for on-demand refresh.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::catalog::swap::RefreshTrigger;

/// Watches a file-based catalog source and asks for a refresh when it changes.
pub struct SourceWatcher {
    path: PathBuf,
    trigger_tx: mpsc::UnboundedSender<RefreshTrigger>,
}

impl SourceWatcher {
    pub fn new(path: &Path, trigger_tx: mpsc::UnboundedSender<RefreshTrigger>) -> Self {
        Self {
            path: path.to_path_buf(),
            trigger_tx,
        }
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.trigger_tx.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Catalog file change detected, requesting refresh");
                        // The refresher may already be gone during shutdown.
                        let _ = tx.send(RefreshTrigger::SourceChanged);
                    }
                }
                Err(e) => tracing::error!("Catalog watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Catalog watcher started");
        Ok(watcher)
    }
}
