//! File watching for live reload.
//!
//! Uses notify crate for cross-platform file system events. Each watch
//! slot re-reads the target inside the backend callback and forwards the
//! finished payload over a channel, so the core only ever sees complete
//! documents and listings in delivery order.

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::debug;

use crate::bridge;
use crate::session::{FilePayload, FolderPayload};
use crate::sync::WatchService;

struct ActiveWatch {
    // Dropping the watcher tears down the OS subscription.
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

/// The production [`WatchService`]: one notify watcher per slot, payloads
/// delivered over the channels handed in at construction.
pub struct NotifyWatchService {
    file_tx: Sender<FilePayload>,
    folder_tx: Sender<FolderPayload>,
    file: Option<ActiveWatch>,
    folder: Option<ActiveWatch>,
}

impl NotifyWatchService {
    pub const fn new(file_tx: Sender<FilePayload>, folder_tx: Sender<FolderPayload>) -> Self {
        Self {
            file_tx,
            folder_tx,
            file: None,
            folder: None,
        }
    }

    /// Path currently covered by the file slot, if any.
    pub fn watched_file(&self) -> Option<&Path> {
        self.file.as_ref().map(|w| w.path.as_path())
    }

    /// Path currently covered by the folder slot, if any.
    pub fn watched_folder(&self) -> Option<&Path> {
        self.folder.as_ref().map(|w| w.path.as_path())
    }
}

fn is_content_event(event: &Event) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
}

fn is_listing_event(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

impl WatchService for NotifyWatchService {
    fn start_file_watch(&mut self, path: &Path) -> anyhow::Result<()> {
        // Canonicalize so event paths from the OS match our stored paths.
        let target = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if self
            .file
            .as_ref()
            .is_some_and(|active| active.path == target)
        {
            return Ok(());
        }

        let tx = self.file_tx.clone();
        let read_path = target.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) if is_content_event(&event) => {
                    // A half-written or vanished file is skipped; the
                    // current document stays mounted until a clean read.
                    match bridge::read_file_payload(&read_path) {
                        Ok(payload) => {
                            let _ = tx.send(payload);
                        }
                        Err(err) => debug!("dropping unreadable re-read: {err}"),
                    }
                }
                Ok(_) => {}
                Err(err) => debug!("file watch backend error: {err}"),
            }
        })?;
        watcher.watch(&target, RecursiveMode::NonRecursive)?;

        self.file = Some(ActiveWatch {
            _watcher: watcher,
            path: target,
        });
        Ok(())
    }

    fn stop_file_watch(&mut self) {
        self.file = None;
    }

    fn start_folder_watch(&mut self, path: &Path) -> anyhow::Result<()> {
        let target = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if self
            .folder
            .as_ref()
            .is_some_and(|active| active.path == target)
        {
            return Ok(());
        }

        let tx = self.folder_tx.clone();
        let read_path = target.clone();
        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<Event>| match res {
                Ok(event) if is_listing_event(&event) => {
                    match bridge::read_folder_payload(&read_path) {
                        Ok(payload) => {
                            let _ = tx.send(payload);
                        }
                        Err(err) => debug!("dropping unreadable re-listing: {err}"),
                    }
                }
                Ok(_) => {}
                Err(err) => debug!("folder watch backend error: {err}"),
            })?;
        watcher.watch(&target, RecursiveMode::NonRecursive)?;

        self.folder = Some(ActiveWatch {
            _watcher: watcher,
            path: target,
        });
        Ok(())
    }

    fn stop_folder_watch(&mut self) {
        self.folder = None;
    }
}
