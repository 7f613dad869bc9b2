//! External open requests and the channels that feed the core.
//!
//! Requests arrive from outside the process (CLI arguments, a second
//! instance forwarding its argument, OS file associations) and may fire
//! before the core is ready. [`PendingOpen`] buffers them; [`OpenTarget`]
//! classifies them; [`EventChannels`] carries everything the watch and
//! request sources produce into the single dispatch loop.

pub mod instance;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};

use serde_json::Value;
use tracing::debug;

use crate::bridge::is_markdown_path;
use crate::config::StartupOptions;
use crate::session::{FilePayload, FolderPayload};

/// A classified open request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenTarget {
    File(PathBuf),
    Folder(PathBuf),
}

impl OpenTarget {
    /// Classify a raw path: directories become folder targets, markdown
    /// files become file targets, everything else is ignored.
    pub fn from_path(path: &Path) -> Option<Self> {
        let canonical = path.canonicalize().ok()?;
        if canonical.is_dir() {
            Some(Self::Folder(canonical))
        } else if canonical.is_file() && is_markdown_path(&canonical) {
            Some(Self::File(canonical))
        } else {
            debug!("ignoring open request for {}", canonical.display());
            None
        }
    }

    /// Classify a structured request.
    ///
    /// Accepts a bare string (treated as a file path) or an object with
    /// `targetType` (`"file"` or `"folder"`) and `path` fields. Anything
    /// else is silently ignored so a malformed request cannot disturb the
    /// current document.
    pub fn from_request(request: &Value) -> Option<Self> {
        match request {
            Value::String(path) => Self::from_path(Path::new(path)),
            Value::Object(fields) => {
                let path = fields.get("path").and_then(Value::as_str)?;
                match fields.get("targetType").and_then(Value::as_str) {
                    Some("file") => {
                        let canonical = Path::new(path).canonicalize().ok()?;
                        (canonical.is_file() && is_markdown_path(&canonical))
                            .then_some(Self::File(canonical))
                    }
                    Some("folder") => {
                        let canonical = Path::new(path).canonicalize().ok()?;
                        canonical.is_dir().then_some(Self::Folder(canonical))
                    }
                    _ => Self::from_path(Path::new(path)),
                }
            }
            _ => None,
        }
    }
}

/// Buffer for open requests that arrive before the core can act on them.
#[derive(Debug, Default)]
pub struct PendingOpen {
    queue: Mutex<VecDeque<OpenTarget>>,
}

impl PendingOpen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, target: OpenTarget) {
        self.queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(target);
    }

    /// Take the oldest buffered target, if any.
    pub fn consume(&self) -> Option<OpenTarget> {
        self.queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front()
    }
}

/// Receiving halves of the per-kind event channels, drained by the app in
/// delivery order.
pub struct EventChannels {
    pub file_changed: Receiver<FilePayload>,
    pub folder_changed: Receiver<FolderPayload>,
    pub open_requests: Receiver<OpenTarget>,
    pub options_updates: Receiver<StartupOptions>,
}

/// Sending halves, handed to the watch service and request sources.
#[derive(Clone)]
pub struct EventSenders {
    pub file_changed: Sender<FilePayload>,
    pub folder_changed: Sender<FolderPayload>,
    pub open_requests: Sender<OpenTarget>,
    pub options_updates: Sender<StartupOptions>,
}

/// Build the four channels connecting event sources to the dispatch loop.
pub fn event_channels() -> (EventSenders, EventChannels) {
    let (file_tx, file_rx) = mpsc::channel();
    let (folder_tx, folder_rx) = mpsc::channel();
    let (open_tx, open_rx) = mpsc::channel();
    let (options_tx, options_rx) = mpsc::channel();
    (
        EventSenders {
            file_changed: file_tx,
            folder_changed: folder_tx,
            open_requests: open_tx,
            options_updates: options_tx,
        },
        EventChannels {
            file_changed: file_rx,
            folder_changed: folder_rx,
            open_requests: open_rx,
            options_updates: options_rx,
        },
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_from_path_classifies_directories_and_files() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("doc.md");
        std::fs::write(&file, "hi").expect("write");

        assert!(matches!(
            OpenTarget::from_path(dir.path()),
            Some(OpenTarget::Folder(_))
        ));
        assert!(matches!(
            OpenTarget::from_path(&file),
            Some(OpenTarget::File(_))
        ));
    }

    #[test]
    fn test_from_path_ignores_non_markdown_and_missing() {
        let dir = tempdir().expect("tempdir");
        let binary = dir.path().join("app.exe");
        std::fs::write(&binary, "x").expect("write");

        assert_eq!(OpenTarget::from_path(&binary), None);
        assert_eq!(OpenTarget::from_path(&dir.path().join("absent.md")), None);
    }

    #[test]
    fn test_from_request_accepts_bare_string() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("doc.md");
        std::fs::write(&file, "hi").expect("write");

        let request = json!(file.to_string_lossy());
        assert!(matches!(
            OpenTarget::from_request(&request),
            Some(OpenTarget::File(_))
        ));
    }

    #[test]
    fn test_from_request_accepts_typed_object() {
        let dir = tempdir().expect("tempdir");
        let request = json!({
            "targetType": "folder",
            "path": dir.path().to_string_lossy(),
        });
        assert!(matches!(
            OpenTarget::from_request(&request),
            Some(OpenTarget::Folder(_))
        ));
    }

    #[test]
    fn test_from_request_rejects_mismatched_type() {
        let dir = tempdir().expect("tempdir");
        let request = json!({
            "targetType": "file",
            "path": dir.path().to_string_lossy(),
        });
        assert_eq!(OpenTarget::from_request(&request), None);
    }

    #[test]
    fn test_from_request_ignores_malformed_values() {
        assert_eq!(OpenTarget::from_request(&json!(42)), None);
        assert_eq!(OpenTarget::from_request(&json!({"path": 1})), None);
        assert_eq!(OpenTarget::from_request(&json!(null)), None);
    }

    #[test]
    fn test_pending_open_is_fifo() {
        let pending = PendingOpen::new();
        pending.push(OpenTarget::File(PathBuf::from("/a.md")));
        pending.push(OpenTarget::Folder(PathBuf::from("/docs")));

        assert_eq!(
            pending.consume(),
            Some(OpenTarget::File(PathBuf::from("/a.md")))
        );
        assert_eq!(
            pending.consume(),
            Some(OpenTarget::Folder(PathBuf::from("/docs")))
        );
        assert_eq!(pending.consume(), None);
    }
}
