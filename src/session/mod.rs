//! The document session: what is currently open and how.
//!
//! A single [`DocumentSession`] instance lives for the whole application.
//! All mutation goes through the named transition operations; event
//! handlers never write fields directly. Transitions return a
//! [`SessionOutcome`] describing the visual effect, which the app layer
//! executes through the render pipeline.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::render::Placeholder;

/// Which kind of target is open. Governs watch selection and which UI
/// affordances are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    SingleFile,
    Folder,
}

/// A readable document delivered by a collaborator (dialog, read, or watch).
///
/// `path` is `None` for in-memory content with no on-disk identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub name: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_hint: Option<String>,
}

/// One entry of a folder listing, in the order the collaborator returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderEntry {
    pub name: String,
    pub path: PathBuf,
}

/// A folder listing delivered by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderPayload {
    pub path: PathBuf,
    pub entries: Vec<FolderEntry>,
}

/// Visual effect of a session transition, executed by the app layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Render this document text into the surface.
    Render {
        text: String,
        base_hint: Option<String>,
    },
    /// Replace the surface with a placeholder message.
    Placeholder(Placeholder),
    /// Keep whatever is currently mounted.
    Unchanged,
}

/// The single mutable session state, owned by the core for the process
/// lifetime.
#[derive(Debug)]
pub struct DocumentSession {
    mode: OpenMode,
    active_file: Option<PathBuf>,
    active_folder: Option<PathBuf>,
    folder_entries: Vec<FolderEntry>,
    auto_refresh: bool,
}

impl Default for DocumentSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentSession {
    /// Initial state: single-file mode, nothing open, auto-refresh on.
    pub const fn new() -> Self {
        Self {
            mode: OpenMode::SingleFile,
            active_file: None,
            active_folder: None,
            folder_entries: Vec::new(),
            auto_refresh: true,
        }
    }

    pub const fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn active_file(&self) -> Option<&Path> {
        self.active_file.as_deref()
    }

    pub fn active_folder(&self) -> Option<&Path> {
        self.active_folder.as_deref()
    }

    pub fn folder_entries(&self) -> &[FolderEntry] {
        &self.folder_entries
    }

    pub const fn auto_refresh(&self) -> bool {
        self.auto_refresh
    }

    pub const fn set_auto_refresh(&mut self, enabled: bool) {
        self.auto_refresh = enabled;
    }

    /// The editor-jump affordance is available only with an on-disk file.
    pub const fn can_open_in_editor(&self) -> bool {
        self.active_file.is_some()
    }

    /// Whether `path` appears in the current folder listing.
    pub fn is_listed(&self, path: &Path) -> bool {
        self.folder_entries.iter().any(|entry| entry.path == path)
    }

    /// Leave folder mode: clear folder path and entries.
    pub fn enter_single_file_mode(&mut self) {
        self.mode = OpenMode::SingleFile;
        self.active_folder = None;
        self.folder_entries.clear();
    }

    /// Display a single document. The payload's path may be `None` for an
    /// in-memory file; the mode is left untouched so a selection inside a
    /// folder stays a folder selection.
    pub fn load_single_file(&mut self, payload: FilePayload) -> SessionOutcome {
        self.active_file = payload.path;
        SessionOutcome::Render {
            text: payload.text,
            base_hint: payload.base_hint,
        }
    }

    /// Switch to folder mode with a fresh listing.
    ///
    /// A previously active file that is still listed stays selected and
    /// mounted; otherwise the selection clears and a placeholder is shown,
    /// distinguishing an empty folder from an unselected one.
    pub fn enter_folder_mode(&mut self, payload: FolderPayload) -> SessionOutcome {
        self.mode = OpenMode::Folder;
        self.active_folder = Some(payload.path);
        self.folder_entries = payload.entries;
        self.resolve_selection(true)
    }

    /// Record the selection of a listed entry whose content the caller has
    /// already read. Callers check `is_listed` and folder mode first.
    pub fn select_folder_entry(&mut self, payload: FilePayload) -> SessionOutcome {
        self.active_file = payload.path.clone();
        SessionOutcome::Render {
            text: payload.text,
            base_hint: payload.base_hint,
        }
    }

    /// Replace the folder listing after an on-disk change.
    ///
    /// With `preserve_selection`, a still-listed active file keeps its
    /// rendered content; anything else falls back to a placeholder and
    /// clears the selection.
    pub fn reconcile_folder_listing(
        &mut self,
        payload: FolderPayload,
        preserve_selection: bool,
    ) -> SessionOutcome {
        self.folder_entries = payload.entries;
        self.resolve_selection(preserve_selection)
    }

    fn resolve_selection(&mut self, preserve_selection: bool) -> SessionOutcome {
        if self.folder_entries.is_empty() {
            self.active_file = None;
            return SessionOutcome::Placeholder(Placeholder::EmptyFolder);
        }
        let kept = preserve_selection
            && self
                .active_file
                .as_deref()
                .is_some_and(|active| self.is_listed(active));
        if kept {
            SessionOutcome::Unchanged
        } else {
            self.active_file = None;
            SessionOutcome::Placeholder(Placeholder::SelectFile)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str) -> FolderEntry {
        FolderEntry {
            name: Path::new(path)
                .file_name()
                .unwrap()
                .to_string_lossy()
                .to_string(),
            path: PathBuf::from(path),
        }
    }

    fn file_payload(path: &str, text: &str) -> FilePayload {
        FilePayload {
            path: Some(PathBuf::from(path)),
            name: Path::new(path)
                .file_name()
                .unwrap()
                .to_string_lossy()
                .to_string(),
            text: text.to_string(),
            base_hint: None,
        }
    }

    #[test]
    fn test_new_session_starts_single_file_with_auto_refresh() {
        let session = DocumentSession::new();
        assert_eq!(session.mode(), OpenMode::SingleFile);
        assert!(session.active_file().is_none());
        assert!(session.active_folder().is_none());
        assert!(session.folder_entries().is_empty());
        assert!(session.auto_refresh());
    }

    #[test]
    fn test_load_single_file_sets_active_path_and_renders() {
        let mut session = DocumentSession::new();
        let outcome = session.load_single_file(file_payload("/docs/a.md", "# A"));
        assert_eq!(session.active_file(), Some(Path::new("/docs/a.md")));
        assert!(matches!(outcome, SessionOutcome::Render { text, .. } if text == "# A"));
    }

    #[test]
    fn test_load_in_memory_file_leaves_no_active_path() {
        let mut session = DocumentSession::new();
        session.load_single_file(FilePayload {
            path: None,
            name: "dropped.md".to_string(),
            text: "hi".to_string(),
            base_hint: None,
        });
        assert!(session.active_file().is_none());
        assert!(!session.can_open_in_editor());
    }

    #[test]
    fn test_enter_single_file_mode_clears_folder_state() {
        let mut session = DocumentSession::new();
        session.enter_folder_mode(FolderPayload {
            path: PathBuf::from("/docs"),
            entries: vec![entry("/docs/a.md")],
        });
        session.enter_single_file_mode();
        assert_eq!(session.mode(), OpenMode::SingleFile);
        assert!(session.active_folder().is_none());
        assert!(session.folder_entries().is_empty());
    }

    #[test]
    fn test_enter_folder_mode_without_selection_shows_select_placeholder() {
        let mut session = DocumentSession::new();
        let outcome = session.enter_folder_mode(FolderPayload {
            path: PathBuf::from("/docs"),
            entries: vec![entry("/docs/a.md"), entry("/docs/b.md")],
        });
        assert_eq!(session.mode(), OpenMode::Folder);
        assert_eq!(session.active_folder(), Some(Path::new("/docs")));
        assert!(session.active_file().is_none());
        assert_eq!(
            outcome,
            SessionOutcome::Placeholder(Placeholder::SelectFile)
        );
    }

    #[test]
    fn test_enter_folder_mode_keeps_still_listed_active_file() {
        let mut session = DocumentSession::new();
        session.load_single_file(file_payload("/docs/a.md", "# A"));
        let outcome = session.enter_folder_mode(FolderPayload {
            path: PathBuf::from("/docs"),
            entries: vec![entry("/docs/a.md"), entry("/docs/b.md")],
        });
        assert_eq!(session.active_file(), Some(Path::new("/docs/a.md")));
        assert_eq!(outcome, SessionOutcome::Unchanged);
    }

    #[test]
    fn test_enter_empty_folder_shows_empty_placeholder() {
        let mut session = DocumentSession::new();
        session.load_single_file(file_payload("/docs/a.md", "# A"));
        let outcome = session.enter_folder_mode(FolderPayload {
            path: PathBuf::from("/docs"),
            entries: Vec::new(),
        });
        assert!(session.active_file().is_none());
        assert!(!session.can_open_in_editor());
        assert_eq!(
            outcome,
            SessionOutcome::Placeholder(Placeholder::EmptyFolder)
        );
    }

    #[test]
    fn test_select_folder_entry_updates_selection() {
        let mut session = DocumentSession::new();
        session.enter_folder_mode(FolderPayload {
            path: PathBuf::from("/docs"),
            entries: vec![entry("/docs/a.md")],
        });
        assert!(session.is_listed(Path::new("/docs/a.md")));
        let outcome = session.select_folder_entry(file_payload("/docs/a.md", "# A"));
        assert_eq!(session.active_file(), Some(Path::new("/docs/a.md")));
        assert!(matches!(outcome, SessionOutcome::Render { .. }));
    }

    #[test]
    fn test_reconcile_preserves_selection_when_still_listed() {
        let mut session = DocumentSession::new();
        session.enter_folder_mode(FolderPayload {
            path: PathBuf::from("/docs"),
            entries: vec![entry("/docs/a.md")],
        });
        session.select_folder_entry(file_payload("/docs/a.md", "# A"));

        let outcome = session.reconcile_folder_listing(
            FolderPayload {
                path: PathBuf::from("/docs"),
                entries: vec![entry("/docs/a.md"), entry("/docs/new.md")],
            },
            true,
        );
        assert_eq!(outcome, SessionOutcome::Unchanged);
        assert_eq!(session.active_file(), Some(Path::new("/docs/a.md")));
        assert_eq!(session.folder_entries().len(), 2);
    }

    #[test]
    fn test_reconcile_clears_vanished_selection() {
        let mut session = DocumentSession::new();
        session.enter_folder_mode(FolderPayload {
            path: PathBuf::from("/docs"),
            entries: vec![entry("/docs/a.md")],
        });
        session.select_folder_entry(file_payload("/docs/a.md", "# A"));

        let outcome = session.reconcile_folder_listing(
            FolderPayload {
                path: PathBuf::from("/docs"),
                entries: vec![entry("/docs/other.md")],
            },
            true,
        );
        assert_eq!(
            outcome,
            SessionOutcome::Placeholder(Placeholder::SelectFile)
        );
        assert!(session.active_file().is_none());
    }

    #[test]
    fn test_reconcile_to_empty_listing_shows_empty_placeholder() {
        let mut session = DocumentSession::new();
        session.enter_folder_mode(FolderPayload {
            path: PathBuf::from("/docs"),
            entries: vec![entry("/docs/a.md")],
        });
        session.select_folder_entry(file_payload("/docs/a.md", "# A"));

        let outcome = session.reconcile_folder_listing(
            FolderPayload {
                path: PathBuf::from("/docs"),
                entries: Vec::new(),
            },
            true,
        );
        assert_eq!(
            outcome,
            SessionOutcome::Placeholder(Placeholder::EmptyFolder)
        );
        assert!(session.active_file().is_none());
        assert!(!session.can_open_in_editor());
    }

    #[test]
    fn test_entry_order_is_preserved_as_delivered() {
        let mut session = DocumentSession::new();
        session.enter_folder_mode(FolderPayload {
            path: PathBuf::from("/docs"),
            entries: vec![entry("/docs/z.md"), entry("/docs/a.md")],
        });
        let names: Vec<_> = session
            .folder_entries()
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["z.md", "a.md"]);
    }
}
