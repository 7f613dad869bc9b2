//! Host integration: filesystem reads, native dialogs, editor launch, and
//! system theme detection.
//!
//! The core works against the [`DocumentProvider`] trait so tests can run
//! with an in-memory fake; [`DesktopProvider`] is the real implementation
//! backed by `rfd` dialogs and `std::fs`.

use std::fs;
use std::path::Path;
use std::process::Command;

use tracing::debug;
use url::Url;

use crate::error::ViewerError;
use crate::session::{FilePayload, FolderEntry, FolderPayload};

/// Extensions treated as markdown documents. Plain `.txt` renders fine as
/// CommonMark, so it is included.
pub const MARKDOWN_EXTENSIONS: [&str; 5] = ["md", "markdown", "mdown", "mkd", "txt"];

/// Whether the path's extension marks it as a viewable document.
pub fn is_markdown_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            MARKDOWN_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// A `file://` URL for the document's parent directory, used to resolve
/// relative links and images. `None` when the path has no usable parent.
fn directory_base_hint(path: &Path) -> Option<String> {
    let parent = path.parent()?;
    Url::from_directory_path(parent)
        .ok()
        .map(|url| url.to_string())
}

/// Read a document from disk into a payload.
///
/// The path is canonicalized so watch comparisons and listing membership
/// use one spelling. Non-markdown paths and non-UTF-8 content are errors;
/// both leave the current document mounted when they surface from a watch.
pub fn read_file_payload(path: &Path) -> Result<FilePayload, ViewerError> {
    let canonical = path
        .canonicalize()
        .map_err(|source| ViewerError::io(path, source))?;
    if !is_markdown_path(&canonical) {
        return Err(ViewerError::io(
            &canonical,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a markdown document"),
        ));
    }
    let bytes = fs::read(&canonical).map_err(|source| ViewerError::io(&canonical, source))?;
    let text = String::from_utf8(bytes)?;
    let name = canonical
        .file_name()
        .map_or_else(|| canonical.display().to_string(), |n| n.to_string_lossy().to_string());
    let base_hint = directory_base_hint(&canonical);
    Ok(FilePayload {
        path: Some(canonical),
        name,
        text,
        base_hint,
    })
}

/// List the markdown documents directly inside `path`, sorted by name
/// case-insensitively with an exact-name tiebreak for stable ordering.
pub fn read_folder_payload(path: &Path) -> Result<FolderPayload, ViewerError> {
    let canonical = path
        .canonicalize()
        .map_err(|source| ViewerError::io(path, source))?;
    let mut entries = Vec::new();
    for dir_entry in
        fs::read_dir(&canonical).map_err(|source| ViewerError::io(&canonical, source))?
    {
        let dir_entry = dir_entry.map_err(|source| ViewerError::io(&canonical, source))?;
        let entry_path = dir_entry.path();
        if !entry_path.is_file() || !is_markdown_path(&entry_path) {
            continue;
        }
        let Ok(entry_path) = entry_path.canonicalize() else {
            continue;
        };
        let name = dir_entry.file_name().to_string_lossy().to_string();
        entries.push(FolderEntry {
            name,
            path: entry_path,
        });
    }
    entries.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(FolderPayload {
        path: canonical,
        entries,
    })
}

/// Result of a folder pick: the listing plus, when the user pointed at a
/// file inside it, that file preselected.
#[derive(Debug)]
pub struct FolderPick {
    pub folder: FolderPayload,
    pub selected: Option<FilePayload>,
}

/// Dialog and filesystem access, injectable for tests.
pub trait DocumentProvider {
    /// Show a file picker. `None` means the user cancelled.
    fn pick_file(&mut self) -> Result<Option<FilePayload>, ViewerError>;
    /// Show a folder picker. `None` means the user cancelled.
    fn pick_folder(&mut self) -> Result<Option<FolderPick>, ViewerError>;
    fn read_file(&mut self, path: &Path) -> Result<FilePayload, ViewerError>;
    fn read_folder(&mut self, path: &Path) -> Result<FolderPayload, ViewerError>;
}

/// The production provider: native `rfd` dialogs over direct filesystem
/// reads.
#[derive(Debug, Default)]
pub struct DesktopProvider;

impl DocumentProvider for DesktopProvider {
    fn pick_file(&mut self) -> Result<Option<FilePayload>, ViewerError> {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Markdown", &MARKDOWN_EXTENSIONS)
            .pick_file()
        else {
            return Ok(None);
        };
        read_file_payload(&path).map(Some)
    }

    fn pick_folder(&mut self) -> Result<Option<FolderPick>, ViewerError> {
        let Some(path) = rfd::FileDialog::new().pick_folder() else {
            return Ok(None);
        };
        let folder = read_folder_payload(&path)?;
        Ok(Some(FolderPick {
            folder,
            selected: None,
        }))
    }

    fn read_file(&mut self, path: &Path) -> Result<FilePayload, ViewerError> {
        read_file_payload(path)
    }

    fn read_folder(&mut self, path: &Path) -> Result<FolderPayload, ViewerError> {
        read_folder_payload(path)
    }
}

/// Jump to `line` of `path` in an external editor.
///
/// Tries VS Code on the PATH first, then the macOS application bundle.
/// Line numbers are 1-based; 0 is tolerated and clamped.
pub fn open_in_external_editor(path: &Path, line: u32) -> Result<(), ViewerError> {
    let line = line.max(1);
    let target = format!("{}:{line}", path.display());

    let direct = Command::new("code").args(["-n", "-g", &target]).spawn();
    if let Ok(child) = direct {
        debug!("opened {target} with code on PATH (pid {})", child.id());
        return Ok(());
    }

    #[cfg(target_os = "macos")]
    {
        let bundled = Command::new("open")
            .args(["-a", "Visual Studio Code", "--args", "-n", "-g", &target])
            .spawn();
        if bundled.is_ok() {
            return Ok(());
        }
    }

    Err(ViewerError::Launch {
        path: path.to_path_buf(),
    })
}

/// The theme the desktop environment asks for, for the `auto` theme mode.
pub fn system_prefers_dark() -> bool {
    !matches!(dark_light::detect(), Ok(dark_light::Mode::Light))
}
