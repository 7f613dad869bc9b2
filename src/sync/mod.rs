//! Watch reconciliation: derive the desired watch set from the session.
//!
//! Nothing in the app starts or stops a watch directly. After any
//! transition that can affect what should be watched, the app calls
//! [`reconcile`] once, which compares the session state against the two
//! watch slots and issues exactly one start-or-stop per slot. Because the
//! desired state is a pure function of the session, reconciling twice in a
//! row is a no-op.

use std::path::Path;

use tracing::warn;

use crate::session::{DocumentSession, OpenMode};

/// The two independently managed watch slots.
pub trait WatchService {
    /// Begin (or move) the single-file watch. Idempotent for an unchanged
    /// path.
    fn start_file_watch(&mut self, path: &Path) -> anyhow::Result<()>;
    fn stop_file_watch(&mut self);
    /// Begin (or move) the folder-listing watch. Idempotent for an
    /// unchanged path.
    fn start_folder_watch(&mut self, path: &Path) -> anyhow::Result<()>;
    fn stop_folder_watch(&mut self);
}

/// Align both watch slots with the session.
///
/// The file slot is active exactly when auto-refresh is on and a document
/// with an on-disk path is open. The folder slot is active exactly when the
/// session is in folder mode with an active folder, regardless of
/// auto-refresh. A failed start leaves the viewer readable, so it is
/// logged and otherwise ignored.
pub fn reconcile(session: &DocumentSession, service: &mut dyn WatchService) {
    match session.active_file() {
        Some(path) if session.auto_refresh() => {
            if let Err(err) = service.start_file_watch(path) {
                warn!("failed to watch file {}: {err:#}", path.display());
            }
        }
        _ => service.stop_file_watch(),
    }

    match session.active_folder() {
        Some(path) if session.mode() == OpenMode::Folder => {
            if let Err(err) = service.start_folder_watch(path) {
                warn!("failed to watch folder {}: {err:#}", path.display());
            }
        }
        _ => service.stop_folder_watch(),
    }
}
