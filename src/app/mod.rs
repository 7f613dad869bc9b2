//! The application core: one coordinator over the session, the render
//! surface, and the watch slots.
//!
//! Every user action and every external event funnels through a method
//! here. Each method runs a session transition, executes its outcome on
//! the surface, and ends with one watch reconciliation pass where the
//! desired watch set may have moved.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::bridge::{self, DocumentProvider};
use crate::config::{StartupOptions, Theme, ThemeMode};
use crate::events::{EventChannels, OpenTarget, PendingOpen};
use crate::geometry::BlockGeometry;
use crate::render::Surface;
use crate::session::{DocumentSession, FilePayload, FolderPayload, OpenMode, SessionOutcome};
use crate::sync::{self, WatchService};

/// Severity of a transient user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A transient message shown to the user without replacing the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// The application core, generic over its host integrations so tests run
/// with fakes.
pub struct App<P, W> {
    session: DocumentSession,
    surface: Surface,
    provider: P,
    watches: W,
    theme: Theme,
    theme_mode: ThemeMode,
    nav_open: bool,
    notice: Option<Notice>,
}

impl<P: DocumentProvider, W: WatchService> App<P, W> {
    pub fn new(provider: P, watches: W) -> Self {
        Self {
            session: DocumentSession::new(),
            surface: Surface::new(),
            provider,
            watches,
            theme: Theme::Dark,
            theme_mode: ThemeMode::Auto,
            nav_open: false,
            notice: None,
        }
    }

    pub const fn session(&self) -> &DocumentSession {
        &self.session
    }

    pub const fn surface(&self) -> &Surface {
        &self.surface
    }

    pub const fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    pub const fn theme(&self) -> Theme {
        self.theme
    }

    pub const fn theme_mode(&self) -> ThemeMode {
        self.theme_mode
    }

    pub const fn nav_open(&self) -> bool {
        self.nav_open
    }

    /// The latest notice, cleared on read.
    pub const fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Info => info!("{message}"),
            NoticeLevel::Error => warn!("{message}"),
        }
        self.notice = Some(Notice { level, message });
    }

    /// Execute a transition outcome on the surface. Conversion failures
    /// surface as a notice; the previous document stays mounted.
    fn apply_outcome(&mut self, outcome: SessionOutcome) {
        match outcome {
            SessionOutcome::Render { text, base_hint } => {
                match crate::render::render_markdown(&text) {
                    Ok(output) => self.surface.mount(output, base_hint.as_deref()),
                    Err(err) => self.notify(NoticeLevel::Error, err.to_string()),
                }
            }
            SessionOutcome::Placeholder(placeholder) => {
                self.surface.mount_placeholder(placeholder);
            }
            SessionOutcome::Unchanged => {}
        }
    }

    fn reconcile_watches(&mut self) {
        sync::reconcile(&self.session, &mut self.watches);
    }

    /// Startup: apply options in one step, act on the oldest buffered open
    /// request, then bring the watch slots up in a single pass.
    pub fn startup(&mut self, options: StartupOptions, pending: &PendingOpen) {
        self.apply_startup_options(options, false);
        if let Some(target) = pending.consume() {
            self.open_target(&target);
        }
        self.reconcile_watches();
    }

    /// Apply presentation options as one step. `reconcile` is off during
    /// startup, where a single pass runs after the initial open instead.
    pub fn apply_startup_options(&mut self, options: StartupOptions, reconcile: bool) {
        if let Some(mode) = options.theme {
            self.theme_mode = mode;
            self.theme = mode.resolve();
        }
        if let Some(open) = options.nav_open {
            self.nav_open = open;
        }
        if let Some(enabled) = options.auto_refresh {
            self.session.set_auto_refresh(enabled);
        }
        if reconcile {
            self.reconcile_watches();
        }
    }

    /// Show the file picker and open the chosen document in single-file
    /// mode. Cancellation changes nothing.
    pub fn open_file_dialog(&mut self) {
        match self.provider.pick_file() {
            Ok(Some(payload)) => {
                self.session.enter_single_file_mode();
                let outcome = self.session.load_single_file(payload);
                self.apply_outcome(outcome);
                self.reconcile_watches();
            }
            Ok(None) => debug!("file dialog cancelled"),
            Err(err) => self.notify(NoticeLevel::Error, err.to_string()),
        }
    }

    /// Show the folder picker and enter folder mode on the chosen
    /// directory. Cancellation changes nothing.
    pub fn open_folder_dialog(&mut self) {
        match self.provider.pick_folder() {
            Ok(Some(pick)) => {
                let outcome = self.session.enter_folder_mode(pick.folder);
                self.apply_outcome(outcome);
                if let Some(selected) = pick.selected {
                    let outcome = self.session.select_folder_entry(selected);
                    self.apply_outcome(outcome);
                }
                self.reconcile_watches();
            }
            Ok(None) => debug!("folder dialog cancelled"),
            Err(err) => self.notify(NoticeLevel::Error, err.to_string()),
        }
    }

    /// Open a classified external target.
    pub fn open_target(&mut self, target: &OpenTarget) {
        match target {
            OpenTarget::File(path) => match self.provider.read_file(path) {
                Ok(payload) => {
                    self.session.enter_single_file_mode();
                    let outcome = self.session.load_single_file(payload);
                    self.apply_outcome(outcome);
                    self.reconcile_watches();
                }
                Err(err) => self.notify(NoticeLevel::Error, err.to_string()),
            },
            OpenTarget::Folder(path) => match self.provider.read_folder(path) {
                Ok(payload) => {
                    let outcome = self.session.enter_folder_mode(payload);
                    self.apply_outcome(outcome);
                    self.reconcile_watches();
                }
                Err(err) => self.notify(NoticeLevel::Error, err.to_string()),
            },
        }
    }

    /// Select one entry of the current folder listing. Requests for paths
    /// outside the listing (a stale click against a fresh listing) are
    /// dropped.
    pub fn select_entry(&mut self, path: &Path) {
        if self.session.mode() != OpenMode::Folder || !self.session.is_listed(path) {
            debug!("ignoring selection outside listing: {}", path.display());
            return;
        }
        match self.provider.read_file(path) {
            Ok(payload) => {
                let outcome = self.session.select_folder_entry(payload);
                self.apply_outcome(outcome);
                self.reconcile_watches();
            }
            Err(err) => self.notify(NoticeLevel::Error, err.to_string()),
        }
    }

    /// Flip auto-refresh and realign the file watch slot.
    pub fn toggle_auto_refresh(&mut self) -> bool {
        let enabled = !self.session.auto_refresh();
        self.session.set_auto_refresh(enabled);
        self.reconcile_watches();
        enabled
    }

    /// A watched file delivered fresh content. Payloads for anything other
    /// than the currently active file are stale and dropped. The scroll
    /// ratio is captured before remounting so the view position survives
    /// the refresh. The watch set cannot have moved, so no reconciliation.
    pub fn handle_file_changed(&mut self, payload: FilePayload) {
        let matches_active = payload
            .path
            .as_deref()
            .is_some_and(|path| self.session.active_file() == Some(path));
        if !matches_active {
            debug!("dropping change event for inactive file");
            return;
        }
        self.surface.remember_scroll_ratio();
        let outcome = self.session.load_single_file(payload);
        self.apply_outcome(outcome);
    }

    /// A watched folder's listing changed on disk. The selection is
    /// preserved when still listed; a vanished selection clears, which can
    /// retire the file watch, so this ends with a reconciliation pass.
    pub fn handle_folder_changed(&mut self, payload: FolderPayload) {
        let matches_active = self.session.mode() == OpenMode::Folder
            && self.session.active_folder() == Some(payload.path.as_path());
        if !matches_active {
            debug!("dropping listing event for inactive folder");
            return;
        }
        let outcome = self.session.reconcile_folder_listing(payload, true);
        self.apply_outcome(outcome);
        self.reconcile_watches();
    }

    /// Drain every queued event, each kind in its delivery order.
    pub fn drain_events(&mut self, channels: &EventChannels) {
        while let Ok(options) = channels.options_updates.try_recv() {
            self.apply_startup_options(options, true);
        }
        while let Ok(target) = channels.open_requests.try_recv() {
            self.open_target(&target);
        }
        while let Ok(payload) = channels.folder_changed.try_recv() {
            self.handle_folder_changed(payload);
        }
        while let Ok(payload) = channels.file_changed.try_recv() {
            self.handle_file_changed(payload);
        }
    }

    /// Jump to the source line at the top of the viewport in an external
    /// editor. `geometry` is the on-screen block layout, `threshold` the
    /// current scroll position.
    pub fn open_active_in_editor(&mut self, geometry: &[BlockGeometry], threshold: f64) {
        let Some(path) = self.session.active_file().map(Path::to_path_buf) else {
            self.notify(NoticeLevel::Info, "no file open to edit");
            return;
        };
        let line = crate::geometry::resolve_source_line(geometry, threshold);
        match bridge::open_in_external_editor(&path, line) {
            Ok(()) => self.notify(
                NoticeLevel::Info,
                format!("opened {}:{line} in editor", path.display()),
            ),
            Err(err) => self.notify(NoticeLevel::Error, err.to_string()),
        }
    }
}
