// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. session::SessionOutcome)
    clippy::module_name_repetitions
)]

//! # Markpane
//!
//! A read-only desktop markdown viewer with live reload.
//!
//! Markpane keeps what is on screen synchronized with what is on disk:
//! - Single-file and folder browsing modes
//! - File and folder watching with automatic re-render
//! - Sanitized HTML output with source-line annotations
//! - Scroll position preserved across reloads
//! - Jump from viewport position to the source line in an editor
//!
//! ## Architecture
//!
//! A single [`app::App`] coordinator owns the mutable state. All mutation
//! flows through named transitions on the [`session::DocumentSession`];
//! each transition yields an outcome the coordinator executes against the
//! [`render::Surface`], then one reconciliation pass aligns the watch
//! slots with the new state.
//!
//! ## Modules
//!
//! - [`app`]: Coordinator and event dispatch
//! - [`session`]: The document session state machine
//! - [`render`]: Markdown conversion, sanitization, the mounted surface
//! - [`geometry`]: Scroll ratios and viewport-to-source-line mapping
//! - [`sync`]: Watch reconciliation
//! - [`watch`]: notify-backed watch service
//! - [`bridge`]: Filesystem, dialogs, editor launch, theme detection
//! - [`events`]: External open requests and event channels

pub mod app;
pub mod bridge;
pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod render;
pub mod session;
pub mod sync;
pub mod watch;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::App;
    pub use crate::events::{OpenTarget, PendingOpen};
    pub use crate::render::Surface;
    pub use crate::session::DocumentSession;
}
