//! Error taxonomy for collaborator calls.
//!
//! Errors triggered by explicit user actions surface as a transient notice;
//! errors from background work (watch reconciliation, change re-reads) are
//! logged and degrade gracefully.

use std::path::PathBuf;

use thiserror::Error;

/// Failures the viewer core can observe from its collaborators.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// A file or folder was unreadable or vanished.
    #[error("failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No compatible external editor could be launched.
    #[error("no compatible editor found to open '{path}'")]
    Launch { path: PathBuf },

    /// File content was not decodable as text.
    #[error("content is not valid UTF-8 text")]
    Decode(#[from] std::string::FromUtf8Error),

    /// The markdown converter failed; nothing was mounted.
    #[error("markdown conversion failed: {0}")]
    Convert(String),
}

impl ViewerError {
    /// Wrap an I/O failure with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
