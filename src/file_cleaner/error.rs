use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Hard failures: broken call contracts, bad construction input, catalog I/O.
///
/// Per-item problems during a scan or clean never surface here; they are
/// recorded in the aggregate result with a [`CleanErrorKind`] tag.
#[derive(Debug, Error)]
pub enum CleanerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Protected path must be absolute: {}", .0.display())]
    RelativeProtectedPath(PathBuf),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CleanerError>;

/// Why a single item was rejected or could not be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanErrorKind {
    NotFound,
    PermissionDenied,
    ElevationFailed,
    ProtectedPath,
    TraversalDetected,
    /// The directory walk itself failed, as opposed to a single file.
    Traversal,
    Io,
}

impl CleanErrorKind {
    pub(crate) fn from_io(err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => CleanErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => CleanErrorKind::PermissionDenied,
            _ => CleanErrorKind::Io,
        }
    }
}
