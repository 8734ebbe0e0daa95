//! Queue errors.

use std::path::PathBuf;

use stepcheck_evaluator::ManifestError;
use thiserror::Error;

/// Queue error types.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Manifest could not be read.
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Component source file does not exist.
    #[error("Component source not found: {}", .0.display())]
    SourceMissing(PathBuf),

    /// Backup or overwrite of a component source failed.
    #[error("Source error: {0}")]
    Source(String),

    /// Result persistence failed.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
