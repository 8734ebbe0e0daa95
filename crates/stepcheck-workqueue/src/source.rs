//! Component source persistence.
//!
//! Fixes are applied as backup, then overwrite. If the overwrite fails the
//! backup is copied back, so a component is never left half-written.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::QueueError;

/// What happened when a fix was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// New source is in place; the previous one is at `backup`.
    Applied { backup: PathBuf },
    /// The write failed and the original was restored from `backup`.
    Restored { backup: PathBuf, error: String },
}

/// Read and replace persisted component sources.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Current source, or `None` if the file does not exist.
    async fn read(&self, path: &Path) -> Result<Option<String>, QueueError>;

    /// Replace the source at `path`, keeping a timestamped backup.
    async fn apply_fix(&self, path: &Path, source: &str) -> Result<ApplyOutcome, QueueError>;
}

/// Source store over the module's components directory.
pub struct FileSourceStore {
    /// Backups kept per component (0 = keep all).
    backup_retention: usize,
}

impl FileSourceStore {
    pub fn new(backup_retention: usize) -> Self {
        Self { backup_retention }
    }
}

#[async_trait]
impl SourceStore for FileSourceStore {
    async fn read(&self, path: &Path) -> Result<Option<String>, QueueError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn apply_fix(&self, path: &Path, source: &str) -> Result<ApplyOutcome, QueueError> {
        let path = path.to_path_buf();
        let source = source.to_string();
        let retention = self.backup_retention;

        tokio::task::spawn_blocking(move || {
            apply_with_backup(&path, &source, retention, |p, s| std::fs::write(p, s))
        })
        .await
        .map_err(|e| QueueError::Source(format!("Fix write task failed: {}", e)))?
    }
}

/// `{file}.backup-{unix_ts}` next to the source. The timestamp is kept
/// strictly above any existing backup so ordering survives fast rewrites.
fn backup_path(path: &Path) -> Result<PathBuf, QueueError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| QueueError::Source(format!("Not a file path: {}", path.display())))?
        .to_string_lossy()
        .into_owned();

    let now = chrono::Utc::now().timestamp();
    let ts = match backups_by_age(path).first() {
        Some((newest, _)) => now.max(newest + 1),
        None => now,
    };
    Ok(path.with_file_name(format!("{}.backup-{}", file_name, ts)))
}

/// Backup, overwrite, and restore on a failed write.
pub(crate) fn apply_with_backup<W>(
    path: &Path,
    source: &str,
    retention: usize,
    write: W,
) -> Result<ApplyOutcome, QueueError>
where
    W: FnOnce(&Path, &str) -> std::io::Result<()>,
{
    if !path.exists() {
        return Err(QueueError::SourceMissing(path.to_path_buf()));
    }

    let backup = backup_path(path)?;
    std::fs::copy(path, &backup)
        .map_err(|e| QueueError::Source(format!("Could not back up {}: {}", path.display(), e)))?;
    debug!(backup = %backup.display(), "Backed up component source");

    let written = std::fs::remove_file(path).and_then(|_| write(path, source));
    match written {
        Ok(()) => {
            info!(path = %path.display(), bytes = source.len(), "Replaced component source");
            prune_backups(path, retention);
            Ok(ApplyOutcome::Applied { backup })
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to write fixed source, restoring backup");
            std::fs::copy(&backup, path).map_err(|restore_err| {
                QueueError::Source(format!(
                    "Write failed ({}) and restore from {} failed: {}",
                    e,
                    backup.display(),
                    restore_err
                ))
            })?;
            Ok(ApplyOutcome::Restored {
                backup,
                error: e.to_string(),
            })
        }
    }
}

/// Existing backups of `path` with their timestamps, newest first.
fn backups_by_age(path: &Path) -> Vec<(i64, PathBuf)> {
    let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
        return Vec::new();
    };
    let prefix = format!("{}.backup-", name.to_string_lossy());

    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut backups: Vec<(i64, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let ts = file_name.strip_prefix(&prefix)?.parse::<i64>().ok()?;
            Some((ts, entry.path()))
        })
        .collect();
    backups.sort_by(|a, b| b.0.cmp(&a.0));
    backups
}

/// Existing backups of `path`, newest first.
pub(crate) fn list_backups(path: &Path) -> Vec<PathBuf> {
    backups_by_age(path).into_iter().map(|(_, p)| p).collect()
}

fn prune_backups(path: &Path, retention: usize) {
    if retention == 0 {
        return;
    }
    for stale in list_backups(path).into_iter().skip(retention) {
        match std::fs::remove_file(&stale) {
            Ok(()) => debug!(backup = %stale.display(), "Pruned old backup"),
            Err(e) => warn!(backup = %stale.display(), error = %e, "Could not prune backup"),
        }
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
