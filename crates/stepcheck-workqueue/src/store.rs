//! Result persistence store.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use stepcheck_config::PathsConfig;
use stepcheck_evaluator::ModuleLayout;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::QueueError;
use crate::report::EvaluationReport;

/// Result store trait for persistence.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Load the last report for a module.
    async fn load_report(&self, module_id: &str) -> Result<Option<EvaluationReport>, QueueError>;

    /// Save a report, replacing the previous one.
    async fn save_report(&self, report: &EvaluationReport) -> Result<(), QueueError>;

    /// Forget a module's results. Returns whether anything was removed.
    async fn clear(&self, module_id: &str) -> Result<bool, QueueError>;
}

/// In-memory result store for testing.
pub struct MemoryResultStore {
    reports: RwLock<HashMap<String, EvaluationReport>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self {
            reports: RwLock::new(HashMap::new()),
        }
    }

    /// Store preloaded with a previous run.
    pub fn with_report(report: EvaluationReport) -> Self {
        let mut reports = HashMap::new();
        reports.insert(report.module_id.clone(), report);
        Self {
            reports: RwLock::new(reports),
        }
    }
}

impl Default for MemoryResultStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn load_report(&self, module_id: &str) -> Result<Option<EvaluationReport>, QueueError> {
        Ok(self.reports.read().await.get(module_id).cloned())
    }

    async fn save_report(&self, report: &EvaluationReport) -> Result<(), QueueError> {
        self.reports
            .write()
            .await
            .insert(report.module_id.clone(), report.clone());
        Ok(())
    }

    async fn clear(&self, module_id: &str) -> Result<bool, QueueError> {
        Ok(self.reports.write().await.remove(module_id).is_some())
    }
}

/// File system based result store.
///
/// ```text
/// {results_dir}/
/// └── {module}_queue/
///     ├── evaluation_results.json
///     └── q{N}_step_{M}/        (evidence, written by the evaluator)
/// ```
pub struct FileResultStore {
    paths: PathsConfig,
}

impl FileResultStore {
    pub fn new(paths: PathsConfig) -> Self {
        Self { paths }
    }

    fn results_file(&self, module_id: &str) -> PathBuf {
        ModuleLayout::new(module_id, &self.paths).results_file()
    }
}

#[async_trait]
impl ResultStore for FileResultStore {
    async fn load_report(&self, module_id: &str) -> Result<Option<EvaluationReport>, QueueError> {
        let path = self.results_file(module_id);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(QueueError::Store(format!("Failed to read {}: {}", path.display(), e))),
        };
        let report = serde_json::from_str(&content)?;
        debug!(path = %path.display(), "Loaded previous results");
        Ok(Some(report))
    }

    async fn save_report(&self, report: &EvaluationReport) -> Result<(), QueueError> {
        let path = self.results_file(&report.module_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                QueueError::Store(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let content = serde_json::to_string_pretty(report)?;
        fs::write(&path, content)
            .await
            .map_err(|e| QueueError::Store(format!("Failed to write results file: {}", e)))?;

        debug!(path = %path.display(), "Saved results");
        Ok(())
    }

    async fn clear(&self, module_id: &str) -> Result<bool, QueueError> {
        let path = self.results_file(module_id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(QueueError::Store(format!("Failed to remove {}: {}", path.display(), e))),
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
