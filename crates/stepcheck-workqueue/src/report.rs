//! Final run report.

use std::collections::HashSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use stepcheck_protocols::{ComponentId, EvaluationResult};
use uuid::Uuid;

/// Outcome of one module run. Persisted as the results file and read back
/// as the passed-set of the next run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub module_id: String,
    #[serde(default)]
    pub run_id: Uuid,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub total_components: usize,
    /// Components evaluated in this run (passed + failed, excluding skipped).
    #[serde(default)]
    pub evaluated: usize,
    #[serde(default)]
    pub passed: usize,
    #[serde(default)]
    pub failed: usize,
    /// Components carried over from the previous run's passed-set.
    #[serde(default)]
    pub skipped: usize,
    #[serde(default)]
    pub all_passed: bool,
    #[serde(default)]
    pub passed_components: Vec<EvaluationResult>,
    #[serde(default)]
    pub failed_components: Vec<EvaluationResult>,
}

impl EvaluationReport {
    /// Build a report. `carried` are previously passed results skipped in
    /// this run; they stay in `passed_components` so the passed-set persists.
    pub fn new(
        module_id: impl Into<String>,
        total_components: usize,
        carried: Vec<EvaluationResult>,
        passed: Vec<EvaluationResult>,
        failed: Vec<EvaluationResult>,
    ) -> Self {
        let skipped = carried.len();
        let evaluated = passed.len() + failed.len();
        let mut passed_components = carried;
        passed_components.extend(passed);
        let all_passed = failed.is_empty() && !passed_components.is_empty();

        Self {
            module_id: module_id.into(),
            run_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            total_components,
            evaluated,
            passed: passed_components.len(),
            failed: failed.len(),
            skipped,
            all_passed,
            passed_components,
            failed_components: failed,
        }
    }

    /// Identities that never need evaluating again.
    pub fn passed_ids(&self) -> HashSet<ComponentId> {
        self.passed_components
            .iter()
            .filter(|r| r.passed)
            .map(|r| r.id())
            .collect()
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Module: {}", self.module_id);
        let _ = writeln!(out, "Total Components: {}", self.total_components);
        let _ = writeln!(out, "Evaluated: {}", self.evaluated);
        let _ = writeln!(out, "Passed: {}", self.passed);
        let _ = writeln!(out, "Failed: {}", self.failed);
        if self.skipped > 0 {
            let _ = writeln!(out, "Skipped (already passed): {}", self.skipped);
        }
        let _ = writeln!(
            out,
            "Status: {}",
            if self.all_passed { "ALL PASSED" } else { "SOME FAILED" }
        );

        if !self.failed_components.is_empty() {
            let _ = writeln!(out, "\nFailed components:");
            for result in &self.failed_components {
                let _ = writeln!(out, "  - {}: {}/100", result.id(), result.score);
            }
        }
        out
    }
}
