//! Component task definition and status.

use serde::{Deserialize, Serialize};
use stepcheck_protocols::{ComponentId, ComponentKind};

/// Task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Waiting in queue.
    #[default]
    Queued,
    /// Currently in the browser.
    Evaluating,
    /// Waiting on a background fix.
    Fixing,
    /// Terminal: met the threshold.
    Passed,
    /// Terminal: out of attempts or unfixable.
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Passed | TaskStatus::Failed)
    }
}

/// One component moving through the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentTask {
    pub module_id: String,
    pub id: ComponentId,
    pub kind: ComponentKind,
    /// Evaluation number, starting at 1.
    pub attempt: u32,
    pub max_attempts: u32,
    /// Set while a fix is outstanding; doubles as the write lock on the source.
    pub fixing: bool,
    pub status: TaskStatus,
}

impl ComponentTask {
    pub fn new(module_id: impl Into<String>, id: ComponentId, kind: ComponentKind) -> Self {
        Self {
            module_id: module_id.into(),
            id,
            kind,
            attempt: 1,
            max_attempts: 3,
            fixing: false,
            status: TaskStatus::Queued,
        }
    }

    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    /// Whether another fix-and-reevaluate cycle is allowed.
    pub fn can_retry(&self) -> bool {
        self.attempt < self.max_attempts
    }

    /// Move back to the queue after a fix was applied.
    pub fn requeue_after_fix(&mut self) {
        self.attempt += 1;
        self.fixing = false;
        self.status = TaskStatus::Queued;
    }
}

impl std::fmt::Display for ComponentTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (attempt {})", self.id, self.attempt)
    }
}
