//! Outstanding background fixes.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use stepcheck_protocols::{ComponentId, EvaluationResult, FixRequest, Fixer, FixerError};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::task::{ComponentTask, TaskStatus};

/// How a finished fix turned out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixOutcome {
    /// Replacement source ready to apply.
    Fixed(String),
    /// The fixer ran but returned nothing usable.
    Empty,
    /// The fixer call failed or its task panicked.
    Failed(String),
}

/// A fix that has completed, ready for reconciliation.
#[derive(Debug)]
pub struct FinishedFix {
    pub task: ComponentTask,
    pub source_path: PathBuf,
    pub original_source: String,
    pub last_result: EvaluationResult,
    pub outcome: FixOutcome,
}

/// A fix in flight for one component.
pub struct FixRecord {
    pub task: ComponentTask,
    /// Source file the fix will overwrite.
    pub source_path: PathBuf,
    /// Source as it was when the fix was launched.
    pub original_source: String,
    /// The failing result that triggered the fix.
    pub last_result: EvaluationResult,
    handle: JoinHandle<Result<Option<String>, FixerError>>,
}

impl FixRecord {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Resolve the fix. Only awaits a handle that has already finished
    /// when called through [`FixTracker::take_finished`].
    pub async fn into_outcome(self) -> FinishedFix {
        let outcome = match self.handle.await {
            Ok(Ok(Some(source))) if !source.trim().is_empty() => FixOutcome::Fixed(source),
            Ok(Ok(_)) => FixOutcome::Empty,
            Ok(Err(e)) => FixOutcome::Failed(e.to_string()),
            Err(e) if e.is_panic() => FixOutcome::Failed("fix task panicked".to_string()),
            Err(e) => FixOutcome::Failed(e.to_string()),
        };
        FinishedFix {
            task: self.task,
            source_path: self.source_path,
            original_source: self.original_source,
            last_result: self.last_result,
            outcome,
        }
    }
}

/// Table of outstanding fixes, at most one per component.
#[derive(Default)]
pub struct FixTracker {
    records: HashMap<ComponentId, FixRecord>,
}

impl FixTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &ComponentId) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Spawn a fix in the background.
    ///
    /// Returns the task and result back unchanged if a fix is already
    /// outstanding for the same component.
    pub fn launch(
        &mut self,
        mut task: ComponentTask,
        fixer: Arc<dyn Fixer>,
        request: FixRequest,
        source_path: PathBuf,
        last_result: EvaluationResult,
    ) -> Result<(), (ComponentTask, EvaluationResult)> {
        if self.records.contains_key(&task.id) {
            return Err((task, last_result));
        }

        task.fixing = true;
        task.status = TaskStatus::Fixing;
        info!(component = %task.id, attempt = task.attempt, max_attempts = task.max_attempts, "Sent to fixer");

        let original_source = request.current_source.clone();
        let handle = tokio::spawn(async move { fixer.fix(request).await });

        self.records.insert(
            task.id,
            FixRecord {
                task,
                source_path,
                original_source,
                last_result,
                handle,
            },
        );
        Ok(())
    }

    /// Attach a failing result for a component whose fix is outstanding.
    /// It replaces the recorded failure unless it is from an older attempt,
    /// so a failed fix reports the latest evaluation. Returns the result
    /// back if no fix is outstanding.
    pub fn fold_result(&mut self, result: EvaluationResult) -> Result<(), EvaluationResult> {
        let Some(record) = self.records.get_mut(&result.id()) else {
            return Err(result);
        };
        debug!(component = %record.task.id, attempt = result.attempt, "Result folded into outstanding fix");
        if result.attempt >= record.last_result.attempt {
            record.last_result = result;
        }
        Ok(())
    }

    /// Remove and return every record whose fix has completed. Never blocks.
    pub fn take_finished(&mut self) -> Vec<FixRecord> {
        let mut done: Vec<ComponentId> = self
            .records
            .iter()
            .filter(|(_, record)| record.is_finished())
            .map(|(id, _)| *id)
            .collect();
        done.sort();

        let finished: Vec<FixRecord> = done
            .iter()
            .filter_map(|id| self.records.remove(id))
            .collect();
        if !finished.is_empty() {
            debug!(count = finished.len(), remaining = self.records.len(), "Fixes completed");
        }
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use stepcheck_protocols::{ComponentKind, Verdict};

    struct EchoFixer(Option<&'static str>);

    #[async_trait]
    impl Fixer for EchoFixer {
        async fn fix(&self, _request: FixRequest) -> Result<Option<String>, FixerError> {
            Ok(self.0.map(str::to_string))
        }
    }

    struct PanickingFixer;

    #[async_trait]
    impl Fixer for PanickingFixer {
        async fn fix(&self, _request: FixRequest) -> Result<Option<String>, FixerError> {
            panic!("model client blew up");
        }
    }

    fn task() -> ComponentTask {
        ComponentTask::new("m", ComponentId::new(0, 1), ComponentKind::Interactive)
    }

    fn request() -> FixRequest {
        FixRequest {
            component: ComponentId::new(0, 1),
            kind: ComponentKind::Interactive,
            prompt: "fix it".to_string(),
            current_source: "<html>old</html>".to_string(),
            screenshots: Vec::new(),
        }
    }

    fn failing_result() -> EvaluationResult {
        EvaluationResult::from_verdict(ComponentId::new(0, 1), Verdict::new(40, "broken"), 70)
    }

    async fn drain(tracker: &mut FixTracker) -> Vec<FixRecord> {
        loop {
            let finished = tracker.take_finished();
            if !finished.is_empty() || tracker.is_empty() {
                return finished;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_one_fix_per_component() {
        let mut tracker = FixTracker::new();
        let fixer: Arc<dyn Fixer> = Arc::new(EchoFixer(Some("<html>new</html>")));

        assert!(tracker
            .launch(task(), fixer.clone(), request(), PathBuf::from("a.html"), failing_result())
            .is_ok());
        let rejected = tracker.launch(task(), fixer, request(), PathBuf::from("a.html"), failing_result());
        let (task, result) = rejected.unwrap_err();
        assert!(!task.fixing);
        assert_eq!(result.score, 40);
        assert_eq!(tracker.len(), 1);
    }

    #[tokio::test]
    async fn test_fold_result_replaces_last_failure() {
        let mut tracker = FixTracker::new();
        let newer = EvaluationResult::from_verdict(ComponentId::new(0, 1), Verdict::new(35, "still broken"), 70);
        assert_eq!(tracker.fold_result(newer.clone()).unwrap_err().score, 35);

        tracker
            .launch(task(), Arc::new(EchoFixer(None)), request(), PathBuf::from("a.html"), failing_result())
            .unwrap();
        tracker.fold_result(newer).unwrap();
        let stale = EvaluationResult::from_verdict(ComponentId::new(0, 1), Verdict::new(10, "old"), 70)
            .with_attempt(0);
        tracker.fold_result(stale).unwrap();

        let fix = drain(&mut tracker).await.pop().unwrap().into_outcome().await;
        assert_eq!(fix.last_result.score, 35);
    }

    #[tokio::test]
    async fn test_finished_fix_outcome() {
        let mut tracker = FixTracker::new();
        tracker
            .launch(
                task(),
                Arc::new(EchoFixer(Some("<html>new</html>"))),
                request(),
                PathBuf::from("a.html"),
                failing_result(),
            )
            .unwrap();

        let finished = drain(&mut tracker).await;
        assert_eq!(finished.len(), 1);
        assert!(tracker.is_empty());

        let fix = finished.into_iter().next().unwrap().into_outcome().await;
        assert!(fix.task.fixing);
        assert_eq!(fix.original_source, "<html>old</html>");
        assert_eq!(fix.last_result.score, 40);
        assert_eq!(fix.outcome, FixOutcome::Fixed("<html>new</html>".to_string()));
    }

    #[tokio::test]
    async fn test_empty_and_blank_fixes() {
        for reply in [None, Some("   ")] {
            let mut tracker = FixTracker::new();
            tracker
                .launch(task(), Arc::new(EchoFixer(reply)), request(), PathBuf::from("a.html"), failing_result())
                .unwrap();
            let record = drain(&mut tracker).await.pop().unwrap();
            assert_eq!(record.into_outcome().await.outcome, FixOutcome::Empty);
        }
    }

    #[tokio::test]
    async fn test_panicking_fix_is_failed() {
        let mut tracker = FixTracker::new();
        tracker
            .launch(task(), Arc::new(PanickingFixer), request(), PathBuf::from("a.html"), failing_result())
            .unwrap();
        let record = drain(&mut tracker).await.pop().unwrap();
        assert!(matches!(record.into_outcome().await.outcome, FixOutcome::Failed(_)));
    }
}
