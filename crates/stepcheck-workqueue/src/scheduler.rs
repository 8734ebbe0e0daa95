//! Module evaluation loop.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use stepcheck_config::Config;
use stepcheck_evaluator::{
    ComponentEvaluator, EvaluationRequest, Manifest, ModuleLayout, build_fix_prompt,
};
use stepcheck_protocols::{
    BrowserDriver, ComponentId, EvaluationResult, FixRequest, Fixer, Judge,
};
use tracing::{error, info, warn};

use crate::error::QueueError;
use crate::fixes::{FinishedFix, FixOutcome, FixTracker};
use crate::queue::EvaluationQueue;
use crate::report::EvaluationReport;
use crate::source::{ApplyOutcome, SourceStore};
use crate::store::ResultStore;
use crate::task::{ComponentTask, TaskStatus};

/// Everything a run needs, built once by the process entry point.
pub struct RunContext {
    pub driver: Arc<dyn BrowserDriver>,
    pub judge: Arc<dyn Judge>,
    pub fixer: Arc<dyn Fixer>,
    pub results: Arc<dyn ResultStore>,
    pub sources: Arc<dyn SourceStore>,
    pub config: Config,
}

/// Mutable state of one module run. Owned by the loop alone.
struct RunState {
    module_id: String,
    total: usize,
    layout: ModuleLayout,
    manifest: Manifest,
    queue: EvaluationQueue,
    fixes: FixTracker,
    passed_set: HashSet<ComponentId>,
    /// Previous passing results, reported again when their task is skipped.
    carried: HashMap<ComponentId, EvaluationResult>,
    skipped: Vec<EvaluationResult>,
    passed: Vec<EvaluationResult>,
    failed: Vec<EvaluationResult>,
    connected: bool,
}

impl RunState {
    fn record_passed(&mut self, mut task: ComponentTask, result: EvaluationResult) {
        task.status = TaskStatus::Passed;
        self.passed_set.insert(task.id);
        info!(component = %task.id, score = result.score, "Component passed");
        self.passed.push(result);
    }

    fn record_failed(&mut self, mut task: ComponentTask, result: EvaluationResult, reason: &str) {
        task.status = TaskStatus::Failed;
        warn!(component = %task.id, score = result.score, attempt = task.attempt, reason, "Component failed");
        self.failed.push(result);
    }
}

enum Evaluation {
    Completed(EvaluationResult),
    /// The session stayed lost through every retry.
    Abandoned(EvaluationResult),
}

/// Drains a module's components through evaluate → fix → re-evaluate.
///
/// One evaluation is in flight at a time. Fixes run as spawned tasks and
/// are reconciled at the top of each loop turn without blocking.
pub struct Scheduler {
    ctx: RunContext,
    evaluator: ComponentEvaluator,
}

impl Scheduler {
    pub fn new(ctx: RunContext) -> Self {
        let evaluator = ComponentEvaluator::new(
            ctx.driver.clone(),
            ctx.judge.clone(),
            ctx.config.evaluator.clone(),
        );
        Self { ctx, evaluator }
    }

    /// Evaluate every component of `module_id` and persist the report.
    pub async fn run_module(&self, module_id: &str) -> Result<EvaluationReport, QueueError> {
        let mut state = self.start_run(module_id).await?;
        self.drain(&mut state).await;
        self.finish(state).await
    }

    /// Load the manifest and previous results and queue every component.
    async fn start_run(&self, module_id: &str) -> Result<RunState, QueueError> {
        let layout = ModuleLayout::new(module_id, &self.ctx.config.paths);
        let manifest = Manifest::load(&layout.manifest_path())?;
        let components = manifest.components();
        info!(module = module_id, components = components.len(), "Starting evaluation run");

        let previous = match self.ctx.results.load_report(module_id).await {
            Ok(report) => report,
            Err(e) => {
                warn!(module = module_id, error = %e, "Could not load previous results, starting fresh");
                None
            }
        };
        let carried: HashMap<ComponentId, EvaluationResult> = previous
            .map(|report| {
                report
                    .passed_components
                    .into_iter()
                    .filter(|r| r.passed)
                    .map(|r| (r.id(), r))
                    .collect()
            })
            .unwrap_or_default();
        if !carried.is_empty() {
            info!(count = carried.len(), "Loaded previously passed components, they will be skipped");
        }

        let max_attempts = self.ctx.config.queue.max_attempts.max(1);
        let queue: EvaluationQueue = components
            .iter()
            .map(|c| ComponentTask::new(module_id, c.id, c.kind).with_max_attempts(max_attempts))
            .collect();

        Ok(RunState {
            module_id: module_id.to_string(),
            total: components.len(),
            layout,
            manifest,
            queue,
            fixes: FixTracker::new(),
            passed_set: carried.keys().copied().collect(),
            carried,
            skipped: Vec::new(),
            passed: Vec::new(),
            failed: Vec::new(),
            connected: false,
        })
    }

    /// Run the loop until the queue is empty and no fix is outstanding.
    async fn drain(&self, state: &mut RunState) {
        while !state.queue.is_empty() || !state.fixes.is_empty() {
            self.reconcile_fixes(state).await;

            if let Some(task) = state.queue.dequeue() {
                self.process(state, task).await;
            }

            if state.queue.is_empty() && !state.fixes.is_empty() {
                info!(outstanding = state.fixes.len(), "Waiting for fixes to complete");
                tokio::time::sleep(Duration::from_millis(self.ctx.config.queue.poll_interval_ms)).await;
            }
        }
    }

    /// Build and persist the report.
    async fn finish(&self, state: RunState) -> Result<EvaluationReport, QueueError> {
        let module_id = state.module_id;
        let report = EvaluationReport::new(
            &module_id,
            state.total,
            state.skipped,
            state.passed,
            state.failed,
        );
        self.ctx.results.save_report(&report).await?;
        info!(
            module = %module_id,
            passed = report.passed,
            failed = report.failed,
            all_passed = report.all_passed,
            "Evaluation run complete"
        );
        Ok(report)
    }

    /// Apply finished fixes and re-queue their tasks.
    async fn reconcile_fixes(&self, state: &mut RunState) {
        for record in state.fixes.take_finished() {
            let FinishedFix {
                mut task,
                source_path,
                original_source,
                last_result,
                outcome,
            } = record.into_outcome().await;

            if state.passed_set.contains(&task.id) {
                info!(component = %task.id, "Passed while its fix ran, discarding fix");
                continue;
            }

            match outcome {
                FixOutcome::Fixed(source) => {
                    if source == original_source {
                        warn!(component = %task.id, "Fixer returned the source unchanged");
                    }
                    match self.ctx.sources.apply_fix(&source_path, &source).await {
                        Ok(ApplyOutcome::Applied { backup }) => {
                            info!(component = %task.id, backup = %backup.display(), "Applied fix");
                        }
                        Ok(ApplyOutcome::Restored { error, .. }) => {
                            error!(component = %task.id, error = %error, "Fix write failed, original restored");
                        }
                        Err(e) => {
                            error!(component = %task.id, error = %e, "Could not apply fix");
                        }
                    }
                    task.requeue_after_fix();
                    info!(component = %task.id, attempt = task.attempt, "Re-queued for evaluation");
                    state.queue.enqueue(task);
                }
                FixOutcome::Empty => {
                    state.record_failed(task, last_result, "fixer returned no usable source");
                }
                FixOutcome::Failed(e) => {
                    error!(component = %task.id, error = %e, "Fix failed");
                    state.record_failed(task, last_result, "fix failed");
                }
            }
        }
    }

    async fn process(&self, state: &mut RunState, mut task: ComponentTask) {
        if state.passed_set.contains(&task.id) {
            info!(component = %task.id, "Skipping, already passed");
            if let Some(result) = state.carried.remove(&task.id) {
                state.skipped.push(result);
            }
            return;
        }

        task.status = TaskStatus::Evaluating;
        let source_path = state.layout.component_path(&state.manifest, task.id);
        let context = state.manifest.context(task.id);
        let request = EvaluationRequest {
            id: task.id,
            kind: task.kind,
            url: state.layout.viewer_url(task.id),
            evidence_dir: state.layout.evidence_dir(task.id),
            context: context.clone(),
            source_path: Some(source_path.clone()),
            attempt: task.attempt,
        };

        let result = match self.evaluate_with_recovery(state, &request).await {
            Evaluation::Completed(result) => result,
            Evaluation::Abandoned(result) => {
                state.record_failed(task, result, "browser session lost");
                return;
            }
        };
        info!(
            component = %task.id,
            score = result.score,
            passed = result.passed,
            attempt = task.attempt,
            "Evaluated"
        );

        if result.passed {
            state.record_passed(task, result);
            return;
        }

        // The outstanding fix owns the component; it is re-queued or
        // recorded when that fix is reconciled.
        let result = match state.fixes.fold_result(result) {
            Ok(()) => {
                warn!(component = %task.id, "Fix already outstanding, not launching another");
                return;
            }
            Err(result) => result,
        };

        if !task.can_retry() {
            state.record_failed(task, result, "max attempts reached");
            return;
        }
        if !self.ctx.config.queue.fix_enabled {
            state.record_failed(task, result, "fixing disabled");
            return;
        }

        let current_source = match self.ctx.sources.read(&source_path).await {
            Ok(Some(source)) => source,
            Ok(None) => {
                error!(component = %task.id, path = %source_path.display(), "Component source not found");
                state.record_failed(task, result, "source missing");
                return;
            }
            Err(e) => {
                error!(component = %task.id, error = %e, "Could not read component source");
                state.record_failed(task, result, "source unreadable");
                return;
            }
        };

        let prompt = result
            .fix_prompt
            .clone()
            .unwrap_or_else(|| build_fix_prompt(Some(task.kind), &result, &context));
        let request = FixRequest {
            component: task.id,
            kind: task.kind,
            prompt,
            current_source,
            screenshots: result.screenshots.clone(),
        };

        if let Err((task, result)) = state
            .fixes
            .launch(task, self.ctx.fixer.clone(), request, source_path, result)
        {
            state.record_failed(task, result, "fix could not be launched");
        }
    }

    /// Run one evaluation, reconnecting on session loss up to
    /// `crash_retries` calls.
    async fn evaluate_with_recovery(
        &self,
        state: &mut RunState,
        request: &EvaluationRequest,
    ) -> Evaluation {
        let retries = self.ctx.config.queue.crash_retries.max(1);
        let delay = Duration::from_secs(self.ctx.config.queue.reconnect_delay_secs);
        let mut last_error = String::from("browser session unavailable");

        for round in 1..=retries {
            if !state.connected {
                match self.ctx.driver.connect().await {
                    Ok(()) => {
                        state.connected = true;
                        if round > 1 {
                            tokio::time::sleep(delay).await;
                        }
                    }
                    Err(e) => {
                        warn!(component = %request.id, error = %e, round, retries, "Browser connect failed");
                        last_error = e.to_string();
                        if round < retries {
                            tokio::time::sleep(delay).await;
                        }
                        continue;
                    }
                }
            }

            match self.evaluator.evaluate_component(request).await {
                Ok(result) => return Evaluation::Completed(result),
                Err(e) => {
                    warn!(component = %request.id, error = %e, round, retries, "Browser session lost, reconnecting");
                    state.connected = false;
                    last_error = e.to_string();
                }
            }
        }

        error!(component = %request.id, retries, "Evaluation abandoned after repeated session loss");
        Evaluation::Abandoned(
            EvaluationResult::evaluation_error(request.id, last_error).with_attempt(request.attempt),
        )
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
