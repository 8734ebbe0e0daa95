use super::*;
use crate::store::{FileResultStore, MemoryResultStore};
use crate::testing::{FixBehavior, ModuleFixture, RecordingDriver, ScriptedFixer, ScriptedJudge};

fn step(s: usize) -> ComponentId {
    ComponentId::new(0, s)
}

struct Harness {
    fixture: ModuleFixture,
    driver: Arc<RecordingDriver>,
    judge: Arc<ScriptedJudge>,
    fixer: Arc<ScriptedFixer>,
    results: Arc<dyn ResultStore>,
}

impl Harness {
    fn new(fixture: ModuleFixture, judge: ScriptedJudge, fix: FixBehavior) -> Self {
        Self {
            fixture,
            driver: Arc::new(RecordingDriver::default()),
            judge: Arc::new(judge),
            fixer: Arc::new(ScriptedFixer::new(fix)),
            results: Arc::new(MemoryResultStore::new()),
        }
    }

    fn with_driver(mut self, driver: RecordingDriver) -> Self {
        self.driver = Arc::new(driver);
        self
    }

    fn with_results(mut self, results: Arc<dyn ResultStore>) -> Self {
        self.results = results;
        self
    }

    fn scheduler(&self) -> Scheduler {
        self.scheduler_with(|_| {})
    }

    fn scheduler_with(&self, tweak: impl FnOnce(&mut Config)) -> Scheduler {
        let mut ctx = self.fixture.context(
            self.driver.clone(),
            self.judge.clone(),
            self.fixer.clone(),
            self.results.clone(),
        );
        tweak(&mut ctx.config);
        Scheduler::new(ctx)
    }

    async fn run(&self) -> EvaluationReport {
        self.scheduler().run_module(&self.fixture.module_id).await.unwrap()
    }
}

fn assert_partition(report: &EvaluationReport) {
    let passed: HashSet<ComponentId> = report.passed_components.iter().map(|r| r.id()).collect();
    let failed: HashSet<ComponentId> = report.failed_components.iter().map(|r| r.id()).collect();
    assert!(passed.is_disjoint(&failed));
    assert_eq!(passed.len() + failed.len(), report.total_components);
    assert_eq!(report.passed_components.len(), passed.len());
    assert_eq!(report.failed_components.len(), failed.len());
}

#[tokio::test]
async fn test_fix_cycle_until_attempts_run_out() {
    let judge = ScriptedJudge::with_scores(&[
        (step(0), &[80]),
        (step(1), &[50, 90]),
        (step(2), &[50, 40, 45]),
    ]);
    let h = Harness::new(ModuleFixture::single_question(3), judge, FixBehavior::Rewrite);

    let report = h.run().await;

    assert_eq!(report.total_components, 3);
    assert_eq!(report.passed, 2);
    assert_eq!(report.failed, 1);
    assert!(!report.all_passed);
    assert_partition(&report);

    let failed = &report.failed_components[0];
    assert_eq!(failed.id(), step(2));
    assert_eq!(failed.score, 45);
    assert_eq!(failed.attempt, 3);

    let step1 = report
        .passed_components
        .iter()
        .find(|r| r.id() == step(1))
        .unwrap();
    assert_eq!(step1.attempt, 2);

    assert_eq!(h.fixer.calls_for(step(0)), 0);
    assert_eq!(h.fixer.calls_for(step(1)), 1);
    assert_eq!(h.fixer.calls_for(step(2)), 2);
    assert_eq!(h.judge.calls_for(step(2)), 3);
}

#[tokio::test]
async fn test_fix_is_written_with_backup() {
    let judge = ScriptedJudge::with_scores(&[(step(0), &[30, 85])]);
    let h = Harness::new(ModuleFixture::single_question(1), judge, FixBehavior::Rewrite);

    let report = h.run().await;
    assert!(report.all_passed);

    let source = std::fs::read_to_string(h.fixture.component_path(0)).unwrap();
    assert!(source.contains("fix 1 for q1_s0"));

    let backups = crate::source::list_backups(&h.fixture.component_path(0));
    assert_eq!(backups.len(), 1);
    assert_eq!(
        std::fs::read_to_string(&backups[0]).unwrap(),
        "<html>original 0</html>"
    );
}

#[tokio::test]
async fn test_fix_request_carries_prompt_and_source() {
    let judge = ScriptedJudge::with_scores(&[(step(0), &[30, 85])]);
    let h = Harness::new(ModuleFixture::single_question(1), judge, FixBehavior::Rewrite);

    h.run().await;

    let requests = h.fixer.requests.lock();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.current_source, "<html>original 0</html>");
    assert!(request.prompt.contains("Controls do not update the chart"));
    assert!(request.prompt.starts_with("Fix this interactive homework component for Step 1."));
    assert!(!request.screenshots.is_empty());
}

#[tokio::test]
async fn test_preloaded_passes_need_no_browser() {
    let fixture = ModuleFixture::single_question(2);
    let previous = EvaluationReport::new(
        &fixture.module_id,
        2,
        Vec::new(),
        vec![
            EvaluationResult::from_verdict(step(0), stepcheck_protocols::Verdict::new(90, "ok"), 70),
            EvaluationResult::from_verdict(step(1), stepcheck_protocols::Verdict::new(75, "ok"), 70),
        ],
        Vec::new(),
    );
    let h = Harness::new(fixture, ScriptedJudge::default(), FixBehavior::Rewrite)
        .with_results(Arc::new(MemoryResultStore::with_report(previous)));

    let report = h.run().await;

    assert_eq!(h.driver.navigation_count(), 0);
    assert_eq!(*h.driver.connects.lock(), 0);
    assert!(h.judge.calls.lock().is_empty());
    assert_eq!(report.skipped, 2);
    assert_eq!(report.evaluated, 0);
    assert_eq!(report.passed, 2);
    assert!(report.all_passed);
}

#[tokio::test]
async fn test_second_run_only_revisits_failures() {
    let fixture = ModuleFixture::single_question(2);
    let results: Arc<dyn ResultStore> = Arc::new(FileResultStore::new(fixture.paths()));
    let judge = ScriptedJudge::with_scores(&[(step(1), &[20, 20, 20])]);
    let h = Harness::new(fixture, judge, FixBehavior::Rewrite).with_results(results.clone());

    let first = h.scheduler_with(|c| c.queue.max_attempts = 2).run_module("fractions").await.unwrap();
    assert_eq!(first.passed, 1);
    assert_eq!(first.failed, 1);
    assert_eq!(h.judge.calls_for(step(0)), 1);
    assert_eq!(h.judge.calls_for(step(1)), 2);

    let second = h.scheduler_with(|c| c.queue.max_attempts = 1).run_module("fractions").await.unwrap();
    assert_eq!(h.judge.calls_for(step(0)), 1);
    assert_eq!(h.judge.calls_for(step(1)), 3);
    assert_eq!(second.skipped, 1);
    assert_eq!(second.evaluated, 1);
    assert_eq!(second.passed, 1);
    assert_eq!(second.failed, 1);
    assert_partition(&second);

    let stored = results.load_report("fractions").await.unwrap().unwrap();
    assert_eq!(stored.run_id, second.run_id);
    assert!(stored.passed_ids().contains(&step(0)));
}

#[tokio::test]
async fn test_fixer_without_output_fails_task() {
    for behavior in [FixBehavior::Nothing, FixBehavior::Error, FixBehavior::Panic] {
        let judge = ScriptedJudge::with_scores(&[(step(0), &[30])]);
        let h = Harness::new(ModuleFixture::single_question(1), judge, behavior);

        let report = h.run().await;

        assert_eq!(report.failed, 1);
        let failed = &report.failed_components[0];
        assert_eq!(failed.attempt, 1);
        assert_eq!(failed.score, 30);
        assert_eq!(h.judge.calls_for(step(0)), 1);
        assert_eq!(
            std::fs::read_to_string(h.fixture.component_path(0)).unwrap(),
            "<html>original 0</html>"
        );
    }
}

/// Evaluate the first queued task, then a duplicate of it while its fix is
/// still outstanding.
async fn evaluate_during_fix(h: &Harness) -> (Scheduler, RunState) {
    let scheduler = h.scheduler();
    let mut state = scheduler.start_run(&h.fixture.module_id).await.unwrap();
    let task = state.queue.dequeue().unwrap();
    let mut duplicate = task.clone();

    scheduler.process(&mut state, task).await;
    assert!(state.fixes.contains(&step(0)));

    duplicate.fixing = true;
    scheduler.process(&mut state, duplicate).await;
    assert_eq!(state.fixes.len(), 1);
    assert!(state.failed.is_empty());
    (scheduler, state)
}

#[tokio::test]
async fn test_failure_during_fix_spawns_no_second_fix() {
    let judge = ScriptedJudge::with_scores(&[(step(0), &[30, 35, 90])]);
    let h = Harness::new(ModuleFixture::single_question(1), judge, FixBehavior::Rewrite);

    let (scheduler, mut state) = evaluate_during_fix(&h).await;
    scheduler.drain(&mut state).await;
    let report = scheduler.finish(state).await.unwrap();

    assert!(report.all_passed);
    assert_partition(&report);
    assert_eq!(report.passed_components[0].attempt, 2);
    assert_eq!(h.fixer.calls_for(step(0)), 1);
    assert_eq!(h.judge.calls_for(step(0)), 3);
}

#[tokio::test]
async fn test_failed_fix_reports_latest_evaluation() {
    let judge = ScriptedJudge::with_scores(&[(step(0), &[30, 35])]);
    let h = Harness::new(ModuleFixture::single_question(1), judge, FixBehavior::Error);

    let (scheduler, mut state) = evaluate_during_fix(&h).await;
    scheduler.drain(&mut state).await;
    let report = scheduler.finish(state).await.unwrap();

    assert_eq!(report.failed, 1);
    assert_partition(&report);
    assert_eq!(report.failed_components[0].score, 35);
    assert_eq!(h.fixer.calls_for(step(0)), 1);
}

#[tokio::test]
async fn test_missing_source_fails_without_fixing() {
    let fixture = ModuleFixture::build(2, |s| s != 1);
    let judge = ScriptedJudge::with_scores(&[(step(1), &[10])]);
    let h = Harness::new(fixture, judge, FixBehavior::Rewrite);

    let report = h.run().await;

    assert_eq!(report.passed, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failed_components[0].id(), step(1));
    assert!(h.fixer.requests.lock().is_empty());
}

#[tokio::test]
async fn test_single_attempt_never_fixes() {
    let judge = ScriptedJudge::with_scores(&[(step(0), &[10])]);
    let h = Harness::new(ModuleFixture::single_question(1), judge, FixBehavior::Rewrite);

    let report = h
        .scheduler_with(|c| c.queue.max_attempts = 1)
        .run_module("fractions")
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert!(h.fixer.requests.lock().is_empty());
}

#[tokio::test]
async fn test_fixing_disabled() {
    let judge = ScriptedJudge::with_scores(&[(step(0), &[10])]);
    let h = Harness::new(ModuleFixture::single_question(1), judge, FixBehavior::Rewrite);

    let report = h
        .scheduler_with(|c| c.queue.fix_enabled = false)
        .run_module("fractions")
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.failed_components[0].attempt, 1);
    assert!(h.fixer.requests.lock().is_empty());
}

#[tokio::test]
async fn test_recovers_from_lost_session() {
    let h = Harness::new(
        ModuleFixture::single_question(2),
        ScriptedJudge::default(),
        FixBehavior::Rewrite,
    )
    .with_driver(RecordingDriver::losing_session(1));

    let report = h.run().await;

    assert!(report.all_passed);
    assert_eq!(report.passed, 2);
    assert_eq!(*h.driver.connects.lock(), 2);
    assert_eq!(h.driver.navigation_count(), 2);
}

#[tokio::test]
async fn test_persistent_session_loss_fails_task() {
    let h = Harness::new(
        ModuleFixture::single_question(1),
        ScriptedJudge::default(),
        FixBehavior::Rewrite,
    )
    .with_driver(RecordingDriver::losing_session(usize::MAX));

    let report = h.run().await;

    assert_eq!(report.failed, 1);
    let failed = &report.failed_components[0];
    assert_eq!(failed.score, 0);
    assert!(failed.issues[0].starts_with("Evaluation error: Browser session lost"));
    assert_eq!(*h.driver.connects.lock(), 2);
    assert!(h.judge.calls.lock().is_empty());
    assert!(h.fixer.requests.lock().is_empty());
    assert_partition(&report);
}

#[tokio::test]
async fn test_report_is_saved() {
    let h = Harness::new(
        ModuleFixture::single_question(1),
        ScriptedJudge::default(),
        FixBehavior::Rewrite,
    );

    let report = h.run().await;

    let stored = h.results.load_report("fractions").await.unwrap().unwrap();
    assert_eq!(stored.run_id, report.run_id);
    assert_eq!(stored.total_components, 1);
    assert!(stored.all_passed);
}

#[tokio::test]
async fn test_missing_manifest() {
    let h = Harness::new(
        ModuleFixture::single_question(1),
        ScriptedJudge::default(),
        FixBehavior::Rewrite,
    );

    let result = h.scheduler().run_module("no-such-module").await;
    assert!(matches!(result, Err(QueueError::Manifest(_))));
}
