//! Scripted collaborators and a module fixture for scheduler tests.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use stepcheck_config::{Config, PathsConfig};
use stepcheck_protocols::{
    BrowserDriver, ComponentId, DriverError, FixRequest, Fixer, FixerError, Judge, JudgeError,
    JudgeRequest, Screenshot, Verdict,
};
use tempfile::TempDir;

use crate::scheduler::RunContext;
use crate::source::FileSourceStore;
use crate::store::ResultStore;

/// Driver that records calls. Pages have no controls.
#[derive(Default)]
pub struct RecordingDriver {
    pub connects: Mutex<usize>,
    pub navigations: Mutex<Vec<String>>,
    /// Number of upcoming navigations that report a lost session.
    pub session_failures: Mutex<usize>,
}

impl RecordingDriver {
    pub fn navigation_count(&self) -> usize {
        self.navigations.lock().len()
    }

    pub fn losing_session(times: usize) -> Self {
        let driver = Self::default();
        *driver.session_failures.lock() = times;
        driver
    }
}

#[async_trait]
impl BrowserDriver for RecordingDriver {
    async fn connect(&self) -> Result<(), DriverError> {
        *self.connects.lock() += 1;
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        {
            let mut failures = self.session_failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(DriverError::SessionLost("target closed".to_string()));
            }
        }
        self.navigations.lock().push(url.to_string());
        Ok(())
    }

    async fn screenshot(&self, path: &Path, _full_page: bool) -> Result<Screenshot, DriverError> {
        Ok(Screenshot {
            path: path.to_path_buf(),
            bytes: 0,
        })
    }

    async fn evaluate_script(&self, _script: &str) -> Result<Value, DriverError> {
        Ok(Value::Array(Vec::new()))
    }

    async fn wait_for_selector(&self, _selector: &str, _timeout: Duration) -> Result<(), DriverError> {
        Ok(())
    }

    async fn start_recording(&self, _dir: &Path) -> Result<(), DriverError> {
        Ok(())
    }

    async fn stop_recording(&self) -> Result<Vec<PathBuf>, DriverError> {
        Ok(Vec::new())
    }

    async fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

/// Judge that replays a score sequence per component.
/// Components without a script (or with an exhausted one) score 90.
#[derive(Default)]
pub struct ScriptedJudge {
    scores: Mutex<HashMap<ComponentId, VecDeque<u8>>>,
    pub calls: Mutex<Vec<ComponentId>>,
}

impl ScriptedJudge {
    pub fn with_scores(scripts: &[(ComponentId, &[u8])]) -> Self {
        let judge = Self::default();
        {
            let mut scores = judge.scores.lock();
            for (id, seq) in scripts {
                scores.insert(*id, seq.iter().copied().collect());
            }
        }
        judge
    }

    pub fn calls_for(&self, id: ComponentId) -> usize {
        self.calls.lock().iter().filter(|c| **c == id).count()
    }
}

#[async_trait]
impl Judge for ScriptedJudge {
    async fn judge(&self, request: JudgeRequest) -> Result<Verdict, JudgeError> {
        self.calls.lock().push(request.component);
        let score = self
            .scores
            .lock()
            .get_mut(&request.component)
            .and_then(|seq| seq.pop_front())
            .unwrap_or(90);
        let verdict = Verdict::new(score, format!("scored {}", score));
        Ok(if score < 70 {
            verdict.with_issues(vec!["Controls do not update the chart".to_string()])
        } else {
            verdict
        })
    }
}

/// What the fake fixer does on each call.
#[derive(Clone, Copy)]
pub enum FixBehavior {
    Rewrite,
    Nothing,
    Error,
    Panic,
}

pub struct ScriptedFixer {
    behavior: FixBehavior,
    pub requests: Mutex<Vec<FixRequest>>,
}

impl ScriptedFixer {
    pub fn new(behavior: FixBehavior) -> Self {
        Self {
            behavior,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls_for(&self, id: ComponentId) -> usize {
        self.requests.lock().iter().filter(|r| r.component == id).count()
    }
}

#[async_trait]
impl Fixer for ScriptedFixer {
    async fn fix(&self, request: FixRequest) -> Result<Option<String>, FixerError> {
        let n = {
            let mut requests = self.requests.lock();
            requests.push(request.clone());
            requests.len()
        };
        match self.behavior {
            FixBehavior::Rewrite => Ok(Some(format!(
                "<html><!-- fix {} for {} --></html>",
                n,
                request.component.key()
            ))),
            FixBehavior::Nothing => Ok(None),
            FixBehavior::Error => Err(FixerError::Provider("quota exceeded".to_string())),
            FixBehavior::Panic => panic!("fixer crashed"),
        }
    }
}

/// A module on disk: one question, `steps` interactive steps, each with a
/// component file.
pub struct ModuleFixture {
    pub dir: TempDir,
    pub module_id: String,
}

impl ModuleFixture {
    pub fn single_question(steps: usize) -> Self {
        Self::build(steps, |_| true)
    }

    /// Like `single_question`, but only steps for which `has_file` holds get a
    /// component file.
    pub fn build(steps: usize, has_file: impl Fn(usize) -> bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let module_id = "fractions".to_string();
        let module_dir = dir.path().join("modules").join(&module_id);
        let components = module_dir.join("components");
        std::fs::create_dir_all(&components).unwrap();

        let step_json: Vec<Value> = (0..steps)
            .map(|s| {
                serde_json::json!({
                    "visual_type": "interactive",
                    "component": format!("q1-step-{}.html", s),
                    "explanation": format!("Step {} explanation", s),
                })
            })
            .collect();
        let manifest = serde_json::json!({
            "version": "2.0",
            "questions": [{ "question": "What is 1/2 + 1/4?", "steps": step_json }],
        });
        std::fs::write(module_dir.join("manifest.json"), manifest.to_string()).unwrap();

        for s in (0..steps).filter(|s| has_file(*s)) {
            std::fs::write(
                components.join(format!("q1-step-{}.html", s)),
                format!("<html>original {}</html>", s),
            )
            .unwrap();
        }

        Self { dir, module_id }
    }

    pub fn component_path(&self, step: usize) -> PathBuf {
        self.dir
            .path()
            .join("modules")
            .join(&self.module_id)
            .join("components")
            .join(format!("q1-step-{}.html", step))
    }

    pub fn paths(&self) -> PathsConfig {
        PathsConfig {
            modules_dir: self.dir.path().join("modules"),
            results_dir: self.dir.path().join("evaluation_results"),
            viewer_base_url: "http://localhost:8000".to_string(),
        }
    }

    /// Config with all delays zeroed.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.paths = self.paths();
        config.queue.poll_interval_ms = 5;
        config.queue.reconnect_delay_secs = 0;
        config.evaluator.settle_delay_ms = 0;
        config.evaluator.navigation_settle_ms = 0;
        config
    }

    pub fn context(
        &self,
        driver: Arc<RecordingDriver>,
        judge: Arc<ScriptedJudge>,
        fixer: Arc<ScriptedFixer>,
        results: Arc<dyn ResultStore>,
    ) -> RunContext {
        let config = self.config();
        RunContext {
            driver,
            judge,
            fixer,
            results,
            sources: Arc::new(FileSourceStore::new(config.queue.backup_retention)),
            config,
        }
    }
}
