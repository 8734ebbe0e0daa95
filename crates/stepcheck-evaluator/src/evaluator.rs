//! One evaluation cycle for one component.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use stepcheck_config::EvaluatorConfig;
use stepcheck_protocols::{
    BrowserDriver, ComponentId, ComponentKind, EvaluationResult, Judge, JudgeRequest,
    TeachingContext,
};
use tracing::{debug, info, warn};

use crate::error::EvaluatorError;
use crate::prompt::build_fix_prompt;
use crate::protocol::{self, ButtonInfo, InputInfo, SliderInfo};

/// Input to [`ComponentEvaluator::evaluate_component`].
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub id: ComponentId,
    pub kind: ComponentKind,
    pub url: String,
    pub evidence_dir: PathBuf,
    pub context: TeachingContext,
    /// Persisted source, read only to build the fix prompt.
    pub source_path: Option<PathBuf>,
    pub attempt: u32,
}

/// Screenshots and interaction log collected during one cycle.
#[derive(Debug, Default)]
struct Evidence {
    screenshots: Vec<PathBuf>,
    interaction_log: Vec<String>,
}

/// Drives the browser through the interaction protocol and asks the judge
/// for a verdict. Holds no per-component state between calls.
pub struct ComponentEvaluator {
    driver: Arc<dyn BrowserDriver>,
    judge: Arc<dyn Judge>,
    config: EvaluatorConfig,
}

impl ComponentEvaluator {
    pub fn new(driver: Arc<dyn BrowserDriver>, judge: Arc<dyn Judge>, config: EvaluatorConfig) -> Self {
        Self { driver, judge, config }
    }

    /// Evaluate one component.
    ///
    /// Only a lost browser session is returned as an error. Every other
    /// failure becomes a zero-score result.
    pub async fn evaluate_component(
        &self,
        request: &EvaluationRequest,
    ) -> Result<EvaluationResult, EvaluatorError> {
        info!(component = %request.id, kind = %request.kind, attempt = request.attempt, "Evaluating component");

        match self.run(request).await {
            Ok(result) => {
                info!(
                    component = %request.id,
                    score = result.score,
                    passed = result.passed,
                    "Evaluation complete"
                );
                Ok(result)
            }
            Err(EvaluatorError::SessionLost(msg)) => Err(EvaluatorError::SessionLost(msg)),
            Err(e) => {
                warn!(component = %request.id, error = %e, "Evaluation failed");
                Ok(EvaluationResult::evaluation_error(request.id, &e).with_attempt(request.attempt))
            }
        }
    }

    async fn run(&self, request: &EvaluationRequest) -> Result<EvaluationResult, EvaluatorError> {
        tokio::fs::create_dir_all(&request.evidence_dir).await?;

        // Drop messages left over from the previous page.
        self.driver.console_messages().await?;

        self.driver.navigate(&request.url).await?;
        if !self.config.ready_selector.is_empty() {
            self.driver
                .wait_for_selector(
                    &self.config.ready_selector,
                    Duration::from_millis(self.config.ready_timeout_ms),
                )
                .await?;
        }
        self.settle(self.config.navigation_settle_ms).await;

        let mut evidence = Evidence::default();
        self.capture(request, &mut evidence, "initial.png").await?;
        evidence.interaction_log.push("Initial state captured".to_string());

        if request.kind == ComponentKind::Interactive {
            let recording = self.config.record_interactions && self.start_recording(request).await;
            let exercised = self.exercise(request, &mut evidence).await;
            if recording {
                self.stop_recording(request).await;
            }
            exercised?;
        }

        let console_errors: Vec<String> = self
            .driver
            .console_messages()
            .await?
            .into_iter()
            .filter(|m| m.is_error())
            .map(|m| m.text)
            .collect();
        if !console_errors.is_empty() {
            debug!(component = %request.id, count = console_errors.len(), "Console errors captured");
        }

        let verdict = self
            .judge
            .judge(JudgeRequest {
                component: request.id,
                kind: request.kind,
                screenshots: evidence.screenshots.clone(),
                interaction_log: evidence.interaction_log.clone(),
                context: request.context.clone(),
            })
            .await?;

        let mut result = EvaluationResult::from_verdict(request.id, verdict, self.config.pass_threshold)
            .with_attempt(request.attempt);
        result.screenshots = evidence.screenshots;
        result.interaction_log = evidence.interaction_log;
        result.console_errors = console_errors;

        if result.needs_attention() {
            result.fix_prompt = self.fix_prompt(request, &result).await;
        }

        Ok(result)
    }

    async fn exercise(
        &self,
        request: &EvaluationRequest,
        evidence: &mut Evidence,
    ) -> Result<(), EvaluatorError> {
        self.exercise_sliders(request, evidence).await?;
        self.exercise_inputs(request, evidence).await?;
        self.exercise_buttons(request, evidence).await
    }

    /// Recording is best effort: a failure is logged and the cycle goes on.
    async fn start_recording(&self, request: &EvaluationRequest) -> bool {
        let dir = request.evidence_dir.join("recording");
        match self.driver.start_recording(&dir).await {
            Ok(()) => true,
            Err(e) => {
                warn!(component = %request.id, error = %e, "Could not start recording");
                false
            }
        }
    }

    async fn stop_recording(&self, request: &EvaluationRequest) {
        match self.driver.stop_recording().await {
            Ok(frames) => {
                info!(component = %request.id, frames = frames.len(), "Interaction recording saved");
            }
            Err(e) => warn!(component = %request.id, error = %e, "Could not stop recording"),
        }
    }

    async fn exercise_sliders(
        &self,
        request: &EvaluationRequest,
        evidence: &mut Evidence,
    ) -> Result<(), EvaluatorError> {
        let value = self.driver.evaluate_script(protocol::DISCOVER_SLIDERS).await?;
        let sliders: Vec<SliderInfo> = protocol::decode_list(value);
        if sliders.is_empty() {
            return Ok(());
        }
        debug!(component = %request.id, count = sliders.len(), "Found sliders");

        for (i, slider) in sliders.iter().take(self.config.max_sliders).enumerate() {
            let mid = slider.midpoint();
            self.driver
                .evaluate_script(&protocol::set_slider_script(i, mid))
                .await?;
            self.settle(self.config.settle_delay_ms).await;
            evidence
                .interaction_log
                .push(format!("Moved slider {} to value {}", i + 1, mid));
        }

        if self.config.max_sliders > 0 {
            self.capture(request, evidence, "after_sliders.png").await?;
        }
        Ok(())
    }

    async fn exercise_inputs(
        &self,
        request: &EvaluationRequest,
        evidence: &mut Evidence,
    ) -> Result<(), EvaluatorError> {
        let value = self.driver.evaluate_script(protocol::DISCOVER_INPUTS).await?;
        let inputs: Vec<InputInfo> = protocol::decode_list(value);
        if inputs.is_empty() {
            return Ok(());
        }
        debug!(component = %request.id, count = inputs.len(), "Found inputs");

        for (i, input) in inputs.iter().take(self.config.max_inputs).enumerate() {
            let sample = input.sample_value();
            self.driver
                .evaluate_script(&protocol::fill_input_script(i, sample))
                .await?;
            self.settle(self.config.settle_delay_ms).await;
            evidence
                .interaction_log
                .push(format!("Typed '{}' in input {}", sample, i + 1));
        }

        if self.config.max_inputs > 0 {
            self.capture(request, evidence, "after_inputs.png").await?;
        }
        Ok(())
    }

    async fn exercise_buttons(
        &self,
        request: &EvaluationRequest,
        evidence: &mut Evidence,
    ) -> Result<(), EvaluatorError> {
        let value = self.driver.evaluate_script(protocol::DISCOVER_BUTTONS).await?;
        let buttons: Vec<ButtonInfo> = protocol::decode_list(value);
        if buttons.is_empty() {
            return Ok(());
        }
        debug!(component = %request.id, count = buttons.len(), "Found buttons");

        for (i, button) in buttons.iter().take(self.config.max_buttons).enumerate() {
            self.driver
                .evaluate_script(&protocol::click_button_script(i))
                .await?;
            self.settle(self.config.settle_delay_ms).await;
            evidence
                .interaction_log
                .push(format!("Clicked button '{}'", button.label()));
        }

        if self.config.max_buttons > 0 {
            self.capture(request, evidence, "after_buttons.png").await?;
        }
        Ok(())
    }

    async fn capture(
        &self,
        request: &EvaluationRequest,
        evidence: &mut Evidence,
        name: &str,
    ) -> Result<(), EvaluatorError> {
        let path = request.evidence_dir.join(name);
        let shot = self.driver.screenshot(&path, true).await?;
        debug!(component = %request.id, path = %shot.path.display(), bytes = shot.bytes, "Screenshot captured");
        evidence.screenshots.push(shot.path);
        Ok(())
    }

    async fn fix_prompt(&self, request: &EvaluationRequest, result: &EvaluationResult) -> Option<String> {
        let path = request.source_path.as_ref()?;
        match tokio::fs::read_to_string(path).await {
            Ok(_) => Some(build_fix_prompt(Some(request.kind), result, &request.context)),
            Err(e) => {
                warn!(component = %request.id, path = %path.display(), error = %e, "Component source unavailable");
                None
            }
        }
    }

    async fn settle(&self, millis: u64) {
        if millis > 0 {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
    }
}

#[cfg(test)]
#[path = "evaluator_tests.rs"]
mod tests;
