//! Judge verdicts and evaluation results.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ComponentId;

/// Minimum score (inclusive) for a component to pass.
pub const PASS_THRESHOLD: u8 = 70;

/// Score assigned when the judge's reply cannot be parsed.
pub const DEGRADED_SCORE: u8 = 50;

/// Structured judgment returned by a [`Judge`](crate::Judge).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub score: u8,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub unnecessary_elements: Vec<String>,
    #[serde(default)]
    pub ui_improvements: Vec<String>,
}

impl Verdict {
    pub fn new(score: u8, feedback: impl Into<String>) -> Self {
        Self {
            score: score.min(100),
            feedback: feedback.into(),
            ..Default::default()
        }
    }

    pub fn with_issues(mut self, issues: Vec<String>) -> Self {
        self.issues = issues;
        self
    }

    pub fn with_unnecessary_elements(mut self, elements: Vec<String>) -> Self {
        self.unnecessary_elements = elements;
        self
    }

    pub fn with_ui_improvements(mut self, improvements: Vec<String>) -> Self {
        self.ui_improvements = improvements;
        self
    }

    /// Neutral verdict used when the judge answered but the answer was unusable.
    pub fn degraded(raw_reply: impl Into<String>, issue: impl Into<String>) -> Self {
        Self {
            score: DEGRADED_SCORE,
            feedback: raw_reply.into(),
            issues: vec![issue.into()],
            ..Default::default()
        }
    }
}

fn default_attempt() -> u32 {
    1
}

/// Outcome of one evaluation pass for one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub score: u8,
    pub passed: bool,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub unnecessary_elements: Vec<String>,
    #[serde(default)]
    pub ui_improvements: Vec<String>,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub screenshots: Vec<PathBuf>,
    #[serde(default)]
    pub interaction_log: Vec<String>,
    #[serde(default)]
    pub console_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_prompt: Option<String>,
    #[serde(default = "default_attempt")]
    pub attempt: u32,
    #[serde(default)]
    pub question_index: usize,
    #[serde(default)]
    pub step_index: usize,
}

impl EvaluationResult {
    /// Apply the pass threshold to a verdict.
    pub fn from_verdict(id: ComponentId, verdict: Verdict, pass_threshold: u8) -> Self {
        Self {
            score: verdict.score,
            passed: verdict.score >= pass_threshold,
            issues: verdict.issues,
            unnecessary_elements: verdict.unnecessary_elements,
            ui_improvements: verdict.ui_improvements,
            feedback: verdict.feedback,
            screenshots: Vec::new(),
            interaction_log: Vec::new(),
            console_errors: Vec::new(),
            fix_prompt: None,
            attempt: 1,
            question_index: id.question_index,
            step_index: id.step_index,
        }
    }

    /// Zero-score result for an evaluation that could not complete.
    pub fn evaluation_error(id: ComponentId, message: impl std::fmt::Display) -> Self {
        Self {
            score: 0,
            passed: false,
            issues: vec![format!("Evaluation error: {}", message)],
            unnecessary_elements: Vec::new(),
            ui_improvements: Vec::new(),
            feedback: "Failed to evaluate".to_string(),
            screenshots: Vec::new(),
            interaction_log: Vec::new(),
            console_errors: Vec::new(),
            fix_prompt: None,
            attempt: 1,
            question_index: id.question_index,
            step_index: id.step_index,
        }
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn id(&self) -> ComponentId {
        ComponentId::new(self.question_index, self.step_index)
    }

    /// True when the judge found anything worth sending to the fixer.
    pub fn needs_attention(&self) -> bool {
        !self.passed
            || !self.issues.is_empty()
            || !self.unnecessary_elements.is_empty()
            || !self.ui_improvements.is_empty()
    }
}

#[cfg(test)]
#[path = "evaluation_tests.rs"]
mod tests;
