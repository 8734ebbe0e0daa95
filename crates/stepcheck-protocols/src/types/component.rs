//! Component identity and classification.

use serde::{Deserialize, Serialize};

/// Address of one component inside a module.
///
/// Single-question modules use `question_index = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId {
    pub question_index: usize,
    pub step_index: usize,
}

impl ComponentId {
    pub fn new(question_index: usize, step_index: usize) -> Self {
        Self {
            question_index,
            step_index,
        }
    }

    /// Stable key used in logs and the fix table, e.g. `q1_s0`.
    pub fn key(&self) -> String {
        format!("q{}_s{}", self.question_index + 1, self.step_index)
    }

    /// Directory name for this component's evidence, e.g. `q1_step_0`.
    pub fn evidence_dir_name(&self) -> String {
        format!("q{}_step_{}", self.question_index + 1, self.step_index)
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Q{} Step {}", self.question_index + 1, self.step_index + 1)
    }
}

/// What a component renders, which selects the interaction protocol and rubric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Interactive,
    Image,
}

impl ComponentKind {
    /// Parse a manifest visual type. Anything other than the two testable
    /// kinds yields `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "interactive" => Some(ComponentKind::Interactive),
            "image" => Some(ComponentKind::Image),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Interactive => "interactive",
            ComponentKind::Image => "image",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Teaching intent attached to a step, fed to the judge and the fixer so
/// repairs stay aligned with what the step is meant to teach.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeachingContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_label: Option<String>,
}

impl TeachingContext {
    pub fn is_empty(&self) -> bool {
        [&self.question, &self.explanation, &self.input_label]
            .iter()
            .all(|field| field.as_deref().is_none_or(|s| s.trim().is_empty()))
    }
}

#[cfg(test)]
#[path = "component_tests.rs"]
mod tests;
