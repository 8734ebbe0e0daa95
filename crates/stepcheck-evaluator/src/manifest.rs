//! Module manifest reader.
//!
//! Two layouts exist: a flat `steps` list (version `1.0`) and a list of
//! `questions`, each carrying its own `steps` (version `2.0`).

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use stepcheck_protocols::{ComponentId, ComponentKind, TeachingContext};
use tracing::debug;

use crate::error::ManifestError;

/// One step of a module.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestStep {
    #[serde(default, alias = "visualizationType")]
    pub visual_type: Option<String>,

    /// Source reference; `null`, `"None"` or missing means no component.
    #[serde(default)]
    pub component: Option<Value>,

    #[serde(default)]
    pub explanation: Option<String>,

    #[serde(default, alias = "inputLabel")]
    pub input_label: Option<String>,
}

impl ManifestStep {
    /// Visual type, `interactive` when absent.
    pub fn kind(&self) -> Option<ComponentKind> {
        match self.visual_type.as_deref() {
            None => Some(ComponentKind::Interactive),
            Some(value) => ComponentKind::parse(value),
        }
    }

    pub fn has_component(&self) -> bool {
        match &self.component {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => {
                let s = s.trim();
                !s.is_empty() && s != "None"
            }
            Some(_) => true,
        }
    }
}

/// One question of a multi-question module.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestQuestion {
    #[serde(default)]
    pub question: Option<String>,

    #[serde(default)]
    pub steps: Vec<ManifestStep>,
}

/// A testable component discovered in a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestComponent {
    pub id: ComponentId,
    pub kind: ComponentKind,
}

/// Declarative description of a module.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub version: Option<Value>,

    #[serde(default)]
    pub question: Option<String>,

    #[serde(default)]
    pub questions: Vec<ManifestQuestion>,

    #[serde(default)]
    pub steps: Vec<ManifestStep>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        if !path.exists() {
            return Err(ManifestError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Declared version as text, `1.0` when absent.
    pub fn version(&self) -> String {
        match &self.version {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => {
                let text = n.to_string();
                if text.contains('.') { text } else { format!("{}.0", text) }
            }
            _ => "1.0".to_string(),
        }
    }

    /// Whether components are addressed per question.
    pub fn is_multi_question(&self) -> bool {
        !self.questions.is_empty() || self.version().starts_with('2')
    }

    /// Testable components in manifest order.
    pub fn components(&self) -> Vec<ManifestComponent> {
        let mut components = Vec::new();

        if self.is_multi_question() {
            for (q_idx, question) in self.questions.iter().enumerate() {
                for (s_idx, step) in question.steps.iter().enumerate() {
                    let id = ComponentId::new(q_idx, s_idx);
                    if !step.has_component() {
                        debug!(component = %id, "Step has no component, skipping");
                        continue;
                    }
                    if let Some(kind) = step.kind() {
                        components.push(ManifestComponent { id, kind });
                    }
                }
            }
        } else {
            for (s_idx, step) in self.steps.iter().enumerate() {
                if let Some(kind) = step.kind() {
                    components.push(ManifestComponent {
                        id: ComponentId::new(0, s_idx),
                        kind,
                    });
                }
            }
        }

        components
    }

    /// File name of a component's source under the module's components dir.
    pub fn component_filename(&self, id: ComponentId) -> String {
        if self.is_multi_question() {
            format!("q{}-step-{}.html", id.question_index + 1, id.step_index)
        } else {
            format!("step-{}.html", id.step_index)
        }
    }

    pub fn step(&self, id: ComponentId) -> Option<&ManifestStep> {
        if self.is_multi_question() {
            self.questions
                .get(id.question_index)
                .and_then(|q| q.steps.get(id.step_index))
        } else if id.question_index == 0 {
            self.steps.get(id.step_index)
        } else {
            None
        }
    }

    /// Teaching context for a component. Blank fields are dropped.
    pub fn context(&self, id: ComponentId) -> TeachingContext {
        let question = if self.is_multi_question() {
            self.questions
                .get(id.question_index)
                .and_then(|q| q.question.clone())
        } else {
            self.question.clone()
        };
        let step = self.step(id);

        TeachingContext {
            question: non_blank(question),
            explanation: non_blank(step.and_then(|s| s.explanation.clone())),
            input_label: non_blank(step.and_then(|s| s.input_label.clone())),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
