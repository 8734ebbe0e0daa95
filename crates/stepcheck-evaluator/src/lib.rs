//! # stepcheck Evaluator
//!
//! Runs the interaction protocol for one component: navigate, capture,
//! exercise controls, judge. Also reads module manifests and assembles fix
//! instructions for failing components.

mod error;
mod evaluator;
mod layout;
mod manifest;
mod prompt;
mod protocol;

pub use error::{EvaluatorError, ManifestError};
pub use evaluator::{ComponentEvaluator, EvaluationRequest};
pub use layout::ModuleLayout;
pub use manifest::{Manifest, ManifestComponent, ManifestStep, ManifestQuestion};
pub use prompt::build_fix_prompt;
