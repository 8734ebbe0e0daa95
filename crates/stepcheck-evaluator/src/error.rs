//! Evaluator and manifest errors.

use std::path::PathBuf;

use stepcheck_protocols::{DriverError, JudgeError};
use thiserror::Error;

/// Errors from one evaluation cycle.
///
/// [`ComponentEvaluator::evaluate_component`](crate::ComponentEvaluator::evaluate_component)
/// only ever returns [`EvaluatorError::SessionLost`]; the other variants are
/// folded into a zero-score result before they reach the caller.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("Browser session lost: {0}")]
    SessionLost(String),

    #[error("{0}")]
    Driver(DriverError),

    #[error("Judge failed: {0}")]
    Judge(#[from] JudgeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DriverError> for EvaluatorError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::SessionLost(msg) => EvaluatorError::SessionLost(msg),
            DriverError::NotConnected => EvaluatorError::SessionLost("not connected".to_string()),
            other => EvaluatorError::Driver(other),
        }
    }
}

impl EvaluatorError {
    pub fn is_session_lost(&self) -> bool {
        matches!(self, EvaluatorError::SessionLost(_))
    }
}

/// Errors reading a module manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Manifest not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
