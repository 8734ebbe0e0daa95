//! Judge errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Evidence unavailable: {0}")]
    Evidence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
