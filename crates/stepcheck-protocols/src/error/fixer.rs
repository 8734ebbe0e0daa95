//! Fixer errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FixerError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
