//! Gemini client errors.

use stepcheck_protocols::{FixerError, JudgeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("No Gemini API key configured (set provider.api_key or GEMINI_API_KEY)")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Response blocked: {0}")]
    Blocked(String),
}

impl From<ProviderError> for JudgeError {
    fn from(e: ProviderError) -> Self {
        JudgeError::Provider(e.to_string())
    }
}

impl From<ProviderError> for FixerError {
    fn from(e: ProviderError) -> Self {
        FixerError::Provider(e.to_string())
    }
}
