//! # stepcheck Provider - Gemini
//!
//! [`GeminiJudge`] scores screenshots against a rubric and [`GeminiFixer`]
//! regenerates component HTML. Both share one [`GeminiClient`].

mod client;
mod error;
mod fixer;
mod judge;
mod prompt;
mod types;

pub use client::GeminiClient;
pub use error::ProviderError;
pub use fixer::{GeminiFixer, extract_html};
pub use judge::{GeminiJudge, parse_verdict};
pub use types::*;
