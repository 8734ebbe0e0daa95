//! Component fixer backed by Gemini.

use std::sync::Arc;

use async_trait::async_trait;
use stepcheck_protocols::{FixRequest, Fixer, FixerError};
use tracing::{debug, info, warn};

use crate::client::{GeminiClient, image_parts};
use crate::prompt::{VISUAL_EVIDENCE_HEADER, fix_instructions};
use crate::types::{GenerateContentRequest, Part};

pub struct GeminiFixer {
    client: Arc<GeminiClient>,
    model: String,
}

impl GeminiFixer {
    pub fn new(client: Arc<GeminiClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Prompt, then screenshots under a header, then the current source and
    /// the repair rules.
    async fn build_parts(request: &FixRequest) -> Vec<Part> {
        let mut parts = vec![Part::text(request.prompt.clone())];
        if !request.screenshots.is_empty() {
            parts.push(Part::text(VISUAL_EVIDENCE_HEADER));
            parts.extend(image_parts(&request.screenshots).await);
        }
        parts.push(Part::text(fix_instructions(&request.current_source)));
        parts
    }
}

#[async_trait]
impl Fixer for GeminiFixer {
    async fn fix(&self, request: FixRequest) -> Result<Option<String>, FixerError> {
        let parts = Self::build_parts(&request).await;
        info!(component = %request.component, model = %self.model, "Requesting fix");

        let text = self
            .client
            .generate_text(&self.model, &GenerateContentRequest::single(parts))
            .await?;
        debug!(component = %request.component, reply_len = text.len(), "Fixer replied");

        let html = extract_html(&text);
        if html.is_none() {
            warn!(component = %request.component, "Could not extract HTML from fixer reply");
        }
        Ok(html)
    }
}

/// Pull a document out of a model reply.
///
/// Tried in order: a ```` ```html ```` fence, a bare ```` ``` ```` fence,
/// then the whole reply if it starts like an HTML document.
pub fn extract_html(text: &str) -> Option<String> {
    if let Some(body) = fenced(text, "```html\n") {
        return Some(body.to_string());
    }
    if let Some(body) = fenced(text, "```\n") {
        return Some(body.to_string());
    }

    let trimmed = text.trim();
    if trimmed.starts_with("<!DOCTYPE") || trimmed.starts_with("<html") {
        return Some(trimmed.to_string());
    }
    None
}

fn fenced<'a>(text: &'a str, open: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let rest = &text[start..];
    let end = rest.find("\n```")?;
    Some(&rest[..end])
}

#[cfg(test)]
#[path = "fixer_tests.rs"]
mod tests;
