//! Vision judge backed by Gemini.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use stepcheck_protocols::{Judge, JudgeError, JudgeRequest, Verdict};
use tracing::{debug, info, warn};

use crate::client::{GeminiClient, image_parts};
use crate::prompt::judge_prompt;
use crate::types::{GenerateContentRequest, Part};

/// Issue recorded when the reply holds no JSON object.
pub const UNPARSEABLE_ISSUE: &str = "Could not parse evaluation";

pub struct GeminiJudge {
    client: Arc<GeminiClient>,
    model: String,
}

impl GeminiJudge {
    pub fn new(client: Arc<GeminiClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Judge for GeminiJudge {
    async fn judge(&self, request: JudgeRequest) -> Result<Verdict, JudgeError> {
        let images = image_parts(&request.screenshots).await;
        if images.is_empty() {
            return Err(JudgeError::Evidence(format!(
                "no readable screenshots for {}",
                request.component
            )));
        }

        let prompt = judge_prompt(request.kind, &request.interaction_log, &request.context);
        let mut parts = Vec::with_capacity(images.len() + 1);
        parts.push(Part::text(prompt));
        parts.extend(images);

        info!(component = %request.component, model = %self.model, screenshots = parts.len() - 1, "Requesting judgment");
        let text = self
            .client
            .generate_text(&self.model, &GenerateContentRequest::single(parts))
            .await?;
        debug!(component = %request.component, reply_len = text.len(), "Judge replied");

        Ok(parse_verdict(&text))
    }
}

/// Parse the first `{ ... }` span of a reply (first `{` to last `}`).
///
/// A reply without such a span, or with one that is not a JSON object,
/// yields a degraded verdict carrying the raw reply as feedback.
pub fn parse_verdict(text: &str) -> Verdict {
    let span = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => {
            warn!("Judge reply contains no JSON object");
            return Verdict::degraded(text, UNPARSEABLE_ISSUE);
        }
    };

    let object = match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(object)) => object,
        Ok(_) => return Verdict::degraded(text, "Parse error: expected a JSON object"),
        Err(e) => {
            warn!(error = %e, "Judge reply is not valid JSON");
            return Verdict::degraded(text, format!("Parse error: {}", e));
        }
    };

    let score = object.get("score").map(score_value).unwrap_or(0);
    let feedback = match object.get("feedback") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    Verdict::new(score, feedback)
        .with_issues(string_list(object.get("issues")))
        .with_unnecessary_elements(string_list(object.get("unnecessary_elements")))
        .with_ui_improvements(string_list(object.get("ui_improvements")))
}

fn score_value(value: &Value) -> u8 {
    let raw = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().trim_end_matches("/100").trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    raw.round().clamp(0.0, 100.0) as u8
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
                Value::String(_) | Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
#[path = "judge_tests.rs"]
mod tests;
