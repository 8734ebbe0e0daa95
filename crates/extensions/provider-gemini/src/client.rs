//! Gemini API client.

use std::path::Path;
use std::time::Duration;

use base64::Engine;
use reqwest::Client;
use stepcheck_config::ProviderConfig;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::types::*;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini API client.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new Gemini client against the public endpoint.
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        Self::with_url(api_key, BASE_URL.to_string(), Duration::from_secs(300))
    }

    /// Create a client against another endpoint (proxies, tests).
    pub fn with_url(api_key: String, base_url: String, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Build from the `[provider]` config section.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = config.resolve_api_key().ok_or(ProviderError::MissingApiKey)?;
        let base_url = config.base_url.clone().unwrap_or_else(|| BASE_URL.to_string());
        Self::with_url(api_key, base_url, Duration::from_secs(config.timeout_secs))
    }

    /// Generate content (non-streaming).
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        debug!("Gemini generate_content: model={}", model);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<GeminiError>(&body) {
                Ok(e) => e.error.message,
                Err(_) => body,
            };
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))
    }

    /// Generate and return the reply text.
    pub async fn generate_text(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<String, ProviderError> {
        let response = self.generate_content(model, request).await?;
        if let Some(usage) = &response.usage_metadata {
            debug!(
                prompt_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "Gemini usage"
            );
        }
        if let Some(text) = response.text() {
            return Ok(text);
        }

        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .or_else(|| response.candidates.first().and_then(|c| c.finish_reason.clone()))
            .unwrap_or_else(|| "empty response".to_string());
        Err(ProviderError::Blocked(reason))
    }
}

/// Read screenshots as inline PNG parts. Unreadable files are skipped.
pub async fn image_parts(paths: &[impl AsRef<Path>]) -> Vec<Part> {
    let mut parts = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        match tokio::fs::read(path).await {
            Ok(bytes) => parts.push(Part::png(
                base64::engine::general_purpose::STANDARD.encode(bytes),
            )),
            Err(e) => warn!(path = %path.display(), error = %e, "Could not load screenshot"),
        }
    }
    parts
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
