//! Gemini `generateContent` API client.
//!
//! Thin HTTP wrapper for `/models/{model}:generateContent`. Pure parsing in
//! `parse_content_response` / `parse_image_response` for testability.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::LlmTimeouts;
use super::types::{InlineImage, LlmError};

// =============================================================================
// CLIENT
// =============================================================================

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigParse`] for a base URL that is not http(s),
    /// or [`LlmError::HttpClientBuild`] if the HTTP client cannot be built.
    pub fn new(api_key: String, base_url: String, timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(LlmError::ConfigParse(format!("LLM_BASE_URL must be an http(s) URL, got {base_url:?}")));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key, base_url })
    }

    /// Send one `generateContent` call and return the raw success body.
    pub(crate) async fn generate(&self, model: &str, body: &GenerateRequest<'_>) -> Result<String, LlmError> {
        let url = format!("{}/models/{model}:generateContent", self.base_url);
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        if status != 200 {
            return Err(LlmError::ApiResponse { status, body: text });
        }
        Ok(text)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateRequest<'a> {
    pub(crate) contents: Vec<RequestContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Serialize)]
pub(crate) struct RequestContent<'a> {
    pub(crate) role: &'static str,
    pub(crate) parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
pub(crate) enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    Inline {
        inline_data: &'a InlineImage,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig<'a> {
    pub(crate) response_mime_type: &'static str,
    pub(crate) response_schema: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) thinking_config: Option<ThinkingConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ThinkingConfig {
    pub(crate) thinking_budget: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineImage>,
    #[serde(default)]
    thought: bool,
}

// =============================================================================
// PARSING
// =============================================================================

const SAFETY_FINISH_REASONS: &[&str] = &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "IMAGE_SAFETY"];

fn parse_envelope(json: &str) -> Result<Vec<ResponsePart>, LlmError> {
    let api: ApiResponse = serde_json::from_str(json).map_err(|e| LlmError::ApiParse(e.to_string()))?;

    if let Some(reason) = api.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(LlmError::Blocked { reason });
    }

    let Some(candidate) = api.candidates.into_iter().next() else {
        return Err(LlmError::EmptyResponse);
    };

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if SAFETY_FINISH_REASONS.contains(&reason) {
            return Err(LlmError::Blocked { reason: reason.to_string() });
        }
    }

    Ok(candidate.content.map(|c| c.parts).unwrap_or_default())
}

/// Concatenate the non-thought text parts of the first candidate.
pub(crate) fn parse_content_response(json: &str) -> Result<String, LlmError> {
    let text: String = parse_envelope(json)?
        .into_iter()
        .filter(|p| !p.thought)
        .filter_map(|p| p.text)
        .collect();
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text)
}

/// Return the base64 payload of the first inline image part.
pub(crate) fn parse_image_response(json: &str) -> Result<String, LlmError> {
    parse_envelope(json)?
        .into_iter()
        .find_map(|p| p.inline_data)
        .map(|img| img.data)
        .ok_or(LlmError::NoImage)
}

#[cfg(test)]
#[path = "gemini_test.rs"]
mod tests;
