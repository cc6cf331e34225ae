//! LLM — Gemini adapter behind the content and image capabilities.
//!
//! DESIGN
//! ======
//! One HTTP client, two models. `LlmClient` owns a [`gemini::GeminiClient`]
//! and implements both [`ContentGenerator`] (structured JSON listing package)
//! and [`ImageGenerator`] (concept render from a reference photo). Everything
//! above this module talks to the traits, so tests swap in scripted mocks.

pub mod config;
pub mod gemini;
pub mod schema;
pub mod types;

use serde_json::Value;
use tracing::{debug, info};

use config::LlmConfig;
use gemini::{GenerateRequest, GenerationConfig, RequestContent, RequestPart, ThinkingConfig};
use types::{ContentGenerator, ContentRequest, ImageGenerator, InlineImage, LlmError};

use crate::model::GeneratedContent;

// =============================================================================
// CLIENT
// =============================================================================

pub struct LlmClient {
    gemini: gemini::GeminiClient,
    content_model: String,
    image_model: String,
    thinking_budget: u32,
    schema: Value,
}

impl LlmClient {
    /// Build an LLM client from environment variables.
    ///
    /// See [`LlmConfig::from_env`] for the variables consulted.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client fails.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_config(LlmConfig::from_env()?)
    }

    /// # Errors
    ///
    /// Returns [`LlmError::HttpClientBuild`] if the HTTP client fails.
    pub fn from_config(config: LlmConfig) -> Result<Self, LlmError> {
        let gemini = gemini::GeminiClient::new(config.api_key, config.base_url, config.timeouts)?;
        Ok(Self {
            gemini,
            content_model: config.content_model,
            image_model: config.image_model,
            thinking_budget: config.thinking_budget,
            schema: schema::generated_content_schema(),
        })
    }

    #[must_use]
    pub fn content_model(&self) -> &str {
        &self.content_model
    }

    #[must_use]
    pub fn image_model(&self) -> &str {
        &self.image_model
    }
}

#[async_trait::async_trait]
impl ContentGenerator for LlmClient {
    async fn generate_content(&self, request: &ContentRequest) -> Result<GeneratedContent, LlmError> {
        let mut parts = Vec::with_capacity(request.images.len() + 1);
        parts.push(RequestPart::Text { text: &request.instruction });
        parts.extend(request.images.iter().map(|img| RequestPart::Inline { inline_data: img }));

        let thinking_config =
            (self.thinking_budget > 0).then_some(ThinkingConfig { thinking_budget: self.thinking_budget });
        let body = GenerateRequest {
            contents: vec![RequestContent { role: "user", parts }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json",
                response_schema: &self.schema,
                thinking_config,
            }),
        };

        info!(model = %self.content_model, images = request.images.len(), "llm: content request");
        let raw = self.gemini.generate(&self.content_model, &body).await?;
        let text = gemini::parse_content_response(&raw)?;
        debug!(bytes = text.len(), "llm: content response");
        serde_json::from_str(&text).map_err(|e| LlmError::ApiParse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl ImageGenerator for LlmClient {
    async fn generate_image(&self, instruction: &str, reference: &InlineImage) -> Result<String, LlmError> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart::Inline { inline_data: reference }, RequestPart::Text { text: instruction }],
            }],
            generation_config: None,
        };

        info!(model = %self.image_model, "llm: image request");
        let raw = self.gemini.generate(&self.image_model, &body).await?;
        gemini::parse_image_response(&raw)
    }
}
