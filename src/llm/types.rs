//! LLM types — provider-neutral payloads, capability traits, and errors.
//!
//! The orchestration layer only sees [`ContentGenerator`] and
//! [`ImageGenerator`]; the concrete client and test mocks implement them.

use serde::{Deserialize, Serialize};

use crate::model::GeneratedContent;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by LLM client operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The required API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The HTTP request to the LLM provider failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The LLM provider returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The LLM provider response body could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The provider refused the prompt or stopped the candidate on safety grounds.
    #[error("blocked by safety filter: {reason}")]
    Blocked { reason: String },

    /// The provider answered without any usable text part.
    #[error("empty response from provider")]
    EmptyResponse,

    /// The provider answered an image request without an inline image part.
    #[error("no image data in response")]
    NoImage,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl LlmError {
    /// True when the provider signalled quota exhaustion or rate limiting.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::ApiResponse { status: 429, .. } => true,
            Self::ApiResponse { body, .. } => {
                let body = body.to_lowercase();
                body.contains("resource_exhausted") || body.contains("quota")
            }
            Self::ApiRequest(msg) => msg.contains("429"),
            _ => false,
        }
    }

    /// True when the failure came from the provider's safety filtering.
    #[must_use]
    pub fn is_safety_block(&self) -> bool {
        match self {
            Self::Blocked { .. } => true,
            Self::ApiResponse { body, .. } => body.to_lowercase().contains("safety"),
            _ => false,
        }
    }
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// An image payload sent inline with a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    /// Base64-encoded bytes, no data-URL prefix.
    pub data: String,
    pub mime_type: String,
}

/// Everything the content capability needs for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRequest {
    /// Single combined instruction context built from the form.
    pub instruction: String,
    pub images: Vec<InlineImage>,
}

// =============================================================================
// CAPABILITY TRAITS
// =============================================================================

/// Structured content generation: prompt + images in, listing package out.
#[async_trait::async_trait]
pub trait ContentGenerator: Send + Sync {
    /// # Errors
    ///
    /// Returns an [`LlmError`] if the request fails, is blocked, or the
    /// response does not match the [`GeneratedContent`] shape.
    async fn generate_content(&self, request: &ContentRequest) -> Result<GeneratedContent, LlmError>;
}

/// Concept image rendering from a reference product photo.
#[async_trait::async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns the generated image as base64.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`]; rate limiting is distinguishable through
    /// [`LlmError::is_rate_limited`].
    async fn generate_image(&self, instruction: &str, reference: &InlineImage) -> Result<String, LlmError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
