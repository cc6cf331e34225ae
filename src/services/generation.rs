//! Generation service — the primary content request and its global state.
//!
//! DESIGN
//! ======
//! `GenerationState` is a single slot: idle, loading, success or error.
//! Entering loading always wipes the previous result and error. Every run
//! takes a fresh monotonic token; a resolution whose token is no longer
//! current is discarded, so a slow earlier run can never overwrite a newer
//! one. On success the concept board is remounted for the new result and the
//! hero render starts on its own.
//!
//! Provider failures are mapped to a small user-facing taxonomy. The raw
//! provider error is logged and never placed in the state.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::llm::types::LlmError;
use crate::model::GeneratedContent;
use crate::services::concept;
use crate::services::request::{self, ValidationError};
use crate::state::Studio;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GenerationStatus {
    #[default]
    Idle,
    Loading,
    Success(Arc<GeneratedContent>),
    Error(String),
}

/// User-facing classes of generation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    SafetyBlocked,
    QuotaExceeded,
    Generic,
}

impl FailureKind {
    #[must_use]
    pub fn classify(err: &LlmError) -> Self {
        if err.is_safety_block() {
            Self::SafetyBlocked
        } else if err.is_rate_limited() {
            Self::QuotaExceeded
        } else {
            Self::Generic
        }
    }

    #[must_use]
    pub fn user_message(self) -> &'static str {
        match self {
            Self::SafetyBlocked => "The content was blocked by the AI safety filter.",
            Self::QuotaExceeded => "API quota reached. Please wait a moment and try again.",
            Self::Generic => "Something went wrong while generating content. Please try again.",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.user_message())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Failed(FailureKind),
    #[error("generation superseded by a newer run")]
    Superseded,
}

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Default)]
pub struct GenerationState {
    status: GenerationStatus,
    token: u64,
}

impl GenerationState {
    #[must_use]
    pub fn status(&self) -> &GenerationStatus {
        &self.status
    }

    #[must_use]
    pub fn token(&self) -> u64 {
        self.token
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.status, GenerationStatus::Loading)
    }

    #[must_use]
    pub fn result(&self) -> Option<&Arc<GeneratedContent>> {
        match &self.status {
            GenerationStatus::Success(content) => Some(content),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            GenerationStatus::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Enter loading with a fresh token, clearing result and error.
    pub fn begin(&mut self) -> u64 {
        self.token += 1;
        self.status = GenerationStatus::Loading;
        self.token
    }

    /// Apply a resolution. Returns `false` (and changes nothing) when `token`
    /// is not the current run.
    pub fn resolve(&mut self, token: u64, outcome: Result<Arc<GeneratedContent>, String>) -> bool {
        if token != self.token {
            return false;
        }
        self.status = match outcome {
            Ok(content) => GenerationStatus::Success(content),
            Err(message) => GenerationStatus::Error(message),
        };
        true
    }

    /// Show a stored result (or nothing). Any run in flight becomes stale.
    pub fn restore(&mut self, result: Option<GeneratedContent>) -> u64 {
        self.token += 1;
        self.status = result.map_or(GenerationStatus::Idle, |c| GenerationStatus::Success(Arc::new(c)));
        self.token
    }

    /// Back to idle. Any run in flight becomes stale.
    pub fn reset(&mut self) {
        self.restore(None);
    }
}

// =============================================================================
// GENERATE
// =============================================================================

/// Validate the form, run the content request, and publish the result.
///
/// # Errors
///
/// - [`GenerateError::Validation`] when the form is incomplete; nothing is sent.
/// - [`GenerateError::Failed`] when the provider call fails.
/// - [`GenerateError::Superseded`] when a newer run started before this one resolved.
pub async fn generate(studio: &Studio) -> Result<Arc<GeneratedContent>, GenerateError> {
    let (token, request) = {
        let mut state = studio.state.write().await;
        let request = match request::build_request(&state.form) {
            Ok(request) => request,
            Err(e) => {
                warn!(missing = ?e.missing, "generation: blocked by validation");
                state.banner = Some(e.to_string());
                return Err(e.into());
            }
        };
        state.banner = None;
        state.concepts.clear();
        (state.generation.begin(), request)
    };

    info!(token, images = request.images.len(), "generation: started");
    let outcome = studio.content.generate_content(&request).await;

    let mut state = studio.state.write().await;
    match outcome {
        Ok(content) => {
            for deviation in content.shape_deviations() {
                warn!(token, %deviation, "generation: content shape deviation");
            }
            let content = Arc::new(content);
            if !state.generation.resolve(token, Ok(Arc::clone(&content))) {
                info!(token, current = state.generation.token(), "generation: discarded stale result");
                return Err(GenerateError::Superseded);
            }
            concept::mount(studio, &mut state, token, &content);
            info!(token, titles = content.titles.len(), "generation: succeeded");
            Ok(content)
        }
        Err(e) => {
            let kind = FailureKind::classify(&e);
            error!(token, error = %e, ?kind, "generation: failed");
            if !state.generation.resolve(token, Err(kind.user_message().to_string())) {
                info!(token, current = state.generation.token(), "generation: discarded stale failure");
                return Err(GenerateError::Superseded);
            }
            Err(GenerateError::Failed(kind))
        }
    }
}

#[cfg(test)]
#[path = "generation_test.rs"]
mod tests;
