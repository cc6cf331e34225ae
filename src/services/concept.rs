//! Concept service — per-concept image renders with retry and backoff.
//!
//! DESIGN
//! ======
//! Each visual concept (one hero, K supporting) owns an independent
//! `ConceptImageState` in the `ConceptBoard` registry: idle, loading, success
//! or error. Concepts never look at their siblings. The board is tagged with
//! the generation run that mounted it; a render that finishes after the board
//! was cleared or remounted is dropped instead of written into the new board.
//!
//! The hero starts rendering as soon as the board mounts; supporting concepts
//! wait for an explicit start. A render needs the reference photo (the first
//! image of the form); without one the concept goes straight to error and no
//! call is made.
//!
//! Retry policy, per render:
//! - rate limited: back off `base * 2^attempt` and try again
//! - any other failure: one retry after a flat delay
//! - never more than `max_attempts` calls; the last failure is reported

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::ImageRetryPolicy;
use crate::llm::types::{ImageGenerator, InlineImage, LlmError};
use crate::model::{GeneratedContent, ImageConcepts};
use crate::state::{Studio, StudioState};

/// Message stored when a render is requested without a reference photo.
pub const MISSING_REFERENCE_MESSAGE: &str = "Main product image not found. Upload a product photo first.";

const STUDIO_INSTRUCTIONS: &str = "STUDIO INSTRUCTIONS:\n\
1. PRODUCT FIDELITY: keep the product's shape, colors and label details 100% identical to the reference image.\n\
2. PHOTO STYLE: professional e-commerce studio, clean lighting, high resolution, 4K quality.\n\
3. CONTEXT: show the product in use (lifestyle) following the concept so buyers can picture the scenario.";

// =============================================================================
// TYPES
// =============================================================================

/// Identity of a concept within one result. Hero sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConceptId {
    Hero,
    /// Zero-based index into the supporting concepts.
    Supporting(usize),
}

impl ConceptId {
    #[must_use]
    pub fn title(self) -> String {
        match self {
            Self::Hero => "Hero Image".to_string(),
            Self::Supporting(i) => format!("Supporting Image {}", i + 1),
        }
    }

    /// File stem derived from the title: lowercase, spaces to underscores.
    #[must_use]
    pub fn file_stem(self) -> String {
        self.title()
            .to_lowercase()
            .replace(' ', "_")
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect()
    }
}

impl fmt::Display for ConceptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConceptStatus {
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptImageState {
    pub status: ConceptStatus,
    /// Base64 image payload, set only on success.
    pub result: Option<String>,
    pub error: Option<String>,
}

impl ConceptImageState {
    #[must_use]
    pub fn idle() -> Self {
        Self { status: ConceptStatus::Idle, result: None, error: None }
    }

    #[must_use]
    pub fn loading() -> Self {
        Self { status: ConceptStatus::Loading, result: None, error: None }
    }

    #[must_use]
    pub fn success(data: String) -> Self {
        Self { status: ConceptStatus::Success, result: Some(data), error: None }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self { status: ConceptStatus::Error, result: None, error: Some(message.into()) }
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self.status, ConceptStatus::Success | ConceptStatus::Error)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConceptError {
    #[error("{}", MISSING_REFERENCE_MESSAGE)]
    MissingReference,
    #[error("concept not on the board: {0}")]
    NotMounted(ConceptId),
    #[error("render already in progress: {0}")]
    Busy(ConceptId),
    #[error("render result discarded; the board was replaced")]
    Stale,
    #[error("image generation failed: {0}")]
    Generation(#[from] LlmError),
}

// =============================================================================
// BOARD
// =============================================================================

#[derive(Debug)]
struct ConceptSlot {
    prompt: String,
    state: ConceptImageState,
    attempt: u64,
}

/// Handle for one render in flight.
#[derive(Debug, Clone)]
struct Ticket {
    run: u64,
    id: ConceptId,
    attempt: u64,
    prompt: String,
}

/// Registry of concept states for the current result.
#[derive(Debug, Default)]
pub struct ConceptBoard {
    run: u64,
    slots: BTreeMap<ConceptId, ConceptSlot>,
}

impl ConceptBoard {
    /// Replace every slot with idle concepts for `concepts`.
    pub fn mount(&mut self, run: u64, concepts: &ImageConcepts) {
        self.run = run;
        self.slots.clear();
        let idle = |prompt: &str| ConceptSlot {
            prompt: prompt.to_string(),
            state: ConceptImageState::idle(),
            attempt: 0,
        };
        self.slots.insert(ConceptId::Hero, idle(&concepts.hero.prompt));
        for (i, concept) in concepts.supporting.iter().enumerate() {
            self.slots.insert(ConceptId::Supporting(i), idle(&concept.prompt));
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    #[must_use]
    pub(crate) fn run(&self) -> u64 {
        self.run
    }

    #[must_use]
    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<ConceptId> {
        self.slots.keys().copied().collect()
    }

    #[must_use]
    pub fn get(&self, id: ConceptId) -> Option<&ConceptImageState> {
        self.slots.get(&id).map(|s| &s.state)
    }

    /// Successful payloads in concept order, hero first.
    #[must_use]
    pub fn successes(&self) -> Vec<(ConceptId, &str)> {
        self.slots
            .iter()
            .filter_map(|(id, slot)| match (&slot.state.status, &slot.state.result) {
                (ConceptStatus::Success, Some(data)) => Some((*id, data.as_str())),
                _ => None,
            })
            .collect()
    }

    fn begin(&mut self, id: ConceptId) -> Result<Ticket, ConceptError> {
        let slot = self.slots.get_mut(&id).ok_or(ConceptError::NotMounted(id))?;
        if slot.state.status == ConceptStatus::Loading {
            return Err(ConceptError::Busy(id));
        }
        slot.attempt += 1;
        slot.state = ConceptImageState::loading();
        Ok(Ticket { run: self.run, id, attempt: slot.attempt, prompt: slot.prompt.clone() })
    }

    fn fail(&mut self, id: ConceptId, message: &str) {
        if let Some(slot) = self.slots.get_mut(&id) {
            slot.state = ConceptImageState::failed(message);
        }
    }

    fn finish(&mut self, ticket: &Ticket, state: ConceptImageState) -> bool {
        if ticket.run != self.run {
            return false;
        }
        match self.slots.get_mut(&ticket.id) {
            Some(slot) if slot.attempt == ticket.attempt => {
                slot.state = state;
                true
            }
            _ => false,
        }
    }
}

// =============================================================================
// RENDER
// =============================================================================

/// The concept prompt followed by the fixed studio instructions.
#[must_use]
pub fn studio_instruction(prompt: &str) -> String {
    format!("{}.\n\n{STUDIO_INSTRUCTIONS}", prompt.trim_end_matches('.'))
}

/// Call the image capability under `policy`.
///
/// # Errors
///
/// Returns the last [`LlmError`] once the attempts are exhausted.
pub async fn render_with_retry(
    images: &dyn ImageGenerator,
    instruction: &str,
    reference: &InlineImage,
    policy: &ImageRetryPolicy,
    id: ConceptId,
) -> Result<String, LlmError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut flat_retry_used = false;
    let mut attempt: u32 = 0;

    loop {
        let err = match images.generate_image(instruction, reference).await {
            Ok(data) => {
                if attempt > 0 {
                    info!(concept = %id, attempt, "concept: render succeeded after retry");
                }
                return Ok(data);
            }
            Err(e) => e,
        };

        let next = attempt + 1;
        if next >= max_attempts {
            warn!(concept = %id, attempts = next, error = %err, "concept: render attempts exhausted");
            return Err(err);
        }

        let delay: Duration = if err.is_rate_limited() {
            policy.rate_limit_delay(attempt)
        } else if !flat_retry_used {
            flat_retry_used = true;
            policy.flat_delay
        } else {
            warn!(concept = %id, attempts = next, error = %err, "concept: render failed after retry");
            return Err(err);
        };

        warn!(
            concept = %id,
            attempt = next,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            rate_limited = err.is_rate_limited(),
            error = %err,
            "concept: retrying render"
        );
        tokio::time::sleep(delay).await;
        attempt = next;
    }
}

/// Render one concept and record the outcome on the board.
///
/// Starting a concept that is already loading is a no-op ([`ConceptError::Busy`]).
///
/// # Errors
///
/// Returns a [`ConceptError`]; in every case except `Busy`, `NotMounted` and
/// `Stale` the board already reflects the failure.
pub async fn start(studio: &Studio, id: ConceptId) -> Result<String, ConceptError> {
    let (ticket, reference) = {
        let mut state = studio.state.write().await;
        match state.concepts.get(id) {
            None => return Err(ConceptError::NotMounted(id)),
            Some(s) if s.status == ConceptStatus::Loading => return Err(ConceptError::Busy(id)),
            Some(_) => {}
        }
        let Some(reference) = state.form.reference_image() else {
            warn!(concept = %id, "concept: no reference image");
            state.concepts.fail(id, MISSING_REFERENCE_MESSAGE);
            return Err(ConceptError::MissingReference);
        };
        (state.concepts.begin(id)?, reference)
    };

    info!(concept = %id, run = ticket.run, "concept: render started");
    let instruction = studio_instruction(&ticket.prompt);
    let retry = &studio.config.image_retry;
    let outcome = render_with_retry(studio.images.as_ref(), &instruction, &reference, retry, id).await;

    let mut state = studio.state.write().await;
    let next = match &outcome {
        Ok(data) => ConceptImageState::success(data.clone()),
        Err(e) => ConceptImageState::failed(e.to_string()),
    };
    if !state.concepts.finish(&ticket, next) {
        debug!(concept = %id, run = ticket.run, "concept: discarded render for replaced board");
        return Err(ConceptError::Stale);
    }
    outcome.map_err(ConceptError::from)
}

/// Start every supporting concept concurrently and wait for all of them.
pub async fn start_supporting(studio: &Studio) -> Vec<(ConceptId, Result<String, ConceptError>)> {
    let ids: Vec<ConceptId> = {
        let state = studio.state.read().await;
        state
            .concepts
            .ids()
            .into_iter()
            .filter(|id| matches!(id, ConceptId::Supporting(_)))
            .collect()
    };
    let renders = ids.iter().map(|&id| async move { (id, start(studio, id).await) });
    futures::future::join_all(renders).await
}

/// Poll until concept `id` is settled. `None` when it leaves the board.
pub async fn wait_settled(studio: &Studio, id: ConceptId, poll: Duration) -> Option<ConceptImageState> {
    loop {
        {
            let state = studio.state.read().await;
            match state.concepts.get(id) {
                None => return None,
                Some(s) if s.is_settled() => return Some(s.clone()),
                Some(_) => {}
            }
        }
        tokio::time::sleep(poll).await;
    }
}

/// Mount the board for `content` and start the hero render in the background.
/// Called with the state already locked.
pub(crate) fn mount(studio: &Studio, state: &mut StudioState, run: u64, content: &GeneratedContent) {
    state.concepts.mount(run, &content.image_concepts);
    debug!(run, concepts = state.concepts.ids().len(), "concept: board mounted");

    let studio = studio.clone();
    tokio::spawn(async move {
        if let Err(e) = start(&studio, ConceptId::Hero).await {
            debug!(error = %e, "concept: hero auto-start ended without image");
        }
    });
}

#[cfg(test)]
#[path = "concept_test.rs"]
mod tests;
