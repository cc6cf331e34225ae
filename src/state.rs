//! Shared application state.
//!
//! DESIGN
//! ======
//! `Studio` is the cloneable handle every service takes. It owns the single
//! `StudioState` behind an async `RwLock` plus the external capabilities
//! (content and image generators, the project store, the preview registry).
//! Services take the lock, apply a pure transition, and drop the guard before
//! every await so that suspended work never holds shared state. Storage
//! writes are staged under the lock and committed after it is released.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::config::StudioConfig;
use crate::llm::types::{ContentGenerator, ImageGenerator, InlineImage};
use crate::model::{CopywritingStyle, Platform, ProjectId, ProjectInput, SavedProject, sort_newest_first};
use crate::services::concept::ConceptBoard;
use crate::services::generation::GenerationState;
use crate::services::intake::{ImageAsset, PreviewRegistry};
use crate::services::toast::ToastState;
use crate::storage::{ProjectStore, StagedWrite};

// =============================================================================
// PRODUCT FORM
// =============================================================================

/// The working copy of the product form. Transient; correlates to a saved
/// project only through `StudioState::current_project_id`.
#[derive(Debug, Default)]
pub struct ProductForm {
    pub product_name: String,
    pub materials: String,
    pub target_market: String,
    pub estimated_price: String,
    pub platform: Option<Platform>,
    pub copywriting_style: CopywritingStyle,
    pub additional_brief: String,
    /// Accepted images in upload order, at most [`crate::config::MAX_IMAGES`].
    pub images: Vec<ImageAsset>,
}

impl ProductForm {
    /// Non-binary snapshot suitable for persistence.
    #[must_use]
    pub fn snapshot(&self) -> ProjectInput {
        ProjectInput {
            product_name: self.product_name.clone(),
            materials: self.materials.clone(),
            target_market: self.target_market.clone(),
            estimated_price: self.estimated_price.clone(),
            platform: self.platform,
            copywriting_style: self.copywriting_style,
            additional_brief: self.additional_brief.clone(),
            images: self.images.iter().map(ImageAsset::meta).collect(),
        }
    }

    /// Replace the fields from a stored snapshot. Image bytes are not stored,
    /// so the active image set is emptied.
    pub fn apply(&mut self, input: &ProjectInput) {
        self.product_name.clone_from(&input.product_name);
        self.materials.clone_from(&input.materials);
        self.target_market.clone_from(&input.target_market);
        self.estimated_price.clone_from(&input.estimated_price);
        self.platform = input.platform;
        self.copywriting_style = input.copywriting_style;
        self.additional_brief.clone_from(&input.additional_brief);
        self.images.clear();
    }

    /// The reference photo for concept renders: the first accepted image.
    #[must_use]
    pub fn reference_image(&self) -> Option<InlineImage> {
        self.images.first().map(ImageAsset::to_inline)
    }
}

// =============================================================================
// TOMBSTONES
// =============================================================================

/// A deleted project still inside its undo window.
#[derive(Debug)]
pub struct Tombstone {
    pub project: SavedProject,
    /// Distinguishes this deletion from a later one of the same id.
    pub serial: u64,
    pub(crate) timer: Option<JoinHandle<()>>,
}

// =============================================================================
// STUDIO STATE
// =============================================================================

#[derive(Debug, Default)]
pub struct StudioState {
    pub form: ProductForm,
    pub generation: GenerationState,
    pub concepts: ConceptBoard,
    /// Visible saved projects, newest first.
    pub projects: Vec<SavedProject>,
    pub current_project_id: Option<ProjectId>,
    pub tombstones: HashMap<ProjectId, Tombstone>,
    pub toast: ToastState,
    /// Validation message for the last blocked action, if any.
    pub banner: Option<String>,
    next_serial: u64,
}

impl StudioState {
    #[must_use]
    pub fn new(mut projects: Vec<SavedProject>) -> Self {
        sort_newest_first(&mut projects);
        Self { projects, ..Self::default() }
    }

    /// The single user-visible error: a blocked action or a failed generation.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.banner.as_deref().or_else(|| self.generation.error())
    }

    /// What storage must hold: the visible list plus every deletion that can
    /// still be undone, newest first.
    #[must_use]
    pub fn persisted_view(&self) -> Vec<SavedProject> {
        let mut view: Vec<SavedProject> = self
            .projects
            .iter()
            .cloned()
            .chain(self.tombstones.values().map(|t| t.project.clone()))
            .collect();
        sort_newest_first(&mut view);
        view
    }

    /// Back to a fresh, uncorrelated draft.
    pub fn reset_session(&mut self) {
        self.form = ProductForm::default();
        self.generation.reset();
        self.concepts.clear();
        self.current_project_id = None;
        self.banner = None;
    }

    pub(crate) fn next_serial(&mut self) -> u64 {
        self.next_serial += 1;
        self.next_serial
    }
}

// =============================================================================
// STUDIO HANDLE
// =============================================================================

/// Shared handle passed to every service. Clone is cheap.
#[derive(Clone)]
pub struct Studio {
    pub state: Arc<RwLock<StudioState>>,
    pub content: Arc<dyn ContentGenerator>,
    pub images: Arc<dyn ImageGenerator>,
    pub store: ProjectStore,
    pub previews: PreviewRegistry,
    pub config: Arc<StudioConfig>,
}

impl Studio {
    /// Build the studio and hydrate the project list from the store.
    #[must_use]
    pub fn new(
        config: StudioConfig,
        content: Arc<dyn ContentGenerator>,
        images: Arc<dyn ImageGenerator>,
        store: ProjectStore,
    ) -> Self {
        let projects = store.load();
        tracing::info!(count = projects.len(), "studio: projects hydrated");
        Self {
            state: Arc::new(RwLock::new(StudioState::new(projects))),
            content,
            images,
            store,
            previews: PreviewRegistry::new(),
            config: Arc::new(config),
        }
    }

    /// Capture the persisted view of `state`. Commit it after releasing the
    /// state lock.
    pub(crate) fn stage_persist(&self, state: &StudioState) -> StagedWrite<'_> {
        self.store.stage(state.persisted_view())
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::llm::types::{ContentRequest, LlmError};
    use crate::model::GeneratedContent;
    use crate::model::test_helpers::sample_content;
    use crate::services::intake::CandidateFile;
    use crate::storage::{MemorySlot, StorageSlot};

    /// Scripted content generator. Falls back to [`sample_content`] once the
    /// script runs out.
    pub(crate) struct MockContent {
        responses: Mutex<Vec<(Duration, Result<GeneratedContent, LlmError>)>>,
        pub(crate) requests: Mutex<Vec<ContentRequest>>,
    }

    impl MockContent {
        pub(crate) fn new(responses: Vec<Result<GeneratedContent, LlmError>>) -> Self {
            Self::delayed(responses.into_iter().map(|r| (Duration::ZERO, r)).collect())
        }

        pub(crate) fn delayed(responses: Vec<(Duration, Result<GeneratedContent, LlmError>)>) -> Self {
            Self { responses: Mutex::new(responses), requests: Mutex::new(Vec::new()) }
        }

        pub(crate) fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl ContentGenerator for MockContent {
        async fn generate_content(&self, request: &ContentRequest) -> Result<GeneratedContent, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            let next = {
                let mut responses = self.responses.lock().unwrap();
                if responses.is_empty() { None } else { Some(responses.remove(0)) }
            };
            match next {
                None => Ok(sample_content()),
                Some((delay, response)) => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    response
                }
            }
        }
    }

    /// Scripted image generator recording each call's instruction and time.
    pub(crate) struct ScriptedImages {
        responses: Mutex<Vec<Result<String, LlmError>>>,
        pub(crate) calls: Mutex<Vec<(String, tokio::time::Instant)>>,
    }

    impl ScriptedImages {
        pub(crate) fn new(responses: Vec<Result<String, LlmError>>) -> Self {
            Self { responses: Mutex::new(responses), calls: Mutex::new(Vec::new()) }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl ImageGenerator for ScriptedImages {
        async fn generate_image(&self, instruction: &str, _reference: &InlineImage) -> Result<String, LlmError> {
            self.calls
                .lock()
                .unwrap()
                .push((instruction.to_string(), tokio::time::Instant::now()));
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() { Ok("aW1hZ2U=".into()) } else { responses.remove(0) }
        }
    }

    pub(crate) fn rate_limited() -> LlmError {
        LlmError::ApiResponse { status: 429, body: "RESOURCE_EXHAUSTED".into() }
    }

    pub(crate) struct Harness {
        pub(crate) studio: Studio,
        pub(crate) slot: Arc<MemorySlot>,
        pub(crate) content: Arc<MockContent>,
        pub(crate) images: Arc<ScriptedImages>,
    }

    impl Harness {
        pub(crate) fn stored(&self) -> Option<String> {
            self.slot.read(crate::storage::PROJECTS_KEY).unwrap()
        }

        pub(crate) fn stored_names(&self) -> Vec<String> {
            self.studio
                .store
                .load()
                .into_iter()
                .map(|p| p.name)
                .collect()
        }
    }

    pub(crate) fn harness_with(
        content: MockContent,
        images: ScriptedImages,
        projects: &[SavedProject],
    ) -> Harness {
        let slot = Arc::new(MemorySlot::new());
        let store = ProjectStore::new(slot.clone());
        if !projects.is_empty() {
            let mut seeded = projects.to_vec();
            sort_newest_first(&mut seeded);
            store.save_all(&seeded);
        }
        let content = Arc::new(content);
        let images = Arc::new(images);
        let studio = Studio::new(StudioConfig::default(), content.clone(), images.clone(), store);
        Harness { studio, slot, content, images }
    }

    pub(crate) fn harness() -> Harness {
        harness_with(MockContent::new(Vec::new()), ScriptedImages::new(Vec::new()), &[])
    }

    pub(crate) fn png(name: &str) -> CandidateFile {
        CandidateFile::from_bytes(name, "image/png", vec![0x89, b'P', b'N', b'G'])
    }

    /// Fill the form with the minimum a generation needs.
    pub(crate) async fn fill_valid_form(studio: &Studio) {
        crate::services::intake::add_images(studio, vec![png("front.png")]).await;
        let mut state = studio.state.write().await;
        state.form.product_name = "Kaos A".into();
        state.form.platform = Some(Platform::Shopee);
    }
}
