use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use tokio::sync::RwLock;

use super::*;
use crate::model::test_helpers::{project, sample_content};
use crate::services::concept::{ConceptId, ConceptStatus, MISSING_REFERENCE_MESSAGE};
use crate::services::generation::{self, GenerationStatus};
use crate::config::StudioConfig;
use crate::state::StudioState;
use crate::state::test_helpers::{Harness, MockContent, ScriptedImages, fill_valid_form, harness, harness_with};
use crate::storage::{MemorySlot, ProjectStore, StorageError, StorageSlot};

fn seeded(projects: &[SavedProject]) -> Harness {
    harness_with(MockContent::new(Vec::new()), ScriptedImages::new(Vec::new()), projects)
}

fn trio() -> (SavedProject, SavedProject, SavedProject) {
    (project("Kaos A", 100), project("Kaos B", 200), project("Kaos C", 300))
}

async fn visible_names(h: &Harness) -> Vec<String> {
    h.studio
        .state
        .read()
        .await
        .projects
        .iter()
        .map(|p| p.name.clone())
        .collect()
}

async fn toast_text(h: &Harness) -> Option<String> {
    h.studio.state.read().await.toast.current().map(|t| t.text.clone())
}

// =============================================================================
// save_project
// =============================================================================

#[tokio::test]
async fn first_save_creates_then_second_save_updates_in_place() {
    let h = harness();
    h.studio.state.write().await.form.product_name = "Kaos A".into();

    let first = save_project(&h.studio).await.unwrap();
    assert_eq!(h.studio.state.read().await.current_project_id.as_ref(), Some(&first));
    assert_eq!(toast_text(&h).await.as_deref(), Some("Project saved."));
    assert_eq!(h.stored_names(), ["Kaos A"]);

    h.studio.state.write().await.form.materials = "Cotton combed 30s".into();
    let second = save_project(&h.studio).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(toast_text(&h).await.as_deref(), Some("Project updated."));

    let state = h.studio.state.read().await;
    assert_eq!(state.projects.len(), 1);
    assert_eq!(state.projects[0].input.materials, "Cotton combed 30s");
    assert_eq!(h.studio.store.load().len(), 1);
}

#[tokio::test]
async fn save_without_name_writes_nothing() {
    let h = harness();
    let err = save_project(&h.studio).await.unwrap_err();
    assert_eq!(err, ProjectError::NameRequired);
    assert!(h.stored().is_none());

    let state = h.studio.state.read().await;
    assert_eq!(state.error_message(), Some("Product name is required to save a project."));
    assert!(state.projects.is_empty());
}

#[tokio::test]
async fn save_keeps_generated_result_and_image_metadata() {
    let h = harness();
    fill_valid_form(&h.studio).await;
    generation::generate(&h.studio).await.unwrap();

    save_project(&h.studio).await.unwrap();
    let stored = h.studio.store.load();
    assert_eq!(stored[0].result.as_ref(), Some(&sample_content()));
    assert_eq!(stored[0].input.images.len(), 1);
    assert_eq!(stored[0].input.images[0].name, "front.png");
}

#[tokio::test]
async fn saved_list_is_newest_first() {
    let (a, _, c) = trio();
    let h = seeded(&[a, c]);
    h.studio.state.write().await.form.product_name = "Kaos Baru".into();
    save_project(&h.studio).await.unwrap();
    assert_eq!(visible_names(&h).await, ["Kaos Baru", "Kaos C", "Kaos A"]);
}

// =============================================================================
// new_project / load_project
// =============================================================================

#[tokio::test]
async fn new_project_clears_everything() {
    let h = harness();
    fill_valid_form(&h.studio).await;
    generation::generate(&h.studio).await.unwrap();
    save_project(&h.studio).await.unwrap();

    new_project(&h.studio).await;
    let state = h.studio.state.read().await;
    assert!(state.current_project_id.is_none());
    assert!(state.form.product_name.is_empty());
    assert!(state.form.images.is_empty());
    assert_eq!(state.generation.status(), &GenerationStatus::Idle);
    assert!(state.concepts.is_empty());
    assert_eq!(state.toast.current().map(|t| t.text.as_str()), Some("Started a new session"));
    assert_eq!(state.projects.len(), 1);
}

#[tokio::test]
async fn load_restores_fields_but_not_images() {
    let mut stored = project("Kaos Lama", 100);
    stored.input.materials = "Linen".into();
    stored.result = Some(sample_content());
    let h = seeded(&[stored.clone()]);
    fill_valid_form(&h.studio).await;

    load_project(&h.studio, &stored.id).await.unwrap();
    {
        let state = h.studio.state.read().await;
        assert_eq!(state.form.product_name, "Kaos Lama");
        assert_eq!(state.form.materials, "Linen");
        assert!(state.form.images.is_empty());
        assert_eq!(state.generation.result().map(|c| c.as_ref()), Some(&sample_content()));
        assert_eq!(state.current_project_id.as_ref(), Some(&stored.id));
        assert_eq!(state.toast.current().map(|t| t.text.as_str()), Some("Loading \"Kaos Lama\"..."));
    }
    assert_eq!(h.studio.previews.live_count(), 0);

    let hero = crate::services::concept::wait_settled(&h.studio, ConceptId::Hero, Duration::from_millis(5))
        .await
        .unwrap();
    assert_eq!(hero.status, ConceptStatus::Error);
    assert_eq!(hero.error.as_deref(), Some(MISSING_REFERENCE_MESSAGE));
    assert_eq!(h.images.call_count(), 0);
}

#[tokio::test]
async fn load_unknown_project() {
    let h = harness();
    let err = load_project(&h.studio, &ProjectId::from("missing")).await.unwrap_err();
    assert!(matches!(err, ProjectError::NotFound(_)));
}

// =============================================================================
// delete_project / undo_delete
// =============================================================================

#[tokio::test(start_paused = true)]
async fn delete_then_undo_leaves_storage_unchanged() {
    let (a, b, c) = trio();
    let h = seeded(&[a, b.clone(), c]);
    let before = h.stored();

    delete_project(&h.studio, &b.id).await.unwrap();
    assert_eq!(visible_names(&h).await, ["Kaos C", "Kaos A"]);
    assert_eq!(h.stored(), before);

    tokio::time::sleep(Duration::from_secs(3)).await;
    undo_delete(&h.studio, &b.id).await.unwrap();
    assert_eq!(visible_names(&h).await, ["Kaos C", "Kaos B", "Kaos A"]);
    assert_eq!(h.stored(), before);
    assert_eq!(toast_text(&h).await.as_deref(), Some("Project restored."));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.stored(), before);
    assert!(h.studio.state.read().await.tombstones.is_empty());
}

#[tokio::test(start_paused = true)]
async fn undo_with_equal_timestamps_restores_exact_storage() {
    let (a, b, c) = (project("Kaos A", 5), project("Kaos B", 5), project("Kaos C", 5));
    let h = seeded(&[a.clone(), b, c.clone()]);
    let before = h.stored();
    let visible_before = visible_names(&h).await;

    delete_project(&h.studio, &a.id).await.unwrap();
    undo_delete(&h.studio, &a.id).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.stored(), before);
    assert_eq!(visible_names(&h).await, visible_before);

    delete_project(&h.studio, &c.id).await.unwrap();
    delete_project(&h.studio, &a.id).await.unwrap();
    assert_eq!(h.stored(), before);
    undo_delete(&h.studio, &c.id).await.unwrap();
    assert_eq!(h.stored(), before);
    undo_delete(&h.studio, &a.id).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.stored(), before);
}

#[tokio::test(start_paused = true)]
async fn delete_window_lapse_commits_removal() {
    let (a, b, c) = trio();
    let h = seeded(&[a, b.clone(), c]);

    delete_project(&h.studio, &b.id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(6900)).await;
    assert_eq!(h.stored_names(), ["Kaos C", "Kaos B", "Kaos A"]);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.stored_names(), ["Kaos C", "Kaos A"]);
    assert!(h.studio.state.read().await.tombstones.is_empty());

    let err = undo_delete(&h.studio, &b.id).await.unwrap_err();
    assert!(matches!(err, ProjectError::NothingToUndo(_)));
}

#[tokio::test(start_paused = true)]
async fn second_delete_gets_its_own_timer() {
    let (a, b, c) = trio();
    let h = seeded(&[a.clone(), b.clone(), c]);

    delete_project(&h.studio, &a.id).await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    delete_project(&h.studio, &b.id).await.unwrap();

    tokio::time::sleep(Duration::from_millis(4100)).await;
    assert_eq!(h.stored_names(), ["Kaos C", "Kaos B"]);

    undo_delete(&h.studio, &b.id).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.stored_names(), ["Kaos C", "Kaos B"]);
    assert_eq!(visible_names(&h).await, ["Kaos C", "Kaos B"]);
}

#[tokio::test]
async fn save_during_window_keeps_pending_project_in_storage() {
    let (a, b, _) = trio();
    let h = seeded(&[a, b.clone()]);

    delete_project(&h.studio, &b.id).await.unwrap();
    h.studio.state.write().await.form.product_name = "Kaos Baru".into();
    save_project(&h.studio).await.unwrap();

    let mut names = h.stored_names();
    names.sort();
    assert_eq!(names, ["Kaos A", "Kaos B", "Kaos Baru"]);
    assert_eq!(visible_names(&h).await.len(), 2);
}

#[tokio::test]
async fn deleting_current_project_resets_form() {
    let h = harness();
    h.studio.state.write().await.form.product_name = "Kaos A".into();
    let id = save_project(&h.studio).await.unwrap();

    delete_project(&h.studio, &id).await.unwrap();
    let state = h.studio.state.read().await;
    assert!(state.current_project_id.is_none());
    assert!(state.form.product_name.is_empty());
    let toast = state.toast.current().unwrap();
    assert_eq!(toast.text, "Project deleted.");
    assert_eq!(toast.severity, Severity::Danger);
    assert_eq!(toast.action, Some(ToastAction::UndoDelete(id.clone())));
}

#[tokio::test]
async fn undo_through_toast_action() {
    let (a, b, _) = trio();
    let h = seeded(&[a, b.clone()]);

    delete_project(&h.studio, &b.id).await.unwrap();
    let toast_id = h.studio.state.read().await.toast.current().unwrap().id;
    assert!(toast::invoke_action(&h.studio, toast_id).await.unwrap());

    assert_eq!(visible_names(&h).await, ["Kaos B", "Kaos A"]);
    assert_eq!(toast_text(&h).await.as_deref(), Some("Project restored."));
}

#[tokio::test]
async fn delete_unknown_project() {
    let h = harness();
    let err = delete_project(&h.studio, &ProjectId::from("nope")).await.unwrap_err();
    assert_eq!(err, ProjectError::NotFound(ProjectId::from("nope")));
}

// =============================================================================
// storage writes
// =============================================================================

/// Records, for each write, whether the studio lock was free at that moment.
#[derive(Default)]
struct LockAwareSlot {
    inner: MemorySlot,
    state: OnceLock<Arc<RwLock<StudioState>>>,
    lock_free: Mutex<Vec<bool>>,
}

impl StorageSlot for LockAwareSlot {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(state) = self.state.get() {
            self.lock_free.lock().unwrap().push(state.try_write().is_ok());
        }
        self.inner.write(key, value)
    }
}

#[tokio::test(start_paused = true)]
async fn storage_writes_happen_outside_the_state_lock() {
    let slot = Arc::new(LockAwareSlot::default());
    let store = ProjectStore::new(slot.clone());
    let (a, b, _) = trio();
    store.save_all(&[b.clone(), a.clone()]);
    let studio = Studio::new(
        StudioConfig::default(),
        Arc::new(MockContent::new(Vec::new())),
        Arc::new(ScriptedImages::new(Vec::new())),
        store,
    );
    assert!(slot.state.set(studio.state.clone()).is_ok());

    studio.state.write().await.form.product_name = "Kaos Baru".into();
    save_project(&studio).await.unwrap();
    delete_project(&studio, &b.id).await.unwrap();
    undo_delete(&studio, &b.id).await.unwrap();
    delete_project(&studio, &a.id).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(*slot.lock_free.lock().unwrap(), [true, true, true]);
    let names: Vec<String> = studio.store.load().into_iter().map(|p| p.name).collect();
    assert_eq!(names.len(), 2);
    assert!(!names.contains(&"Kaos A".to_string()));
}
