//! Projects service — save, load, delete with undo.
//!
//! DESIGN
//! ======
//! The visible list is always sorted newest first. Deleting hides the project
//! at once and parks it in a tombstone with its own timer; only when the
//! timer fires is the removal written to storage. Every write stores the
//! visible list plus all live tombstones, so storage never loses a project
//! whose deletion can still be undone. Deleting a second project while the
//! first is pending starts a second, independent timer.

use tracing::{debug, info, warn};

use crate::model::{ProjectId, SavedProject, now_ms, sort_newest_first};
use crate::services::{concept, toast};
use crate::services::toast::{Severity, ToastAction};
use crate::state::{Studio, Tombstone};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectError {
    #[error("Product name is required to save a project.")]
    NameRequired,
    #[error("project not found: {0}")]
    NotFound(ProjectId),
    #[error("no pending deletion for project {0}")]
    NothingToUndo(ProjectId),
}

/// Start a fresh, unsaved draft.
pub async fn new_project(studio: &Studio) {
    let mut state = studio.state.write().await;
    state.reset_session();
    toast::show(studio, &mut state, "Started a new session", Severity::Info, None);
    info!("projects: new session");
}

/// Save the working form. Creates a project on first save, then updates it
/// in place.
///
/// # Errors
///
/// Returns [`ProjectError::NameRequired`] when the product name is empty;
/// nothing is written.
pub async fn save_project(studio: &Studio) -> Result<ProjectId, ProjectError> {
    let mut guard = studio.state.write().await;
    let state = &mut *guard;

    let name = state.form.product_name.trim().to_string();
    if name.is_empty() {
        warn!("projects: save blocked, product name missing");
        state.banner = Some(ProjectError::NameRequired.to_string());
        return Err(ProjectError::NameRequired);
    }

    let input = state.form.snapshot();
    let result = state.generation.result().map(|c| (**c).clone());
    let timestamp = now_ms();

    let existing = state
        .current_project_id
        .as_ref()
        .and_then(|id| state.projects.iter_mut().find(|p| &p.id == id));

    let (id, message) = if let Some(project) = existing {
        project.name = name;
        project.timestamp = timestamp;
        project.input = input;
        project.result = result;
        (project.id.clone(), "Project updated.")
    } else {
        let id = state.current_project_id.clone().unwrap_or_default();
        state.projects.push(SavedProject { id: id.clone(), name, timestamp, input, result });
        state.current_project_id = Some(id.clone());
        (id, "Project saved.")
    };

    sort_newest_first(&mut state.projects);
    state.banner = None;
    let write = studio.stage_persist(state);
    toast::show(studio, state, message, Severity::Info, None);
    let count = state.projects.len();
    drop(guard);

    write.commit();
    info!(project_id = %id, count, "projects: saved");
    Ok(id)
}

/// Copy a saved project into the working form. Image bytes are not stored,
/// so the form comes back without photos.
///
/// # Errors
///
/// Returns [`ProjectError::NotFound`] when `id` is not in the visible list.
pub async fn load_project(studio: &Studio, id: &ProjectId) -> Result<(), ProjectError> {
    let mut guard = studio.state.write().await;
    let state = &mut *guard;

    let project = state
        .projects
        .iter()
        .find(|p| &p.id == id)
        .cloned()
        .ok_or_else(|| ProjectError::NotFound(id.clone()))?;

    state.form.apply(&project.input);
    state.banner = None;
    let run = state.generation.restore(project.result.clone());
    state.concepts.clear();
    if let Some(content) = &project.result {
        concept::mount(studio, state, run, content);
    }
    state.current_project_id = Some(project.id.clone());
    toast::show(studio, state, format!("Loading \"{}\"...", project.name), Severity::Info, None);
    info!(project_id = %id, "projects: loaded");
    Ok(())
}

/// Hide a project and schedule its removal from storage after the undo window.
///
/// # Errors
///
/// Returns [`ProjectError::NotFound`] when `id` is not in the visible list.
pub async fn delete_project(studio: &Studio, id: &ProjectId) -> Result<(), ProjectError> {
    let mut guard = studio.state.write().await;
    let state = &mut *guard;

    let pos = state
        .projects
        .iter()
        .position(|p| &p.id == id)
        .ok_or_else(|| ProjectError::NotFound(id.clone()))?;
    let project = state.projects.remove(pos);
    let serial = state.next_serial();

    let window = studio.config.undo_window;
    let timer = {
        let studio = studio.clone();
        let id = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            commit_delete(&studio, &id, serial).await;
        })
    };
    if let Some(previous) = state
        .tombstones
        .insert(id.clone(), Tombstone { project, serial, timer: Some(timer) })
    {
        if let Some(handle) = previous.timer {
            handle.abort();
        }
    }

    if state.current_project_id.as_ref() == Some(id) {
        state.reset_session();
    }

    toast::show(studio, state, "Project deleted.", Severity::Danger, Some(ToastAction::UndoDelete(id.clone())));
    info!(
        project_id = %id,
        serial,
        window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX),
        pending = state.tombstones.len(),
        "projects: deleted, undo window open"
    );
    Ok(())
}

/// Restore a project whose deletion is still pending.
///
/// # Errors
///
/// Returns [`ProjectError::NothingToUndo`] when the window has closed or the
/// project was never deleted.
pub async fn undo_delete(studio: &Studio, id: &ProjectId) -> Result<(), ProjectError> {
    let mut guard = studio.state.write().await;
    let state = &mut *guard;

    let tombstone = state
        .tombstones
        .remove(id)
        .ok_or_else(|| ProjectError::NothingToUndo(id.clone()))?;
    if let Some(handle) = tombstone.timer {
        handle.abort();
    }

    state.projects.push(tombstone.project);
    sort_newest_first(&mut state.projects);
    let write = studio.stage_persist(state);

    let undo_toast = state
        .toast
        .current()
        .filter(|t| t.action == Some(ToastAction::UndoDelete(id.clone())))
        .map(|t| t.id);
    if let Some(toast_id) = undo_toast {
        state.toast.dismiss(toast_id);
    }
    toast::show(studio, state, "Project restored.", Severity::Info, None);
    drop(guard);

    write.commit();
    info!(project_id = %id, serial = tombstone.serial, "projects: deletion undone");
    Ok(())
}

async fn commit_delete(studio: &Studio, id: &ProjectId, serial: u64) {
    let mut guard = studio.state.write().await;
    let state = &mut *guard;

    if !state.tombstones.get(id).is_some_and(|t| t.serial == serial) {
        debug!(project_id = %id, serial, "projects: stale deletion timer ignored");
        return;
    }
    state.tombstones.remove(id);
    let write = studio.stage_persist(state);
    drop(guard);

    write.commit();
    info!(project_id = %id, serial, "projects: deletion committed");
}

#[cfg(test)]
#[path = "projects_test.rs"]
mod tests;
