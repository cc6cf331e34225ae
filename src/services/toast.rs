//! Toast service — transient notifications with an optional undo action.
//!
//! DESIGN
//! ======
//! One toast is visible at a time; showing a new one replaces the old. Each
//! toast schedules its own expiry (plain toasts and toasts carrying an action
//! use different durations). An expiry only clears the toast it was scheduled
//! for, so a replaced toast's timer is harmless.

use tracing::{debug, info};

use crate::model::ProjectId;
use crate::services::projects::{self, ProjectError};
use crate::state::{Studio, StudioState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Danger,
}

/// Reversible follow-ups a toast can offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToastAction {
    UndoDelete(ProjectId),
}

impl ToastAction {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::UndoDelete(_) => "Undo",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub text: String,
    pub severity: Severity,
    pub action: Option<ToastAction>,
}

#[derive(Debug, Default)]
pub struct ToastState {
    current: Option<Toast>,
    next_id: u64,
}

impl ToastState {
    #[must_use]
    pub fn current(&self) -> Option<&Toast> {
        self.current.as_ref()
    }

    /// Replace the visible toast.
    pub fn push(&mut self, text: impl Into<String>, severity: Severity, action: Option<ToastAction>) -> Toast {
        self.next_id += 1;
        let toast = Toast { id: self.next_id, text: text.into(), severity, action };
        self.current = Some(toast.clone());
        toast
    }

    /// Clear the visible toast if it is `id`.
    pub fn dismiss(&mut self, id: u64) -> bool {
        if self.current.as_ref().is_some_and(|t| t.id == id) {
            self.current = None;
            return true;
        }
        false
    }
}

/// Show a toast and schedule its expiry. Called with the state already locked.
pub(crate) fn show(
    studio: &Studio,
    state: &mut StudioState,
    text: impl Into<String>,
    severity: Severity,
    action: Option<ToastAction>,
) -> u64 {
    let ttl = if action.is_some() { studio.config.toast_action_duration } else { studio.config.toast_duration };
    let toast = state.toast.push(text, severity, action);
    info!(toast_id = toast.id, severity = ?toast.severity, text = %toast.text, "toast: shown");

    let studio = studio.clone();
    let id = toast.id;
    tokio::spawn(async move {
        tokio::time::sleep(ttl).await;
        if studio.state.write().await.toast.dismiss(id) {
            debug!(toast_id = id, "toast: expired");
        }
    });
    id
}

/// Dismiss a toast early.
pub async fn dismiss(studio: &Studio, id: u64) -> bool {
    studio.state.write().await.toast.dismiss(id)
}

/// Run the action attached to toast `id`. Returns `false` when the toast is
/// gone or carries no action.
///
/// # Errors
///
/// Propagates the failure of the dispatched action.
pub async fn invoke_action(studio: &Studio, id: u64) -> Result<bool, ProjectError> {
    let action = {
        let mut state = studio.state.write().await;
        let action = state
            .toast
            .current()
            .filter(|t| t.id == id)
            .and_then(|t| t.action.clone());
        if action.is_some() {
            state.toast.dismiss(id);
        }
        action
    };

    match action {
        Some(ToastAction::UndoDelete(project_id)) => {
            projects::undo_delete(studio, &project_id).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
#[path = "toast_test.rs"]
mod tests;
