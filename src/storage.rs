//! Storage — the single named slot holding the saved-project list.
//!
//! DESIGN
//! ======
//! A `StorageSlot` behaves like browser local storage: string values under
//! string keys, read once at startup and rewritten wholesale on every
//! mutation. `ProjectStore` layers the project-list encoding on top and owns
//! the failure policy: reads that fail or do not parse yield an empty list,
//! writes that fail are logged. Neither surfaces to the caller, so the studio
//! degrades to session-only persistence instead of stopping.
//!
//! Callers snapshot the list with [`ProjectStore::stage`] while they still
//! hold the studio lock, release the lock, then [`StagedWrite::commit`]. The
//! staged write holds the store's write turn, so slot writes land in the same
//! order as the state changes they capture.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, warn};

use crate::model::{SavedProject, sort_newest_first};

/// Slot key under which the project list is stored.
pub const PROJECTS_KEY: &str = "marketboost-ai-projects";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

// =============================================================================
// SLOTS
// =============================================================================

/// A durable string key-value slot.
pub trait StorageSlot: Send + Sync {
    /// Returns `Ok(None)` when nothing has been written under `key` yet.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the backing store cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// # Errors
    ///
    /// Returns a [`StorageError`] when the backing store cannot be written.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// One JSON file per key under a data directory.
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StorageSlot for FileSlot {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Process-local slot. Used by tests and when no data directory is usable.
#[derive(Default)]
pub struct MemorySlot {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageSlot for MemorySlot {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// PROJECT STORE
// =============================================================================

/// Encodes the project list into a slot. Best-effort in both directions.
#[derive(Clone)]
pub struct ProjectStore {
    slot: Arc<dyn StorageSlot>,
    key: String,
    turn: Arc<Mutex<()>>,
}

/// A snapshot waiting to be written. Holds the store's write turn until
/// committed or dropped.
#[must_use = "a staged write is discarded unless committed"]
pub struct StagedWrite<'a> {
    store: &'a ProjectStore,
    projects: Vec<SavedProject>,
    _turn: MutexGuard<'a, ()>,
}

impl StagedWrite<'_> {
    /// Write the snapshot. Failures are logged only.
    pub fn commit(self) {
        self.store.save_all(&self.projects);
    }
}

impl ProjectStore {
    #[must_use]
    pub fn new(slot: Arc<dyn StorageSlot>) -> Self {
        Self { slot, key: PROJECTS_KEY.to_string(), turn: Arc::new(Mutex::new(())) }
    }

    /// Take the write turn and capture `projects` for a later commit.
    pub fn stage(&self, projects: Vec<SavedProject>) -> StagedWrite<'_> {
        let turn = self.turn.lock().unwrap_or_else(PoisonError::into_inner);
        StagedWrite { store: self, projects, _turn: turn }
    }

    /// Read the persisted list, newest first. Never fails: unreadable or
    /// malformed data is logged and treated as an empty list.
    #[must_use]
    pub fn load(&self) -> Vec<SavedProject> {
        let raw = match self.slot.read(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                error!(error = %e, key = %self.key, "storage: failed to read projects");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<SavedProject>>(&raw) {
            Ok(mut projects) => {
                sort_newest_first(&mut projects);
                debug!(count = projects.len(), "storage: projects loaded");
                projects
            }
            Err(e) => {
                warn!(error = %e, key = %self.key, "storage: stored projects unreadable, starting empty");
                Vec::new()
            }
        }
    }

    /// Serialize and write the whole list. Failures are logged only.
    pub fn save_all(&self, projects: &[SavedProject]) {
        if let Err(e) = self.try_save_all(projects) {
            error!(error = %e, key = %self.key, count = projects.len(), "storage: failed to save projects");
        }
    }

    fn try_save_all(&self, projects: &[SavedProject]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(projects)?;
        self.slot.write(&self.key, &raw)
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
