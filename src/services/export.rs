//! Export service — bundle every section and rendered image into one archive.
//!
//! DESIGN
//! ======
//! Entries are collected first and handed to an [`Archiver`] in one call.
//! Text entries always use the fixed section ordinals so file numbering does
//! not shift when a section is empty. Only concepts in the success state
//! contribute an image; idle, loading and failed concepts are skipped.
//! The archive keeps the `[CTA]` markers, only clipboard copy strips them.

use std::path::{Component, Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use tracing::{info, warn};

use crate::model::{GeneratedContent, ProjectId};
use crate::services::concept::ConceptBoard;
use crate::services::sections::{SectionKind, format_section};
use crate::state::Studio;

pub const TEXT_FOLDER: &str = "MarketBoost_Text";
pub const VISUAL_FOLDER: &str = "MarketBoost_Visuals";
pub const FALLBACK_ARCHIVE_NAME: &str = "MarketBoost_Assets.zip";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("nothing to export: generate or load a result first")]
    NothingToExport,
    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),
    #[error("invalid archive entry name: {0}")]
    InvalidEntryName(String),
    #[error("archive write failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Relative path inside the archive, `/`-separated.
    pub name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub text_entries: usize,
    pub image_entries: usize,
}

/// Sink for a finished set of entries.
#[async_trait::async_trait]
pub trait Archiver: Send + Sync {
    /// Write `entries` under `archive_name` and return where they landed.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] when an entry name escapes the archive or the
    /// write fails.
    async fn archive(&self, archive_name: &str, entries: &[ArchiveEntry]) -> Result<PathBuf, ExportError>;
}

// =============================================================================
// NAMING
// =============================================================================

/// `MarketBoost_<first three words of the first title>.zip`, or the fallback
/// when no usable title exists.
#[must_use]
pub fn archive_name(content: &GeneratedContent) -> String {
    let stem: String = content
        .titles
        .first()
        .map(|t| t.split_whitespace().take(3).collect::<Vec<_>>().join("_"))
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if stem.trim_matches('_').is_empty() {
        FALLBACK_ARCHIVE_NAME.to_string()
    } else {
        format!("MarketBoost_{stem}.zip")
    }
}

// =============================================================================
// ENTRIES
// =============================================================================

#[must_use]
pub fn text_entries(content: &GeneratedContent) -> Vec<ArchiveEntry> {
    SectionKind::ALL
        .into_iter()
        .filter_map(|kind| {
            format_section(kind, content).map(|text| ArchiveEntry {
                name: format!("{TEXT_FOLDER}/{}", kind.file_name()),
                bytes: Bytes::from(text),
            })
        })
        .collect()
}

/// One PNG per successful concept. Payloads that fail to decode are logged
/// and skipped.
#[must_use]
pub fn image_entries(board: &ConceptBoard) -> Vec<ArchiveEntry> {
    board
        .successes()
        .into_iter()
        .filter_map(|(id, payload)| match STANDARD.decode(payload) {
            Ok(raw) => Some(ArchiveEntry {
                name: format!("{VISUAL_FOLDER}/{}.png", id.file_stem()),
                bytes: Bytes::from(raw),
            }),
            Err(e) => {
                warn!(concept = %id, error = %e, "export: skipping undecodable image");
                None
            }
        })
        .collect()
}

#[must_use]
pub fn collect_entries(content: &GeneratedContent, board: &ConceptBoard) -> Vec<ArchiveEntry> {
    let mut entries = text_entries(content);
    entries.extend(image_entries(board));
    entries
}

// =============================================================================
// EXPORT
// =============================================================================

/// Export the result on screen plus every rendered image.
///
/// # Errors
///
/// Returns [`ExportError::NothingToExport`] without a result, or the
/// archiver's failure.
pub async fn export_all(studio: &Studio, archiver: &dyn Archiver) -> Result<ExportSummary, ExportError> {
    let (name, texts, images) = {
        let state = studio.state.read().await;
        let content = state.generation.result().ok_or(ExportError::NothingToExport)?;
        (archive_name(content), text_entries(content), image_entries(&state.concepts))
    };
    write_archive(archiver, &name, texts, images).await
}

/// Export a saved project's text. Rendered images are session-only, so none
/// are included.
///
/// # Errors
///
/// Returns [`ExportError::ProjectNotFound`], [`ExportError::NothingToExport`]
/// when the project was saved without a result, or the archiver's failure.
pub async fn export_project(
    studio: &Studio,
    id: &ProjectId,
    archiver: &dyn Archiver,
) -> Result<ExportSummary, ExportError> {
    let (name, texts) = {
        let state = studio.state.read().await;
        let project = state
            .projects
            .iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| ExportError::ProjectNotFound(id.clone()))?;
        let content = project.result.as_ref().ok_or(ExportError::NothingToExport)?;
        (archive_name(content), text_entries(content))
    };
    write_archive(archiver, &name, texts, Vec::new()).await
}

async fn write_archive(
    archiver: &dyn Archiver,
    name: &str,
    texts: Vec<ArchiveEntry>,
    images: Vec<ArchiveEntry>,
) -> Result<ExportSummary, ExportError> {
    let text_count = texts.len();
    let image_count = images.len();
    let mut entries = texts;
    entries.extend(images);

    let path = archiver.archive(name, &entries).await?;
    info!(
        archive = name,
        path = %path.display(),
        text_entries = text_count,
        image_entries = image_count,
        "export: archive written"
    );
    Ok(ExportSummary { path, text_entries: text_count, image_entries: image_count })
}

// =============================================================================
// DIRECTORY ARCHIVER
// =============================================================================

/// Writes entries as plain files under `root/<archive stem>/`.
pub struct DirectoryArchiver {
    root: PathBuf,
}

impl DirectoryArchiver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn safe_relative(name: &str) -> Result<&Path, ExportError> {
    let path = Path::new(name);
    let ok = !name.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)));
    if ok { Ok(path) } else { Err(ExportError::InvalidEntryName(name.to_string())) }
}

#[async_trait::async_trait]
impl Archiver for DirectoryArchiver {
    async fn archive(&self, archive_name: &str, entries: &[ArchiveEntry]) -> Result<PathBuf, ExportError> {
        let stem = archive_name.strip_suffix(".zip").unwrap_or(archive_name);
        let dest = self.root.join(safe_relative(stem)?);
        for entry in entries {
            safe_relative(&entry.name)?;
        }

        for entry in entries {
            let target = dest.join(&entry.name);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, &entry.bytes).await?;
        }
        Ok(dest)
    }
}

#[cfg(test)]
#[path = "export_test.rs"]
mod tests;
