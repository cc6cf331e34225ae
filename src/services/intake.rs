//! Intake service — validate, read, and encode uploaded product photos.
//!
//! DESIGN
//! ======
//! Files are processed strictly in input order. A file with a non-image type
//! or unreadable bytes is skipped on its own; the rest of the batch continues.
//! The only batch-level rule is the cap: when the merged set would exceed
//! [`MAX_IMAGES`], a capacity error is reported and acceptance stops once the
//! set is full. Each accepted asset owns a preview handle that is released
//! when the asset is dropped.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use tracing::{info, warn};

use crate::config::MAX_IMAGES;
use crate::llm::types::InlineImage;
use crate::model::ImageMeta;
use crate::state::Studio;

// =============================================================================
// PREVIEWS
// =============================================================================

#[derive(Default)]
struct PreviewInner {
    next_id: AtomicU64,
    live: Mutex<HashSet<u64>>,
}

/// Tracks which preview handles are still live.
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<PreviewInner>,
}

impl PreviewRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn create(&self, name: &str) -> PreviewHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        PreviewHandle { id, url: format!("preview://{id}/{name}"), registry: Arc::downgrade(&self.inner) }
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.inner
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_live(&self, id: u64) -> bool {
        self.inner
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }
}

/// Revocable display reference to an image. Released on drop.
pub struct PreviewHandle {
    id: u64,
    url: String,
    registry: Weak<PreviewInner>,
}

impl PreviewHandle {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle").field("id", &self.id).finish_non_exhaustive()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if let Some(inner) = self.registry.upgrade() {
            inner
                .live
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&self.id);
        }
    }
}

// =============================================================================
// CANDIDATES
// =============================================================================

#[derive(Debug, Clone)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Bytes),
}

/// A file offered for upload, with its declared type.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    pub mime_type: String,
    pub source: ImageSource,
}

impl CandidateFile {
    /// Declared type is inferred from the extension.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let mime_type = mime_from_extension(&path).to_string();
        Self { name, mime_type, source: ImageSource::Path(path) }
    }

    #[must_use]
    pub fn from_bytes(name: &str, mime_type: &str, bytes: impl Into<Bytes>) -> Self {
        Self { name: name.to_string(), mime_type: mime_type.to_string(), source: ImageSource::Bytes(bytes.into()) }
    }

    fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    async fn read(&self) -> std::io::Result<Bytes> {
        match &self.source {
            ImageSource::Path(path) => tokio::fs::read(path).await.map(Bytes::from),
            ImageSource::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

#[must_use]
pub fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        _ => "application/octet-stream",
    }
}

// =============================================================================
// ASSETS
// =============================================================================

/// An accepted image. Immutable once created.
#[derive(Debug)]
pub struct ImageAsset {
    name: String,
    raw_bytes: Bytes,
    preview: PreviewHandle,
    encoded_payload: String,
    mime_type: String,
}

impl ImageAsset {
    fn encode(previews: &PreviewRegistry, file: CandidateFile, raw_bytes: Bytes) -> Self {
        let encoded_payload = STANDARD.encode(&raw_bytes);
        let preview = previews.create(&file.name);
        Self { name: file.name, raw_bytes, preview, encoded_payload, mime_type: file.mime_type }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn raw_bytes(&self) -> &Bytes {
        &self.raw_bytes
    }

    #[must_use]
    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    /// Base64 without a data-URL prefix.
    #[must_use]
    pub fn encoded_payload(&self) -> &str {
        &self.encoded_payload
    }

    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    #[must_use]
    pub fn to_inline(&self) -> InlineImage {
        InlineImage { data: self.encoded_payload.clone(), mime_type: self.mime_type.clone() }
    }

    #[must_use]
    pub fn meta(&self) -> ImageMeta {
        ImageMeta { name: self.name.clone(), mime_type: self.mime_type.clone(), size_bytes: self.raw_bytes.len() }
    }
}

// =============================================================================
// INTAKE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("{name}: only image files can be uploaded")]
    NotAnImage { name: String },
    #[error("at most {max} images can be uploaded")]
    Capacity { max: usize },
    #[error("{name}: file could not be read: {source}")]
    Decode {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Default)]
pub struct IntakeReport {
    pub accepted: usize,
    pub errors: Vec<IntakeError>,
}

impl IntakeReport {
    #[must_use]
    pub fn capacity_exceeded(&self) -> bool {
        self.errors.iter().any(|e| matches!(e, IntakeError::Capacity { .. }))
    }
}

/// Add a batch of files to the form's image set.
pub async fn add_images(studio: &Studio, files: Vec<CandidateFile>) -> IntakeReport {
    let existing = studio.state.read().await.form.images.len();
    let mut report = IntakeReport::default();
    let room = MAX_IMAGES.saturating_sub(existing);

    if existing + files.len() > MAX_IMAGES {
        warn!(existing, incoming = files.len(), max = MAX_IMAGES, "intake: capacity exceeded");
        report.errors.push(IntakeError::Capacity { max: MAX_IMAGES });
    }

    let mut accepted = Vec::new();
    for file in files {
        if accepted.len() >= room {
            break;
        }
        if !file.is_image() {
            warn!(name = %file.name, mime_type = %file.mime_type, "intake: rejected non-image file");
            report.errors.push(IntakeError::NotAnImage { name: file.name });
            continue;
        }
        match file.read().await {
            Ok(bytes) => accepted.push(ImageAsset::encode(&studio.previews, file, bytes)),
            Err(source) => {
                warn!(name = %file.name, error = %source, "intake: skipped unreadable file");
                report.errors.push(IntakeError::Decode { name: file.name, source });
            }
        }
    }

    let mut state = studio.state.write().await;
    let images = &mut state.form.images;
    let room_now = MAX_IMAGES.saturating_sub(images.len());
    if accepted.len() > room_now {
        accepted.truncate(room_now);
        if !report.capacity_exceeded() {
            report.errors.push(IntakeError::Capacity { max: MAX_IMAGES });
        }
    }
    report.accepted = accepted.len();
    images.extend(accepted);
    info!(accepted = report.accepted, total = images.len(), errors = report.errors.len(), "intake: batch processed");
    report
}

/// Remove the image at `index`, releasing its preview. Returns `false` when
/// the index is out of range.
pub async fn remove_image(studio: &Studio, index: usize) -> bool {
    let mut state = studio.state.write().await;
    if index >= state.form.images.len() {
        return false;
    }
    let removed = state.form.images.remove(index);
    info!(index, name = %removed.name, remaining = state.form.images.len(), "intake: image removed");
    true
}

#[cfg(test)]
#[path = "intake_test.rs"]
mod tests;
