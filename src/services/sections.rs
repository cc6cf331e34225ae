//! Result sections — fixed ordinals, titles and plain-text formatting.
//!
//! The same formatter feeds clipboard copy, per-section text download and
//! the export archive. A section with no content is not present.

use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::model::{GeneratedContent, ParseOptionError};

pub const CTA_OPEN: &str = "[CTA]";
pub const CTA_CLOSE: &str = "[/CTA]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Strategy,
    Price,
    Titles,
    Hook,
    Highlights,
    Features,
    FullDescription,
    PackageContents,
    SeoKeywords,
    VisualConcepts,
    VideoStoryboard,
    Compliance,
}

impl SectionKind {
    /// Every section in display order.
    pub const ALL: [SectionKind; 12] = [
        Self::Strategy,
        Self::Price,
        Self::Titles,
        Self::Hook,
        Self::Highlights,
        Self::Features,
        Self::FullDescription,
        Self::PackageContents,
        Self::SeoKeywords,
        Self::VisualConcepts,
        Self::VideoStoryboard,
        Self::Compliance,
    ];

    /// 1-based position, fixed regardless of which sections are present.
    #[must_use]
    pub fn ordinal(self) -> usize {
        Self::ALL.iter().position(|k| *k == self).map_or(0, |i| i + 1)
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Strategy => "Strategy & Market Trends",
            Self::Price => "Price & Market Analysis",
            Self::Titles => "Product Titles",
            Self::Hook => "Description Hook",
            Self::Highlights => "Key Highlights",
            Self::Features => "Features & Specifications",
            Self::FullDescription => "Full Description",
            Self::PackageContents => "Package Contents",
            Self::SeoKeywords => "SEO Keywords",
            Self::VisualConcepts => "AI Visual Concepts",
            Self::VideoStoryboard => "Video Storyboard",
            Self::Compliance => "Compliance Report",
        }
    }

    /// Title with symbols removed, whitespace runs to `_`, lowercased.
    #[must_use]
    pub fn slug(self) -> String {
        slugify(self.title())
    }

    /// `NN_<slug>.txt`
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{:02}_{}.txt", self.ordinal(), self.slug())
    }

    /// Single-section download name: the title with spaces turned into `_`.
    #[must_use]
    pub fn download_name(self) -> String {
        format!("{}.txt", self.title().replace(' ', "_"))
    }
}

/// Accepts the slug (`seo_keywords`), the title, or the ordinal (`9`, `09`).
impl FromStr for SectionKind {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        let by_ordinal = wanted
            .parse::<usize>()
            .ok()
            .and_then(|n| Self::ALL.into_iter().find(|k| k.ordinal() == n));
        by_ordinal
            .or_else(|| {
                let lower = wanted.to_lowercase();
                Self::ALL
                    .into_iter()
                    .find(|k| k.slug() == lower || k.title().to_lowercase() == lower)
            })
            .ok_or_else(|| ParseOptionError { kind: "section", value: s.to_string() })
    }
}

pub(crate) fn slugify(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub text: String,
}

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("- {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Plain-text rendering of one section, or `None` when it has no content.
#[must_use]
pub fn format_section(kind: SectionKind, content: &GeneratedContent) -> Option<String> {
    let text = match kind {
        SectionKind::Strategy => {
            let s = &content.trend_and_strategy;
            if blank(&s.visual_trends) && blank(&s.copywriting_trends) && blank(&s.actionable_advice) {
                return None;
            }
            format!(
                "TRENDS & STRATEGY:\n\nVisual trends:\n{}\n\nCopywriting trends:\n{}\n\nActionable advice:\n{}",
                s.visual_trends, s.copywriting_trends, s.actionable_advice
            )
        }
        SectionKind::Price => {
            let p = &content.price_suggestion;
            if blank(&p.suggested_price_range) && blank(&p.justification) {
                return None;
            }
            format!(
                "PRICE & MARKET ANALYSIS:\n\nSuggested price range:\n{}\n\nJustification:\n{}",
                p.suggested_price_range, p.justification
            )
        }
        SectionKind::Titles => {
            if content.titles.is_empty() {
                return None;
            }
            let mut out = String::from("PRODUCT TITLE OPTIONS:\n");
            for (i, title) in content.titles.iter().enumerate() {
                let _ = write!(out, "\n{}. {title}", i + 1);
            }
            out
        }
        SectionKind::Hook => {
            if blank(&content.short_description) {
                return None;
            }
            content.short_description.clone()
        }
        SectionKind::Highlights => {
            if content.short_highlights.is_empty() {
                return None;
            }
            format!("SHORT HIGHLIGHTS:\n\n{}", bullets(&content.short_highlights))
        }
        SectionKind::Features => {
            if content.bullet_features.is_empty() {
                return None;
            }
            format!("KEY FEATURES:\n\n{}", bullets(&content.bullet_features))
        }
        SectionKind::FullDescription => {
            if blank(&content.long_description) {
                return None;
            }
            content.long_description.clone()
        }
        SectionKind::PackageContents => {
            if blank(&content.whats_in_the_box) {
                return None;
            }
            content.whats_in_the_box.clone()
        }
        SectionKind::SeoKeywords => {
            let seo = &content.seo_keywords;
            if seo.total() == 0 {
                return None;
            }
            format!(
                "PRIMARY KEYWORDS:\n{}\n\nSECONDARY KEYWORDS:\n{}\n\nLONG-TAIL KEYWORDS:\n{}\n\nBACKEND TAGS:\n{}",
                bullets(&seo.primary),
                bullets(&seo.secondary),
                bullets(&seo.long_tail),
                seo.backend_tags.join(", ")
            )
        }
        SectionKind::VisualConcepts => {
            let c = &content.image_concepts;
            let mut out = format!(
                "Hero Image Concept:\nExplanation: {}\nRationale: {}\nPrompt: {}",
                c.hero.explanation, c.hero.rationale, c.hero.prompt
            );
            for (i, s) in c.supporting.iter().enumerate() {
                let _ = write!(
                    out,
                    "\n\n---\n\nSupporting {}:\nExplanation: {}\nRationale: {}\nPrompt: {}",
                    i + 1,
                    s.explanation,
                    s.rationale,
                    s.prompt
                );
            }
            let _ = write!(out, "\n\n---\n\nGlobal Reasoning:\n{}", c.reasoning);
            out
        }
        SectionKind::VideoStoryboard => {
            let v = &content.video_content;
            if v.hooks.is_empty() && v.storyboard.is_empty() {
                return None;
            }
            let mut out = format!("VIDEO HOOKS (FIRST 3 SECONDS):\n{}\n\nSTORYBOARD:", bullets(&v.hooks));
            for (i, scene) in v.storyboard.iter().enumerate() {
                let _ = write!(
                    out,
                    "\n\nSCENE {}: {}\nVisual: {}\nAudio: {}\nDuration: {}",
                    i + 1,
                    scene.scene,
                    scene.visual,
                    scene.audio,
                    scene.duration
                );
            }
            out
        }
        SectionKind::Compliance => {
            let r = &content.compliance_report;
            if blank(&r.status) && r.notes.is_empty() {
                return None;
            }
            format!("COMPLIANCE STATUS: {}\n\nNOTES:\n{}", r.status, bullets(&r.notes))
        }
    };
    Some(text)
}

/// All present sections in display order.
#[must_use]
pub fn sections(content: &GeneratedContent) -> Vec<Section> {
    SectionKind::ALL
        .into_iter()
        .filter_map(|kind| format_section(kind, content).map(|text| Section { kind, text }))
        .collect()
}

/// Remove the `[CTA]` / `[/CTA]` delimiters, keeping the text between them.
#[must_use]
pub fn strip_markup(text: &str) -> String {
    text.replace(CTA_OPEN, "").replace(CTA_CLOSE, "")
}

// =============================================================================
// CLIPBOARD
// =============================================================================

#[derive(Debug, thiserror::Error)]
#[error("clipboard unavailable: {0}")]
pub struct ClipboardError(pub String);

pub trait Clipboard: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`ClipboardError`] when the text cannot be placed.
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Headless clipboard: prints the copied text to stdout.
pub struct StdoutClipboard;

impl Clipboard for StdoutClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        use std::io::Write as _;
        let mut out = std::io::stdout().lock();
        writeln!(out, "{text}").map_err(|e| ClipboardError(e.to_string()))
    }
}

/// Copy one section with markup stripped. Returns `false` when the section
/// is not present.
///
/// # Errors
///
/// Propagates the clipboard failure.
pub fn copy_section(
    clipboard: &dyn Clipboard,
    kind: SectionKind,
    content: &GeneratedContent,
) -> Result<bool, ClipboardError> {
    let Some(text) = format_section(kind, content) else {
        return Ok(false);
    };
    clipboard.write_text(&strip_markup(&text))?;
    tracing::debug!(section = kind.title(), "sections: copied");
    Ok(true)
}

// =============================================================================
// DOWNLOAD
// =============================================================================

/// Write one section as `<dir>/<download name>`, markup kept as in the
/// archive. Returns `None` when the section is not present.
///
/// # Errors
///
/// Returns the io error when `dir` cannot be created or the file written.
pub async fn download_section(
    kind: SectionKind,
    content: &GeneratedContent,
    dir: &Path,
) -> std::io::Result<Option<PathBuf>> {
    let Some(text) = format_section(kind, content) else {
        return Ok(None);
    };
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(kind.download_name());
    tokio::fs::write(&path, text).await?;
    tracing::info!(section = kind.title(), path = %path.display(), "sections: downloaded");
    Ok(Some(path))
}

#[cfg(test)]
#[path = "sections_test.rs"]
mod tests;
