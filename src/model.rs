//! Domain model — listing options, generated content, saved projects.
//!
//! DESIGN
//! ======
//! `GeneratedContent` mirrors the JSON shape the content-generation capability
//! must return. Every field is required on deserialization: a missing field is
//! a contract violation by the provider and surfaces as a parse error rather
//! than a partially populated result.

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// OPTION SETS
// =============================================================================

/// Error returned when parsing a platform or style from user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseOptionError {
    pub kind: &'static str,
    pub value: String,
}

/// Target marketplace for the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Shopee,
    #[serde(rename = "TikTok Shop")]
    TikTokShop,
    Tokopedia,
    Lazada,
}

impl Platform {
    pub const ALL: [Platform; 4] = [Self::Shopee, Self::TikTokShop, Self::Tokopedia, Self::Lazada];

    /// Marketplace name as written into the generation instruction.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Shopee => "Shopee",
            Self::TikTokShop => "TikTok Shop",
            Self::Tokopedia => "Tokopedia",
            Self::Lazada => "Lazada",
        }
    }

    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::Shopee => "shopee",
            Self::TikTokShop => "tiktok-shop",
            Self::Tokopedia => "tokopedia",
            Self::Lazada => "lazada",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Platform {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.slug() == wanted || p.label().to_lowercase() == wanted)
            .ok_or_else(|| ParseOptionError { kind: "platform", value: s.to_string() })
    }
}

/// Copywriting tone requested from the generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CopywritingStyle {
    #[default]
    Natural,
    #[serde(rename = "Soft Selling")]
    SoftSelling,
    #[serde(rename = "Hard Selling")]
    HardSelling,
    Storytelling,
    Branding,
    Premium,
    Professional,
    Educational,
    #[serde(rename = "FOMO")]
    Fomo,
}

impl CopywritingStyle {
    /// Options in the order the form presents them.
    pub const ALL: [CopywritingStyle; 9] = [
        Self::Natural,
        Self::Professional,
        Self::SoftSelling,
        Self::HardSelling,
        Self::Storytelling,
        Self::Educational,
        Self::Fomo,
        Self::Branding,
        Self::Premium,
    ];

    /// Tone name as written into the generation instruction.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Natural => "Natural",
            Self::SoftSelling => "Soft Selling",
            Self::HardSelling => "Hard Selling",
            Self::Storytelling => "Storytelling",
            Self::Branding => "Branding",
            Self::Premium => "Premium",
            Self::Professional => "Professional",
            Self::Educational => "Educational",
            Self::Fomo => "FOMO",
        }
    }

    /// Option text shown next to the choice.
    #[must_use]
    pub fn display_label(self) -> &'static str {
        match self {
            Self::Natural => "Natural (relaxed & friendly)",
            Self::SoftSelling => "Soft Selling (subtle)",
            Self::HardSelling => "Hard Selling (assertive)",
            Self::Storytelling => "Storytelling",
            Self::Branding => "Branding (brand image)",
            Self::Premium => "Premium (luxury)",
            Self::Professional => "Professional",
            Self::Educational => "Educational",
            Self::Fomo => "FOMO / Limited Offer",
        }
    }

    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::Natural => "natural",
            Self::SoftSelling => "soft-selling",
            Self::HardSelling => "hard-selling",
            Self::Storytelling => "storytelling",
            Self::Branding => "branding",
            Self::Premium => "premium",
            Self::Professional => "professional",
            Self::Educational => "educational",
            Self::Fomo => "fomo",
        }
    }
}

impl fmt::Display for CopywritingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CopywritingStyle {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.slug() == wanted || c.label().to_lowercase() == wanted)
            .ok_or_else(|| ParseOptionError { kind: "copywriting style", value: s.to_string() })
    }
}

// =============================================================================
// GENERATED CONTENT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAndStrategy {
    pub visual_trends: String,
    pub copywriting_trends: String,
    pub actionable_advice: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSuggestion {
    pub suggested_price_range: String,
    pub justification: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoKeywords {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
    pub long_tail: Vec<String>,
    pub backend_tags: Vec<String>,
}

impl SeoKeywords {
    #[must_use]
    pub fn total(&self) -> usize {
        self.primary.len() + self.secondary.len() + self.long_tail.len() + self.backend_tags.len()
    }
}

/// One visual scene the image capability can render from a reference photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedImageConcept {
    pub explanation: String,
    pub rationale: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConcepts {
    pub hero: DetailedImageConcept,
    pub supporting: Vec<DetailedImageConcept>,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryboardScene {
    pub scene: String,
    pub visual: String,
    pub audio: String,
    pub duration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoContent {
    pub hooks: Vec<String>,
    pub storyboard: Vec<StoryboardScene>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub status: String,
    pub notes: Vec<String>,
}

/// The full marketing package produced by one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    pub trend_and_strategy: TrendAndStrategy,
    pub price_suggestion: PriceSuggestion,
    pub titles: Vec<String>,
    /// The short hook shown above the full description.
    pub short_description: String,
    pub short_highlights: Vec<String>,
    pub bullet_features: Vec<String>,
    /// May embed one `[CTA]...[/CTA]` block.
    pub long_description: String,
    pub whats_in_the_box: String,
    pub seo_keywords: SeoKeywords,
    pub image_concepts: ImageConcepts,
    pub video_content: VideoContent,
    pub compliance_report: ComplianceReport,
}

pub const EXPECTED_TITLES: usize = 3;
pub const EXPECTED_KEYWORDS: usize = 30;
pub const EXPECTED_SUPPORTING_CONCEPTS: usize = 5;
pub const EXPECTED_HOOKS: usize = 3;

impl GeneratedContent {
    /// Describe every place where the content misses the requested counts.
    ///
    /// Deviations are advisory: the provider owns the shape, callers only log.
    #[must_use]
    pub fn shape_deviations(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.titles.len() != EXPECTED_TITLES {
            out.push(format!("expected {EXPECTED_TITLES} titles, got {}", self.titles.len()));
        }
        if !(3..=5).contains(&self.short_highlights.len()) {
            out.push(format!("expected 3-5 highlights, got {}", self.short_highlights.len()));
        }
        if !(4..=8).contains(&self.bullet_features.len()) {
            out.push(format!("expected 4-8 features, got {}", self.bullet_features.len()));
        }
        let keywords = self.seo_keywords.total();
        if keywords != EXPECTED_KEYWORDS {
            out.push(format!("expected {EXPECTED_KEYWORDS} SEO keywords, got {keywords}"));
        }
        let supporting = self.image_concepts.supporting.len();
        if supporting != EXPECTED_SUPPORTING_CONCEPTS {
            out.push(format!("expected {EXPECTED_SUPPORTING_CONCEPTS} supporting concepts, got {supporting}"));
        }
        if self.video_content.hooks.len() != EXPECTED_HOOKS {
            out.push(format!("expected {EXPECTED_HOOKS} video hooks, got {}", self.video_content.hooks.len()));
        }
        out
    }
}

// =============================================================================
// SAVED PROJECTS
// =============================================================================

/// Stable, opaque project identifier, minted once on first save.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ProjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Non-binary description of an uploaded image. Survives a reload; the bytes don't.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMeta {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: usize,
}

/// Form snapshot stored with a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    pub product_name: String,
    pub materials: String,
    pub target_market: String,
    pub estimated_price: String,
    pub platform: Option<Platform>,
    pub copywriting_style: CopywritingStyle,
    #[serde(default)]
    pub additional_brief: String,
    #[serde(default)]
    pub images: Vec<ImageMeta>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedProject {
    pub id: ProjectId,
    pub name: String,
    /// Milliseconds since Unix epoch of the creation or last save.
    pub timestamp: i64,
    pub input: ProjectInput,
    pub result: Option<GeneratedContent>,
}

/// Sort newest first. Equal timestamps fall back to id order, so the result
/// does not depend on the input order.
pub fn sort_newest_first(projects: &mut [SavedProject]) {
    projects.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
}

#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}
