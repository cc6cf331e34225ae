//! Request builder — form preconditions and the content-generation payload.

use std::fmt::Write;

use crate::llm::types::ContentRequest;
use crate::model::{EXPECTED_HOOKS, EXPECTED_KEYWORDS, EXPECTED_SUPPORTING_CONCEPTS, EXPECTED_TITLES};
use crate::state::ProductForm;

/// Brief used when the user leaves the additional brief empty.
pub const DEFAULT_BRIEF: &str = "Maximize sales conversion.";

/// SEO keyword split: primary, secondary, long-tail, backend tags.
pub const KEYWORD_SPLIT: [usize; 4] = [5, 8, 10, 7];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    ProductName,
    Images,
    Platform,
}

impl MissingField {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::ProductName => "product name",
            Self::Images => "product photo",
            Self::Platform => "marketplace",
        }
    }
}

fn join_labels(fields: &[MissingField]) -> String {
    fields
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Please complete the product details ({}) so the AI can do its best work.", join_labels(.missing))]
pub struct ValidationError {
    pub missing: Vec<MissingField>,
}

/// Check the generation preconditions.
///
/// # Errors
///
/// Returns a [`ValidationError`] listing every missing field.
pub fn validate(form: &ProductForm) -> Result<(), ValidationError> {
    let mut missing = Vec::new();
    if form.product_name.trim().is_empty() {
        missing.push(MissingField::ProductName);
    }
    if form.images.is_empty() {
        missing.push(MissingField::Images);
    }
    if form.platform.is_none() {
        missing.push(MissingField::Platform);
    }
    if missing.is_empty() { Ok(()) } else { Err(ValidationError { missing }) }
}

/// Validate and project the form into a [`ContentRequest`].
///
/// # Errors
///
/// Returns a [`ValidationError`] when a precondition fails; no payload is built.
pub fn build_request(form: &ProductForm) -> Result<ContentRequest, ValidationError> {
    validate(form)?;
    Ok(ContentRequest {
        instruction: build_instruction(form),
        images: form.images.iter().map(|img| img.to_inline()).collect(),
    })
}

/// The single combined instruction sent with the images.
#[must_use]
pub fn build_instruction(form: &ProductForm) -> String {
    let platform = form.platform.map_or("", |p| p.label());
    let style = form.copywriting_style.label();
    let brief = if form.additional_brief.trim().is_empty() { DEFAULT_BRIEF } else { form.additional_brief.trim() };
    let [primary, secondary, long_tail, backend] = KEYWORD_SPLIT;

    let mut out = String::with_capacity(2048);
    let _ = writeln!(out, "ROLE: senior e-commerce strategist and copywriter for {platform} sellers.");
    let _ = writeln!(out, "OUTPUT LANGUAGE: Indonesian (Bahasa Indonesia) for every text field.");
    let _ = writeln!(out);
    let _ = writeln!(out, "CONTENT CHECKLIST (exact counts):");
    let _ = writeln!(out, "- titles: exactly {EXPECTED_TITLES} SEO-optimized product titles under 150 characters.");
    let _ = writeln!(out, "- shortHighlights: 3-5 short bullet points.");
    let _ = writeln!(out, "- bulletFeatures: 4-8 detailed feature points.");
    let _ = writeln!(
        out,
        "- seoKeywords: exactly {EXPECTED_KEYWORDS} unique keywords split {primary} primary (high volume), \
         {secondary} secondary (closely related), {long_tail} long-tail (specific buyer questions), \
         {backend} backend tags (hidden terms for the {platform} search algorithm)."
    );
    let _ = writeln!(
        out,
        "- imageConcepts: 1 hero concept and exactly {EXPECTED_SUPPORTING_CONCEPTS} supporting concepts, \
         each with explanation, rationale and a rendering prompt that shows the product in real use."
    );
    let _ = writeln!(
        out,
        "- videoContent: {EXPECTED_HOOKS} hooks for the first 3 seconds and a multi-scene storyboard."
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "LONG DESCRIPTION:");
    let _ = writeln!(out, "- Follow AIDA (attention, interest, desire, action).");
    let _ = writeln!(out, "- Describe at least 3 real usage scenarios and answer at least 3 buyer pain points.");
    let _ = writeln!(out, "- Include KEY HIGHLIGHTS, MAIN FEATURES and TECHNICAL SPECIFICATIONS sections.");
    let _ = writeln!(out, "- Wrap the closing call to action in [CTA]...[/CTA].");
    let _ = writeln!(out);
    let _ = writeln!(out, "COPYWRITING STYLE: {style}.");
    let _ = writeln!(out);
    let _ = writeln!(out, "PRODUCT DATA:");
    let _ = writeln!(out, "- Product: {}", form.product_name.trim());
    let _ = writeln!(out, "- Materials: {}", form.materials);
    let _ = writeln!(out, "- Target market: {}", form.target_market);
    let _ = writeln!(out, "- Price: {}", form.estimated_price);
    let _ = writeln!(out, "- Platform: {platform}");
    let _ = writeln!(out);
    let _ = writeln!(out, "SPECIAL BRIEF: \"{brief}\"");
    let _ = writeln!(out);
    let _ = write!(
        out,
        "Return one JSON object matching the schema. The SEO keyword total must be exactly {EXPECTED_KEYWORDS}."
    );
    out
}

#[cfg(test)]
#[path = "request_test.rs"]
mod tests;
