use super::*;
use crate::model::{CopywritingStyle, Platform};
use crate::services::intake::{CandidateFile, add_images};
use crate::state::test_helpers::{fill_valid_form, harness, png};

// =============================================================================
// validate
// =============================================================================

#[tokio::test]
async fn complete_form_is_valid() {
    let h = harness();
    fill_valid_form(&h.studio).await;
    assert!(validate(&h.studio.state.read().await.form).is_ok());
}

#[tokio::test]
async fn empty_product_name_blocks() {
    let h = harness();
    fill_valid_form(&h.studio).await;
    let mut state = h.studio.state.write().await;
    state.form.product_name = "   ".into();
    let err = validate(&state.form).unwrap_err();
    assert_eq!(err.missing, [MissingField::ProductName]);
}

#[tokio::test]
async fn zero_images_blocks() {
    let h = harness();
    fill_valid_form(&h.studio).await;
    let mut state = h.studio.state.write().await;
    state.form.images.clear();
    let err = validate(&state.form).unwrap_err();
    assert_eq!(err.missing, [MissingField::Images]);
}

#[tokio::test]
async fn unset_platform_blocks() {
    let h = harness();
    fill_valid_form(&h.studio).await;
    let mut state = h.studio.state.write().await;
    state.form.platform = None;
    let err = validate(&state.form).unwrap_err();
    assert_eq!(err.missing, [MissingField::Platform]);
}

#[test]
fn empty_form_lists_every_missing_field() {
    let err = validate(&ProductForm::default()).unwrap_err();
    assert_eq!(err.missing, [MissingField::ProductName, MissingField::Images, MissingField::Platform]);
    let message = err.to_string();
    assert!(message.contains("product name, product photo, marketplace"));
}

// =============================================================================
// build_request
// =============================================================================

#[tokio::test]
async fn request_carries_images_in_order() {
    let h = harness();
    fill_valid_form(&h.studio).await;
    add_images(&h.studio, vec![CandidateFile::from_bytes("side.jpg", "image/jpeg", vec![1, 2]), png("back.png")]).await;

    let state = h.studio.state.read().await;
    let request = build_request(&state.form).unwrap();
    let mimes: Vec<&str> = request.images.iter().map(|i| i.mime_type.as_str()).collect();
    assert_eq!(mimes, ["image/png", "image/jpeg", "image/png"]);
    assert_eq!(request.images[1].data, "AQI=");
}

#[test]
fn invalid_form_builds_nothing() {
    assert!(build_request(&ProductForm::default()).is_err());
}

// =============================================================================
// build_instruction
// =============================================================================

#[test]
fn instruction_encodes_platform_tone_and_checklist() {
    let form = ProductForm {
        product_name: "Kaos A".into(),
        platform: Some(Platform::TikTokShop),
        copywriting_style: CopywritingStyle::HardSelling,
        ..ProductForm::default()
    };
    let text = build_instruction(&form);
    assert!(text.contains("TikTok Shop"));
    assert!(text.contains("Hard Selling"));
    assert!(text.contains("exactly 3 SEO-optimized product titles"));
    assert!(text.contains("3-5 short bullet points"));
    assert!(text.contains("4-8 detailed feature points"));
    assert!(text.contains("exactly 30 unique keywords split 5 primary"));
    assert!(text.contains("8 secondary"));
    assert!(text.contains("10 long-tail"));
    assert!(text.contains("7 backend tags"));
    assert!(text.contains("exactly 5 supporting concepts"));
    assert!(text.contains("3 hooks"));
    assert!(text.contains("[CTA]...[/CTA]"));
    assert!(text.contains("Indonesian"));
}

#[test]
fn instruction_falls_back_to_default_brief() {
    let form = ProductForm { product_name: "Kaos A".into(), ..ProductForm::default() };
    assert!(build_instruction(&form).contains(DEFAULT_BRIEF));

    let custom = ProductForm { additional_brief: "Target Gen Z.".into(), ..form };
    let text = build_instruction(&custom);
    assert!(text.contains("Target Gen Z."));
    assert!(!text.contains(DEFAULT_BRIEF));
}

#[test]
fn keyword_split_totals_thirty() {
    assert_eq!(KEYWORD_SPLIT.iter().sum::<usize>(), crate::model::EXPECTED_KEYWORDS);
}
