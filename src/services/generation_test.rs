use std::time::Duration;

use super::*;
use crate::model::test_helpers::sample_content;
use crate::services::concept::{ConceptId, ConceptImageState};
use crate::services::request::MissingField;
use crate::state::test_helpers::{Harness, MockContent, ScriptedImages, fill_valid_form, harness, harness_with};

fn with_content(responses: Vec<Result<GeneratedContent, LlmError>>) -> Harness {
    harness_with(MockContent::new(responses), ScriptedImages::new(Vec::new()), &[])
}

fn titled(title: &str) -> GeneratedContent {
    let mut content = sample_content();
    content.titles[0] = title.into();
    content
}

// =============================================================================
// FailureKind
// =============================================================================

#[test]
fn classify_safety_block() {
    let err = LlmError::Blocked { reason: "SAFETY".into() };
    assert_eq!(FailureKind::classify(&err), FailureKind::SafetyBlocked);
}

#[test]
fn classify_quota() {
    let err = LlmError::ApiResponse { status: 429, body: "quota exceeded".into() };
    assert_eq!(FailureKind::classify(&err), FailureKind::QuotaExceeded);
}

#[test]
fn classify_everything_else_as_generic() {
    assert_eq!(FailureKind::classify(&LlmError::EmptyResponse), FailureKind::Generic);
    assert_eq!(FailureKind::classify(&LlmError::ApiRequest("dns".into())), FailureKind::Generic);
    let err = LlmError::ApiResponse { status: 500, body: "internal".into() };
    assert_eq!(FailureKind::classify(&err), FailureKind::Generic);
}

// =============================================================================
// GenerationState
// =============================================================================

#[test]
fn resolve_with_old_token_is_ignored() {
    let mut gen_state = GenerationState::default();
    let first = gen_state.begin();
    let second = gen_state.begin();
    assert!(!gen_state.resolve(first, Err("late".into())));
    assert!(gen_state.is_loading());
    assert!(gen_state.resolve(second, Ok(Arc::new(sample_content()))));
    assert!(gen_state.result().is_some());
}

#[test]
fn restore_and_reset_invalidate_inflight_run() {
    let mut gen_state = GenerationState::default();
    let run = gen_state.begin();
    gen_state.restore(Some(sample_content()));
    assert!(!gen_state.resolve(run, Err("late".into())));
    assert!(gen_state.result().is_some());

    let run = gen_state.begin();
    gen_state.reset();
    assert!(!gen_state.resolve(run, Ok(Arc::new(sample_content()))));
    assert_eq!(gen_state.status(), &GenerationStatus::Idle);
}

// =============================================================================
// generate
// =============================================================================

#[tokio::test]
async fn incomplete_form_sends_nothing() {
    let h = harness();
    let err = generate(&h.studio).await.unwrap_err();
    let GenerateError::Validation(v) = err else { panic!("expected validation error") };
    assert_eq!(v.missing, [MissingField::ProductName, MissingField::Images, MissingField::Platform]);
    assert_eq!(h.content.request_count(), 0);

    let state = h.studio.state.read().await;
    assert_eq!(state.generation.status(), &GenerationStatus::Idle);
    assert!(state.error_message().unwrap().starts_with("Please complete the product details"));
}

#[tokio::test]
async fn missing_platform_alone_blocks() {
    let h = harness();
    fill_valid_form(&h.studio).await;
    h.studio.state.write().await.form.platform = None;

    let err = generate(&h.studio).await.unwrap_err();
    assert!(matches!(err, GenerateError::Validation(ref v) if v.missing == [MissingField::Platform]));
    assert_eq!(h.content.request_count(), 0);
}

#[tokio::test]
async fn success_publishes_result_and_starts_hero() {
    let h = harness();
    fill_valid_form(&h.studio).await;

    let content = generate(&h.studio).await.unwrap();
    assert_eq!(*content, sample_content());
    {
        let state = h.studio.state.read().await;
        assert_eq!(state.generation.result(), Some(&content));
        assert!(state.error_message().is_none());
        assert_eq!(state.concepts.ids().len(), 6);
    }

    let hero = crate::services::concept::wait_settled(&h.studio, ConceptId::Hero, Duration::from_millis(5))
        .await
        .unwrap();
    assert_eq!(hero, ConceptImageState::success("aW1hZ2U=".into()));
    assert_eq!(h.images.call_count(), 1);

    let state = h.studio.state.read().await;
    assert_eq!(state.concepts.get(ConceptId::Supporting(0)), Some(&ConceptImageState::idle()));
}

#[tokio::test]
async fn request_carries_form_images() {
    let h = harness();
    fill_valid_form(&h.studio).await;
    generate(&h.studio).await.unwrap();

    let requests = h.content.requests.lock().unwrap();
    assert_eq!(requests[0].images.len(), 1);
    assert_eq!(requests[0].images[0].mime_type, "image/png");
    assert!(requests[0].instruction.contains("Kaos A"));
}

#[tokio::test(start_paused = true)]
async fn entering_loading_clears_previous_result() {
    let h = harness_with(
        MockContent::delayed(vec![
            (Duration::ZERO, Ok(sample_content())),
            (Duration::from_secs(1), Ok(titled("Second"))),
        ]),
        ScriptedImages::new(Vec::new()),
        &[],
    );
    fill_valid_form(&h.studio).await;
    generate(&h.studio).await.unwrap();

    let studio = h.studio.clone();
    let second = tokio::spawn(async move { generate(&studio).await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    {
        let state = h.studio.state.read().await;
        assert!(state.generation.is_loading());
        assert!(state.generation.result().is_none());
        assert!(state.concepts.is_empty());
    }

    let content = second.await.unwrap().unwrap();
    assert_eq!(content.titles[0], "Second");
}

#[tokio::test]
async fn safety_block_shows_safety_message() {
    let h = with_content(vec![Err(LlmError::Blocked { reason: "PROHIBITED_CONTENT".into() })]);
    fill_valid_form(&h.studio).await;

    let err = generate(&h.studio).await.unwrap_err();
    assert!(matches!(err, GenerateError::Failed(FailureKind::SafetyBlocked)));

    let state = h.studio.state.read().await;
    assert_eq!(state.generation.error(), Some(FailureKind::SafetyBlocked.user_message()));
    assert!(!state.error_message().unwrap().contains("PROHIBITED_CONTENT"));
    assert!(state.concepts.is_empty());
}

#[tokio::test]
async fn quota_failure_shows_quota_message() {
    let h = with_content(vec![Err(LlmError::ApiResponse { status: 429, body: "RESOURCE_EXHAUSTED".into() })]);
    fill_valid_form(&h.studio).await;

    let err = generate(&h.studio).await.unwrap_err();
    assert!(matches!(err, GenerateError::Failed(FailureKind::QuotaExceeded)));
    let state = h.studio.state.read().await;
    assert_eq!(state.error_message(), Some("API quota reached. Please wait a moment and try again."));
}

#[tokio::test]
async fn generic_failure_hides_provider_text() {
    let h = with_content(vec![Err(LlmError::ApiResponse { status: 500, body: "stack trace here".into() })]);
    fill_valid_form(&h.studio).await;

    generate(&h.studio).await.unwrap_err();
    let state = h.studio.state.read().await;
    let message = state.error_message().unwrap();
    assert_eq!(message, FailureKind::Generic.user_message());
    assert!(!message.contains("stack trace"));
}

#[tokio::test]
async fn retry_after_failure_succeeds() {
    let h = with_content(vec![Err(LlmError::EmptyResponse)]);
    fill_valid_form(&h.studio).await;

    assert!(generate(&h.studio).await.is_err());
    generate(&h.studio).await.unwrap();
    let state = h.studio.state.read().await;
    assert!(state.generation.result().is_some());
    assert!(state.error_message().is_none());
}

#[tokio::test(start_paused = true)]
async fn slow_earlier_run_is_discarded() {
    let h = harness_with(
        MockContent::delayed(vec![
            (Duration::from_secs(5), Ok(titled("Run A"))),
            (Duration::from_secs(1), Ok(titled("Run B"))),
        ]),
        ScriptedImages::new(Vec::new()),
        &[],
    );
    fill_valid_form(&h.studio).await;

    let studio = h.studio.clone();
    let first = tokio::spawn(async move { generate(&studio).await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let second = generate(&h.studio).await.unwrap();
    assert_eq!(second.titles[0], "Run B");

    let first = first.await.unwrap();
    assert!(matches!(first, Err(GenerateError::Superseded)));

    let state = h.studio.state.read().await;
    assert_eq!(state.generation.result().unwrap().titles[0], "Run B");
    assert_eq!(state.concepts.run(), state.generation.token());
}

#[tokio::test(start_paused = true)]
async fn new_session_discards_inflight_run() {
    let h = harness_with(
        MockContent::delayed(vec![(Duration::from_secs(2), Ok(sample_content()))]),
        ScriptedImages::new(Vec::new()),
        &[],
    );
    fill_valid_form(&h.studio).await;

    let studio = h.studio.clone();
    let run = tokio::spawn(async move { generate(&studio).await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    crate::services::projects::new_project(&h.studio).await;

    assert!(matches!(run.await.unwrap(), Err(GenerateError::Superseded)));
    let state = h.studio.state.read().await;
    assert_eq!(state.generation.status(), &GenerationStatus::Idle);
    assert!(state.concepts.is_empty());
}
