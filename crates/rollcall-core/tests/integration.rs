//! End-to-end tests for the analyzer pipeline.
//!
//! Uses a MockGenerator that replays scripted replies without touching the
//! network, and paused tokio time so rate-limit waits finish instantly.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rollcall_core::gemini::{ContentGenerator, GenerateError, GenerateRequest};
use rollcall_core::model::MatchKind;
use rollcall_core::{Analyzer, AnalyzerConfig, Confidence, Lot, RollcallError, SheetFile};

#[derive(Clone, Default)]
struct MockGenerator {
    replies: Arc<Mutex<VecDeque<Result<String, GenerateError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockGenerator {
    fn new(replies: Vec<Result<String, GenerateError>>) -> Self {
        MockGenerator {
            replies: Arc::new(Mutex::new(replies.into())),
            calls: Arc::default(),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentGenerator for MockGenerator {
    async fn generate(
        &self,
        model: &str,
        _request: &GenerateRequest,
    ) -> Result<String, GenerateError> {
        self.calls.lock().unwrap().push(model.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GenerateError::EmptyResponse))
    }
}

fn config() -> AnalyzerConfig {
    AnalyzerConfig {
        api_key: Some("test-key".into()),
        models: vec!["model-a".into(), "model-b".into(), "model-c".into()],
        ..AnalyzerConfig::default()
    }
}

fn jpeg(name: &str) -> SheetFile {
    SheetFile::new(name, "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00])
}

fn reply(count: usize, names: &[&str], lot: &str) -> String {
    serde_json::json!({
        "studentCount": count,
        "studentNames": names,
        "lotIdentified": lot,
        "zoneIdentified": "",
        "confidence": "high",
        "notes": "clear image",
        "illegibleNames": []
    })
    .to_string()
}

fn rate_limited() -> Result<String, GenerateError> {
    Err(GenerateError::RateLimited("RESOURCE_EXHAUSTED".into()))
}

fn lots() -> Vec<Lot> {
    vec![
        Lot::new("lot-1", "Lot 43").with_zone("Zone 1"),
        Lot::new("lot-2", "Hawkeye Commuter Lot"),
    ]
}

// ---------------------------------------------------------------------------
// Model fallback
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn rate_limits_wait_then_fall_back() {
    let generator = MockGenerator::new(vec![
        rate_limited(),
        rate_limited(),
        Ok(reply(2, &["Emma Johnson", "Liam Williams"], "Lot 43")),
    ]);
    let analyzer = Analyzer::new(generator.clone(), config());

    let start = tokio::time::Instant::now();
    let result = analyzer
        .analyze_sheet(&jpeg("sheet.jpg"), &lots()[0])
        .await
        .unwrap();

    assert!(start.elapsed() >= Duration::from_secs(120));
    assert_eq!(generator.calls(), ["model-a", "model-b", "model-c"]);
    assert_eq!(result.model, "model-c");
    assert_eq!(result.count, 2);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_on_last_model_is_final() {
    let generator = MockGenerator::new(vec![rate_limited(), rate_limited(), rate_limited()]);
    let analyzer = Analyzer::new(generator.clone(), config());

    let start = tokio::time::Instant::now();
    let err = analyzer
        .analyze_sheet(&jpeg("sheet.jpg"), &lots()[0])
        .await
        .unwrap_err();

    assert!(matches!(err, RollcallError::RateLimitExceeded));
    // Two waits; none after the last model.
    assert!(start.elapsed() >= Duration::from_secs(120));
    assert!(start.elapsed() < Duration::from_secs(180));
    assert_eq!(generator.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn other_failures_fall_back_without_waiting() {
    let generator = MockGenerator::new(vec![
        Err(GenerateError::ModelNotFound("model-a".into())),
        Ok(reply(1, &["Ava Brown"], "Lot 43")),
    ]);
    let analyzer = Analyzer::new(generator.clone(), config());

    let start = tokio::time::Instant::now();
    let result = analyzer
        .analyze_sheet(&jpeg("sheet.jpg"), &lots()[0])
        .await
        .unwrap();

    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(result.model, "model-b");
}

#[tokio::test]
async fn last_model_error_is_reported_with_its_cause() {
    let generator = MockGenerator::new(vec![
        Err(GenerateError::Timeout),
        Err(GenerateError::Network("connection reset".into())),
        Err(GenerateError::Unauthorized("API_KEY_INVALID".into())),
    ]);
    let analyzer = Analyzer::new(generator, config());

    let err = analyzer
        .analyze_sheet(&jpeg("sheet.jpg"), &lots()[0])
        .await
        .unwrap_err();

    match &err {
        RollcallError::Model { model, source } => {
            assert_eq!(model, "model-c");
            assert!(matches!(source, GenerateError::Unauthorized(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.user_message().starts_with("Invalid API key"));
}

// ---------------------------------------------------------------------------
// Reply handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn count_follows_extracted_names() {
    let text = format!(
        "Sure! Here is the result:\n```json\n{}\n```",
        reply(5, &["Emma Johnson", "Liam Williams", "Ava Brown"], "Lot 43")
    );
    let analyzer = Analyzer::new(MockGenerator::new(vec![Ok(text)]), config());

    let result = analyzer
        .analyze_sheet(&jpeg("sheet.jpg"), &lots()[0])
        .await
        .unwrap();

    assert_eq!(result.count, 3);
    assert_eq!(result.reported_count, Some(5.0));
    assert!(result
        .notes
        .contains("[Note: AI reported count 5 adjusted to match 3 extracted names]"));
    assert_eq!(result.confidence, Confidence::High);
    assert!(!result.analyzed_at.is_empty());
}

#[tokio::test]
async fn non_json_reply_is_a_format_error() {
    let analyzer = Analyzer::new(
        MockGenerator::new(vec![Ok("I cannot read this image.".into())]),
        config(),
    );
    let err = analyzer
        .analyze_sheet(&jpeg("sheet.jpg"), &lots()[0])
        .await
        .unwrap_err();
    assert!(matches!(err, RollcallError::ResponseFormat(_)));
}

#[tokio::test]
async fn invalid_image_never_reaches_the_model() {
    let generator = MockGenerator::new(vec![]);
    let analyzer = Analyzer::new(generator.clone(), config());

    let gif = SheetFile::new("sheet.gif", "image/gif", b"GIF89a".to_vec());
    let err = analyzer.analyze_sheet(&gif, &lots()[0]).await.unwrap_err();

    assert!(matches!(err, RollcallError::InvalidFileType(_)));
    assert!(generator.calls().is_empty());
}

#[tokio::test]
async fn identification_requires_a_lot() {
    let analyzer = Analyzer::new(
        MockGenerator::new(vec![Ok(reply(1, &["Ava Brown"], ""))]),
        config(),
    );
    let err = analyzer
        .analyze_with_lot_identification(&jpeg("sheet.jpg"), &lots())
        .await
        .unwrap_err();
    assert!(matches!(err, RollcallError::LotNotIdentified));
}

// ---------------------------------------------------------------------------
// Bulk analysis
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bulk_assigns_lots_and_collects_failures() {
    let generator = MockGenerator::new(vec![
        Ok(reply(2, &["Emma Johnson", "Liam Williams"], "Lot 43")),
        Ok(reply(1, &["Ava Brown"], "Hawkeye Lot")),
        Ok(reply(1, &["Noah Davis"], "Lot 99")),
    ]);
    let analyzer = Analyzer::new(generator, config());
    let files = vec![jpeg("a.jpg"), jpeg("b.jpg"), jpeg("c.jpg")];

    let mut progress = Vec::new();
    let report = analyzer
        .analyze_bulk(&files, &lots(), |p| progress.push(p))
        .await
        .unwrap();

    assert_eq!(progress, [33, 67, 100]);
    assert_eq!(report.successful.len(), 2);

    let first = &report.successful[0];
    assert_eq!(first.lot_id, "lot-1");
    assert_eq!(first.match_kind, MatchKind::Exact);

    let second = &report.successful[1];
    assert_eq!(second.lot_id, "lot-2");
    assert_eq!(second.detected_lot_name, "Hawkeye Lot");
    assert_eq!(second.match_kind, MatchKind::Fuzzy);

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].file_name, "c.jpg");
    assert!(report.failed[0].error.contains("Found: \"Lot 99\""));
    assert!(report.failed[0].original_error.contains("Lot 99"));
}

#[tokio::test]
async fn bulk_rejects_empty_inputs() {
    let analyzer = Analyzer::new(MockGenerator::default(), config());

    let err = analyzer
        .analyze_bulk(&[], &lots(), |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, RollcallError::InvalidInput(_)));

    let err = analyzer
        .analyze_bulk(&[jpeg("a.jpg")], &[], |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, RollcallError::InvalidInput(_)));
}

#[test]
fn gemini_analyzer_needs_a_real_key() {
    let mut config = config();
    config.api_key = Some("your_gemini_api_key_here".into());
    assert!(matches!(
        Analyzer::gemini(config),
        Err(RollcallError::NotConfigured)
    ));
}
