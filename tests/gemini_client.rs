//! Gemini client against a mocked `generateContent` endpoint.

use serde_json::json;
use shorts_generator::models::job::ContentLanguage;
use shorts_generator::services::gemini::GeminiClient;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "gemini-test";
const ENDPOINT: &str = "/v1beta/models/gemini-test:generateContent";

const SEGMENT: &str = "This is the most amazing story you will ever hear, and the ending is shocking.";

fn client(server: &MockServer, keys: &[&str]) -> GeminiClient {
    GeminiClient::new(&server.uri(), MODEL, keys.iter().map(|k| k.to_string()).collect())
        .with_retry_delay(Duration::ZERO)
}

/// A `generateContent` reply whose first text part is `payload` serialized as JSON.
fn model_reply(payload: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": payload.to_string() }] }
        }]
    }))
}

fn analysis_payload() -> serde_json::Value {
    json!({
        "engagement_score": 0.9,
        "emotion_score": 0.8,
        "viral_potential": 1.7,
        "quotability": 0.6,
        "emotions": ["surprise", "excitement"],
        "keywords": ["story", "ending"],
        "reason": "Strong hook with a surprising ending"
    })
}

fn quota_exceeded() -> ResponseTemplate {
    ResponseTemplate::new(429).set_body_json(json!({
        "error": { "code": 429, "status": "RESOURCE_EXHAUSTED", "message": "Quota exceeded" }
    }))
}

#[tokio::test]
async fn test_quota_error_rotates_to_backup_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header("x-goog-api-key", "primary"))
        .respond_with(quota_exceeded())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header("x-goog-api-key", "backup"))
        .respond_with(model_reply(analysis_payload()))
        .expect(1)
        .mount(&server)
        .await;

    let gemini = client(&server, &["primary", "backup"]);
    let analysis = gemini.analyze_segment(SEGMENT).await;

    assert_eq!(gemini.current_key_index(), 1);
    assert!(gemini.is_available());
    assert_eq!(analysis.engagement_score, 0.9);
    assert_eq!(analysis.viral_potential, 1.0, "scores are clamped to [0, 1]");
    assert_eq!(analysis.reason, "Strong hook with a surprising ending");
}

#[tokio::test]
async fn test_all_keys_exhausted_falls_back_to_heuristics() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(quota_exceeded())
        .expect(2)
        .mount(&server)
        .await;

    let gemini = client(&server, &["first", "second"]);
    let analysis = gemini.analyze_segment(SEGMENT).await;

    assert!(!gemini.is_available());
    assert!(analysis.reason.starts_with("Heuristic analysis"));
    assert!(analysis.engagement_score >= 0.4);

    // Once exhausted no further requests are made.
    let metadata = gemini.generate_metadata(SEGMENT, "Original", ContentLanguage::English).await;
    assert!(!metadata.title.is_empty());
}

#[tokio::test]
async fn test_no_keys_never_calls_the_api() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(model_reply(analysis_payload()))
        .expect(0)
        .mount(&server)
        .await;

    let gemini = client(&server, &[]);
    assert!(!gemini.is_available());
    let analysis = gemini.analyze_segment(SEGMENT).await;
    assert!(analysis.reason.starts_with("Heuristic analysis"));
}

#[tokio::test]
async fn test_unparseable_output_is_retried_then_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "not json at all" }] } }]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let gemini = client(&server, &["only"]);
    let analysis = gemini.analyze_segment(SEGMENT).await;

    assert!(analysis.reason.starts_with("Heuristic analysis"));
    assert!(gemini.is_available(), "parse errors do not spend the key");
}

#[tokio::test]
async fn test_metadata_is_normalized() {
    let server = MockServer::start().await;
    let tags: Vec<String> = (0..40).map(|i| format!("tag-number-{i}")).collect();
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(model_reply(json!({
            "title": format!("  {}  ", "T".repeat(150)),
            "description": "What happens next will surprise you. Subscribe for more!",
            "tags": tags,
        })))
        .mount(&server)
        .await;

    let gemini = client(&server, &["key"]);
    let metadata = gemini.generate_metadata(SEGMENT, "Original", ContentLanguage::Hinglish).await;

    assert_eq!(metadata.title.chars().count(), 100);
    assert!(metadata.description.starts_with("What happens next"));
    assert!(metadata.tags.len() <= 28);
    assert!(metadata.tags.join(", ").len() <= 500);
    assert_eq!(metadata.tags[0], "tag-number-0");
}

#[tokio::test]
async fn test_metadata_backs_off_when_overloaded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(503).set_body_string("The model is overloaded"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(model_reply(json!({
            "title": "A twist nobody saw coming",
            "description": "Full story on the channel.",
            "tags": ["shorts", "story"],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gemini = client(&server, &["key"]);
    let metadata = gemini.generate_metadata(SEGMENT, "Original", ContentLanguage::English).await;

    assert_eq!(metadata.title, "A twist nobody saw coming");
    assert_eq!(metadata.tags, vec!["shorts", "story"]);
    assert_eq!(gemini.current_key_index(), 0, "overload does not rotate keys");
}

#[tokio::test]
async fn test_quota_on_final_metadata_attempt_still_rotates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header("x-goog-api-key", "primary"))
        .respond_with(ResponseTemplate::new(503).set_body_string("The model is overloaded"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header("x-goog-api-key", "primary"))
        .respond_with(quota_exceeded())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header("x-goog-api-key", "backup"))
        .respond_with(model_reply(analysis_payload()))
        .expect(1)
        .mount(&server)
        .await;

    let gemini = client(&server, &["primary", "backup"]);
    let metadata = gemini.generate_metadata(SEGMENT, "Original", ContentLanguage::English).await;
    assert!(!metadata.title.is_empty(), "falls back after the last attempt");
    assert_eq!(gemini.current_key_index(), 1, "spent key is not reused");

    // The next call goes straight to the backup key.
    let analysis = gemini.analyze_segment(SEGMENT).await;
    assert_eq!(analysis.engagement_score, 0.9);
}
