//! Mock HTTP tests for Gemini image generation.
//!
//! These tests cover:
//! - Request wire format per model tier
//! - One-shot fallback to the fast model on permission/not-found
//! - No fallback for other failures
//! - Response extraction errors

use lumiframe::{
    AspectRatio, Config, DataUri, GeminiProvider, GenError, GenerationRequest, ImageModel,
    ImageProvider, MediaKind, Resolution,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STANDARD_PATH: &str = "/models/gemini-3-pro-image-preview:generateContent";
const FAST_PATH: &str = "/models/gemini-2.5-flash-image:generateContent";

fn provider(server: &MockServer) -> GeminiProvider {
    let config = Config::builder()
        .api_key("test-key")
        .base_url(server.uri())
        .build()
        .unwrap();
    GeminiProvider::new(config)
}

fn image_response(mime: &str, data: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "candidates": [{
            "content": {"parts": [
                {"text": "here you go"},
                {"inlineData": {"mimeType": mime, "data": data}}
            ]},
            "finishReason": "STOP"
        }]
    }))
}

fn google_error(status: u16, code: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(serde_json::json!({
        "error": {"code": status, "message": message, "status": code}
    }))
}

#[tokio::test]
async fn test_standard_model_sends_resolution_and_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STANDARD_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(image_response("image/png", "AQID"))
        .expect(1)
        .mount(&server)
        .await;

    let request = GenerationRequest::new("a red fox")
        .with_aspect_ratio(AspectRatio::Portrait)
        .with_resolution(Resolution::TwoK);
    let image = provider(&server).generate(&request).await.unwrap();

    assert_eq!(image.data, vec![1, 2, 3]);
    assert_eq!(image.mime_type, "image/png");
    assert!(!image.metadata.fallback_used);
    assert_eq!(image.metadata.model.as_deref(), Some(ImageModel::Standard.as_str()));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["contents"][0]["parts"][0]["text"], "a red fox");
    assert_eq!(body["generationConfig"]["responseModalities"][0], "IMAGE");
    assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "9:16");
    assert_eq!(body["generationConfig"]["imageConfig"]["imageSize"], "2K");
}

#[tokio::test]
async fn test_fast_model_is_called_once_without_resolution() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(FAST_PATH))
        .respond_with(image_response("image/jpeg", "AQID"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(STANDARD_PATH))
        .respond_with(image_response("image/png", "AQID"))
        .expect(0)
        .mount(&server)
        .await;

    let request = GenerationRequest::new("a red fox")
        .with_model(ImageModel::Fast)
        .with_resolution(Resolution::FourK);
    let image = provider(&server).generate(&request).await.unwrap();
    assert_eq!(image.mime_type, "image/jpeg");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "16:9");
    assert!(body["generationConfig"]["imageConfig"].get("imageSize").is_none());
}

#[tokio::test]
async fn test_fast_model_failure_propagates_unchanged() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(FAST_PATH))
        .respond_with(google_error(404, "NOT_FOUND", "model not found"))
        .expect(1)
        .mount(&server)
        .await;

    let request = GenerationRequest::new("x").with_model(ImageModel::Fast);
    let err = provider(&server).generate(&request).await.unwrap_err();
    assert!(matches!(err, GenError::Api { status: 404, .. }));
}

#[tokio::test]
async fn test_permission_denied_falls_back_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STANDARD_PATH))
        .respond_with(google_error(403, "PERMISSION_DENIED", "caller lacks access"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FAST_PATH))
        .respond_with(image_response("image/png", "AQID"))
        .expect(1)
        .mount(&server)
        .await;

    let request = GenerationRequest::new("a lighthouse").with_resolution(Resolution::FourK);
    let image = provider(&server).generate(&request).await.unwrap();

    assert!(image.metadata.fallback_used);
    assert_eq!(image.metadata.model.as_deref(), Some(ImageModel::Fast.as_str()));

    let requests = server.received_requests().await.unwrap();
    let retry: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(retry["contents"][0]["parts"][0]["text"], "a lighthouse");
    assert!(retry["generationConfig"]["imageConfig"].get("imageSize").is_none());
}

#[tokio::test]
async fn test_not_found_code_in_body_triggers_fallback() {
    let server = MockServer::start().await;

    // Status 400 but the symbolic code says NOT_FOUND
    Mock::given(method("POST"))
        .and(path(STANDARD_PATH))
        .respond_with(google_error(400, "NOT_FOUND", "models/x is not found"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FAST_PATH))
        .respond_with(image_response("image/png", "AQID"))
        .expect(1)
        .mount(&server)
        .await;

    let image = provider(&server)
        .generate(&GenerationRequest::new("x"))
        .await
        .unwrap();
    assert!(image.metadata.fallback_used);
}

#[tokio::test]
async fn test_blocked_wording_with_permission_code_still_falls_back() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STANDARD_PATH))
        .respond_with(google_error(
            400,
            "PERMISSION_DENIED",
            "Access to this model is blocked for the project",
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FAST_PATH))
        .respond_with(image_response("image/png", "AQID"))
        .expect(1)
        .mount(&server)
        .await;

    let image = provider(&server)
        .generate(&GenerationRequest::new("x"))
        .await
        .unwrap();
    assert!(image.metadata.fallback_used);
}

#[tokio::test]
async fn test_fallback_failure_is_final() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STANDARD_PATH))
        .respond_with(google_error(404, "NOT_FOUND", "no such model"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FAST_PATH))
        .respond_with(google_error(500, "INTERNAL", "backend exploded"))
        .expect(1)
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate(&GenerationRequest::new("x"))
        .await
        .unwrap_err();
    match err {
        GenError::Api { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("backend exploded"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_does_not_fall_back() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STANDARD_PATH))
        .respond_with(google_error(500, "INTERNAL", "try later"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FAST_PATH))
        .respond_with(image_response("image/png", "AQID"))
        .expect(0)
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate(&GenerationRequest::new("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, GenError::Api { status: 500, .. }));
}

#[tokio::test]
async fn test_rate_limit_does_not_fall_back() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STANDARD_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FAST_PATH))
        .respond_with(image_response("image/png", "AQID"))
        .expect(0)
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate(&GenerationRequest::new("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, GenError::RateLimited { .. }));
}

#[tokio::test]
async fn test_response_without_image_part() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STANDARD_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "I cannot draw that"}]}}]
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate(&GenerationRequest::new("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, GenError::NoImageData));
}

#[tokio::test]
async fn test_blocked_prompt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STANDARD_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FAST_PATH))
        .respond_with(image_response("image/png", "AQID"))
        .expect(0)
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate(&GenerationRequest::new("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, GenError::ContentBlocked(_)));
}

#[tokio::test]
async fn test_empty_prompt_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(image_response("image/png", "AQID"))
        .expect(0)
        .mount(&server)
        .await;

    let err = provider(&server)
        .generate(&GenerationRequest::new("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, GenError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_result_as_data_uri() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STANDARD_PATH))
        .respond_with(image_response("image/webp", "AQID"))
        .mount(&server)
        .await;

    let image = provider(&server)
        .generate(&GenerationRequest::new("x"))
        .await
        .unwrap();
    let result = image.to_media_result();

    assert_eq!(result.kind, MediaKind::Image);
    assert_eq!(result.data_uri.to_string(), "data:image/webp;base64,AQID");
    let parsed = DataUri::parse(&result.data_uri.to_string()).unwrap();
    assert_eq!(parsed.decode().unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models/gemini-3-pro-image-preview"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "models/gemini-3-pro-image-preview"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server);
    assert_eq!(provider.name(), "Gemini (Google)");
    provider.health_check().await.unwrap();
}

#[tokio::test]
async fn test_health_check_rejected_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = provider(&server).health_check().await.unwrap_err();
    assert!(matches!(err, GenError::Auth(_)));
}
