//! Integration tests for the Gemini provider against a mock HTTP server

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notescribe_server::config::GeminiConfig;
use notescribe_server::gateway::{Content, GeminiProvider, Provider};

fn provider_for(server: &MockServer) -> GeminiProvider {
    let config = GeminiConfig {
        model: "gemini-2.0-flash".to_string(),
        api_key: Some("test-key".to_string()),
        api_base: Some(server.uri()),
    };
    GeminiProvider::new(config).expect("provider should build")
}

#[tokio::test]
async fn test_generate_returns_candidate_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "Hello "}, {"text": "there"}]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let contents = vec![Content::user_text("Hi")];
    let response = provider.generate(&contents).await.expect("generate ok");
    assert_eq!(response.text, "Hello there");
}

#[tokio::test]
async fn test_generate_with_no_candidates_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let response = provider
        .generate(&[Content::user_text("Hi")])
        .await
        .expect("generate ok");
    assert!(response.is_empty());
}

#[tokio::test]
async fn test_generate_propagates_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let result = provider.generate(&[Content::user_text("Hi")]).await;
    assert!(result.is_err());
    let message = format!("{}", result.unwrap_err());
    assert!(message.contains("500"), "unexpected error: {}", message);
}

#[tokio::test]
async fn test_generate_without_key_is_missing_credentials() {
    let config = GeminiConfig {
        model: "gemini-2.0-flash".to_string(),
        api_key: None,
        api_base: None,
    };
    let provider = GeminiProvider::new(config).expect("provider should build");
    assert!(!provider.is_configured());

    let result = provider.generate(&[Content::user_text("Hi")]).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_streaming_concatenates_sse_chunks() {
    let server = MockServer::start().await;

    let body = concat!(
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"The \"}]}}]}\n",
        "\n",
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"quick \"}]}}]}\n",
        "\n",
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"fox\"}]}}]}\n",
        "\n",
        "data: [DONE]\n",
    );

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .and(query_param("key", "test-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let text = provider
        .generate_streaming(&[Content::user_text("Hi")])
        .await
        .expect("streaming ok");
    assert_eq!(text, "The quick fox");
}

#[tokio::test]
async fn test_streaming_skips_malformed_events() {
    let server = MockServer::start().await;

    let body = concat!(
        "data: not json at all\n",
        "\n",
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"ok\"}]}}]}\n",
        "\n",
    );

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:streamGenerateContent"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let text = provider
        .generate_streaming(&[Content::user_text("Hi")])
        .await
        .expect("streaming ok");
    assert_eq!(text, "ok");
}
