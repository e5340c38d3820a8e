//! Integration tests for `OpenAiProvider` using wiremock HTTP mocks.

use astrocast_core::ProviderSettings;
use astrocast_providers::{
    CompletionRequest, GenerativeProvider, OpenAiProvider, ProviderError, StreamEvent,
};
use futures::StreamExt;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(base_url: &str, api_key: &str) -> ProviderSettings {
    ProviderSettings {
        api_key: Some(api_key.to_owned()),
        base_url: base_url.to_owned(),
        model: "gpt-test".to_owned(),
        priority: 2,
    }
}

fn test_provider(base_url: &str) -> OpenAiProvider {
    OpenAiProvider::new(&settings(base_url, "sk-test"), 30)
        .expect("client construction should not fail")
}

fn request() -> CompletionRequest {
    CompletionRequest::new("You are an astrologer.", "Predict my week.")
}

#[tokio::test]
async fn complete_sends_system_and_user_messages() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "gpt-test",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": "{\"general\":\"ok\"}" },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 80, "completion_tokens": 20, "total_tokens": 100 }
    });

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-test",
            "messages": [
                { "role": "system", "content": "You are an astrologer." },
                { "role": "user", "content": "Predict my week." }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let completion = test_provider(&server.uri())
        .complete(&request())
        .await
        .expect("should complete");

    assert_eq!(completion.text, "{\"general\":\"ok\"}");
    assert_eq!(completion.usage.input_tokens, 80);
    assert_eq!(completion.usage.output_tokens, 20);
}

#[tokio::test]
async fn server_error_is_retriable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let err = test_provider(&server.uri())
        .complete(&request())
        .await
        .expect_err("503 should fail");
    assert!(matches!(err, ProviderError::Upstream { status: 503, .. }), "{err:?}");
    assert!(err.is_retriable());
}

#[tokio::test]
async fn malformed_body_is_not_retriable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = test_provider(&server.uri())
        .complete(&request())
        .await
        .expect_err("garbage should fail");
    assert!(matches!(err, ProviderError::Deserialize { .. }), "{err:?}");
    assert!(!err.is_retriable());
}

#[tokio::test]
async fn null_content_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": null } }]
        })))
        .mount(&server)
        .await;

    let err = test_provider(&server.uri())
        .complete(&request())
        .await
        .expect_err("null content should fail");
    assert!(matches!(err, ProviderError::EmptyResponse { .. }));
}

#[tokio::test]
async fn stream_requests_usage_and_stops_at_done() {
    let server = MockServer::start().await;

    let sse = concat!(
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}],\"usage\":null}\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Mars \"}}],\"usage\":null}\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"roars.\"}}],\"usage\":null}\n\n",
        "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":50,\"completion_tokens\":4,\"total_tokens\":54}}\n\n",
        "data: [DONE]\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"ignored\"}}]}\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "stream": true,
            "stream_options": { "include_usage": true }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .mount(&server)
        .await;

    let events: Vec<StreamEvent> = test_provider(&server.uri())
        .stream(&request())
        .await
        .expect("stream should open")
        .map(|e| e.expect("no stream errors"))
        .collect()
        .await;

    assert_eq!(
        events,
        vec![
            StreamEvent::Delta("Mars ".to_owned()),
            StreamEvent::Delta("roars.".to_owned()),
            StreamEvent::Usage(astrocast_providers::TokenUsage {
                input_tokens: 50,
                output_tokens: 4,
            }),
        ]
    );
}

#[tokio::test]
async fn stream_open_failure_is_returned_before_streaming() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let result = test_provider(&server.uri()).stream(&request()).await;
    assert!(matches!(result, Err(ProviderError::RateLimited { .. })));
}

#[tokio::test]
async fn stream_without_done_sentinel_ends_in_error() {
    let server = MockServer::start().await;

    let sse = concat!(
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Mars \"}}],\"usage\":null}\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"ro\"}}],\"usage\":null}\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .mount(&server)
        .await;

    let items: Vec<_> = test_provider(&server.uri())
        .stream(&request())
        .await
        .expect("stream should open")
        .collect()
        .await;

    assert_eq!(items.len(), 3);
    assert!(matches!(items[1], Ok(StreamEvent::Delta(ref t)) if t == "ro"));
    assert!(matches!(
        items[2],
        Err(ProviderError::Stream { ref provider, .. }) if provider == "openai"
    ));
}

#[tokio::test]
async fn whitespace_key_is_never_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(&settings(&server.uri(), "\t "), 30)
        .expect("client construction should not fail");
    assert!(!provider.is_configured());
    let err = provider
        .stream(&request())
        .await
        .err()
        .expect("blank key should not open a stream");
    assert!(matches!(err, ProviderError::NotConfigured { .. }));
}
