//! Integration tests for `AnthropicProvider` using wiremock HTTP mocks.

use std::sync::Arc;

use astrocast_core::{PriceTable, ProviderSettings};
use astrocast_providers::{
    AnthropicProvider, AttemptOutcome, CancelToken, CompletionRequest, GenerativeProvider,
    Orchestrator, ProviderError, RetryPolicy, StreamChunk, StreamEvent,
};
use futures::StreamExt;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(base_url: &str, api_key: Option<&str>) -> ProviderSettings {
    ProviderSettings {
        api_key: api_key.map(str::to_owned),
        base_url: base_url.to_owned(),
        model: "claude-test".to_owned(),
        priority: 1,
    }
}

fn test_provider(base_url: &str) -> AnthropicProvider {
    AnthropicProvider::new(&settings(base_url, Some("test-key")), 30)
        .expect("client construction should not fail")
}

fn request() -> CompletionRequest {
    CompletionRequest::new("You are an astrologer.", "Predict my day.")
        .with_temperature(0.5)
        .with_max_tokens(300)
}

#[tokio::test]
async fn complete_returns_text_and_usage() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "model": "claude-test",
        "content": [
            { "type": "text", "text": "The stars " },
            { "type": "text", "text": "align." }
        ],
        "usage": { "input_tokens": 120, "output_tokens": 40 }
    });

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(serde_json::json!({
            "model": "claude-test",
            "system": "You are an astrologer.",
            "max_tokens": 300,
            "messages": [{ "role": "user", "content": "Predict my day." }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let completion = test_provider(&server.uri())
        .complete(&request())
        .await
        .expect("should complete");

    assert_eq!(completion.text, "The stars align.");
    assert_eq!(completion.usage.input_tokens, 120);
    assert_eq!(completion.usage.output_tokens, 40);
    assert_eq!(completion.model.as_deref(), Some("claude-test"));
}

#[tokio::test]
async fn rate_limit_maps_to_retriable_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = test_provider(&server.uri())
        .complete(&request())
        .await
        .expect_err("429 should fail");
    assert!(matches!(err, ProviderError::RateLimited { .. }), "{err:?}");
    assert!(err.is_retriable());
}

#[tokio::test]
async fn overloaded_maps_to_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = test_provider(&server.uri())
        .complete(&request())
        .await
        .expect_err("529 should fail");
    match err {
        ProviderError::Upstream { status, ref body, .. } => {
            assert_eq!(status, 529);
            assert_eq!(body, "overloaded");
        }
        other => panic!("expected Upstream, got {other:?}"),
    }
}

#[tokio::test]
async fn unauthorized_is_not_retriable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid x-api-key"))
        .mount(&server)
        .await;

    let err = test_provider(&server.uri())
        .complete(&request())
        .await
        .expect_err("401 should fail");
    assert!(matches!(err, ProviderError::Rejected { status: 401, .. }), "{err:?}");
    assert!(!err.is_retriable());
}

#[tokio::test]
async fn empty_content_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [],
            "usage": { "input_tokens": 10, "output_tokens": 0 }
        })))
        .mount(&server)
        .await;

    let err = test_provider(&server.uri())
        .complete(&request())
        .await
        .expect_err("empty content should fail");
    assert!(matches!(err, ProviderError::EmptyResponse { .. }));
}

#[tokio::test]
async fn missing_key_never_sends_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = AnthropicProvider::new(&settings(&server.uri(), None), 30)
        .expect("client construction should not fail");
    assert!(!provider.is_configured());

    let err = provider
        .complete(&request())
        .await
        .expect_err("unconfigured provider should fail");
    assert!(matches!(err, ProviderError::NotConfigured { .. }));
}

#[tokio::test]
async fn stream_yields_deltas_and_usage() {
    let server = MockServer::start().await;

    let sse = concat!(
        "event: message_start\n",
        "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"usage\":{\"input_tokens\":25,\"output_tokens\":1}}}\n\n",
        "event: content_block_start\n",
        "data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n",
        "event: ping\n",
        "data: {\"type\":\"ping\"}\n\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Venus \"}}\n\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"smiles.\"}}\n\n",
        "event: content_block_stop\n",
        "data: {\"type\":\"content_block_stop\",\"index\":0}\n\n",
        "event: message_delta\n",
        "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":15}}\n\n",
        "event: message_stop\n",
        "data: {\"type\":\"message_stop\"}\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(serde_json::json!({ "stream": true })))
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

    let text: String = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Delta(t) => Some(t.as_str()),
            StreamEvent::Usage(_) => None,
        })
        .collect();
    assert_eq!(text, "Venus smiles.");

    let usage = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Usage(u) => Some(*u),
            StreamEvent::Delta(_) => None,
        })
        .fold(Default::default(), astrocast_providers::TokenUsage::merge_max);
    assert_eq!(usage.input_tokens, 25);
    assert_eq!(usage.output_tokens, 15);
}

#[tokio::test]
async fn stream_error_event_surfaces_as_item() {
    let server = MockServer::start().await;

    let sse = concat!(
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Par\"}}\n\n",
        "data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .mount(&server)
        .await;

    let items: Vec<_> = test_provider(&server.uri())
        .stream(&request())
        .await
        .expect("stream should open")
        .collect()
        .await;

    assert_eq!(items.len(), 2);
    assert!(matches!(items[0], Ok(StreamEvent::Delta(ref t)) if t == "Par"));
    assert!(matches!(items[1], Err(ProviderError::Stream { .. })));
}

#[tokio::test]
async fn blank_key_counts_as_unconfigured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let settings = settings(&server.uri(), Some("   "));
    assert!(!settings.is_configured());
    let provider =
        AnthropicProvider::new(&settings, 30).expect("client construction should not fail");
    assert!(!provider.is_configured());

    let err = provider
        .complete(&request())
        .await
        .expect_err("blank key should not be sent");
    assert!(matches!(err, ProviderError::NotConfigured { .. }));
}

#[tokio::test]
async fn body_closing_before_message_stop_is_a_failed_stream() {
    let server = MockServer::start().await;

    let sse = concat!(
        "event: message_start\n",
        "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"usage\":{\"input_tokens\":25,\"output_tokens\":1}}}\n\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Half a sen\"}}\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .mount(&server)
        .await;

    let provider: Arc<dyn GenerativeProvider> = Arc::new(test_provider(&server.uri()));
    let orch = Arc::new(Orchestrator::new(
        vec![provider],
        RetryPolicy::default(),
        PriceTable::builtin(),
    ));

    let chunks: Vec<StreamChunk> = orch
        .generate_streaming(request(), None, CancelToken::never())
        .collect()
        .await;

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0], StreamChunk::Text("Half a sen".to_owned()));
    assert!(
        matches!(chunks[1], StreamChunk::Error(ref m) if m.contains("terminal event")),
        "{chunks:?}"
    );

    let log = orch.usage_for("anthropic");
    assert_eq!(log.len(), 1);
    assert!(matches!(log[0].outcome, AttemptOutcome::Failed { .. }));
}
