use std::sync::Arc;
use std::time::Duration;

use photojudge::gateway::openrouter::{ChatProvider, OpenRouterAdapter};
use photojudge::gateway::{
    Attribution, ChatModel, ChatRequest, FinishReason, ImageData, Message, NoopUsageSink,
    ProviderError, ProviderGateway, RateLimitSource,
};
use photojudge::ModelClient;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn openrouter_parses_success_content_and_usage() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "content": "SCORE: 7.0\nRATIONALE: fine" },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 10,
                "completion_tokens": 20
            }
        })))
        .mount(&server)
        .await;

    let adapter =
        OpenRouterAdapter::with_config("sk-test", server.uri(), Duration::from_secs(5), None, None)
            .unwrap();

    let req = ChatRequest::new(
        ChatModel::openrouter("google/gemini-2.5-flash-lite"),
        vec![Message::user("hi")],
        Attribution::new("test"),
    );

    let resp = adapter.chat(&req).await.unwrap();
    assert_eq!(resp.content, "SCORE: 7.0\nRATIONALE: fine");
    assert_eq!(resp.finish_reason, FinishReason::Stop);
    assert_eq!(resp.input_tokens, 10);
    assert_eq!(resp.output_tokens, 20);
    assert_eq!(
        resp.cost_nanodollars,
        photojudge::gateway::chat_cost("google/gemini-2.5-flash-lite", 10, 20)
    );
}

#[tokio::test]
async fn openrouter_serializes_image_turns_as_content_parts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "content": "ok" },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 1, "completion_tokens": 1 }
        })))
        .mount(&server)
        .await;

    let adapter =
        OpenRouterAdapter::with_config("sk-test", server.uri(), Duration::from_secs(5), None, None)
            .unwrap();

    let image = ImageData::jpeg(vec![0xFF, 0xD8, 0xFF]);
    let req = ChatRequest::new(
        ChatModel::openrouter("google/gemini-2.5-flash-lite"),
        vec![
            Message::system("judge it"),
            Message::user_with_image("Please evaluate this photograph.", &image),
        ],
        Attribution::new("test"),
    );

    adapter.chat(&req).await.unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();

    assert_eq!(body["messages"][0]["content"], "judge it");
    let parts = body["messages"][1]["content"].as_array().unwrap();
    assert_eq!(parts[0]["type"], "text");
    assert_eq!(parts[1]["type"], "image_url");
    assert!(parts[1]["image_url"]["url"]
        .as_str()
        .unwrap()
        .starts_with("data:image/jpeg;base64,"));
}

#[tokio::test]
async fn openrouter_detects_refusal_from_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": { "content": "I cannot comply with that request." },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 1, "completion_tokens": 1 }
        })))
        .mount(&server)
        .await;

    let adapter =
        OpenRouterAdapter::with_config("sk-test", server.uri(), Duration::from_secs(5), None, None)
            .unwrap();

    let req = ChatRequest::new(
        ChatModel::openrouter("google/gemini-2.5-flash-lite"),
        vec![Message::user("hi")],
        Attribution::new("test"),
    );

    let err = adapter.chat(&req).await.unwrap_err();
    assert!(matches!(err, ProviderError::Refused { .. }));
}

#[tokio::test]
async fn openrouter_classifies_http_429_as_remote_rate_limit_and_keeps_context() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("x-request-id", "abc123")
                .set_body_json(json!({
                    "error": { "message": "rate limited", "code": "rate_limit_exceeded" }
                })),
        )
        .mount(&server)
        .await;

    let adapter =
        OpenRouterAdapter::with_config("sk-test", server.uri(), Duration::from_secs(5), None, None)
            .unwrap();

    let req = ChatRequest::new(
        ChatModel::openrouter("google/gemini-2.5-flash-lite"),
        vec![Message::user("hi")],
        Attribution::new("test"),
    );

    let err = adapter.chat(&req).await.unwrap_err();
    match err {
        ProviderError::RateLimited {
            retry_after,
            limit_source,
            context,
        } => {
            assert_eq!(limit_source, RateLimitSource::Remote);
            assert_eq!(retry_after, Duration::from_secs(60));
            let ctx = context.expect("expected error context");
            assert_eq!(ctx.http_status, Some(429));
            assert_eq!(ctx.provider_code.as_deref(), Some("rate_limit_exceeded"));
            assert_eq!(ctx.request_id.as_deref(), Some("abc123"));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn provider_gateway_is_exactly_once_per_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "message": "transient error", "code": "internal" }
        })))
        .mount(&server)
        .await;

    let adapter =
        OpenRouterAdapter::with_config("sk-test", server.uri(), Duration::from_secs(5), None, None)
            .unwrap();
    let gateway = ProviderGateway::with_adapter(adapter, Arc::new(NoopUsageSink));

    let req = ChatRequest::new(
        ChatModel::openrouter("google/gemini-2.5-flash-lite"),
        vec![Message::user("hi")],
        Attribution::new("test"),
    );

    // A retryable error surfaces immediately; the gateway never re-sends.
    let err = gateway.complete(req).await.unwrap_err();
    assert!(err.is_retryable());

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
}
