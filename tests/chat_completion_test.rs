//! Wiremock integration tests for [`ChatCompletionClient`].
//!
//! These tests verify the request shape, answer extraction, and the mapping
//! of transport/status/body failures onto [`UpstreamError`].

use tollgate::{
    Backend, BackendChoice, ChatCompletionClient, ChatCompletionConfig, Identity, LatencyModel,
    QueryRequest, Tollgate, UpstreamError,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

/// Test successful completion with API key.
#[tokio::test]
async fn test_complete_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test_key"))
        .and(body_json(serde_json::json!({
            "model": "gpt-3.5-turbo",
            "messages": [{"role": "user", "content": "hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Hi there!")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ChatCompletionClient::new(
        ChatCompletionConfig::new()
            .base_url(mock_server.uri())
            .api_key("test_key"),
    )
    .unwrap();

    let answer = client.invoke("hello").await.expect("invoke should succeed");
    assert_eq!(answer, "Hi there!");
}

/// Test that a custom model is sent.
#[tokio::test]
async fn test_custom_model() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_json(serde_json::json!({
            "model": "llama3",
            "messages": [{"role": "user", "content": "ping"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("pong")))
        .mount(&mock_server)
        .await;

    let client = ChatCompletionClient::new(
        ChatCompletionConfig::new()
            .base_url(format!("{}/v1", mock_server.uri()))
            .model("llama3"),
    )
    .unwrap();

    assert_eq!(client.model(), "llama3");
    assert_eq!(client.invoke("ping").await.unwrap(), "pong");
}

/// Only the first choice is used.
#[tokio::test]
async fn test_first_choice_wins() {
    let mock_server = MockServer::start().await;

    let body = serde_json::json!({
        "choices": [
            {"message": {"role": "assistant", "content": "first"}},
            {"message": {"role": "assistant", "content": "second"}}
        ]
    });
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&mock_server)
        .await;

    let client = ChatCompletionClient::with_base_url(mock_server.uri()).unwrap();
    assert_eq!(client.invoke("x").await.unwrap(), "first");
}

/// Test server error with body.
#[tokio::test]
async fn test_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&mock_server)
        .await;

    let client = ChatCompletionClient::with_base_url(mock_server.uri()).unwrap();
    let err = client.invoke("hello").await.unwrap_err();

    assert_eq!(
        err,
        UpstreamError::Status {
            status: 500,
            message: "upstream exploded".to_string()
        }
    );
}

/// Test status without body falls back to the reason phrase.
#[tokio::test]
async fn test_rate_limited_without_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let client = ChatCompletionClient::with_base_url(mock_server.uri()).unwrap();
    let err = client.invoke("hello").await.unwrap_err();

    match err {
        UpstreamError::Status { status, message } => {
            assert_eq!(status, 429);
            assert_eq!(message, "Too Many Requests");
        }
        other => panic!("Expected Status, got {:?}", other),
    }
}

/// Test non-JSON success body.
#[tokio::test]
async fn test_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let client = ChatCompletionClient::with_base_url(mock_server.uri()).unwrap();
    let err = client.invoke("hello").await.unwrap_err();
    assert!(matches!(err, UpstreamError::Malformed(_)), "got {err:?}");
}

/// Test empty choices list.
#[tokio::test]
async fn test_no_choices() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
        .mount(&mock_server)
        .await;

    let client = ChatCompletionClient::with_base_url(mock_server.uri()).unwrap();
    let err = client.invoke("hello").await.unwrap_err();
    assert!(matches!(err, UpstreamError::Malformed(_)), "got {err:?}");
}

/// Test null content (e.g. a tool-call-only answer).
#[tokio::test]
async fn test_null_content() {
    let mock_server = MockServer::start().await;

    let body = serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": null}}]
    });
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&mock_server)
        .await;

    let client = ChatCompletionClient::with_base_url(mock_server.uri()).unwrap();
    let err = client.invoke("hello").await.unwrap_err();
    assert!(matches!(err, UpstreamError::Malformed(_)), "got {err:?}");
}

/// Test connection failure.
#[tokio::test]
async fn test_transport_error() {
    // Grab a free port, then close it so the connection is refused.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = ChatCompletionClient::with_base_url(format!("http://127.0.0.1:{port}")).unwrap();
    let err = client.invoke("hello").await.unwrap_err();
    assert!(matches!(err, UpstreamError::Http(_)), "got {err:?}");
}

// =========================================================================
// Through the gateway
// =========================================================================

/// A cached answer must not hit the endpoint a second time.
#[tokio::test]
async fn test_gateway_caches_chat_answers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("remote answer")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = Tollgate::builder()
        .chat_completion(ChatCompletionConfig::new().base_url(mock_server.uri()))
        .latency(LatencyModel::none())
        .build()
        .unwrap();

    let request = QueryRequest::new("hello", Identity::user("alice"))
        .backend(BackendChoice::ChatCompletion);

    let first = gateway.query(request.clone()).await.unwrap();
    assert_eq!(first.answer(), Some("remote answer"));
    assert!(!first.is_cached());

    let second = gateway.query(request).await.unwrap();
    assert_eq!(second.answer(), Some("remote answer"));
    assert!(second.is_cached());
}

/// A synchronous upstream failure surfaces to the caller and is not cached.
#[tokio::test]
async fn test_gateway_surfaces_upstream_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&mock_server)
        .await;

    let gateway = Tollgate::builder()
        .chat_completion(ChatCompletionConfig::new().base_url(mock_server.uri()))
        .latency(LatencyModel::none())
        .build()
        .unwrap();

    let request = QueryRequest::new("hello", Identity::user("alice"))
        .backend(BackendChoice::ChatCompletion);
    let err = gateway.query(request).await.unwrap_err();

    assert!(matches!(
        err,
        tollgate::GatewayError::Upstream(UpstreamError::Status { status: 503, .. })
    ));
    assert!(gateway.cache().is_empty());
}
