use httpmock::prelude::*;
use ollama_chat::core::ChatModel;
use ollama_chat::domain::model::{ChatMessage, ChatRequest};
use ollama_chat::{stream_prompt, ChatError, OllamaClient};
use std::time::Duration;

fn ndjson(lines: &[serde_json::Value]) -> String {
    lines
        .iter()
        .map(|l| l.to_string() + "\n")
        .collect::<String>()
}

fn story_body() -> String {
    ndjson(&[
        serde_json::json!({"model": "llama3", "message": {"role": "assistant", "content": "Once"}, "done": false}),
        serde_json::json!({"model": "llama3", "message": {"role": "assistant", "content": " upon"}, "done": false}),
        serde_json::json!({"model": "llama3", "message": {"role": "assistant", "content": " a time."}, "done": false}),
        serde_json::json!({"model": "llama3", "message": {"role": "assistant", "content": ""}, "done": true, "done_reason": "stop", "prompt_eval_count": 14, "eval_count": 5}),
    ])
}

#[tokio::test]
async fn test_stream_prints_concatenated_chunks() {
    let server = MockServer::start();
    let chat_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .json_body_partial(r#"{"model": "llama3", "stream": true}"#)
            .body_contains("Tell me a story");
        then.status(200)
            .header("Content-Type", "application/x-ndjson")
            .body(story_body());
    });

    let client = OllamaClient::new(server.base_url());
    let mut out = Vec::new();
    let summary = stream_prompt(&client, "llama3", "Tell me a story", &mut out, None)
        .await
        .unwrap();

    chat_mock.assert();
    assert_eq!(String::from_utf8(out).unwrap(), "Once upon a time.");
    assert_eq!(summary.chunks, 3);
    assert_eq!(summary.done_reason.as_deref(), Some("stop"));
    let usage = summary.usage.unwrap();
    assert_eq!(usage.prompt_tokens, 14);
    assert_eq!(usage.completion_tokens, 5);
}

#[tokio::test]
async fn test_stream_without_trailing_newline() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(200).body(concat!(
            r#"{"message":{"role":"assistant","content":"The end"},"done":false}"#,
            "\n",
            r#"{"message":{"role":"assistant","content":"."},"done":true}"#
        ));
    });

    let client = OllamaClient::new(server.base_url());
    let mut out = Vec::new();
    stream_prompt(&client, "llama3", "Tell me a story", &mut out, None)
        .await
        .unwrap();

    assert_eq!(out, b"The end.");
}

#[tokio::test]
async fn test_missing_model_is_reported() {
    let server = MockServer::start();
    let chat_mock = server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(404)
            .json_body(serde_json::json!({"error": "model \"llama3\" not found, try pulling it first"}));
    });

    let client = OllamaClient::new(server.base_url());
    let mut out = Vec::new();
    let err = stream_prompt(&client, "llama3", "Tell me a story", &mut out, None)
        .await
        .unwrap_err();

    chat_mock.assert();
    assert!(out.is_empty());
    match err {
        ChatError::ModelNotFound { message } => assert!(message.contains("llama3")),
        other => panic!("expected ModelNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_mid_stream_error_keeps_partial_output() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(200).body(ndjson(&[
            serde_json::json!({"message": {"role": "assistant", "content": "Once"}, "done": false}),
            serde_json::json!({"error": "llama runner process has terminated"}),
        ]));
    });

    let client = OllamaClient::new(server.base_url());
    let mut out = Vec::new();
    let err = stream_prompt(&client, "llama3", "Tell me a story", &mut out, None)
        .await
        .unwrap_err();

    assert_eq!(out, b"Once");
    assert!(matches!(err, ChatError::GenerationError { ref message } if message.contains("terminated")));
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(503).body("overloaded");
    });

    let client = OllamaClient::new(server.base_url());
    let mut out = Vec::new();
    let err = stream_prompt(&client, "llama3", "Tell me a story", &mut out, None)
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    // 保留埠號後關閉，確保連線被拒
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let client = OllamaClient::new(format!("http://{}", addr));
    let mut out = Vec::new();
    let err = stream_prompt(&client, "llama3", "Tell me a story", &mut out, None)
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::ApiError(_)));
    assert!(err.recovery_suggestion().contains("ollama serve"));
}

#[tokio::test]
async fn test_chat_aggregates_reply() {
    let server = MockServer::start();
    let chat_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .json_body_partial(r#"{"model": "mistral", "options": {"temperature": 0.5}}"#);
        then.status(200).body(story_body());
    });

    let client = OllamaClient::new(server.base_url()).with_request_timeout(Duration::from_secs(5));
    let request =
        ChatRequest::new("mistral", vec![ChatMessage::user("Tell me a story")]).with_temperature(0.5);
    let reply = client.chat(&request).await.unwrap();

    chat_mock.assert();
    assert_eq!(reply, "Once upon a time.");
}

#[tokio::test]
async fn test_chat_rejects_non_ndjson_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/chat");
        then.status(200).body("<html>proxy error</html>");
    });

    let client = OllamaClient::new(server.base_url());
    let request = ChatRequest::new("mistral", vec![ChatMessage::user("hi")]);
    let err = client.chat(&request).await.unwrap_err();

    assert!(matches!(err, ChatError::StreamError { .. }));
}

#[tokio::test]
async fn test_keep_alive_is_forwarded() {
    let server = MockServer::start();
    let chat_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/chat")
            .json_body_partial(r#"{"keep_alive": "10m"}"#);
        then.status(200).body(story_body());
    });

    let client = OllamaClient::new(server.base_url()).with_keep_alive("10m");
    let mut out = Vec::new();
    stream_prompt(&client, "llama3", "Tell me a story", &mut out, None)
        .await
        .unwrap();

    chat_mock.assert();
}

#[tokio::test]
async fn test_version_probe() {
    let server = MockServer::start();
    let version_mock = server.mock(|when, then| {
        when.method(GET).path("/api/version");
        then.status(200)
            .json_body(serde_json::json!({"version": "0.5.7"}));
    });

    let client = OllamaClient::new(server.base_url()).with_request_timeout(Duration::from_secs(2));
    let version = client.version().await.unwrap();

    version_mock.assert();
    assert_eq!(version, "0.5.7");
}
