mod support;

use std::sync::Arc;

use chat_api::ChatRequest;
use chat_backend::{BackendErrorKind, Role};
use chat_backend_http::{HttpChatBackend, HttpChatBackendConfig};
use history_store::MemoryStore;
use scout_chat::{ChatError, ChatOrchestrator, SendOutcome};
use support::{ScriptedResponse, ScriptedServer};

fn orchestrator(server: &ScriptedServer) -> ChatOrchestrator {
    let backend = HttpChatBackend::new(HttpChatBackendConfig::new(&server.base_url))
        .expect("http backend builds");
    ChatOrchestrator::new(Arc::new(backend), Arc::new(MemoryStore::new()))
}

#[tokio::test]
async fn http_stream_success_fills_placeholder() {
    let server = ScriptedServer::new(vec![ScriptedResponse::lines(
        200,
        &["data: Based \ndata: on", " \r\ndata: your \n", "data: strategy..."],
    )])
    .await;
    let orchestrator = orchestrator(&server);
    orchestrator.set_strategy("High press").await;

    let outcome = orchestrator
        .send("Find me a left back")
        .await
        .expect("stream succeeds");

    assert!(matches!(
        outcome,
        SendOutcome::Streamed { ref content, .. } if content == "Based on your strategy..."
    ));
    let snapshot = orchestrator.snapshot().await;
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[1].content, "Based on your strategy...");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/api/chat/stream");
    let sent: ChatRequest = serde_json::from_str(&requests[0].body).expect("JSON body");
    assert_eq!(sent.messages.len(), 1);
    assert_eq!(sent.messages[0].role, "user");
    assert_eq!(sent.strategy.as_deref(), Some("High press"));
}

#[tokio::test]
async fn http_stream_error_falls_back_with_identical_body() {
    let server = ScriptedServer::new(vec![
        ScriptedResponse::json(503, r#"{"error":{"message":"stream unavailable"}}"#),
        ScriptedResponse::json(200, r#"{"message":"Here are 3 candidates."}"#),
    ])
    .await;
    let orchestrator = orchestrator(&server);

    let outcome = orchestrator
        .send("Find me a left back")
        .await
        .expect("fallback recovers");

    match outcome {
        SendOutcome::RecoveredByFallback {
            content,
            stream_error,
            ..
        } => {
            assert_eq!(content, "Here are 3 candidates.");
            assert_eq!(stream_error.kind(), BackendErrorKind::Status(503));
            assert_eq!(stream_error.message(), "stream unavailable");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let snapshot = orchestrator.snapshot().await;
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot[2].role, Role::Assistant);

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].path, "/api/chat/stream");
    assert_eq!(requests[1].path, "/api/chat");
    assert_eq!(requests[0].body, requests[1].body);
}

#[tokio::test]
async fn http_empty_stream_body_falls_back() {
    let server = ScriptedServer::new(vec![
        ScriptedResponse::lines(200, &[]),
        ScriptedResponse::json(200, r#"{"message":"Here are 3 candidates."}"#),
    ])
    .await;
    let orchestrator = orchestrator(&server);

    let outcome = orchestrator.send("Find me a left back").await.expect("recovers");

    assert!(matches!(outcome, SendOutcome::RecoveredByFallback { .. }));
    assert_eq!(orchestrator.snapshot().await.len(), 3);
}

#[tokio::test]
async fn http_fallback_failure_surfaces_server_message() {
    let server = ScriptedServer::new(vec![
        ScriptedResponse::Reset,
        ScriptedResponse::json(500, "model offline"),
    ])
    .await;
    let orchestrator = orchestrator(&server);

    let error = orchestrator
        .send("Find me a left back")
        .await
        .expect_err("both calls fail");

    match &error {
        ChatError::Fallback { fallback_error, .. } => {
            assert_eq!(fallback_error.kind(), BackendErrorKind::Status(500));
            assert_eq!(fallback_error.message(), "model offline");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(error.to_string().contains("model offline"));
    assert_eq!(orchestrator.snapshot().await.len(), 2);
}
