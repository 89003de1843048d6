//! Integration tests for the HTTP/SSE transport.
//!
//! These tests drive the axum router directly through `tower::ServiceExt`,
//! without binding a socket, and verify the stream endpoint's framing and the
//! submit endpoint's request/response behaviour.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use toolbox_mcp::mcp::server::McpServer;
use toolbox_mcp::mcp::sse::{build_router, AppState, DEFAULT_MESSAGE_PATH, DEFAULT_SSE_PATH};
use toolbox_mcp::tools::{self, Storage};

fn test_router() -> Router {
    let mut server = McpServer::new();
    let storage = Arc::new(Storage::new());
    tools::register_defaults(&mut server, &storage);

    let state = AppState::new(Arc::new(server), DEFAULT_MESSAGE_PATH);
    build_router(state, DEFAULT_SSE_PATH)
}

async fn post_json(router: &Router, body: &str) -> (StatusCode, Option<Value>) {
    let request = Request::builder()
        .method("POST")
        .uri(DEFAULT_MESSAGE_PATH)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&bytes).unwrap())
    };

    (status, json)
}

// =============================================================================
// Stream Endpoint Tests
// =============================================================================

#[tokio::test]
async fn test_sse_stream_emits_endpoint_event_first() {
    let router = test_router();

    let request = Request::builder()
        .uri(DEFAULT_SSE_PATH)
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

    // The stream never completes while the connection is registered, so pull
    // the first frame instead of collecting the whole body.
    let mut body = response.into_body();
    let frame = body.frame().await.unwrap().unwrap();
    let chunk = frame.into_data().unwrap();

    assert_eq!(&chunk[..], b"event: endpoint\ndata: /message\n\n");
}

// =============================================================================
// Submit Endpoint Tests
// =============================================================================

#[tokio::test]
async fn test_post_initialize_returns_json_response() {
    let router = test_router();

    let (status, json) = post_json(
        &router,
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let resp = json.unwrap();
    assert_eq!(resp["id"], 1);
    assert_eq!(resp["result"]["protocolVersion"], "2024-11-05");
}

#[tokio::test]
async fn test_post_notification_returns_no_content() {
    let router = test_router();

    let (status, json) = post_json(
        &router,
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(json.is_none());
}

#[tokio::test]
async fn test_post_malformed_body_returns_parse_error() {
    let router = test_router();

    let (status, json) = post_json(&router, "{broken").await;

    assert_eq!(status, StatusCode::OK);
    let resp = json.unwrap();
    assert_eq!(resp["error"]["code"], -32700);
    assert!(resp["id"].is_null());
}

#[tokio::test]
async fn test_full_session_over_post() {
    let router = test_router();

    // Gating applies before the lifecycle notification arrives.
    let (_, json) = post_json(&router, r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#).await;
    assert_eq!(json.unwrap()["error"]["code"], -32002);

    let (status, _) = post_json(
        &router,
        r#"{"jsonrpc":"2.0","id":2,"method":"initialize","params":{}}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post_json(&router, r#"{"jsonrpc":"2.0","method":"initialized"}"#).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, json) = post_json(&router, r#"{"jsonrpc":"2.0","id":3,"method":"tools/list"}"#).await;
    let tools = json.unwrap();
    assert_eq!(tools["result"]["tools"].as_array().unwrap().len(), 7);

    let (_, json) = post_json(
        &router,
        r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"calculator","arguments":{"operation":"multiply","a":6,"b":7}}}"#,
    )
    .await;
    let resp = json.unwrap();
    let text = resp["result"]["content"][0]["text"].as_str().unwrap();
    let payload: Value = serde_json::from_str(text).unwrap();
    assert_eq!(payload["result"], 42.0);
}

#[tokio::test]
async fn test_initialization_is_shared_across_clients() {
    let router = test_router();

    // One client completes the handshake...
    post_json(
        &router,
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
    )
    .await;
    post_json(&router, r#"{"jsonrpc":"2.0","method":"initialized"}"#).await;

    // ...and tool methods are unlocked for every request that follows,
    // regardless of which client sends it.
    let (_, json) = post_json(&router, r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).await;
    assert!(json.unwrap()["result"]["tools"].is_array());
}
