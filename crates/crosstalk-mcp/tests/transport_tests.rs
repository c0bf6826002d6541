// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router-level tests for the MCP transport and the loopback security
//! filter, driven through tower's `oneshot` without a real listener.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::connect_info::ConnectInfo;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use crosstalk_core::types::{AssistantId, ClientStatus};
use crosstalk_core::{ClientRegistry, CrosstalkError};
use crosstalk_dispatch::{Dispatcher, QueueProcessor};
use crosstalk_mcp::{router, AppState};
use crosstalk_peer::{ExecOutcome, ExecRequest, PeerChannel, PeerExecutor, Persona};
use crosstalk_tools::{KnowledgeGraphClient, ToolContext};

struct SilentPeer;

#[async_trait]
impl PeerChannel for SilentPeer {
    async fn send_message(
        &self,
        _prompt: &str,
        _message_id: Option<&str>,
        _persona: Option<&Persona>,
    ) -> Result<Option<String>, CrosstalkError> {
        Ok(None)
    }
}

struct SilentExec;

#[async_trait]
impl PeerExecutor for SilentExec {
    async fn execute(&self, _request: ExecRequest) -> Result<ExecOutcome, CrosstalkError> {
        Ok(ExecOutcome::default())
    }
}

struct Harness {
    state: AppState,
    _dir: tempfile::TempDir,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("store.sqlite");
    let store = crosstalk_storage::Store::open(db_path.to_str().unwrap())
        .await
        .unwrap();
    let registry = Arc::new(ClientRegistry::new());
    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        registry.clone(),
        Arc::new(SilentPeer),
        Arc::new(SilentExec),
        true,
    ));
    let queue = Arc::new(QueueProcessor::new(store.clone(), registry.clone()));
    let kg = Arc::new(KnowledgeGraphClient::new("http://127.0.0.1:1"));
    let tool_ctx = ToolContext {
        store: store.clone(),
        clients: registry.clone(),
        dispatcher,
        kg: kg.clone(),
        identity: None,
    };
    let state = AppState::new(store, registry, queue, kg, tool_ctx, 3790);
    Harness { state, _dir: dir }
}

fn loopback() -> ConnectInfo<SocketAddr> {
    ConnectInfo("127.0.0.1:50000".parse().unwrap())
}

fn request(method: &str, path: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header("host", "127.0.0.1:3790");
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let mut request = builder
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_default())
        .unwrap();
    request.extensions_mut().insert(loopback());
    request
}

fn initialize_body() -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-03-26",
            "capabilities": {},
            "clientInfo": {"name": "test", "version": "0"}
        }
    })
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Pull the JSON payloads out of an SSE body.
fn sse_payloads(body: &str) -> Vec<serde_json::Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|data| serde_json::from_str(data).unwrap())
        .collect()
}

#[tokio::test]
async fn post_without_session_and_not_initialize_is_400() {
    let h = harness().await;
    let app = router(h.state);

    let body = serde_json::json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"});
    let response = app
        .oneshot(request("POST", "/mcp", Some(body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let envelope: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(envelope["jsonrpc"], "2.0");
    assert_eq!(envelope["error"]["code"], -32000);
    assert!(envelope["error"]["message"]
        .as_str()
        .unwrap()
        .contains("missing session id"));
    assert!(envelope["id"].is_null());
}

#[tokio::test]
async fn post_with_unknown_session_is_400() {
    let h = harness().await;
    let app = router(h.state);

    let mut req = request("POST", "/mcp", Some(initialize_body()));
    req.headers_mut()
        .insert("mcp-session-id", "ghost".parse().unwrap());
    let response = app.oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let envelope: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(
        envelope["error"]["message"],
        "Bad Request: Unknown session id"
    );
}

#[tokio::test]
async fn initialize_creates_session_and_registers_identity() {
    let h = harness().await;
    let state = h.state.clone();
    let app = router(h.state);

    let mut req = request("POST", "/mcp", Some(initialize_body()));
    req.headers_mut()
        .insert("x-client-id", "claude".parse().unwrap());
    let response = app.oneshot(req).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let session_id = response
        .headers()
        .get("mcp-session-id")
        .and_then(|v| v.to_str().ok())
        .expect("session id header")
        .to_string();

    let payloads = sse_payloads(&body_text(response).await);
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0]["result"]["serverInfo"]["name"], "crosstalk");

    // Registry and store mirror agree.
    assert!(state.registry.is_online(AssistantId::Claude));
    assert_eq!(
        state.registry.get_session_id(AssistantId::Claude).as_deref(),
        Some(session_id.as_str())
    );
    let client = state
        .store
        .get_client(AssistantId::Claude)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(client.status, ClientStatus::Online);
    assert_eq!(client.session_id.as_deref(), Some(session_id.as_str()));
}

#[tokio::test]
async fn tool_calls_flow_over_an_initialized_session() {
    let h = harness().await;
    let app = router(h.state.clone());

    let mut req = request("POST", "/mcp", Some(initialize_body()));
    req.headers_mut()
        .insert("x-client-id", "claude".parse().unwrap());
    let response = app.clone().oneshot(req).await.unwrap();
    let session_id = response.headers()["mcp-session-id"]
        .to_str()
        .unwrap()
        .to_string();

    let call = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/call",
        "params": {"name": "who_am_i", "arguments": {}}
    });
    let mut req = request("POST", "/mcp", Some(call));
    req.headers_mut()
        .insert("mcp-session-id", session_id.parse().unwrap());
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let payloads = sse_payloads(&body_text(response).await);
    let text = payloads[0]["result"]["content"][0]["text"].as_str().unwrap();
    let body: serde_json::Value = serde_json::from_str(text).unwrap();
    assert_eq!(body["client_id"], "claude");
    assert_eq!(body["description"], "Claude Code CLI");
}

#[tokio::test]
async fn anonymous_session_fails_identity_tools_but_initializes() {
    let h = harness().await;
    let app = router(h.state.clone());

    let response = app
        .clone()
        .oneshot(request("POST", "/mcp", Some(initialize_body())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session_id = response.headers()["mcp-session-id"]
        .to_str()
        .unwrap()
        .to_string();

    let call = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/call",
        "params": {"name": "who_am_i", "arguments": {}}
    });
    let mut req = request("POST", "/mcp", Some(call));
    req.headers_mut()
        .insert("mcp-session-id", session_id.parse().unwrap());
    let response = app.oneshot(req).await.unwrap();

    let payloads = sse_payloads(&body_text(response).await);
    assert_eq!(payloads[0]["result"]["isError"], true);
    let text = payloads[0]["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("Unknown client"));
}

#[tokio::test]
async fn notifications_are_accepted_without_a_stream() {
    let h = harness().await;
    let app = router(h.state.clone());

    let response = app
        .clone()
        .oneshot(request("POST", "/mcp", Some(initialize_body())))
        .await
        .unwrap();
    let session_id = response.headers()["mcp-session-id"]
        .to_str()
        .unwrap()
        .to_string();

    let notification = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "notifications/initialized"
    });
    let mut req = request("POST", "/mcp", Some(notification));
    req.headers_mut()
        .insert("mcp-session-id", session_id.parse().unwrap());
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn delete_closes_the_session_and_sets_offline() {
    let h = harness().await;
    let state = h.state.clone();
    let app = router(h.state);

    let mut req = request("POST", "/mcp", Some(initialize_body()));
    req.headers_mut()
        .insert("x-client-id", "codex".parse().unwrap());
    let response = app.clone().oneshot(req).await.unwrap();
    let session_id = response.headers()["mcp-session-id"]
        .to_str()
        .unwrap()
        .to_string();
    assert!(state.registry.is_online(AssistantId::Codex));

    let mut req = request("DELETE", "/mcp", None);
    req.headers_mut()
        .insert("mcp-session-id", session_id.parse().unwrap());
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(!state.registry.is_online(AssistantId::Codex));
    assert!(state.sessions.is_empty());
    let client = state
        .store
        .get_client(AssistantId::Codex)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(client.status, ClientStatus::Offline);
    assert!(client.session_id.is_none());

    // A second delete no longer finds the session.
    let mut req = request("DELETE", "/mcp", None);
    req.headers_mut()
        .insert("mcp-session-id", session_id.parse().unwrap());
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_lists_sessions_with_client_ids() {
    let h = harness().await;
    let app = router(h.state.clone());

    let mut req = request("POST", "/mcp", Some(initialize_body()));
    req.headers_mut()
        .insert("x-client-id", "claude".parse().unwrap());
    app.clone().oneshot(req).await.unwrap();

    let response = app.oneshot(request("GET", "/status", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let status: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(status["sessionCount"], 1);
    assert_eq!(status["sessions"][0]["clientId"], "claude");
}

#[tokio::test]
async fn health_reports_kg_unavailable_when_nothing_listens() {
    let h = harness().await;
    let app = router(h.state);

    let response = app.oneshot(request("GET", "/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["knowledge_graph"], "unavailable");
}

#[tokio::test]
async fn non_loopback_peers_are_rejected() {
    let h = harness().await;
    let app = router(h.state);

    let mut req = request("GET", "/status", None);
    req.extensions_mut()
        .insert(ConnectInfo::<SocketAddr>("8.8.8.8:443".parse().unwrap()));
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn foreign_host_header_is_rejected() {
    let h = harness().await;
    let app = router(h.state);

    let mut req = request("GET", "/status", None);
    req.headers_mut()
        .insert("host", "evil.example:3790".parse().unwrap());
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn origin_header_on_mcp_is_rejected() {
    let h = harness().await;
    let app = router(h.state);

    let mut req = request("POST", "/mcp", Some(initialize_body()));
    req.headers_mut()
        .insert("origin", "http://localhost:3000".parse().unwrap());
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn origin_header_outside_mcp_is_allowed() {
    let h = harness().await;
    let app = router(h.state);

    let mut req = request("GET", "/health", None);
    req.headers_mut()
        .insert("origin", "http://localhost:3000".parse().unwrap());
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
