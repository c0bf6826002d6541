// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the tool server over a real store.

use std::sync::Arc;

use async_trait::async_trait;

use crosstalk_core::types::AssistantId;
use crosstalk_core::{ClientRegistry, CrosstalkError};
use crosstalk_dispatch::Dispatcher;
use crosstalk_peer::{ExecOutcome, ExecRequest, PeerChannel, PeerExecutor, Persona};
use crosstalk_tools::{KnowledgeGraphClient, ToolContext, ToolServer};

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
    ctx: ToolContext,
    registry: Arc<ClientRegistry>,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn server_as(&self, identity: Option<AssistantId>) -> ToolServer {
        ToolServer::new(self.ctx.with_identity(identity))
    }
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
    let ctx = ToolContext {
        store,
        clients: registry.clone(),
        dispatcher,
        kg: Arc::new(KnowledgeGraphClient::new("http://127.0.0.1:1")),
        identity: None,
    };
    Harness {
        ctx,
        registry,
        _dir: dir,
    }
}

fn payload(result: &crosstalk_tools::ToolCallResult) -> serde_json::Value {
    serde_json::from_str(result.text().unwrap()).unwrap()
}

#[tokio::test]
async fn who_am_i_reports_identity() {
    let h = harness().await;
    let server = h.server_as(Some(AssistantId::Claude));

    let result = server.call("who_am_i", serde_json::json!({})).await;
    assert!(result.is_error.is_none());
    let body = payload(&result);
    assert_eq!(body["client_id"], "claude");
    assert_eq!(body["description"], "Claude Code CLI");
}

#[tokio::test]
async fn identity_tools_fail_without_identity() {
    let h = harness().await;
    let server = h.server_as(None);

    for (tool, args) in [
        ("who_am_i", serde_json::json!({})),
        ("create_conversation", serde_json::json!({})),
        (
            "send_message",
            serde_json::json!({"target": "codex", "content": "hi"}),
        ),
    ] {
        let result = server.call(tool, args).await;
        assert_eq!(result.is_error, Some(true), "{tool} should require identity");
        assert_eq!(payload(&result)["error"], "Unknown client");
    }
}

#[tokio::test]
async fn unknown_tool_is_an_error_envelope() {
    let h = harness().await;
    let server = h.server_as(Some(AssistantId::Claude));

    let result = server.call("frobnicate", serde_json::json!({})).await;
    assert_eq!(result.is_error, Some(true));
    assert!(payload(&result)["error"]
        .as_str()
        .unwrap()
        .contains("unknown tool"));
}

#[tokio::test]
async fn conversation_lifecycle_through_tools() {
    let h = harness().await;
    let server = h.server_as(Some(AssistantId::Claude));

    let created = payload(
        &server
            .call(
                "create_conversation",
                serde_json::json!({"title": "pairing session"}),
            )
            .await,
    );
    let conversation_id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["created_by"], "claude");
    assert_eq!(created["status"], "active");

    let fetched = payload(
        &server
            .call(
                "get_conversation",
                serde_json::json!({"conversation_id": conversation_id}),
            )
            .await,
    );
    assert_eq!(fetched["title"], "pairing session");

    let listed = payload(
        &server
            .call("list_conversations", serde_json::json!({}))
            .await,
    );
    assert_eq!(listed["count"], 1);

    let closed = payload(
        &server
            .call(
                "close_conversation",
                serde_json::json!({
                    "conversation_id": conversation_id,
                    "summary": "done",
                    "sync": false
                }),
            )
            .await,
    );
    assert_eq!(closed["status"], "completed");

    // Completed conversations drop out of the default listing.
    let listed = payload(
        &server
            .call("list_conversations", serde_json::json!({}))
            .await,
    );
    assert_eq!(listed["count"], 0);
}

#[tokio::test]
async fn get_conversation_not_found_is_an_envelope_error() {
    let h = harness().await;
    let server = h.server_as(Some(AssistantId::Claude));

    let result = server
        .call(
            "get_conversation",
            serde_json::json!({"conversation_id": "no-such"}),
        )
        .await;
    assert_eq!(result.is_error, Some(true));
    assert!(payload(&result)["error"]
        .as_str()
        .unwrap()
        .contains("conversation not found"));
}

#[tokio::test]
async fn send_message_to_online_target_is_delivered() {
    let h = harness().await;
    h.registry.set_online(AssistantId::Codex, "sess-codex");
    let server = h.server_as(Some(AssistantId::Claude));

    let body = payload(
        &server
            .call(
                "send_message",
                serde_json::json!({
                    "target": "codex",
                    "content": "hello",
                    "wait_for_response": false
                }),
            )
            .await,
    );
    assert_eq!(body["status"], "delivered");
    assert!(body["message_id"].is_string());
    assert_eq!(body["invokedViaMcp"], false);
}

#[tokio::test]
async fn send_message_to_self_is_forbidden() {
    let h = harness().await;
    let server = h.server_as(Some(AssistantId::Claude));

    let result = server
        .call(
            "send_message",
            serde_json::json!({"target": "claude", "content": "echo"}),
        )
        .await;
    assert_eq!(result.is_error, Some(true));
    assert!(payload(&result)["error"]
        .as_str()
        .unwrap()
        .contains("yourself"));
}

#[tokio::test]
async fn send_message_validates_limits_and_enums() {
    let h = harness().await;
    let server = h.server_as(Some(AssistantId::Claude));

    let result = server
        .call(
            "send_message",
            serde_json::json!({"target": "gemini", "content": "hi"}),
        )
        .await;
    assert_eq!(result.is_error, Some(true), "unknown assistant literal");

    let result = server
        .call(
            "send_message",
            serde_json::json!({
                "target": "codex",
                "content": "hi",
                "timeout_ms": 400000
            }),
        )
        .await;
    assert_eq!(result.is_error, Some(true), "timeout above the cap");

    let result = server
        .call(
            "send_message",
            serde_json::json!({"target": "codex", "content": "hi", "bogus": 1}),
        )
        .await;
    assert_eq!(result.is_error, Some(true), "unknown field");
}

#[tokio::test]
async fn message_flow_history_read_receipts_and_response() {
    let h = harness().await;
    h.registry.set_online(AssistantId::Claude, "s1");
    h.registry.set_online(AssistantId::Codex, "s2");
    let claude = h.server_as(Some(AssistantId::Claude));
    let codex = h.server_as(Some(AssistantId::Codex));

    let sent = payload(
        &claude
            .call(
                "send_message",
                serde_json::json!({
                    "target": "codex",
                    "content": "what is the plan?",
                    "wait_for_response": false
                }),
            )
            .await,
    );
    let conversation_id = sent["conversation_id"].as_str().unwrap().to_string();
    let message_id = sent["message_id"].as_str().unwrap().to_string();

    // Only the target may mark it read.
    let result = claude
        .call(
            "mark_message_read",
            serde_json::json!({"message_id": message_id}),
        )
        .await;
    assert_eq!(result.is_error, Some(true));
    assert!(payload(&result)["error"]
        .as_str()
        .unwrap()
        .contains("only the target"));

    let read = payload(
        &codex
            .call(
                "mark_message_read",
                serde_json::json!({"message_id": message_id}),
            )
            .await,
    );
    assert_eq!(read["status"], "read");

    // Codex answers, resolving the request.
    let answered = payload(
        &codex
            .call(
                "send_message",
                serde_json::json!({
                    "target": "claude",
                    "content": "ship it tomorrow",
                    "conversation_id": conversation_id,
                    "response_to_id": message_id,
                    "wait_for_response": false
                }),
            )
            .await,
    );
    assert_eq!(answered["status"], "delivered");

    let response = payload(
        &claude
            .call(
                "get_response",
                serde_json::json!({"message_id": message_id, "timeout_ms": 500}),
            )
            .await,
    );
    assert_eq!(response["response"]["content"], "ship it tomorrow");

    let history = payload(
        &claude
            .call(
                "get_history",
                serde_json::json!({"conversation_id": conversation_id}),
            )
            .await,
    );
    assert_eq!(history["count"], 2);
    assert_eq!(history["messages"][0]["content"], "what is the plan?");
    assert_eq!(history["messages"][0]["status"], "responded");
}

#[tokio::test]
async fn get_response_times_out_with_flag() {
    let h = harness().await;
    h.registry.set_online(AssistantId::Codex, "s2");
    let server = h.server_as(Some(AssistantId::Claude));

    let sent = payload(
        &server
            .call(
                "send_message",
                serde_json::json!({
                    "target": "codex",
                    "content": "anyone there?",
                    "wait_for_response": false
                }),
            )
            .await,
    );

    let response = payload(
        &server
            .call(
                "get_response",
                serde_json::json!({
                    "message_id": sent["message_id"],
                    "timeout_ms": 150
                }),
            )
            .await,
    );
    assert!(response["response"].is_null());
    assert_eq!(response["timeout"], true);
}

#[tokio::test]
async fn shared_context_round_trip() {
    let h = harness().await;
    let server = h.server_as(Some(AssistantId::Codex));

    let shared = payload(
        &server
            .call(
                "share_context",
                serde_json::json!({
                    "context_type": "snippet",
                    "content": "let x = 1;",
                    "description": "minimal repro"
                }),
            )
            .await,
    );
    assert_eq!(shared["shared_by"], "codex");
    let context_id = shared["id"].as_str().unwrap();

    let fetched = payload(
        &server
            .call(
                "get_shared_context",
                serde_json::json!({"context_id": context_id}),
            )
            .await,
    );
    assert_eq!(fetched["content"], "let x = 1;");

    let listed = payload(
        &server
            .call("list_shared_context", serde_json::json!({}))
            .await,
    );
    assert_eq!(listed["count"], 1);

    let missing = server
        .call(
            "get_shared_context",
            serde_json::json!({"context_id": "nope"}),
        )
        .await;
    assert_eq!(missing.is_error, Some(true));
}

#[tokio::test]
async fn search_messages_finds_content() {
    let h = harness().await;
    h.registry.set_online(AssistantId::Codex, "s2");
    let server = h.server_as(Some(AssistantId::Claude));

    server
        .call(
            "send_message",
            serde_json::json!({
                "target": "codex",
                "content": "investigating the flaky websocket reconnect",
                "wait_for_response": false
            }),
        )
        .await;

    let found = payload(
        &server
            .call(
                "search_messages",
                serde_json::json!({"query": "websocket"}),
            )
            .await,
    );
    assert_eq!(found["count"], 1);
    assert!(found["results"][0]["snippet"]
        .as_str()
        .unwrap()
        .contains("websocket"));
}

#[tokio::test]
async fn delegate_research_sends_a_research_request() {
    let h = harness().await;
    h.registry.set_online(AssistantId::Codex, "s2");
    let server = h.server_as(Some(AssistantId::Claude));

    // The target is online, so the request is simply delivered; waiting is
    // bounded by the depth deadline, so use the store to answer first.
    let ctx = h.ctx.clone();
    let responder = tokio::spawn(async move {
        // Poll until the research request shows up, then answer it.
        for _ in 0..100 {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            let conversations = ctx.store.list_conversations(None, 10, 0).await.unwrap();
            let Some(conversation) = conversations.first() else {
                continue;
            };
            let history = ctx.store.get_history(&conversation.id, 10, 0).await.unwrap();
            if let Some(request) = history.first() {
                assert_eq!(request.message_type.to_string(), "research_request");
                ctx.dispatcher
                    .send_message(
                        AssistantId::Codex,
                        AssistantId::Claude,
                        "findings: it is DNS",
                        crosstalk_dispatch::SendOptions {
                            conversation_id: Some(conversation.id.clone()),
                            response_to_id: Some(request.id.clone()),
                            message_type: request.message_type.response_type(),
                            wait_for_response: false,
                            ..crosstalk_dispatch::SendOptions::default()
                        },
                    )
                    .await
                    .unwrap();
                return;
            }
        }
        panic!("research request never appeared");
    });

    let body = payload(
        &server
            .call(
                "delegate_research",
                serde_json::json!({
                    "target": "codex",
                    "topic": "intermittent DNS failures",
                    "depth": "shallow",
                    "sync": false
                }),
            )
            .await,
    );
    responder.await.unwrap();

    assert_eq!(body["topic"], "intermittent DNS failures");
    assert_eq!(body["depth"], "shallow");
    assert_eq!(body["status"], "responded");
    assert_eq!(body["response"]["content"], "findings: it is DNS");
    assert_eq!(body["response"]["message_type"], "research_response");
}

#[tokio::test]
async fn request_review_rejects_unknown_type() {
    let h = harness().await;
    let server = h.server_as(Some(AssistantId::Claude));

    let result = server
        .call(
            "request_review",
            serde_json::json!({
                "target": "codex",
                "content": "fn main() {}",
                "review_type": "vibes"
            }),
        )
        .await;
    assert_eq!(result.is_error, Some(true));
}

#[tokio::test]
async fn tool_definitions_cover_the_required_surface() {
    let h = harness().await;
    let server = h.server_as(None);
    let defs = server.tool_definitions();
    let names: Vec<&str> = defs.iter().filter_map(|d| d["name"].as_str()).collect();

    for required in [
        "who_am_i",
        "create_conversation",
        "list_conversations",
        "get_conversation",
        "close_conversation",
        "send_message",
        "get_response",
        "get_history",
        "mark_message_read",
        "share_context",
        "get_shared_context",
        "list_shared_context",
        "delegate_research",
        "request_review",
        "search_messages",
    ] {
        assert!(names.contains(&required), "missing tool {required}");
    }

    // Sorted and schema-bearing.
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
    assert!(defs
        .iter()
        .all(|d| d["inputSchema"]["type"] == "object"));
}
