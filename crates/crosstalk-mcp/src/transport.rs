// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streamable HTTP handlers for the `/mcp` path.
//!
//! POST initialises sessions and dispatches tool calls onto a per-session
//! SSE stream whose event ids come from the session's event log. GET
//! attaches (or re-attaches) the stream, replaying missed events when the
//! client supplies `last-event-id`. DELETE closes the session. Session
//! errors are HTTP 400 with a structured JSON-RPC envelope.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    Json,
};
use futures::stream::{self, Stream, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crosstalk_core::types::ClientStatus;
use crosstalk_tools::ToolServer;

use crate::event_log::parse_event_id;
use crate::rpc::{self, JsonRpcRequest};
use crate::server::AppState;
use crate::session::{Session, StreamEvent};

/// Session header name (case-insensitive on the wire).
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Resume anchor header name.
pub const LAST_EVENT_ID_HEADER: &str = "last-event-id";

/// MCP protocol revision this transport speaks.
const PROTOCOL_VERSION: &str = "2025-03-26";

pub async fn handle_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(_) => {
            return bad_request("Bad Request: body is not a JSON-RPC message");
        }
    };

    let session_header = header_str(&headers, SESSION_HEADER);
    match session_header {
        Some(session_id) => {
            let Some(session) = state.sessions.get(session_id).map(|s| Arc::clone(&s)) else {
                return bad_request("Bad Request: Unknown session id");
            };
            dispatch_on_session(&session, request).await
        }
        None if request.is_initialize() => initialize_session(state, &headers, &query, request).await,
        None => bad_request("Bad Request: missing session id and not an initialize request"),
    }
}

/// Create a session for an initialize request with no session header.
async fn initialize_session(
    state: AppState,
    headers: &HeaderMap,
    query: &HashMap<String, String>,
    request: JsonRpcRequest,
) -> Response {
    let assistant = crate::identity::resolve(headers, query.get("client").map(String::as_str));
    let session_id = Uuid::new_v4().to_string();
    let tool_server = ToolServer::new(state.tool_ctx.with_identity(assistant));
    let session = Arc::new(Session::new(session_id.clone(), assistant, tool_server));
    state.sessions.insert(session_id.clone(), Arc::clone(&session));

    // Session-initialised hook: registry first, store mirror second, queue
    // drain last. The drain must observe the registry update.
    if let Some(id) = assistant {
        state.registry.set_online(id, session_id.clone());
        if let Err(e) = state
            .store
            .update_client_presence(id, ClientStatus::Online, Some(session_id.clone()))
            .await
        {
            warn!(error = %e, assistant = %id, "failed to mirror online status");
        }
        state.queue.on_client_online(id).await;
    }

    info!(
        session_id = session_id.as_str(),
        assistant = ?assistant,
        "session initialized"
    );

    let payload = rpc::response(request.id, initialize_result());
    let event_id = session.emit(payload.clone());
    let mut response =
        sse_once(StreamEvent { event_id, payload }).into_response();
    match session_id.parse() {
        Ok(value) => {
            response.headers_mut().insert(SESSION_HEADER, value);
        }
        Err(_) => {
            return server_error();
        }
    }
    response
}

/// Dispatch one message on an existing session.
async fn dispatch_on_session(session: &Session, request: JsonRpcRequest) -> Response {
    if request.is_notification() {
        debug!(method = request.method.as_str(), "notification accepted");
        return StatusCode::ACCEPTED.into_response();
    }

    let payload = match request.method.as_str() {
        "initialize" => rpc::response(request.id, initialize_result()),
        "ping" => rpc::response(request.id, serde_json::json!({})),
        "tools/list" => rpc::response(
            request.id,
            serde_json::json!({ "tools": session.tool_server.tool_definitions() }),
        ),
        "tools/call" => {
            let params = request.params.unwrap_or_else(|| serde_json::json!({}));
            let Some(name) = params.get("name").and_then(|n| n.as_str()) else {
                return sse_once_payload(session, rpc::error_response(
                    request.id,
                    rpc::BAD_REQUEST,
                    "tools/call requires a tool name",
                ));
            };
            let arguments = params
                .get("arguments")
                .cloned()
                .unwrap_or_else(|| serde_json::json!({}));
            let result = session.tool_server.call(name, arguments).await;
            match serde_json::to_value(&result) {
                Ok(result) => rpc::response(request.id, result),
                Err(_) => return server_error(),
            }
        }
        other => rpc::error_response(
            request.id,
            rpc::METHOD_NOT_FOUND,
            &format!("method not found: {other}"),
        ),
    };

    sse_once_payload(session, payload)
}

/// Attach (or resume) the session's SSE stream.
pub async fn handle_get(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(session_id) = header_str(&headers, SESSION_HEADER) else {
        return bad_request("Bad Request: missing session id");
    };
    let Some(session) = state.sessions.get(session_id).map(|s| Arc::clone(&s)) else {
        return bad_request("Bad Request: Unknown session id");
    };

    // Subscribe before snapshotting the replay so nothing falls between;
    // the live filter drops any overlap.
    let rx = session.subscribe();
    let anchor = header_str(&headers, LAST_EVENT_ID_HEADER).unwrap_or("");
    let (replayed, threshold) = match session.event_log.replay_after(anchor) {
        Some((_, events)) => {
            let threshold = events
                .last()
                .and_then(|event| parse_event_id(&event.event_id))
                .or_else(|| parse_event_id(anchor))
                .map(|(_, seq)| seq)
                .unwrap_or(0);
            let events = events
                .into_iter()
                .map(|event| StreamEvent {
                    event_id: event.event_id,
                    payload: event.payload,
                })
                .collect::<Vec<_>>();
            (events, threshold)
        }
        None => (Vec::new(), 0),
    };
    debug!(
        session_id = session.id.as_str(),
        replayed = replayed.len(),
        "stream attached"
    );

    let live = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => return Some((event, rx)),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
    .filter(move |event| {
        let fresh = parse_event_id(&event.event_id)
            .map(|(_, seq)| seq > threshold)
            .unwrap_or(true);
        futures::future::ready(fresh)
    });

    let events = stream::iter(replayed).chain(live).map(to_sse_event);
    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// Terminate a session.
pub async fn handle_delete(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(session_id) = header_str(&headers, SESSION_HEADER) else {
        return bad_request("Bad Request: missing session id");
    };
    let Some((_, session)) = state.sessions.remove(session_id) else {
        return bad_request("Bad Request: Unknown session id");
    };

    close_session(&state, &session).await;
    info!(session_id, "session closed");
    StatusCode::OK.into_response()
}

/// The transport close hook: registry offline, store mirror, nothing else.
pub async fn close_session(state: &AppState, session: &Session) {
    if let Some(id) = session.assistant_id {
        state.registry.set_offline(id);
        if let Err(e) = state
            .store
            .update_client_presence(id, ClientStatus::Offline, None)
            .await
        {
            warn!(error = %e, assistant = %id, "failed to mirror offline status");
        }
    }
}

fn initialize_result() -> serde_json::Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": "crosstalk",
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn to_sse_event(event: StreamEvent) -> Result<Event, Infallible> {
    Ok(Event::default()
        .id(event.event_id)
        .event("message")
        .data(event.payload.to_string()))
}

/// A finite SSE response carrying exactly one already-emitted event.
fn sse_once(event: StreamEvent) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(stream::iter(vec![event]).map(to_sse_event))
}

/// Emit `payload` on the session and answer with a single-event stream.
fn sse_once_payload(session: &Session, payload: serde_json::Value) -> Response {
    let event_id = session.emit(payload.clone());
    sse_once(StreamEvent { event_id, payload }).into_response()
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(rpc::bad_request_envelope(message)),
    )
        .into_response()
}

fn server_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "dispatch_failed" })),
    )
        .into_response()
}
