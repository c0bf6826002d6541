// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP server assembly: routes, shared state, and lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    middleware,
    routing::get,
    Json, Router,
};
use dashmap::DashMap;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crosstalk_core::{ClientRegistry, CrosstalkError};
use crosstalk_dispatch::QueueProcessor;
use crosstalk_storage::Store;
use crosstalk_tools::{KnowledgeGraphClient, ToolContext};

use crate::security;
use crate::session::SessionMap;
use crate::transport;

/// Shared state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionMap,
    pub registry: Arc<ClientRegistry>,
    pub store: Store,
    pub queue: Arc<QueueProcessor>,
    pub kg: Arc<KnowledgeGraphClient>,
    /// Identity-less template; each session binds its own identity.
    pub tool_ctx: ToolContext,
    pub port: u16,
}

impl AppState {
    pub fn new(
        store: Store,
        registry: Arc<ClientRegistry>,
        queue: Arc<QueueProcessor>,
        kg: Arc<KnowledgeGraphClient>,
        tool_ctx: ToolContext,
        port: u16,
    ) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            registry,
            store,
            queue,
            kg,
            tool_ctx,
            port,
        }
    }
}

/// Build the bridge router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/mcp",
            axum::routing::post(transport::handle_post)
                .get(transport::handle_get)
                .delete(transport::handle_delete),
        )
        .route("/status", get(get_status))
        .route("/health", get(get_health))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security::loopback_guard,
        ))
        .with_state(state)
}

#[derive(Serialize)]
struct SessionSummary {
    id: String,
    #[serde(rename = "clientId")]
    client_id: Option<String>,
}

#[derive(Serialize)]
struct StatusResponse {
    sessions: Vec<SessionSummary>,
    #[serde(rename = "sessionCount")]
    session_count: usize,
}

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let sessions: Vec<SessionSummary> = state
        .sessions
        .iter()
        .map(|entry| SessionSummary {
            id: entry.key().clone(),
            client_id: entry.value().assistant_id.map(|id| id.to_string()),
        })
        .collect();
    let session_count = sessions.len();
    Json(StatusResponse {
        sessions,
        session_count,
    })
}

async fn get_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let knowledge_graph = if state.kg.is_available().await {
        "available"
    } else {
        "unavailable"
    };
    Json(serde_json::json!({
        "status": "ok",
        "knowledge_graph": knowledge_graph,
    }))
}

/// Bind the loopback listener and serve until `cancel` fires, then run the
/// shutdown hook over every live session.
pub async fn serve(state: AppState, cancel: CancellationToken) -> Result<(), CrosstalkError> {
    let addr = format!("127.0.0.1:{}", state.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CrosstalkError::Transport {
            message: format!("failed to bind {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;
    info!(addr = addr.as_str(), "bridge listening");

    let app = router(state.clone());
    let shutdown = cancel.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
    .map_err(|e| CrosstalkError::Transport {
        message: format!("server error: {e}"),
        source: Some(Box::new(e)),
    })?;

    shutdown_sessions(&state).await;
    Ok(())
}

/// Set every session's owner offline, drop the sessions, clear the registry.
pub async fn shutdown_sessions(state: &AppState) {
    let sessions: Vec<_> = state
        .sessions
        .iter()
        .map(|entry| Arc::clone(entry.value()))
        .collect();
    for session in sessions {
        transport::close_session(state, &session).await;
    }
    state.sessions.clear();
    state.registry.clear();
    info!("all sessions closed");
}
