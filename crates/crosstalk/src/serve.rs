// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `crosstalk serve` command implementation.
//!
//! Wires the store, client registry, subprocess peer adapters, dispatcher,
//! queue processor, and HTTP transport together, then serves until a
//! shutdown signal arrives. Shutdown order: stop the queue processor, close
//! every session, checkpoint and close the database.

use std::sync::Arc;

use tracing::info;

use crosstalk_config::CrosstalkConfig;
use crosstalk_core::{ClientRegistry, CrosstalkError};
use crosstalk_dispatch::{Dispatcher, QueueProcessor};
use crosstalk_mcp::AppState;
use crosstalk_peer::{CodexExec, PeerMcpClient};
use crosstalk_storage::Store;
use crosstalk_tools::{KnowledgeGraphClient, ToolContext};

use crate::shutdown;

/// Runs the `crosstalk serve` command.
pub async fn run_serve(config: CrosstalkConfig) -> Result<(), CrosstalkError> {
    init_tracing(&config.server.log_level);

    info!("starting crosstalk serve");

    let store = Store::open(&config.storage.database_path).await?;
    info!(path = config.storage.database_path.as_str(), "store opened");

    // Crash recovery: nothing is online until a session says so.
    store.reset_presence().await?;

    let registry = Arc::new(ClientRegistry::new());
    let peer = Arc::new(PeerMcpClient::new(config.codex.clone()));
    let exec = Arc::new(CodexExec::new(config.codex.clone(), store.clone()));
    let dispatcher = Arc::new(Dispatcher::new(
        store.clone(),
        registry.clone(),
        peer,
        exec,
        config.codex.enabled,
    ));
    let queue = Arc::new(QueueProcessor::new(store.clone(), registry.clone()));
    let kg = Arc::new(KnowledgeGraphClient::new(config.knowledge_graph.url.clone()));

    let tool_ctx = ToolContext {
        store: store.clone(),
        clients: registry.clone(),
        dispatcher,
        kg: kg.clone(),
        identity: None,
    };
    let state = AppState::new(
        store.clone(),
        registry,
        queue.clone(),
        kg,
        tool_ctx,
        config.server.port,
    );

    let cancel = shutdown::install_signal_handler();
    let queue_handle = queue.spawn(cancel.clone());
    info!(
        port = config.server.port,
        codex_mcp = config.codex.enabled,
        "bridge assembled"
    );

    crosstalk_mcp::serve(state, cancel.clone()).await?;

    // serve() has already closed the sessions; stop the queue loop and
    // flush the store.
    cancel.cancel();
    let _ = queue_handle.await;
    store.close().await?;

    info!("crosstalk serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("crosstalk={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
