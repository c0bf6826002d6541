// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streamable HTTP MCP transport for the Crosstalk bridge.
//!
//! Sessions live over `/mcp` (POST to initialise and dispatch, GET to
//! attach the resumable SSE stream, DELETE to close). Each session owns an
//! [`event_log::EventLog`] whose ids double as SSE event ids, so a client
//! that reconnects with `last-event-id` is caught up before new events
//! flow. Only loopback callers are served.

pub mod event_log;
pub mod identity;
pub mod rpc;
pub mod security;
pub mod server;
pub mod session;
pub mod transport;

pub use server::{router, serve, shutdown_sessions, AppState};
