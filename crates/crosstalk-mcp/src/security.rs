// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loopback-only request filtering.
//!
//! The bridge serves exactly one machine. Requests are rejected with 403
//! when the peer address is not loopback, when the `Host` authority is not
//! one of the loopback spellings for the bound port, or when a request to
//! the tool path carries an `Origin` header (browsers have no business
//! here).

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use crate::server::AppState;

pub async fn loopback_guard(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    if !addr.ip().is_loopback() {
        warn!(peer = %addr, "rejected non-loopback request");
        return forbidden("loopback only");
    }

    if let Some(host) = request.headers().get("host").and_then(|h| h.to_str().ok()) {
        if !allowed_host(host, state.port) {
            warn!(host, "rejected request with foreign host header");
            return forbidden("invalid host");
        }
    }

    if request.uri().path().starts_with("/mcp") && request.headers().contains_key("origin") {
        warn!("rejected cross-origin request to the tool path");
        return forbidden("origin not allowed");
    }

    next.run(request).await
}

/// The three loopback spellings for the bound port.
pub fn allowed_host(host: &str, port: u16) -> bool {
    host == format!("127.0.0.1:{port}")
        || host == format!("localhost:{port}")
        || host == format!("[::1]:{port}")
}

fn forbidden(reason: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(serde_json::json!({ "error": reason })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_hosts_are_exactly_the_loopback_spellings() {
        assert!(allowed_host("127.0.0.1:3790", 3790));
        assert!(allowed_host("localhost:3790", 3790));
        assert!(allowed_host("[::1]:3790", 3790));

        assert!(!allowed_host("127.0.0.1:9999", 3790));
        assert!(!allowed_host("localhost", 3790));
        assert!(!allowed_host("bridge.internal:3790", 3790));
        assert!(!allowed_host("127.0.0.2:3790", 3790));
    }
}
