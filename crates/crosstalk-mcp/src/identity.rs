// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assistant identity derivation for incoming sessions.
//!
//! Order, first hit wins: `x-client-id` header, user-agent substring,
//! `client` query parameter. Only the exact literals `claude` and `codex`
//! are accepted; anything else leaves the session anonymous.

use axum::http::HeaderMap;

use crosstalk_core::types::AssistantId;

/// Resolve the calling assistant from request headers and query parameters.
pub fn resolve(headers: &HeaderMap, client_param: Option<&str>) -> Option<AssistantId> {
    if let Some(value) = header_str(headers, "x-client-id") {
        if let Ok(id) = value.parse::<AssistantId>() {
            return Some(id);
        }
    }

    if let Some(agent) = header_str(headers, "user-agent") {
        if agent.contains("claude-code") || agent.contains("Claude") {
            return Some(AssistantId::Claude);
        }
        if agent.contains("codex") || agent.contains("Codex") {
            return Some(AssistantId::Codex);
        }
    }

    if let Some(value) = client_param {
        if let Ok(id) = value.parse::<AssistantId>() {
            return Some(id);
        }
    }

    None
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
