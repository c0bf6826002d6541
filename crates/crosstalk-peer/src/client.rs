// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent MCP stdio channel to the codex CLI.
//!
//! One long-lived child runs in MCP server mode; tool calls are serialized
//! through an internal mutex. Any transport or tool error disconnects the
//! client so the next call reconnects from scratch.

use async_trait::async_trait;
use dashmap::DashMap;
use rmcp::model::CallToolRequestParam;
use rmcp::service::{RoleClient, RunningService, ServiceExt};
use rmcp::transport::child_process::TokioChildProcess;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crosstalk_config::model::CodexConfig;
use crosstalk_core::CrosstalkError;

use crate::persona::Persona;

/// Tier-A channel to the peer. Returns `Ok(None)` when no response text
/// could be extracted; the dispatcher then falls through to the exec tier.
#[async_trait]
pub trait PeerChannel: Send + Sync {
    async fn send_message(
        &self,
        prompt: &str,
        message_id: Option<&str>,
        persona: Option<&Persona>,
    ) -> Result<Option<String>, CrosstalkError>;
}

/// Persistent stdio tool-call channel to a `codex mcp serve` child.
pub struct PeerMcpClient {
    config: CodexConfig,
    service: Mutex<Option<RunningService<RoleClient, ()>>>,
    /// Peer conversation id remembered per originating message id, so
    /// follow-ups on the same message continue the same peer conversation.
    conversations: DashMap<String, String>,
}

impl PeerMcpClient {
    pub fn new(config: CodexConfig) -> Self {
        Self {
            config,
            service: Mutex::new(None),
            conversations: DashMap::new(),
        }
    }

    /// Spawn the child, open the stdio channel, and verify the `codex` tool
    /// is served.
    async fn connect(&self) -> Result<RunningService<RoleClient, ()>, CrosstalkError> {
        let mut cmd = Command::new(&self.config.path);
        cmd.arg("mcp").arg("serve");
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }

        let transport = TokioChildProcess::new(cmd).map_err(|e| CrosstalkError::Peer {
            message: format!("failed to spawn {}: {e}", self.config.path),
            source: Some(Box::new(e)),
        })?;

        let service = ().serve(transport).await.map_err(|e| CrosstalkError::Peer {
            message: format!("mcp handshake with {} failed: {e}", self.config.path),
            source: Some(Box::new(e)),
        })?;

        let tools = match service.list_tools(Default::default()).await {
            Ok(tools) => tools,
            Err(e) => {
                let _ = service.cancel().await;
                return Err(CrosstalkError::Peer {
                    message: format!("tool discovery failed: {e}"),
                    source: Some(Box::new(e)),
                });
            }
        };
        if !tools.tools.iter().any(|t| t.name == "codex") {
            let _ = service.cancel().await;
            return Err(CrosstalkError::Peer {
                message: "peer does not serve a 'codex' tool".to_string(),
                source: None,
            });
        }

        info!(path = self.config.path.as_str(), "connected to codex mcp server");
        Ok(service)
    }
}

#[async_trait]
impl PeerChannel for PeerMcpClient {
    async fn send_message(
        &self,
        prompt: &str,
        message_id: Option<&str>,
        persona: Option<&Persona>,
    ) -> Result<Option<String>, CrosstalkError> {
        let mut guard = self.service.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }

        let remembered = message_id
            .and_then(|id| self.conversations.get(id))
            .map(|entry| entry.value().clone());

        let (tool, arguments) = match &remembered {
            Some(conversation_id) => (
                "codex-reply",
                serde_json::json!({
                    "conversation_id": conversation_id,
                    "prompt": prompt,
                }),
            ),
            None => {
                let persona = persona.unwrap_or(&crate::persona::ARCHITECT);
                let sandbox = persona.sandbox.unwrap_or(self.config.sandbox.as_str());
                let base_instructions = self
                    .config
                    .base_instructions
                    .clone()
                    .unwrap_or_else(|| persona.base_instructions.to_string());
                (
                    "codex",
                    serde_json::json!({
                        "prompt": prompt,
                        "approval-policy": self.config.approval_policy,
                        "sandbox": sandbox,
                        "base-instructions": base_instructions,
                    }),
                )
            }
        };

        let arguments = match arguments {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        };
        let request = CallToolRequestParam {
            name: tool.to_string().into(),
            arguments,
        };

        let service = guard.as_ref().ok_or_else(|| CrosstalkError::Peer {
            message: "peer channel lost before call".to_string(),
            source: None,
        })?;
        let result = match service.call_tool(request).await {
            Ok(result) => result,
            Err(e) => {
                // Drop the channel so the next call reconnects.
                if let Some(service) = guard.take() {
                    let _ = service.cancel().await;
                }
                warn!(error = %e, tool, "peer tool call failed, disconnected");
                return Err(CrosstalkError::Peer {
                    message: format!("peer tool call '{tool}' failed: {e}"),
                    source: Some(Box::new(e)),
                });
            }
        };
        drop(guard);

        let value = serde_json::to_value(&result).map_err(|e| CrosstalkError::Peer {
            message: format!("unserializable peer result: {e}"),
            source: Some(Box::new(e)),
        })?;

        if let (Some(message_id), Some(conversation_id)) =
            (message_id, extract_conversation_id(&value))
        {
            debug!(
                message_id,
                conversation_id = conversation_id.as_str(),
                "remembered peer conversation"
            );
            self.conversations
                .insert(message_id.to_string(), conversation_id);
        }

        Ok(extract_text(&value))
    }
}

/// Pull the response text out of a tool result.
///
/// The first `content` item of type `text` is used; if its text parses as a
/// JSON object with a `response` field, that field is returned, otherwise
/// the text verbatim.
pub(crate) fn extract_text(result: &serde_json::Value) -> Option<String> {
    let text = result
        .get("content")?
        .as_array()?
        .iter()
        .find(|item| item.get("type").and_then(|t| t.as_str()) == Some("text"))?
        .get("text")?
        .as_str()?;

    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(text) {
        if let Some(response) = parsed.get("response").and_then(|r| r.as_str()) {
            return Some(response.to_string());
        }
    }
    Some(text.to_string())
}

/// Find the peer's conversation id, either inside a JSON content item or in
/// the result's `_meta`.
pub(crate) fn extract_conversation_id(result: &serde_json::Value) -> Option<String> {
    if let Some(items) = result.get("content").and_then(|c| c.as_array()) {
        for item in items {
            let Some(text) = item.get("text").and_then(|t| t.as_str()) else {
                continue;
            };
            if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(text) {
                if let Some(id) = parsed.get("conversationId").and_then(|v| v.as_str()) {
                    return Some(id.to_string());
                }
            }
        }
    }
    result
        .get("_meta")
        .or_else(|| result.get("meta"))
        .and_then(|meta| meta.get("conversationId"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
