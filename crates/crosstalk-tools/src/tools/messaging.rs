// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message tools: send, poll for responses, history, read receipts, search.

use async_trait::async_trait;
use serde::Deserialize;

use crosstalk_core::types::{AssistantId, MessageStatus, Priority};
use crosstalk_core::CrosstalkError;
use crosstalk_dispatch::SendOptions;

use crate::context::ToolContext;
use crate::tool::{parse_params, Tool};

/// Upper bound on send/response wait timeouts.
const MAX_TIMEOUT_MS: u64 = 300_000;

/// Send a message to the other assistant.
pub struct SendMessageTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SendMessageParams {
    #[serde(default)]
    conversation_id: Option<String>,
    target: AssistantId,
    content: String,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default)]
    response_to_id: Option<String>,
    #[serde(default = "default_wait")]
    wait_for_response: bool,
    #[serde(default = "default_send_timeout")]
    timeout_ms: u64,
    #[serde(default)]
    agent: Option<String>,
}

fn default_wait() -> bool {
    true
}

fn default_send_timeout() -> u64 {
    60_000
}

#[async_trait]
impl Tool for SendMessageTool {
    fn name(&self) -> &str {
        "send_message"
    }

    fn description(&self) -> &str {
        "Send a message to the other assistant and optionally wait for its reply"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "conversation_id": { "type": "string", "format": "uuid" },
                "target": { "type": "string", "enum": ["claude", "codex"] },
                "content": { "type": "string", "minLength": 1 },
                "priority": { "type": "string", "enum": ["normal", "high", "urgent"], "default": "normal" },
                "response_to_id": { "type": "string", "format": "uuid" },
                "wait_for_response": { "type": "boolean", "default": true },
                "timeout_ms": { "type": "integer", "minimum": 0, "maximum": 300000, "default": 60000 },
                "agent": { "type": "string", "enum": ["architect", "oracle"] }
            },
            "required": ["target", "content"],
            "additionalProperties": false
        })
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, CrosstalkError> {
        let identity = ctx.require_identity()?;
        let params: SendMessageParams = parse_params(input)?;

        if params.target == identity {
            return Err(CrosstalkError::Forbidden(
                "cannot send a message to yourself".to_string(),
            ));
        }
        if params.content.trim().is_empty() {
            return Err(CrosstalkError::Validation(
                "content must not be empty".to_string(),
            ));
        }
        if params.timeout_ms > MAX_TIMEOUT_MS {
            return Err(CrosstalkError::Validation(format!(
                "timeout_ms must be at most {MAX_TIMEOUT_MS}"
            )));
        }

        let outcome = ctx
            .dispatcher
            .send_message(
                identity,
                params.target,
                &params.content,
                SendOptions {
                    conversation_id: params.conversation_id,
                    priority: params.priority.unwrap_or(Priority::Normal),
                    response_to_id: params.response_to_id,
                    wait_for_response: params.wait_for_response,
                    timeout_ms: params.timeout_ms,
                    agent: params.agent,
                    ..SendOptions::default()
                },
            )
            .await?;

        Ok(serde_json::to_value(outcome).map_err(|e| CrosstalkError::Internal(e.to_string()))?)
    }
}

/// Poll for the response to an earlier message.
pub struct GetResponseTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetResponseParams {
    message_id: String,
    #[serde(default = "default_response_timeout")]
    timeout_ms: u64,
}

fn default_response_timeout() -> u64 {
    30_000
}

#[async_trait]
impl Tool for GetResponseTool {
    fn name(&self) -> &str {
        "get_response"
    }

    fn description(&self) -> &str {
        "Wait for the response to a previously sent message"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "message_id": { "type": "string", "format": "uuid" },
                "timeout_ms": { "type": "integer", "minimum": 0, "maximum": 300000, "default": 30000 }
            },
            "required": ["message_id"],
            "additionalProperties": false
        })
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, CrosstalkError> {
        let params: GetResponseParams = parse_params(input)?;
        if params.timeout_ms > MAX_TIMEOUT_MS {
            return Err(CrosstalkError::Validation(format!(
                "timeout_ms must be at most {MAX_TIMEOUT_MS}"
            )));
        }
        ctx.store
            .get_message(&params.message_id)
            .await?
            .ok_or_else(|| CrosstalkError::not_found("message", params.message_id.as_str()))?;

        match ctx
            .dispatcher
            .wait_for_response(&params.message_id, params.timeout_ms)
            .await?
        {
            Some(response) => Ok(serde_json::json!({ "response": response })),
            None => Ok(serde_json::json!({ "response": null, "timeout": true })),
        }
    }
}

/// Read a conversation's messages in order.
pub struct GetHistoryTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetHistoryParams {
    conversation_id: String,
    #[serde(default = "default_history_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_history_limit() -> i64 {
    50
}

#[async_trait]
impl Tool for GetHistoryTool {
    fn name(&self) -> &str {
        "get_history"
    }

    fn description(&self) -> &str {
        "Fetch a conversation's messages in chronological order"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "conversation_id": { "type": "string", "format": "uuid" },
                "limit": { "type": "integer", "minimum": 1, "maximum": 500, "default": 50 },
                "offset": { "type": "integer", "minimum": 0, "default": 0 }
            },
            "required": ["conversation_id"],
            "additionalProperties": false
        })
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, CrosstalkError> {
        let params: GetHistoryParams = parse_params(input)?;
        if !(1..=500).contains(&params.limit) {
            return Err(CrosstalkError::Validation(
                "limit must be between 1 and 500".to_string(),
            ));
        }
        if params.offset < 0 {
            return Err(CrosstalkError::Validation(
                "offset must be non-negative".to_string(),
            ));
        }
        ctx.store
            .get_conversation(&params.conversation_id)
            .await?
            .ok_or_else(|| {
                CrosstalkError::not_found("conversation", params.conversation_id.as_str())
            })?;

        let messages = ctx
            .store
            .get_history(&params.conversation_id, params.limit, params.offset)
            .await?;
        let count = messages.len();
        Ok(serde_json::json!({
            "messages": messages,
            "count": count,
        }))
    }
}

/// Mark a delivered message as read. Only the target may do this.
pub struct MarkMessageReadTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MarkMessageReadParams {
    message_id: String,
}

#[async_trait]
impl Tool for MarkMessageReadTool {
    fn name(&self) -> &str {
        "mark_message_read"
    }

    fn description(&self) -> &str {
        "Mark a message you received as read"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "message_id": { "type": "string", "format": "uuid" }
            },
            "required": ["message_id"],
            "additionalProperties": false
        })
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, CrosstalkError> {
        let identity = ctx.require_identity()?;
        let params: MarkMessageReadParams = parse_params(input)?;

        let message = ctx
            .store
            .get_message(&params.message_id)
            .await?
            .ok_or_else(|| CrosstalkError::not_found("message", params.message_id.as_str()))?;
        if message.target != identity {
            return Err(CrosstalkError::Forbidden(
                "only the target may mark a message read".to_string(),
            ));
        }

        ctx.store
            .update_message_status(&params.message_id, MessageStatus::Read)
            .await?;
        Ok(serde_json::json!({
            "message_id": params.message_id,
            "status": "read",
        }))
    }
}

/// Full-text search across message content.
pub struct SearchMessagesTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchMessagesParams {
    query: String,
    #[serde(default = "default_search_limit")]
    limit: i64,
}

fn default_search_limit() -> i64 {
    10
}

#[async_trait]
impl Tool for SearchMessagesTool {
    fn name(&self) -> &str {
        "search_messages"
    }

    fn description(&self) -> &str {
        "Full-text search over message content"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "minLength": 1 },
                "limit": { "type": "integer", "minimum": 1, "maximum": 50, "default": 10 }
            },
            "required": ["query"],
            "additionalProperties": false
        })
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, CrosstalkError> {
        let params: SearchMessagesParams = parse_params(input)?;
        if params.query.trim().is_empty() {
            return Err(CrosstalkError::Validation(
                "query must not be empty".to_string(),
            ));
        }
        if !(1..=50).contains(&params.limit) {
            return Err(CrosstalkError::Validation(
                "limit must be between 1 and 50".to_string(),
            ));
        }

        let hits = ctx.store.search_messages(&params.query, params.limit).await?;
        let count = hits.len();
        Ok(serde_json::json!({
            "results": hits,
            "count": count,
        }))
    }
}
