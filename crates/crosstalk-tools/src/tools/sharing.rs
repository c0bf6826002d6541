// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared context tools: opaque payloads passed between the assistants.

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crosstalk_core::types::{ContextType, SharedContext};
use crosstalk_core::CrosstalkError;
use crosstalk_storage::now_ts;

use crate::context::ToolContext;
use crate::tool::{parse_params, Tool};

/// Store a context payload for the other assistant.
pub struct ShareContextTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ShareContextParams {
    #[serde(default)]
    conversation_id: Option<String>,
    context_type: ContextType,
    content: String,
    #[serde(default)]
    description: Option<String>,
}

#[async_trait]
impl Tool for ShareContextTool {
    fn name(&self) -> &str {
        "share_context"
    }

    fn description(&self) -> &str {
        "Share a file, snippet, entity, memory item, or URL with the other assistant"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "conversation_id": { "type": "string", "format": "uuid" },
                "context_type": {
                    "type": "string",
                    "enum": ["file", "snippet", "entity", "memory_item", "url"]
                },
                "content": { "type": "string", "minLength": 1 },
                "description": { "type": "string" }
            },
            "required": ["context_type", "content"],
            "additionalProperties": false
        })
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, CrosstalkError> {
        let identity = ctx.require_identity()?;
        let params: ShareContextParams = parse_params(input)?;
        if params.content.is_empty() {
            return Err(CrosstalkError::Validation(
                "content must not be empty".to_string(),
            ));
        }
        if let Some(conversation_id) = &params.conversation_id {
            ctx.store
                .get_conversation(conversation_id)
                .await?
                .ok_or_else(|| {
                    CrosstalkError::not_found("conversation", conversation_id.as_str())
                })?;
        }

        let context = SharedContext {
            id: Uuid::new_v4().to_string(),
            conversation_id: params.conversation_id,
            context_type: params.context_type,
            content: params.content,
            description: params.description,
            shared_by: identity,
            created_at: now_ts(),
        };
        ctx.store.create_shared_context(&context).await?;
        Ok(serde_json::to_value(context).map_err(|e| CrosstalkError::Internal(e.to_string()))?)
    }
}

/// Fetch one shared context payload.
pub struct GetSharedContextTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetSharedContextParams {
    context_id: String,
}

#[async_trait]
impl Tool for GetSharedContextTool {
    fn name(&self) -> &str {
        "get_shared_context"
    }

    fn description(&self) -> &str {
        "Fetch one shared context payload by id"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "context_id": { "type": "string", "format": "uuid" }
            },
            "required": ["context_id"],
            "additionalProperties": false
        })
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, CrosstalkError> {
        let params: GetSharedContextParams = parse_params(input)?;
        let context = ctx
            .store
            .get_shared_context(&params.context_id)
            .await?
            .ok_or_else(|| {
                CrosstalkError::not_found("shared context", params.context_id.as_str())
            })?;
        Ok(serde_json::to_value(context).map_err(|e| CrosstalkError::Internal(e.to_string()))?)
    }
}

/// List shared context, optionally scoped to a conversation.
pub struct ListSharedContextTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListSharedContextParams {
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    20
}

#[async_trait]
impl Tool for ListSharedContextTool {
    fn name(&self) -> &str {
        "list_shared_context"
    }

    fn description(&self) -> &str {
        "List shared context payloads, newest first"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "conversation_id": { "type": "string", "format": "uuid" },
                "limit": { "type": "integer", "minimum": 1, "maximum": 100, "default": 20 }
            },
            "additionalProperties": false
        })
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, CrosstalkError> {
        let params: ListSharedContextParams = parse_params(input)?;
        if !(1..=100).contains(&params.limit) {
            return Err(CrosstalkError::Validation(
                "limit must be between 1 and 100".to_string(),
            ));
        }

        let contexts = ctx
            .store
            .list_shared_context(params.conversation_id, params.limit)
            .await?;
        let count = contexts.len();
        Ok(serde_json::json!({
            "contexts": contexts,
            "count": count,
        }))
    }
}
