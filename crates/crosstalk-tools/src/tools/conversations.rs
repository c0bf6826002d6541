// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation lifecycle tools.

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

use crosstalk_core::types::{Conversation, ConversationStatus};
use crosstalk_core::CrosstalkError;
use crosstalk_storage::now_ts;

use crate::context::ToolContext;
use crate::tool::{parse_params, Tool};

/// Open a new conversation owned by the calling assistant.
pub struct CreateConversationTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateConversationParams {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    project: Option<String>,
}

#[async_trait]
impl Tool for CreateConversationTool {
    fn name(&self) -> &str {
        "create_conversation"
    }

    fn description(&self) -> &str {
        "Create a new conversation between the assistants"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "project": { "type": "string" }
            },
            "additionalProperties": false
        })
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, CrosstalkError> {
        let identity = ctx.require_identity()?;
        let params: CreateConversationParams = parse_params(input)?;

        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            title: params.title,
            project: params.project,
            status: ConversationStatus::Active,
            created_by: identity,
            created_at: now_ts(),
            updated_at: now_ts(),
            summary: None,
            metadata: None,
            closed_at: None,
        };
        ctx.store.create_conversation(&conversation).await?;
        Ok(serde_json::to_value(conversation).map_err(|e| CrosstalkError::Internal(e.to_string()))?)
    }
}

/// Page through conversations, newest activity first.
pub struct ListConversationsTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListConversationsParams {
    #[serde(default = "default_status")]
    status: String,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_status() -> String {
    "active".to_string()
}

fn default_limit() -> i64 {
    20
}

#[async_trait]
impl Tool for ListConversationsTool {
    fn name(&self) -> &str {
        "list_conversations"
    }

    fn description(&self) -> &str {
        "List conversations ordered by most recent activity"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "status": { "type": "string", "enum": ["active", "completed", "all"], "default": "active" },
                "limit": { "type": "integer", "minimum": 1, "maximum": 100, "default": 20 },
                "offset": { "type": "integer", "minimum": 0, "default": 0 }
            },
            "additionalProperties": false
        })
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, CrosstalkError> {
        let params: ListConversationsParams = parse_params(input)?;
        if !(1..=100).contains(&params.limit) {
            return Err(CrosstalkError::Validation(
                "limit must be between 1 and 100".to_string(),
            ));
        }
        if params.offset < 0 {
            return Err(CrosstalkError::Validation(
                "offset must be non-negative".to_string(),
            ));
        }
        let status = match params.status.as_str() {
            "active" => Some(ConversationStatus::Active),
            "completed" => Some(ConversationStatus::Completed),
            "all" => None,
            other => {
                return Err(CrosstalkError::Validation(format!(
                    "status must be active, completed, or all, got '{other}'"
                )))
            }
        };

        let conversations = ctx
            .store
            .list_conversations(status, params.limit, params.offset)
            .await?;
        let count = conversations.len();
        Ok(serde_json::json!({
            "conversations": conversations,
            "count": count,
        }))
    }
}

/// Fetch a single conversation.
pub struct GetConversationTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetConversationParams {
    conversation_id: String,
}

#[async_trait]
impl Tool for GetConversationTool {
    fn name(&self) -> &str {
        "get_conversation"
    }

    fn description(&self) -> &str {
        "Fetch one conversation by id"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "conversation_id": { "type": "string", "format": "uuid" }
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
        let params: GetConversationParams = parse_params(input)?;
        let conversation = ctx
            .store
            .get_conversation(&params.conversation_id)
            .await?
            .ok_or_else(|| {
                CrosstalkError::not_found("conversation", params.conversation_id.as_str())
            })?;
        Ok(serde_json::to_value(conversation).map_err(|e| CrosstalkError::Internal(e.to_string()))?)
    }
}

/// Complete a conversation, optionally syncing its summary to the
/// knowledge graph.
pub struct CloseConversationTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CloseConversationParams {
    conversation_id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default = "default_sync")]
    sync: bool,
}

fn default_sync() -> bool {
    true
}

#[async_trait]
impl Tool for CloseConversationTool {
    fn name(&self) -> &str {
        "close_conversation"
    }

    fn description(&self) -> &str {
        "Mark a conversation completed, with an optional summary"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "conversation_id": { "type": "string", "format": "uuid" },
                "summary": { "type": "string" },
                "sync": { "type": "boolean", "default": true }
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
        let params: CloseConversationParams = parse_params(input)?;
        ctx.store
            .get_conversation(&params.conversation_id)
            .await?
            .ok_or_else(|| {
                CrosstalkError::not_found("conversation", params.conversation_id.as_str())
            })?;

        ctx.store
            .update_conversation_status(
                &params.conversation_id,
                ConversationStatus::Completed,
                params.summary.clone(),
            )
            .await?;

        if params.sync {
            if let Some(summary) = &params.summary {
                ctx.kg.spawn_summary_sync(&params.conversation_id, summary);
            }
        }

        Ok(serde_json::json!({
            "conversation_id": params.conversation_id,
            "status": "completed",
        }))
    }
}
