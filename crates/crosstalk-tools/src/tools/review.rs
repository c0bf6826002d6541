// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Review requests: wraps `send_message` with a focus-tuned prompt and a
//! structured review request.

use async_trait::async_trait;
use serde::Deserialize;

use crosstalk_core::types::{AssistantId, MessageType, Priority};
use crosstalk_core::CrosstalkError;
use crosstalk_dispatch::SendOptions;

use crate::context::ToolContext;
use crate::tool::{parse_params, Tool};

/// How long a review is waited on.
const REVIEW_TIMEOUT_MS: u64 = 120_000;

/// Ask the other assistant to review content.
pub struct RequestReviewTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RequestReviewParams {
    target: AssistantId,
    content: String,
    #[serde(default = "default_review_type")]
    review_type: String,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default = "default_sync")]
    sync: bool,
}

fn default_review_type() -> String {
    "general".to_string()
}

fn default_sync() -> bool {
    true
}

/// Focus tail per review type.
fn review_focus(review_type: &str) -> Result<&'static str, CrosstalkError> {
    match review_type {
        "code" => Ok("Focus on correctness, error handling, and test coverage."),
        "architecture" => Ok(
            "Focus on module boundaries, coupling, and how the design will hold up as it grows.",
        ),
        "security" => Ok(
            "Focus on input validation, authentication boundaries, and anything an attacker \
             could reach.",
        ),
        "performance" => Ok(
            "Focus on algorithmic complexity, allocations, and contention under load.",
        ),
        "general" => Ok("Judge overall quality and call out whatever matters most."),
        other => Err(CrosstalkError::Validation(format!(
            "review_type must be code, architecture, security, performance, or general, got '{other}'"
        ))),
    }
}

#[async_trait]
impl Tool for RequestReviewTool {
    fn name(&self) -> &str {
        "request_review"
    }

    fn description(&self) -> &str {
        "Request a structured review from the other assistant"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "target": { "type": "string", "enum": ["claude", "codex"] },
                "content": { "type": "string", "minLength": 1 },
                "review_type": {
                    "type": "string",
                    "enum": ["code", "architecture", "security", "performance", "general"],
                    "default": "general"
                },
                "context": { "type": "string" },
                "conversation_id": { "type": "string", "format": "uuid" },
                "sync": { "type": "boolean", "default": true }
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
        let params: RequestReviewParams = parse_params(input)?;
        if params.target == identity {
            return Err(CrosstalkError::Forbidden(
                "cannot request a review from yourself".to_string(),
            ));
        }
        let focus = review_focus(&params.review_type)?;

        let mut prompt = format!(
            "Review request ({}):\n{}\n",
            params.review_type, params.content
        );
        if let Some(context) = &params.context {
            prompt.push_str(&format!("\nContext:\n{context}\n"));
        }
        prompt.push_str(&format!("\n{focus}"));

        let outcome = ctx
            .dispatcher
            .send_message(
                identity,
                params.target,
                &prompt,
                SendOptions {
                    conversation_id: params.conversation_id,
                    message_type: MessageType::ReviewRequest,
                    priority: Priority::Normal,
                    wait_for_response: true,
                    timeout_ms: REVIEW_TIMEOUT_MS,
                    ..SendOptions::default()
                },
            )
            .await?;

        if params.sync {
            if let Some(response) = &outcome.response {
                ctx.kg
                    .spawn_exchange_sync("review", &params.review_type, &response.content);
            }
        }

        let mut result =
            serde_json::to_value(outcome).map_err(|e| CrosstalkError::Internal(e.to_string()))?;
        if let Some(object) = result.as_object_mut() {
            object.insert(
                "review_type".to_string(),
                serde_json::json!(params.review_type),
            );
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_types_are_closed() {
        for kind in ["code", "architecture", "security", "performance", "general"] {
            assert!(review_focus(kind).is_ok());
        }
        assert!(review_focus("vibes").is_err());
    }
}
