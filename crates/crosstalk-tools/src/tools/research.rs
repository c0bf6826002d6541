// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Research delegation: wraps `send_message` with a depth-tuned prompt and
//! a structured research request.

use async_trait::async_trait;
use serde::Deserialize;

use crosstalk_core::types::{AssistantId, MessageType, Priority};
use crosstalk_core::CrosstalkError;
use crosstalk_dispatch::SendOptions;

use crate::context::ToolContext;
use crate::tool::{parse_params, Tool};

/// Ask the other assistant to research a topic.
pub struct DelegateResearchTool;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DelegateResearchParams {
    target: AssistantId,
    topic: String,
    #[serde(default)]
    context: Option<String>,
    #[serde(default = "default_depth")]
    depth: String,
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default = "default_sync")]
    sync: bool,
}

fn default_depth() -> String {
    "medium".to_string()
}

fn default_sync() -> bool {
    true
}

/// Depth-specific prompt tail and wait deadline.
fn depth_profile(depth: &str) -> Result<(&'static str, u64), CrosstalkError> {
    match depth {
        "shallow" => Ok((
            "Keep it quick: the three to five most important points, a short paragraph each.",
            120_000,
        )),
        "medium" => Ok((
            "Cover the main approaches and their trade-offs, and name the sources you relied on.",
            300_000,
        )),
        "deep" => Ok((
            "Be exhaustive: enumerate approaches, edge cases, and failure modes, and end with \
             concrete recommendations backed by sources.",
            600_000,
        )),
        other => Err(CrosstalkError::Validation(format!(
            "depth must be shallow, medium, or deep, got '{other}'"
        ))),
    }
}

#[async_trait]
impl Tool for DelegateResearchTool {
    fn name(&self) -> &str {
        "delegate_research"
    }

    fn description(&self) -> &str {
        "Delegate a research topic to the other assistant and wait for findings"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "target": { "type": "string", "enum": ["claude", "codex"] },
                "topic": { "type": "string", "minLength": 1 },
                "context": { "type": "string" },
                "depth": { "type": "string", "enum": ["shallow", "medium", "deep"], "default": "medium" },
                "conversation_id": { "type": "string", "format": "uuid" },
                "sync": { "type": "boolean", "default": true }
            },
            "required": ["target", "topic"],
            "additionalProperties": false
        })
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, CrosstalkError> {
        let identity = ctx.require_identity()?;
        let params: DelegateResearchParams = parse_params(input)?;
        if params.target == identity {
            return Err(CrosstalkError::Forbidden(
                "cannot delegate research to yourself".to_string(),
            ));
        }
        let (tail, timeout_ms) = depth_profile(&params.depth)?;

        let mut prompt = format!("Research request: {}\n", params.topic);
        if let Some(context) = &params.context {
            prompt.push_str(&format!("\nContext:\n{context}\n"));
        }
        prompt.push_str(&format!("\n{tail}"));

        let outcome = ctx
            .dispatcher
            .send_message(
                identity,
                params.target,
                &prompt,
                SendOptions {
                    conversation_id: params.conversation_id,
                    message_type: MessageType::ResearchRequest,
                    priority: Priority::Normal,
                    wait_for_response: true,
                    timeout_ms,
                    ..SendOptions::default()
                },
            )
            .await?;

        if params.sync {
            if let Some(response) = &outcome.response {
                ctx.kg
                    .spawn_exchange_sync("research", &params.topic, &response.content);
            }
        }

        let mut result =
            serde_json::to_value(outcome).map_err(|e| CrosstalkError::Internal(e.to_string()))?;
        if let Some(object) = result.as_object_mut() {
            object.insert("topic".to_string(), serde_json::json!(params.topic));
            object.insert("depth".to_string(), serde_json::json!(params.depth));
        }
        Ok(result)
    }
}
