// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session identity lookup.

use async_trait::async_trait;

use crosstalk_core::CrosstalkError;

use crate::context::ToolContext;
use crate::tool::Tool;

/// Reports which assistant this session is authenticated as.
pub struct WhoAmITool;

#[async_trait]
impl Tool for WhoAmITool {
    fn name(&self) -> &str {
        "who_am_i"
    }

    fn description(&self) -> &str {
        "Return the calling assistant's identity and description"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        })
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        _input: serde_json::Value,
    ) -> Result<serde_json::Value, CrosstalkError> {
        let identity = ctx.require_identity()?;
        Ok(serde_json::json!({
            "client_id": identity.to_string(),
            "description": identity.description(),
        }))
    }
}
