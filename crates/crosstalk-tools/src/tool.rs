// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool trait, registry, and the wire result envelope.
//!
//! Every tool provides a name, description, JSON Schema for its parameters,
//! and an async `invoke`. Results always reach the client as textual JSON
//! inside the `{content:[{type:"text",text}], isError?}` envelope; handler
//! failures become `{"error": …}` with `isError:true` and the HTTP layer
//! stays 200.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crosstalk_core::CrosstalkError;

use crate::context::ToolContext;

/// One content item of a tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    Text { text: String },
}

/// The wire envelope for a tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolCallResult {
    /// Wrap a successful result value as textual JSON.
    pub fn ok(value: serde_json::Value) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: value.to_string(),
            }],
            is_error: None,
        }
    }

    /// Wrap a failure as `{"error": message}` with the error flag set.
    pub fn error(message: impl AsRef<str>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: serde_json::json!({ "error": message.as_ref() }).to_string(),
            }],
            is_error: Some(true),
        }
    }

    /// The first text payload, for tests and logging.
    pub fn text(&self) -> Option<&str> {
        self.content.first().map(|ToolContent::Text { text }| text.as_str())
    }
}

/// Unified interface for all bridge tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's unique name (used for lookup and API serialization).
    fn name(&self) -> &str;

    /// Human-readable description of what the tool does.
    fn description(&self) -> &str;

    /// JSON Schema describing the tool's input parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Invoke the tool with parsed JSON input on behalf of one session.
    async fn invoke(
        &self,
        ctx: &ToolContext,
        input: serde_json::Value,
    ) -> Result<serde_json::Value, CrosstalkError>;
}

/// Registry of available tools, indexed by name.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registers a tool. The tool is indexed by its `name()`.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Looks up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// MCP-format tool definitions for `tools/list`, sorted by name.
    ///
    /// Each definition has the shape
    /// `{"name", "description", "inputSchema"}`.
    pub fn tool_definitions(&self) -> Vec<serde_json::Value> {
        let mut defs: Vec<serde_json::Value> = self
            .tools
            .values()
            .map(|t| {
                serde_json::json!({
                    "name": t.name(),
                    "description": t.description(),
                    "inputSchema": t.parameters_schema(),
                })
            })
            .collect();
        defs.sort_by(|a, b| {
            a["name"]
                .as_str()
                .unwrap_or("")
                .cmp(b["name"].as_str().unwrap_or(""))
        });
        defs
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse tool input into a typed parameter struct, mapping serde failures
/// onto validation errors. Validation always precedes dispatch.
pub fn parse_params<T: serde::de::DeserializeOwned>(
    input: serde_json::Value,
) -> Result<T, CrosstalkError> {
    serde_json::from_value(input).map_err(|e| CrosstalkError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_result_serializes_to_the_wire_envelope() {
        let result = ToolCallResult::ok(serde_json::json!({"client_id": "claude"}));
        let wire = serde_json::to_value(&result).unwrap();
        assert_eq!(wire["content"][0]["type"], "text");
        assert!(wire["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("\"client_id\":\"claude\""));
        assert!(wire.get("isError").is_none());
    }

    #[test]
    fn error_result_sets_flag_and_json_error_text() {
        let result = ToolCallResult::error("Unknown client");
        let wire = serde_json::to_value(&result).unwrap();
        assert_eq!(wire["isError"], true);
        let text: serde_json::Value =
            serde_json::from_str(wire["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(text["error"], "Unknown client");
    }

    #[test]
    fn parse_params_rejects_unknown_fields() {
        #[derive(Debug, serde::Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Params {
            #[allow(dead_code)]
            name: String,
        }
        let err =
            parse_params::<Params>(serde_json::json!({"name": "x", "bogus": 1})).unwrap_err();
        assert!(matches!(err, CrosstalkError::Validation(_)));
    }
}
