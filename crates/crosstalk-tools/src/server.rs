// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-session tool server.
//!
//! Binds the shared tool registry to one session's identity and converts
//! every handler failure into the error envelope; the HTTP layer never sees
//! a tool failure as anything but a 200 with `isError:true`.

use std::sync::Arc;

use tracing::debug;

use crosstalk_core::types::AssistantId;

use crate::context::ToolContext;
use crate::tool::{ToolCallResult, ToolRegistry};
use crate::tools;

/// Schema-validated tool dispatch for one session.
pub struct ToolServer {
    registry: Arc<ToolRegistry>,
    ctx: ToolContext,
}

impl ToolServer {
    /// A server over the full bridge tool set.
    pub fn new(ctx: ToolContext) -> Self {
        let mut registry = ToolRegistry::new();
        tools::register_all(&mut registry);
        Self {
            registry: Arc::new(registry),
            ctx,
        }
    }

    /// A server over a caller-supplied registry (used by tests).
    pub fn with_registry(ctx: ToolContext, registry: Arc<ToolRegistry>) -> Self {
        Self { registry, ctx }
    }

    /// The assistant this session resolved to, if any.
    pub fn identity(&self) -> Option<AssistantId> {
        self.ctx.identity
    }

    /// MCP tool definitions for `tools/list`.
    pub fn tool_definitions(&self) -> Vec<serde_json::Value> {
        self.registry.tool_definitions()
    }

    /// Dispatch one tool call, always producing a result envelope.
    pub async fn call(&self, name: &str, arguments: serde_json::Value) -> ToolCallResult {
        let Some(tool) = self.registry.get(name) else {
            return ToolCallResult::error(format!("unknown tool: {name}"));
        };
        debug!(tool = name, identity = ?self.ctx.identity, "tool call");
        match tool.invoke(&self.ctx, arguments).await {
            Ok(value) => ToolCallResult::ok(value),
            Err(e) => ToolCallResult::error(e.to_string()),
        }
    }
}
