// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Crosstalk tool surface.
//!
//! A schema-validated registry of named tools, the per-session
//! [`ToolServer`] that dispatches them, and the best-effort knowledge-graph
//! sync client.

pub mod context;
pub mod kg;
pub mod server;
pub mod tool;
pub mod tools;

pub use context::ToolContext;
pub use kg::KnowledgeGraphClient;
pub use server::ToolServer;
pub use tool::{ToolCallResult, ToolContent, ToolRegistry};
