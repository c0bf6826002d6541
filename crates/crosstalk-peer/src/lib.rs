// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subprocess peer adapters for the `codex` CLI.
//!
//! Two tiers: a persistent MCP stdio channel ([`PeerMcpClient`]) that reuses
//! one long-lived child, and a one-shot exec fallback ([`CodexExec`]) that
//! runs `codex exec --json` with a schema-constrained structured output.
//! The dispatcher talks to both through the [`PeerChannel`] and
//! [`PeerExecutor`] traits so it can be tested without a codex binary.

pub mod client;
pub mod exec;
pub mod markdown;
pub mod persona;
pub mod schema;

pub use client::{PeerChannel, PeerMcpClient};
pub use exec::{CodexExec, ExecOutcome, ExecRequest, PeerExecutor};
pub use persona::Persona;
